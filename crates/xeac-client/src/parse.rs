//! Structural extraction from EAC-CPF archival-description documents.
//!
//! Two fields are pulled out of the `cpfDescription` element: the
//! Latin-script name (the second-to-last `part` of the `Latn` name entries)
//! and the biography (the non-blank paragraph children of `biogHist`, joined
//! with blank lines). Matching is on local names, so it is insensitive to
//! the document's namespace prefixes.

use crate::error::XeacError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// The two text fields extracted from one archival description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpfSummary {
    pub name: String,
    pub biography: String,
}

fn path_ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

pub fn parse_document(xml: &str) -> Result<CpfSummary, XeacError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut latn_name_entry = false;
    let mut part_buf: Option<String> = None;
    let mut para_buf: Option<String> = None;
    let mut latn_parts: Vec<String> = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut saw_biog_hist = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let local = String::from_utf8_lossy(e.name().local_name().as_ref()).to_string();
                match local.as_str() {
                    "nameEntry" if path_ends_with(&path, &["cpfDescription", "identity"]) => {
                        latn_name_entry = false;
                        for attr in e.attributes() {
                            let attr = attr?;
                            if attr.key.local_name().as_ref() == b"scriptCode" {
                                latn_name_entry = attr.value.as_ref() == b"Latn";
                            }
                        }
                    }
                    "part"
                        if latn_name_entry
                            && path_ends_with(
                                &path,
                                &["cpfDescription", "identity", "nameEntry"],
                            ) =>
                    {
                        part_buf = Some(String::new());
                    }
                    "biogHist"
                        if path_ends_with(&path, &["cpfDescription", "description"]) =>
                    {
                        saw_biog_hist = true;
                    }
                    _ if para_buf.is_none()
                        && path_ends_with(
                            &path,
                            &["cpfDescription", "description", "biogHist"],
                        ) =>
                    {
                        // A direct child of biogHist opens a new paragraph.
                        para_buf = Some(String::new());
                    }
                    _ => {}
                }
                path.push(local);
            }
            Event::Empty(_) => {
                // A childless element carries no text; any paragraph it
                // would contribute is blank and gets discarded anyway.
            }
            Event::Text(ref t) => {
                let text = t.unescape()?;
                if let Some(buf) = part_buf.as_mut() {
                    buf.push_str(&text);
                } else if let Some(buf) = para_buf.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(_) => {
                let local = path.pop().unwrap_or_default();
                match local.as_str() {
                    "part" => {
                        if let Some(buf) = part_buf.take() {
                            latn_parts.push(buf);
                        }
                    }
                    "nameEntry" => latn_name_entry = false,
                    _ => {}
                }
                if para_buf.is_some()
                    && path_ends_with(&path, &["cpfDescription", "description", "biogHist"])
                {
                    // Closed a direct child of biogHist.
                    if let Some(buf) = para_buf.take() {
                        paragraphs.push(buf);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if latn_parts.len() < 2 {
        return Err(XeacError::Structure(format!(
            "expected at least two Latin-script name parts, found {}",
            latn_parts.len()
        )));
    }
    if !saw_biog_hist {
        return Err(XeacError::Structure(
            "document has no biogHist section".to_string(),
        ));
    }

    let name = latn_parts[latn_parts.len() - 2].clone();
    let biography = paragraphs
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(CpfSummary { name, biography })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<eac-cpf xmlns="urn:isbn:1-931666-33-4">
  <control>
    <recordId>amnhp_1000</recordId>
  </control>
  <cpfDescription>
    <identity>
      <nameEntry scriptCode="Hant"><part>ignored</part></nameEntry>
      <nameEntry scriptCode="Latn">
        <part>Akeley</part>
        <part>Carl Ethan</part>
        <part>1864-1926</part>
      </nameEntry>
    </identity>
    <description>
      <biogHist>
        <p></p>
        <p> </p>
        <p>First.</p>
        <p>Second.</p>
      </biogHist>
    </description>
  </cpfDescription>
</eac-cpf>"#;

    #[test]
    fn extracts_second_to_last_latin_name_part() {
        let summary = parse_document(SAMPLE).unwrap();
        assert_eq!(summary.name, "Carl Ethan");
    }

    #[test]
    fn biography_discards_blank_paragraphs_and_joins_the_rest() {
        let summary = parse_document(SAMPLE).unwrap();
        assert_eq!(summary.biography, "First.\n\nSecond.");
    }

    #[test]
    fn prefixed_namespaces_are_handled() {
        let prefixed = r#"<x:eac-cpf xmlns:x="urn:isbn:1-931666-33-4">
  <x:cpfDescription>
    <x:identity>
      <x:nameEntry scriptCode="Latn">
        <x:part>Akeley</x:part>
        <x:part>Mary Jobe</x:part>
        <x:part>1878-1966</x:part>
      </x:nameEntry>
    </x:identity>
    <x:description>
      <x:biogHist>
        <x:p>Explorer.</x:p>
      </x:biogHist>
    </x:description>
  </x:cpfDescription>
</x:eac-cpf>"#;
        let summary = parse_document(prefixed).unwrap();
        assert_eq!(summary.name, "Mary Jobe");
        assert_eq!(summary.biography, "Explorer.");
    }

    #[test]
    fn too_few_name_parts_is_a_structural_error() {
        let minimal = r#"<eac-cpf><cpfDescription>
  <identity><nameEntry scriptCode="Latn"><part>Solo</part></nameEntry></identity>
  <description><biogHist><p>Text.</p></biogHist></description>
</cpfDescription></eac-cpf>"#;
        let err = parse_document(minimal).unwrap_err();
        assert!(matches!(err, XeacError::Structure(_)));
    }

    #[test]
    fn missing_biography_section_is_a_structural_error() {
        let no_bio = r#"<eac-cpf><cpfDescription>
  <identity><nameEntry scriptCode="Latn"><part>A</part><part>B</part></nameEntry></identity>
</cpfDescription></eac-cpf>"#;
        let err = parse_document(no_bio).unwrap_err();
        assert!(matches!(err, XeacError::Structure(_)));
    }

    #[test]
    fn non_latin_entries_are_ignored() {
        let summary = parse_document(SAMPLE).unwrap();
        assert_ne!(summary.name, "ignored");
    }
}
