use thiserror::Error;

#[derive(Error, Debug)]
pub enum XeacError {
    #[error("Archival record '{0}' could not be found")]
    NotFound(String),

    #[error("HTTP request to the archival-description service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Unexpected document structure: {0}")]
    Structure(String),

    #[error(transparent)]
    Db(#[from] database::DbError),
}
