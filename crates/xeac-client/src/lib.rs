//! Client for the XEAC archival-description service.
//!
//! Given an external identifier, fetches the EAC-CPF XML document over HTTP,
//! extracts the subject's name and biography, and persists the result as a
//! media resource on a display item. One linear pipeline, no retry: a
//! non-success HTTP status or an unexpected document shape fails the whole
//! operation.

use crate::error::XeacError;
use crate::parse::parse_document;
use database::{DisplayItem, MediaResource, NewMediaResource, Repository};

pub mod error;
pub mod parse;

pub use error::XeacError as Error;
pub use parse::CpfSummary;

/// Base URL of the archival-description service; record documents live at
/// `<base><identifier>.xml`.
pub const DEFAULT_BASE_URL: &str = "http://data.library.amnh.org:8082/orbeon/xeac/id/amnh";

/// The kind of archival entity an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Person,
    Corporation,
}

impl EntityKind {
    /// The identifier prefix the service uses for this kind of entity.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Person => "p",
            EntityKind::Corporation => "c",
        }
    }
}

/// HTTP client for one archival-description service endpoint.
#[derive(Debug, Clone)]
pub struct XeacClient {
    http: reqwest::Client,
    base_url: String,
}

impl XeacClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Points the client at a non-default service, e.g. a test server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetches the archival description for `identifier` and stores it as a
    /// media resource on `display_item`, keyed by title, description and
    /// direct URL. Returns the resource and whether this call created it.
    pub async fn fetch_resource(
        &self,
        repository: &Repository,
        identifier: &str,
        display_item: &DisplayItem,
    ) -> Result<(MediaResource, bool), XeacError> {
        let url = format!("{}{}.xml", self.base_url, identifier);
        tracing::info!(%url, "Fetching archival description");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(XeacError::NotFound(identifier.to_string()));
        }

        let body = response.text().await?;
        let summary = parse_document(&body)?;

        let (resource, created) = repository
            .get_or_create_media_resource(NewMediaResource {
                display_item_id: display_item.id,
                title: Some(summary.name),
                snippet: None,
                description: Some(summary.biography),
                direct_url: Some(format!("{}{}", self.base_url, identifier)),
            })
            .await?;
        Ok((resource, created))
    }
}

impl Default for XeacClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_prefixes() {
        assert_eq!(EntityKind::Person.prefix(), "p");
        assert_eq!(EntityKind::Corporation.prefix(), "c");
    }

    #[test]
    fn default_client_points_at_the_archive() {
        let client = XeacClient::default();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }
}
