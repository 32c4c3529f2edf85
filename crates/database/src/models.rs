//! The four entities of the exhibit data model.
//!
//! Every primary key is assigned by the storage engine on insert and never
//! changes afterwards. Display items own their media resources; collections
//! and display items are linked through `items_collections` join rows.

use serde::Serialize;
use serde_json::{Value, json};
use sqlx::FromRow;
use sqlx::any::AnyRow;

/// Table metadata for the generic data-access helpers in [`crate::ops`].
pub trait Entity: for<'r> FromRow<'r, AnyRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Column list used for SELECT and for INSERT .. RETURNING, primary key
    /// first.
    const COLUMNS: &'static str;
}

/// An item on display, such as a book, an item of dress, or a photograph.
///
/// The physical beacon mounted next to the item is identified by the
/// `(beacon_major_id, beacon_minor_id)` pair, which is the external lookup
/// key and is unique across display items.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DisplayItem {
    pub id: i64,
    pub beacon_major_id: i64,
    pub beacon_minor_id: i64,
    pub title: Option<String>,
    pub cover_image: Option<String>,
}

impl Entity for DisplayItem {
    const TABLE: &'static str = "display_items";
    const COLUMNS: &'static str = "id, beacon_major_id, beacon_minor_id, title, cover_image";
}

impl DisplayItem {
    /// The JSON shape served by the HTTP layer, with the item's media
    /// resources inlined.
    pub fn projection(&self, media_resources: &[MediaResource]) -> Value {
        json!({
            "id": self.id,
            "beacon_major_id": self.beacon_major_id,
            "beacon_minor_id": self.beacon_minor_id,
            "title": self.title,
            "cover_image": self.cover_image,
            "media_resources": media_resources
                .iter()
                .map(MediaResource::projection)
                .collect::<Vec<_>>(),
        })
    }
}

/// Field values for a display item that has not been stored yet.
#[derive(Debug, Clone, Default)]
pub struct NewDisplayItem {
    pub beacon_major_id: i64,
    pub beacon_minor_id: i64,
    pub title: Option<String>,
    pub cover_image: Option<String>,
}

/// A pdf, epub, jpeg, streamed movie, etc., belonging to one display item.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct MediaResource {
    pub id: i64,
    pub display_item_id: i64,
    /// The name / title that identifies the media resource.
    pub title: Option<String>,
    /// A snippet of text from the curator to contribute to the broader story.
    pub snippet: Option<String>,
    /// A longer description of the item (from the source).
    pub description: Option<String>,
    /// The human-readable URL where this information can be found.
    pub direct_url: Option<String>,
}

impl Entity for MediaResource {
    const TABLE: &'static str = "media_resources";
    const COLUMNS: &'static str = "id, display_item_id, title, snippet, description, direct_url";
}

impl MediaResource {
    /// The flat JSON shape served by the HTTP layer; `url` is sourced from
    /// `direct_url`.
    pub fn projection(&self) -> Value {
        json!({
            "title": self.title,
            "snippet": self.snippet,
            "description": self.description,
            "url": self.direct_url,
        })
    }
}

/// Field values for a media resource that has not been stored yet.
#[derive(Debug, Clone, Default)]
pub struct NewMediaResource {
    pub display_item_id: i64,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub description: Option<String>,
    pub direct_url: Option<String>,
}

/// A curated experience, involving a bunch of items.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub curator: Option<String>,
}

impl Entity for Collection {
    const TABLE: &'static str = "collections";
    const COLUMNS: &'static str = "id, name, curator";
}

/// Join row linking a display item to a collection it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ItemCollection {
    pub id: i64,
    pub item_id: i64,
    pub collection_id: i64,
}

impl Entity for ItemCollection {
    const TABLE: &'static str = "items_collections";
    const COLUMNS: &'static str = "id, item_id, collection_id";
}
