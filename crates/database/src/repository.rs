//! The `Repository` provides a high-level, application-specific interface
//! to the exhibit database. It encapsulates all SQL and the get-or-create
//! protocol behind typed, per-entity operations.

use crate::error::DbError;
use crate::models::{
    Collection, DisplayItem, ItemCollection, MediaResource, NewDisplayItem, NewMediaResource,
};
use crate::ops::{self, OnMultiple, Value};
use serde_json::Value as JsonValue;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool};

#[derive(Debug, Clone)]
pub struct Repository {
    pool: AnyPool,
}

impl Repository {
    /// Creates a new `Repository` over a shared database connection pool.
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<PoolConnection<Any>, DbError> {
        Ok(self.pool.acquire().await?)
    }

    // ----- Display items ---------------------------------------------------

    /// Returns the display item for `new`'s beacon pair, creating it if
    /// absent. The boolean is true when this call created the row.
    pub async fn get_or_create_display_item(
        &self,
        new: NewDisplayItem,
    ) -> Result<(DisplayItem, bool), DbError> {
        let mut conn = self.conn().await?;
        let filters = [
            ("beacon_major_id", Value::Int(new.beacon_major_id)),
            ("beacon_minor_id", Value::Int(new.beacon_minor_id)),
        ];
        let extra = [
            ("title", Value::OptText(new.title)),
            ("cover_image", Value::OptText(new.cover_image)),
        ];
        ops::get_one_or_create::<DisplayItem>(&mut conn, &filters, &extra).await
    }

    /// Looks up the display item identified by a physical beacon. Zero
    /// matches yields `None`; more than one match is an error.
    pub async fn find_display_item_by_beacon(
        &self,
        major: i64,
        minor: i64,
    ) -> Result<Option<DisplayItem>, DbError> {
        let mut conn = self.conn().await?;
        let filters = [
            ("beacon_major_id", Value::Int(major)),
            ("beacon_minor_id", Value::Int(minor)),
        ];
        ops::get_one::<DisplayItem>(&mut conn, &filters, OnMultiple::Error).await
    }

    pub async fn list_display_items(&self) -> Result<Vec<DisplayItem>, DbError> {
        let items = sqlx::query_as::<Any, DisplayItem>(
            "SELECT id, beacon_major_id, beacon_minor_id, title, cover_image \
             FROM display_items ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// The aggregate listing served by `GET /all_items`: every display item
    /// with its media resources inlined.
    pub async fn all_items_json(&self) -> Result<JsonValue, DbError> {
        let items = self.list_display_items().await?;
        let mut projections = Vec::with_capacity(items.len());
        for item in &items {
            let media = self.media_resources_for(item.id).await?;
            projections.push(item.projection(&media));
        }
        Ok(JsonValue::Array(projections))
    }

    /// One display item's JSON projection, media resources included.
    pub async fn display_item_json(&self, item: &DisplayItem) -> Result<JsonValue, DbError> {
        let media = self.media_resources_for(item.id).await?;
        Ok(item.projection(&media))
    }

    /// Deletes a display item together with its media resources and its
    /// collection links. Collections themselves survive. Returns false when
    /// no such item existed.
    pub async fn delete_display_item(&self, id: i64) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM media_resources WHERE display_item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM items_collections WHERE item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM display_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ----- Media resources -------------------------------------------------

    pub async fn media_resources_for(&self, item_id: i64) -> Result<Vec<MediaResource>, DbError> {
        let media = sqlx::query_as::<Any, MediaResource>(
            "SELECT id, display_item_id, title, snippet, description, direct_url \
             FROM media_resources WHERE display_item_id = $1 ORDER BY id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(media)
    }

    /// Returns the media resource keyed by owner, title, description and
    /// direct URL, creating it if absent.
    pub async fn get_or_create_media_resource(
        &self,
        new: NewMediaResource,
    ) -> Result<(MediaResource, bool), DbError> {
        let mut conn = self.conn().await?;
        let filters = [
            ("display_item_id", Value::Int(new.display_item_id)),
            ("title", Value::OptText(new.title)),
            ("description", Value::OptText(new.description)),
            ("direct_url", Value::OptText(new.direct_url)),
        ];
        let extra = [("snippet", Value::OptText(new.snippet))];
        ops::get_one_or_create::<MediaResource>(&mut conn, &filters, &extra).await
    }

    // ----- Collections and membership --------------------------------------

    /// Returns the collection with `name`, creating it with `curator` if
    /// absent.
    pub async fn get_or_create_collection(
        &self,
        name: &str,
        curator: Option<&str>,
    ) -> Result<(Collection, bool), DbError> {
        let mut conn = self.conn().await?;
        let filters = [("name", Value::from(name))];
        let extra = [(
            "curator",
            Value::OptText(curator.map(str::to_string)),
        )];
        ops::get_one_or_create::<Collection>(&mut conn, &filters, &extra).await
    }

    /// Links a display item into a collection. Idempotent; returns true when
    /// a new link was created.
    pub async fn add_to_collection(
        &self,
        item_id: i64,
        collection_id: i64,
    ) -> Result<bool, DbError> {
        let mut conn = self.conn().await?;
        let filters = [
            ("item_id", Value::Int(item_id)),
            ("collection_id", Value::Int(collection_id)),
        ];
        let (_link, created) =
            ops::get_one_or_create::<ItemCollection>(&mut conn, &filters, &[]).await?;
        Ok(created)
    }

    /// Removes a display item from a collection. Returns false when no such
    /// link existed.
    pub async fn remove_from_collection(
        &self,
        item_id: i64,
        collection_id: i64,
    ) -> Result<bool, DbError> {
        let result =
            sqlx::query("DELETE FROM items_collections WHERE item_id = $1 AND collection_id = $2")
                .bind(item_id)
                .bind(collection_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The display items belonging to a collection.
    pub async fn members_of(&self, collection_id: i64) -> Result<Vec<DisplayItem>, DbError> {
        let items = sqlx::query_as::<Any, DisplayItem>(
            "SELECT d.id, d.beacon_major_id, d.beacon_minor_id, d.title, d.cover_image \
             FROM display_items d \
             JOIN items_collections ic ON ic.item_id = d.id \
             WHERE ic.collection_id = $1 ORDER BY d.id",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// The collections a display item belongs to.
    pub async fn collections_of(&self, item_id: i64) -> Result<Vec<Collection>, DbError> {
        let collections = sqlx::query_as::<Any, Collection>(
            "SELECT c.id, c.name, c.curator \
             FROM collections c \
             JOIN items_collections ic ON ic.collection_id = c.id \
             WHERE ic.item_id = $1 ORDER BY c.id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collections)
    }

    /// Deletes a collection and its membership links. Display items survive.
    pub async fn delete_collection(&self, id: i64) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM items_collections WHERE collection_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
