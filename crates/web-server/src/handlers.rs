use crate::{AppState, error::AppError};
use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::Value;
use std::sync::Arc;

/// # GET /all_items
/// Every display item, media resources inlined. No pagination.
pub async fn all_items(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let items = state.repository.all_items_json().await?;
    Ok(Json(items))
}

/// # GET /display_item/:major/:minor
/// Looks up the display item for a physical beacon and serves its JSON
/// projection; 404 when no item carries that beacon pair.
pub async fn display_item_by_beacon(
    Path((major, minor)): Path<(i64, i64)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let item = state
        .repository
        .find_display_item_by_beacon(major, minor)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No display item for beacon {major}/{minor}"))
        })?;
    let projection = state.repository.display_item_json(&item).await?;
    Ok(Json(projection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{Database, NewDisplayItem, NewMediaResource, Repository};

    async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("web.db").display());
        let db = Database::connect(&url).await.unwrap();
        let repository = Repository::new(db.pool().clone());
        (dir, Arc::new(AppState { repository }))
    }

    #[tokio::test]
    async fn beacon_lookup_serves_the_item() {
        let (_dir, state) = test_state().await;
        let (item, _) = state
            .repository
            .get_or_create_display_item(NewDisplayItem {
                beacon_major_id: 65370,
                beacon_minor_id: 49339,
                title: Some("Beet Beacon".to_string()),
                cover_image: None,
            })
            .await
            .unwrap();
        state
            .repository
            .get_or_create_media_resource(NewMediaResource {
                display_item_id: item.id,
                title: Some("Field notes".to_string()),
                direct_url: Some("http://example.org/notes".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let Json(body) = display_item_by_beacon(Path((65370, 49339)), State(state))
            .await
            .unwrap();
        assert_eq!(body["title"], "Beet Beacon");
        assert_eq!(body["media_resources"][0]["url"], "http://example.org/notes");
    }

    #[tokio::test]
    async fn unknown_beacon_is_not_found() {
        let (_dir, state) = test_state().await;
        let err = display_item_by_beacon(Path((1, 2)), State(state))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn all_items_lists_everything() {
        let (_dir, state) = test_state().await;
        for (major, title) in [(1, "First"), (2, "Second")] {
            state
                .repository
                .get_or_create_display_item(NewDisplayItem {
                    beacon_major_id: major,
                    beacon_minor_id: 1,
                    title: Some(title.to_string()),
                    cover_image: None,
                })
                .await
                .unwrap();
        }

        let Json(body) = all_items(State(state)).await.unwrap();
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], "First");
        assert_eq!(items[1]["title"], "Second");
    }
}
