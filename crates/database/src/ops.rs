//! Generic, entity-parameterized record lookup and conflict-safe creation.
//!
//! These helpers assemble SQL dynamically from `(column, Value)` pairs and
//! run against an [`AnyConnection`], so the same code serves every entity
//! and every configured backend. `get_one_or_create` is the system's one
//! concurrency-correctness mechanism: insert-if-absent that survives a
//! benign race between two writers, provided the storage layer enforces a
//! uniqueness constraint on the filtered columns.

use crate::error::DbError;
use crate::models::Entity;
use sqlx::any::AnyArguments;
use sqlx::query::QueryAs;
use sqlx::{Any, AnyConnection, Connection};

/// A value bindable into a dynamically assembled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
    OptText(Option<String>),
}

impl Value {
    fn bind_to<'q, T>(
        self,
        query: QueryAs<'q, Any, T, AnyArguments<'q>>,
    ) -> QueryAs<'q, Any, T, AnyArguments<'q>> {
        match self {
            Value::Int(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::OptText(v) => query.bind(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        Value::OptText(v)
    }
}

/// Policy for a lookup that matches more than one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnMultiple {
    /// More than one match is an error.
    #[default]
    Error,
    /// The caller asserts the duplicates are semantically equivalent, so any
    /// one of them will do. Duplicates here may be a sign of a problem
    /// somewhere else; a storage-level constraint might be useful.
    Interchangeable,
}

/// Equality filters over the entity's columns. An `OptText(None)` entry
/// matches stored NULLs (rendered as `IS NULL`, not `= NULL`).
pub type Filters<'a> = &'a [(&'a str, Value)];

fn where_clause(filters: Filters<'_>) -> String {
    if filters.is_empty() {
        return "1 = 1".to_string();
    }
    let mut placeholder = 0;
    filters
        .iter()
        .map(|(column, value)| match value {
            Value::OptText(None) => format!("{column} IS NULL"),
            _ => {
                placeholder += 1;
                format!("{column} = ${placeholder}")
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// NULL filter entries are folded into the WHERE clause, not bound.
fn bind_filters<'q, T>(
    mut query: QueryAs<'q, Any, T, AnyArguments<'q>>,
    filters: Filters<'_>,
) -> QueryAs<'q, Any, T, AnyArguments<'q>> {
    for (_, value) in filters {
        if !matches!(value, Value::OptText(None)) {
            query = value.clone().bind_to(query);
        }
    }
    query
}

/// Looks up at most one record of `T` matching the equality `filters`.
///
/// Zero matches is a normal outcome (`Ok(None)`). Multiple matches follow
/// the `on_multiple` policy.
pub async fn get_one<T: Entity>(
    conn: &mut AnyConnection,
    filters: Filters<'_>,
    on_multiple: OnMultiple,
) -> Result<Option<T>, DbError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} LIMIT 2",
        T::COLUMNS,
        T::TABLE,
        where_clause(filters),
    );
    let query = bind_filters(sqlx::query_as::<Any, T>(&sql), filters);
    let mut rows = query.fetch_all(&mut *conn).await?;
    match (rows.len(), on_multiple) {
        (0, _) => Ok(None),
        (1, _) => Ok(Some(rows.remove(0))),
        (_, OnMultiple::Error) => Err(DbError::MultipleFound { table: T::TABLE }),
        (_, OnMultiple::Interchangeable) => Ok(Some(rows.remove(0))),
    }
}

/// Inserts a new record of `T` built from `values` and returns it with its
/// storage-assigned id. Constraint violations propagate to the caller.
pub async fn create<T: Entity>(
    conn: &mut AnyConnection,
    values: Filters<'_>,
) -> Result<T, DbError> {
    let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        T::TABLE,
        columns.join(", "),
        placeholders.join(", "),
        T::COLUMNS,
    );
    let mut query = sqlx::query_as::<Any, T>(&sql);
    for (_, value) in values {
        query = value.clone().bind_to(query);
    }
    Ok(query.fetch_one(&mut *conn).await?)
}

/// Returns the record matching `filters`, creating it first if absent.
///
/// The boolean is true when this call created the record. Creation happens
/// in a nested transaction scope (a savepoint when the connection is already
/// inside a transaction): if a concurrent writer wins the race and the
/// insert hits a uniqueness-constraint violation, the scope is rolled back
/// and the winner's row is re-read and returned instead. Any other storage
/// error during creation propagates uncaught.
pub async fn get_one_or_create<T: Entity>(
    conn: &mut AnyConnection,
    filters: Filters<'_>,
    extra_values: Filters<'_>,
) -> Result<(T, bool), DbError> {
    if let Some(found) = get_one::<T>(conn, filters, OnMultiple::Error).await? {
        return Ok((found, false));
    }
    create_or_recover(conn, filters, extra_values).await
}

/// The losing-racer half of [`get_one_or_create`]: attempt the insert and
/// fall back to a re-read on a uniqueness conflict.
pub(crate) async fn create_or_recover<T: Entity>(
    conn: &mut AnyConnection,
    filters: Filters<'_>,
    extra_values: Filters<'_>,
) -> Result<(T, bool), DbError> {
    let mut values: Vec<(&str, Value)> = filters.to_vec();
    values.extend(extra_values.iter().cloned());

    let mut tx = conn.begin().await?;
    match create::<T>(&mut tx, &values).await {
        Ok(record) => {
            tx.commit().await?;
            Ok((record, true))
        }
        Err(DbError::Sqlx(err)) if is_unique_violation(&err) => {
            tracing::info!(
                table = T::TABLE,
                error = %err,
                "Lost a creation race, reusing the existing row"
            );
            tx.rollback().await?;
            // The re-read tolerates duplicates: recovery must not turn a
            // benign race on an unconstrained key into a hard error.
            let existing = get_one::<T>(conn, filters, OnMultiple::Interchangeable)
                .await?
                .ok_or(DbError::NotFound)?;
            Ok((existing, false))
        }
        Err(other) => Err(other),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::{Collection, DisplayItem};
    use sqlx::Acquire;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("ops.db").display());
        let db = Database::connect(&url).await.unwrap();
        (dir, db)
    }

    fn beet_filters() -> Vec<(&'static str, Value)> {
        vec![
            ("beacon_major_id", Value::Int(65370)),
            ("beacon_minor_id", Value::Int(49339)),
        ]
    }

    #[tokio::test]
    async fn get_one_returns_none_on_miss() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let found = get_one::<DisplayItem>(&mut conn, &beet_filters(), OnMultiple::Error)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn get_one_or_create_is_idempotent() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let extra = [("title", Value::from("Beet Beacon"))];

        let (created, was_created) =
            get_one_or_create::<DisplayItem>(&mut conn, &beet_filters(), &extra)
                .await
                .unwrap();
        assert!(was_created);
        assert_eq!(created.title.as_deref(), Some("Beet Beacon"));

        let (found, was_created) =
            get_one_or_create::<DisplayItem>(&mut conn, &beet_filters(), &extra)
                .await
                .unwrap();
        assert!(!was_created);
        assert_eq!(found.id, created.id);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM display_items")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn losing_racer_recovers_the_existing_row() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let filters = beet_filters();

        // The winning racer's insert, landed after this caller's initial
        // lookup missed.
        let winner = create::<DisplayItem>(&mut conn, &filters).await.unwrap();

        let extra = [("title", Value::from("Beet Beacon"))];
        let (recovered, was_created) = create_or_recover::<DisplayItem>(&mut conn, &filters, &extra)
            .await
            .unwrap();
        assert!(!was_created);
        assert_eq!(recovered.id, winner.id);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM display_items")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn conflict_recovery_rolls_back_to_the_savepoint() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let filters = beet_filters();
        create::<DisplayItem>(&mut conn, &filters).await.unwrap();

        // Inside an enclosing transaction the nested scope is a savepoint;
        // the conflict rollback must not take the outer work with it.
        let mut tx = conn.begin().await.unwrap();
        create::<Collection>(&mut tx, &[("name", Value::from("Dress"))])
            .await
            .unwrap();
        let (recovered, was_created) =
            create_or_recover::<DisplayItem>(&mut tx, &filters, &[])
                .await
                .unwrap();
        assert!(!was_created);
        assert_eq!(recovered.beacon_major_id, 65370);
        tx.commit().await.unwrap();

        let collections: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM collections")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(collections.0, 1);
    }

    #[tokio::test]
    async fn duplicate_beacon_pairs_are_rejected() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let filters = beet_filters();
        create::<DisplayItem>(&mut conn, &filters).await.unwrap();

        let err = create::<DisplayItem>(&mut conn, &filters).await.unwrap_err();
        match err {
            DbError::Sqlx(inner) => assert!(is_unique_violation(&inner)),
            other => panic!("expected a unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_filters_match_stored_nulls() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        create::<Collection>(
            &mut conn,
            &[
                ("name", Value::from("Dress")),
                ("curator", Value::OptText(None)),
            ],
        )
        .await
        .unwrap();

        let filters = [
            ("name", Value::from("Dress")),
            ("curator", Value::OptText(None)),
        ];
        let found = get_one::<Collection>(&mut conn, &filters, OnMultiple::Error)
            .await
            .unwrap()
            .expect("IS NULL filter should match the stored row");
        assert_eq!(found.curator, None);

        // A concrete value still misses the NULL row.
        let concrete = [
            ("name", Value::from("Dress")),
            ("curator", Value::OptText(Some("N. Whitman".to_string()))),
        ];
        let missed = get_one::<Collection>(&mut conn, &concrete, OnMultiple::Error)
            .await
            .unwrap();
        assert!(missed.is_none());

        let (again, created) = get_one_or_create::<Collection>(&mut conn, &filters, &[])
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, found.id);
    }

    #[tokio::test]
    async fn empty_filters_match_everything() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let none = get_one::<Collection>(&mut conn, &[], OnMultiple::Error)
            .await
            .unwrap();
        assert!(none.is_none());

        create::<Collection>(&mut conn, &[("name", Value::from("Dress"))])
            .await
            .unwrap();
        let one = get_one::<Collection>(&mut conn, &[], OnMultiple::Error)
            .await
            .unwrap()
            .expect("the only row");
        assert_eq!(one.name, "Dress");
    }

    #[tokio::test]
    async fn multiple_matches_follow_policy() {
        let (_dir, db) = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        for _ in 0..2 {
            create::<Collection>(&mut conn, &[("name", Value::from("Dress"))])
                .await
                .unwrap();
        }

        let filters = [("name", Value::from("Dress"))];
        let err = get_one::<Collection>(&mut conn, &filters, OnMultiple::Error)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::MultipleFound { table: "collections" }));

        let one = get_one::<Collection>(&mut conn, &filters, OnMultiple::Interchangeable)
            .await
            .unwrap()
            .expect("one of the duplicates");
        assert_eq!(one.name, "Dress");
    }
}
