use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Unsupported database URL scheme '{0}' (expected postgres or sqlite)")]
    UnsupportedScheme(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Multiple rows in '{table}' matched a lookup expected to return at most one")]
    MultipleFound { table: &'static str },

    #[error("The requested record was not found in the database.")]
    NotFound,
}
