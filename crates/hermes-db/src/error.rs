use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("username already taken")]
    UsernameTaken,
    #[error("unknown recipient {0}")]
    UnknownRecipient(i64),
    #[error("message owner does not exist")]
    UnknownOwner,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    Pool(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Whether `err` is a constraint failure with the given extended result code,
/// e.g. `ffi::SQLITE_CONSTRAINT_FOREIGNKEY`.
pub(crate) fn is_constraint(err: &rusqlite::Error, extended_code: i32) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == extended_code)
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    is_constraint(err, ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    is_constraint(err, ffi::SQLITE_CONSTRAINT_UNIQUE)
}
