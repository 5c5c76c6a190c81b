#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
}
impl Error {
	/// Maps unique-constraint violations to [`Error::Conflict`] and keeps every other failure.
	pub(crate) fn conflict_on_unique(err: sqlx::Error, what: impl Into<String>) -> Self {
		match &err {
			sqlx::Error::Database(db_err) if db_err.is_unique_violation() =>
				Self::Conflict(what.into()),
			_ => Self::Sqlx(err),
		}
	}
}
