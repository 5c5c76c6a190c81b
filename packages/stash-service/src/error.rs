use serde::Serialize;
use serde_json::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String, details: Option<Value> },
	#[error("Circular reference: {message}")]
	CircularReference { message: String },
	#[error("Already exists: {message}")]
	AlreadyExists { message: String },
	#[error("Has dependencies: {message}")]
	HasDependencies { message: String, details: Value },
	#[error("Job running: {message}")]
	JobRunning { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into(), details: None }
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidInput { message: message.into() }
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::InvalidInput { .. } => ErrorKind::InvalidInput,
			Self::NotFound { .. } => ErrorKind::NotFound,
			Self::CircularReference { .. } => ErrorKind::CircularReference,
			Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
			Self::HasDependencies { .. } => ErrorKind::HasDependencies,
			Self::JobRunning { .. } => ErrorKind::JobRunning,
			Self::Provider { .. } | Self::Storage { .. } => ErrorKind::Internal,
		}
	}

	pub fn report(&self) -> ErrorReport {
		let (message, details) = match self {
			Self::InvalidInput { message }
			| Self::CircularReference { message }
			| Self::AlreadyExists { message }
			| Self::JobRunning { message }
			| Self::Provider { message }
			| Self::Storage { message } => (message.clone(), None),
			Self::NotFound { message, details } => (message.clone(), details.clone()),
			Self::HasDependencies { message, details } => (message.clone(), Some(details.clone())),
		};

		ErrorReport { kind: self.kind(), message, details }
	}
}
impl From<stash_storage::Error> for Error {
	fn from(err: stash_storage::Error) -> Self {
		match err {
			stash_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			stash_storage::Error::InvalidArgument(message) => Self::InvalidInput { message },
			stash_storage::Error::NotFound(message) => Self::not_found(message),
			stash_storage::Error::Conflict(message) => Self::AlreadyExists { message },
		}
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	NotFound,
	CircularReference,
	InvalidInput,
	AlreadyExists,
	HasDependencies,
	JobRunning,
	Internal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorReport {
	pub kind: ErrorKind,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
}
