pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid configuration: {message}")]
	Configuration { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<hybrec_storage::Error> for Error {
	fn from(err: hybrec_storage::Error) -> Self {
		match err {
			hybrec_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			hybrec_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			hybrec_storage::Error::NotFound(message) | hybrec_storage::Error::Conflict(message) =>
				Self::Storage { message },
		}
	}
}
impl From<hybrec_providers::Error> for Error {
	fn from(err: hybrec_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
impl From<hybrec_domain::Error> for Error {
	fn from(err: hybrec_domain::Error) -> Self {
		match err {
			hybrec_domain::Error::InvalidWeights { message } => Self::Configuration { message },
			hybrec_domain::Error::InvalidQuery { message } => Self::InvalidRequest { message },
		}
	}
}
impl From<hybrec_config::Error> for Error {
	fn from(err: hybrec_config::Error) -> Self {
		Self::Configuration { message: err.to_string() }
	}
}
