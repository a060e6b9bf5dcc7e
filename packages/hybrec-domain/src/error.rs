pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	InvalidWeights { message: String },
	#[error("{message}")]
	InvalidQuery { message: String },
}
