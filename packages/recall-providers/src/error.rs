pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Provider returned status {status}: {body}")]
	Status { status: u16, body: String },
}
impl Error {
	/// Transient failures are retried with bounded backoff at the call
	/// site; everything else surfaces immediately.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Reqwest(err) => err.is_timeout() || err.is_connect(),
			Self::Status { status, .. } => *status >= 500 || *status == 429,
			_ => false,
		}
	}
}
