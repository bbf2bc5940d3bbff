/// Failure reported by the identity gateway or the remote store.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BackendError {
	/// The service understood the request and refused it. The message is the service's own.
	#[error("{message}")]
	Rejected { status: u16, message: String },
	/// Rate limited or a server-side fault; worth trying again.
	#[error("service unavailable (status {status})")]
	Unavailable { status: u16 },
	#[error("network error: {0}")]
	Network(String),
	#[error("malformed response: {0}")]
	Decode(String),
	#[error("no active session")]
	NoSession,
}

impl BackendError {
	pub fn rejected(message: impl Into<String>) -> Self {
		Self::Rejected {
			status: 400,
			message: message.into(),
		}
	}

	/// Whether repeating the same request could plausibly succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Unavailable { .. } | Self::Network(_))
	}

	pub fn from_status(status: u16, message: String) -> Self {
		match status {
			429 | 500..=599 => Self::Unavailable { status },
			_ => Self::Rejected { status, message },
		}
	}
}

impl From<reqwest::Error> for BackendError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			return Self::Decode(err.to_string());
		}
		match err.status() {
			Some(status) => Self::from_status(status.as_u16(), err.to_string()),
			None => Self::Network(err.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(429, true)]
	#[case(500, true)]
	#[case(503, true)]
	#[case(400, false)]
	#[case(401, false)]
	#[case(404, false)]
	fn status_classification(#[case] status: u16, #[case] transient: bool) {
		assert_eq!(BackendError::from_status(status, "nope".into()).is_transient(), transient);
	}

	#[test]
	fn rejection_displays_message_verbatim() {
		let err = BackendError::rejected("EMAIL_EXISTS");
		assert_eq!(err.to_string(), "EMAIL_EXISTS");
	}
}
