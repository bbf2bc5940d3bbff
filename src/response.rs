use crate::backend::BackendError;
use reqwest::RequestBuilder;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub struct Response<T> {
	builder: RequestBuilder,
	marker: std::marker::PhantomData<T>,
}
impl<T> std::fmt::Debug for Response<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.builder.fmt(f)
	}
}
impl<T> Response<T>
where
	T: DeserializeOwned,
{
	pub fn from(builder: RequestBuilder) -> Self {
		Self {
			builder,
			marker: Default::default(),
		}
	}

	pub fn with_query<Q>(mut self, query: &Q) -> Self
	where
		Q: Serialize + ?Sized,
	{
		self.builder = self.builder.query(query);
		self
	}

	pub fn with_json<Q>(mut self, json: &Q) -> Self
	where
		Q: Serialize + ?Sized,
	{
		self.builder = self.builder.json(json);
		self
	}

	pub async fn send(self) -> Result<T, BackendError> {
		let response: reqwest::Response = self.builder.send().await?;
		let status = response.status();
		let text = response.text().await?;
		if !status.is_success() {
			return Err(BackendError::from_status(status.as_u16(), error_message(&text)));
		}
		serde_json::from_str(&text).map_err(|err| BackendError::Decode(format!("{err} in {text:?}")))
	}
}

/// Pulls the human readable message out of an error body.
///
/// Identity Toolkit answers `{"error": {"message": ..}}`, the Realtime Database `{"error": ..}`.
/// Anything else is returned as-is.
pub fn error_message(body: &str) -> String {
	#[derive(Deserialize)]
	struct Body {
		error: ErrorField,
	}
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum ErrorField {
		Detailed { message: String },
		Plain(String),
	}
	match serde_json::from_str::<Body>(body) {
		Ok(Body {
			error: ErrorField::Detailed { message },
		}) => message,
		Ok(Body {
			error: ErrorField::Plain(message),
		}) => message,
		Err(_) => body.trim().to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_toolkit_errors() {
		let body = r#"{"error": {"code": 400, "message": "EMAIL_EXISTS", "errors": [{"message": "EMAIL_EXISTS", "domain": "global"}]}}"#;
		assert_eq!(error_message(body), "EMAIL_EXISTS");
	}

	#[test]
	fn database_errors() {
		assert_eq!(error_message(r#"{"error" : "Permission denied"}"#), "Permission denied");
	}

	#[test]
	fn unknown_bodies_pass_through() {
		assert_eq!(error_message(" Bad Gateway \n"), "Bad Gateway");
	}
}
