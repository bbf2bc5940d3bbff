use super::{RecordData, RecordError};
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);
impl TaskId {
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl From<String> for TaskId {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl std::fmt::Display for TaskId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}
impl std::fmt::Debug for TaskId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "TaskId({})", self.0)
	}
}

/// One entry on a user's to-do list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub unique_id: TaskId,
	pub content: String,
	#[serde(default)]
	pub done: bool,
}
impl Task {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			unique_id: TaskId::generate(),
			content: content.into(),
			done: false,
		}
	}

	/// Whether the user-visible parts of two tasks match, ignoring identity.
	pub fn same_payload(&self, other: &Self) -> bool {
		self.content == other.content && self.done == other.done
	}
}

impl RecordData for Task {
	fn parse_record(key: &str, record: &serde_json::Value) -> Result<Self, RecordError> {
		#[derive(Deserialize)]
		#[serde(rename_all = "camelCase")]
		struct Raw {
			unique_id: Option<String>,
			#[serde(default)]
			content: String,
			#[serde(default)]
			done: bool,
		}
		let raw = Raw::deserialize(record).map_err(|err| RecordError::Malformed {
			key: key.to_owned(),
			reason: err.to_string(),
		})?;
		// Older records may omit the id; the key is authoritative either way.
		let unique_id = raw.unique_id.unwrap_or_else(|| key.to_owned());
		if unique_id != key {
			return Err(RecordError::KeyMismatch {
				key: key.to_owned(),
				id: unique_id,
			});
		}
		Ok(Self {
			unique_id: TaskId(unique_id),
			content: raw.content,
			done: raw.done,
		})
	}

	fn to_record(&self) -> serde_json::Value {
		serde_json::json!({
			"uniqueId": self.unique_id,
			"content": self.content,
			"done": self.done,
		})
	}
}
