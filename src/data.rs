mod task;
pub use task::*;

mod list;
pub use list::*;

/// Something stored in the remote store as a JSON record under a key.
pub trait RecordData {
	fn parse_record(key: &str, record: &serde_json::Value) -> Result<Self, RecordError>
	where
		Self: Sized;

	fn to_record(&self) -> serde_json::Value;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecordError {
	#[error("record {key:?} is malformed: {reason}")]
	Malformed { key: String, reason: String },
	#[error("record {key:?} claims to be {id:?}")]
	KeyMismatch { key: String, id: String },
}
