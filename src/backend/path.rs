use crate::data::TaskId;

/// Slash separated location of a record or collection in the remote store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(Vec<String>);

impl StorePath {
	/// The collection holding every task a user owns.
	pub fn collection(user_id: &str) -> Self {
		Self(vec![user_id.to_owned()])
	}

	pub fn record(user_id: &str, task_id: &TaskId) -> Self {
		Self(vec![user_id.to_owned(), task_id.to_string()])
	}

	pub fn parse(path: &str) -> Self {
		Self(path.split('/').filter(|segment| !segment.is_empty()).map(str::to_owned).collect())
	}

	pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
		self.0.iter().map(String::as_str)
	}

	pub fn is_root(&self) -> bool {
		self.0.is_empty()
	}

	pub fn starts_with(&self, other: &Self) -> bool {
		self.0.starts_with(&other.0)
	}
}

impl std::fmt::Display for StorePath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0.join("/"))
	}
}
impl std::fmt::Debug for StorePath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "StorePath(/{self})")
	}
}
