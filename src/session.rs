use crate::auth::Session;
use gloo_storage::{SessionStorage, Storage};
use serde::{Deserialize, Serialize};

/// A value the identity gateway keeps in browser session storage so a reload
/// does not sign the user out. Passwords never go through here.
pub trait SessionValue {
	fn id() -> &'static str;

	fn load() -> Option<Self>
	where
		Self: for<'de> Deserialize<'de>,
	{
		SessionStorage::get::<Self>(Self::id()).ok()
	}

	fn apply_to_session(&self)
	where
		Self: Serialize,
	{
		if let Err(err) = SessionStorage::set(Self::id(), self) {
			log::warn!(target: "auth", "Failed to persist {}: {err:?}", Self::id());
		}
	}

	fn delete() {
		SessionStorage::delete(Self::id());
	}
}

impl SessionValue for Session {
	fn id() -> &'static str {
		"tasklist_session"
	}
}
