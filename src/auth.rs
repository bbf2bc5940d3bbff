use serde::{Deserialize, Serialize};
use yewdux::prelude::*;

/// Seconds before expiry at which an id token is treated as stale.
static EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub user_id: String,
	pub email: String,
	pub id_token: String,
	pub refresh_token: String,
	/// Unix timestamp (seconds) at which `id_token` stops being accepted.
	pub expires_at: i64,
}
impl Session {
	pub fn is_expired(&self, now: i64) -> bool {
		now + EXPIRY_MARGIN_SECS >= self.expires_at
	}
}
impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("user_id", &self.user_id)
			.field("email", &self.email)
			.field("expires_at", &self.expires_at)
			.finish_non_exhaustive()
	}
}

/// What the identity gateway last reported. Mirrored into a global store by `backend::Provider`.
#[derive(Clone, Debug, PartialEq, Default, Store)]
pub enum AuthState {
	/// The gateway has not reported yet (e.g. a stored session is still being restored).
	#[default]
	Pending,
	SignedOut,
	SignedIn(Session),
}
impl AuthState {
	pub fn session(&self) -> Option<&Session> {
		match self {
			Self::SignedIn(session) => Some(session),
			_ => None,
		}
	}
}

#[derive(Clone, PartialEq)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}
impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
	}
}
