//! Hosted backend: Firebase Authentication (Identity Toolkit REST) and the
//! Firebase Realtime Database (REST plus its server-sent event stream).
mod auth;
pub use auth::*;
mod database;
pub use database::*;
pub mod stream;

fn now() -> i64 {
	time::OffsetDateTime::now_utc().unix_timestamp()
}
