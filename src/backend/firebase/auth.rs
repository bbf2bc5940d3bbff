use super::now;
use crate::{
	auth::{AuthState, Credentials, Session},
	backend::{notify_all, BackendError, IdentityGateway, Listeners, Subscription},
	response::Response,
	session::SessionValue,
};
use futures_util::future::LocalBoxFuture;
use serde::{de::IgnoredAny, Deserialize};
use std::{cell::RefCell, rc::Rc};

static IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
static TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Default)]
struct AuthInner {
	session: Option<Session>,
	listeners: Listeners<AuthState>,
}
impl AuthInner {
	fn listeners(&mut self) -> &mut Listeners<AuthState> {
		&mut self.listeners
	}

	fn state(&self) -> AuthState {
		match &self.session {
			Some(session) => AuthState::SignedIn(session.clone()),
			None => AuthState::SignedOut,
		}
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
	local_id: String,
	email: String,
	id_token: String,
	refresh_token: String,
	/// Seconds, as a decimal string.
	expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
	id_token: String,
	refresh_token: String,
	expires_in: String,
	user_id: String,
}

fn expires_at(expires_in: &str) -> Result<i64, BackendError> {
	let seconds = expires_in
		.parse::<i64>()
		.map_err(|err| BackendError::Decode(format!("expiresIn {expires_in:?}: {err}")))?;
	Ok(now() + seconds)
}

/// Email/password accounts through the Identity Toolkit REST API.
///
/// The session (never the password) is kept in browser session storage so a
/// reload stays signed in; id tokens are refreshed shortly before they expire.
#[derive(Clone)]
pub struct FirebaseAuth {
	api_key: Rc<str>,
	client: reqwest::Client,
	inner: Rc<RefCell<AuthInner>>,
}

impl FirebaseAuth {
	/// Starts from whatever session the browser tab already holds.
	pub fn new(api_key: String) -> Self {
		let session = Session::load();
		if let Some(session) = &session {
			log::info!(target: "auth", "Restored session for {}", session.email);
		}
		Self::with_session(api_key, session)
	}

	pub fn with_session(api_key: String, session: Option<Session>) -> Self {
		Self {
			api_key: api_key.into(),
			client: reqwest::Client::new(),
			inner: Rc::new(RefCell::new(AuthInner {
				session,
				listeners: Listeners::default(),
			})),
		}
	}

	fn account_request<T>(&self, action: &str) -> Response<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let builder = self.client.post(format!("{IDENTITY_URL}/accounts:{action}"));
		Response::<T>::from(builder).with_query(&[("key", &*self.api_key)])
	}

	fn set_session(&self, session: Option<Session>) {
		match &session {
			Some(session) => session.apply_to_session(),
			None => Session::delete(),
		}
		let (callbacks, state) = {
			let mut inner = self.inner.borrow_mut();
			inner.session = session;
			(inner.listeners.callbacks(), inner.state())
		};
		notify_all(callbacks, state);
	}

	/// A currently valid id token for authenticating store requests.
	pub async fn id_token(&self) -> Result<String, BackendError> {
		let Some(session) = self.inner.borrow().session.clone() else {
			return Err(BackendError::NoSession);
		};
		if !session.is_expired(now()) {
			return Ok(session.id_token);
		}
		log::debug!(target: "auth", "Refreshing id token for {}", session.email);
		let response = Response::<RefreshResponse>::from(self.client.post(TOKEN_URL))
			.with_query(&[("key", &*self.api_key)])
			.with_json(&serde_json::json!({
				"grant_type": "refresh_token",
				"refresh_token": session.refresh_token,
			}))
			.send()
			.await;
		let response = match response {
			Ok(response) => response,
			Err(err) if !err.is_transient() => {
				log::warn!(target: "auth", "Session could not be refreshed, signing out: {err}");
				self.set_session(None);
				return Err(err);
			}
			Err(err) => return Err(err),
		};
		let refreshed = Session {
			user_id: response.user_id,
			email: session.email,
			id_token: response.id_token,
			refresh_token: response.refresh_token,
			expires_at: expires_at(&response.expires_in)?,
		};
		let token = refreshed.id_token.clone();
		self.set_session(Some(refreshed));
		Ok(token)
	}
}

impl IdentityGateway for FirebaseAuth {
	fn create_account(&self, credentials: Credentials) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		Box::pin(async move {
			self.account_request::<IgnoredAny>("signUp")
				.with_json(&serde_json::json!({
					"email": credentials.email,
					"password": credentials.password,
					"returnSecureToken": true,
				}))
				.send()
				.await?;
			log::info!(target: "auth", "Created account for {}", credentials.email);
			Ok(())
		})
	}

	fn verify_credentials(&self, credentials: Credentials) -> LocalBoxFuture<'_, Result<Session, BackendError>> {
		Box::pin(async move {
			let response = self
				.account_request::<SignInResponse>("signInWithPassword")
				.with_json(&serde_json::json!({
					"email": credentials.email,
					"password": credentials.password,
					"returnSecureToken": true,
				}))
				.send()
				.await?;
			let session = Session {
				user_id: response.local_id,
				email: response.email,
				id_token: response.id_token,
				refresh_token: response.refresh_token,
				expires_at: expires_at(&response.expires_in)?,
			};
			log::info!(target: "auth", "Signed in as {}", session.email);
			self.set_session(Some(session.clone()));
			Ok(session)
		})
	}

	fn terminate_session(&self) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		// Id tokens are stateless; signing out means forgetting them.
		self.set_session(None);
		Box::pin(futures_util::future::ready(Ok(())))
	}

	fn current(&self) -> AuthState {
		self.inner.borrow().state()
	}

	fn subscribe(&self, on_change: Box<dyn Fn(AuthState)>) -> Subscription {
		on_change(self.current());
		Listeners::register(&self.inner, AuthInner::listeners, on_change)
	}
}
