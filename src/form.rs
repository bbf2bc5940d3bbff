use crate::{
	auth::Credentials,
	backend::{BackendError, IdentityGateway},
	route::Route,
};
use yewdux::prelude::*;

/// What the user has typed into the login or sign up form.
///
/// Lives in a global store so leaving and returning to a form keeps the email;
/// only [`CredentialForm::reset`] empties it.
#[derive(Clone, PartialEq, Default, Store)]
pub struct CredentialForm {
	pub email: String,
	pub password: String,
	pub confirm_password: String,
}
impl std::fmt::Debug for CredentialForm {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CredentialForm").field("email", &self.email).finish_non_exhaustive()
	}
}

impl CredentialForm {
	pub fn reset(&mut self) {
		*self = Self::default();
	}

	pub fn clear_passwords(&mut self) {
		self.password.clear();
		self.confirm_password.clear();
	}

	fn credentials(&self) -> Credentials {
		Credentials {
			email: self.email.trim().to_owned(),
			password: self.password.clone(),
		}
	}
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FormError {
	#[error("Passwords do not match")]
	PasswordMismatch,
	#[error("{0}")]
	Gateway(#[from] BackendError),
}

/// Creates an account from the form. Does not sign in; on success the user is
/// sent to the login page with their email still filled in.
pub async fn sign_up(gateway: &dyn IdentityGateway, form: &mut CredentialForm) -> Result<Route, FormError> {
	if form.password != form.confirm_password {
		form.clear_passwords();
		return Err(FormError::PasswordMismatch);
	}
	gateway.create_account(form.credentials()).await?;
	form.clear_passwords();
	Ok(Route::Login)
}

pub async fn log_in(gateway: &dyn IdentityGateway, form: &mut CredentialForm) -> Result<Route, FormError> {
	let session = gateway.verify_credentials(form.credentials()).await?;
	log::debug!(target: "auth", "login accepted for {}", session.email);
	form.clear_passwords();
	Ok(Route::Tasks)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{auth::AuthState, backend::memory::MemoryGateway};
	use futures::executor::block_on;
	use rstest::rstest;

	fn form(email: &str, password: &str, confirm_password: &str) -> CredentialForm {
		CredentialForm {
			email: email.into(),
			password: password.into(),
			confirm_password: confirm_password.into(),
		}
	}

	#[test]
	fn reset_empties_every_field() {
		let mut form = form("a@b.co", "secret1", "secret1");
		form.clear_passwords();
		assert_eq!(form.email, "a@b.co");
		form.reset();
		assert_eq!(form, CredentialForm::default());
	}

	#[test]
	fn mismatched_passwords_never_reach_the_gateway() {
		let gateway = MemoryGateway::default();
		let mut form = form("a@b.co", "secret1", "secret2");
		let result = block_on(sign_up(&gateway, &mut form));
		assert_eq!(result, Err(FormError::PasswordMismatch));
		assert_eq!(result.unwrap_err().to_string(), "Passwords do not match");
		assert_eq!(gateway.request_count(), 0);
		assert_eq!(form.email, "a@b.co");
		assert!(form.password.is_empty());
		assert!(form.confirm_password.is_empty());
	}

	#[test]
	fn sign_up_leads_to_login_without_signing_in() {
		let gateway = MemoryGateway::default();
		let mut form = form("a@b.co", "secret1", "secret1");
		assert_eq!(block_on(sign_up(&gateway, &mut form)), Ok(Route::Login));
		assert_eq!(gateway.request_count(), 1);
		assert_eq!(gateway.current(), AuthState::SignedOut);
		assert_eq!(form.email, "a@b.co");
	}

	#[rstest]
	#[case("not-an-email", "secret1", "INVALID_EMAIL")]
	#[case("a@b.co", "123", "WEAK_PASSWORD : Password should be at least 6 characters")]
	fn gateway_messages_are_shown_verbatim(#[case] email: &str, #[case] password: &str, #[case] message: &str) {
		let gateway = MemoryGateway::default();
		let mut form = form(email, password, password);
		let err = block_on(sign_up(&gateway, &mut form)).unwrap_err();
		assert_eq!(err.to_string(), message);
	}

	#[test]
	fn duplicate_accounts_are_rejected() {
		let gateway = MemoryGateway::default();
		block_on(sign_up(&gateway, &mut form("a@b.co", "secret1", "secret1"))).unwrap();
		let err = block_on(sign_up(&gateway, &mut form("a@b.co", "secret1", "secret1"))).unwrap_err();
		assert_eq!(err.to_string(), "EMAIL_EXISTS");
	}

	#[test]
	fn log_in_opens_the_task_list() {
		let gateway = MemoryGateway::default();
		block_on(sign_up(&gateway, &mut form("a@b.co", "secret1", "secret1"))).unwrap();
		let mut form = form("a@b.co", "secret1", "");
		assert_eq!(block_on(log_in(&gateway, &mut form)), Ok(Route::Tasks));
		assert!(matches!(gateway.current(), AuthState::SignedIn(session) if session.email == "a@b.co"));
		assert!(form.password.is_empty());
	}

	#[test]
	fn wrong_password_keeps_the_user_signed_out() {
		let gateway = MemoryGateway::default();
		block_on(sign_up(&gateway, &mut form("a@b.co", "secret1", "secret1"))).unwrap();
		let mut form = form("a@b.co", "wrong-pass", "");
		let err = block_on(log_in(&gateway, &mut form)).unwrap_err();
		assert_eq!(err, FormError::Gateway(BackendError::rejected("INVALID_LOGIN_CREDENTIALS")));
		assert_eq!(gateway.current(), AuthState::SignedOut);
	}
}
