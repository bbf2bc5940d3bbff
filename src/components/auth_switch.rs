use crate::auth::AuthState;
use yew::prelude::*;
use yewdux::prelude::*;

#[derive(Debug, Clone, PartialEq, Properties)]
pub struct AuthSwitchProps {
	#[prop_or_default]
	pub identified: Option<Html>,
	#[prop_or_default]
	pub anonymous: Option<Html>,
}

/// Renders `identified` while a user is signed in and `anonymous` once it is
/// known that nobody is. Nothing renders while the session is being restored.
#[function_component]
pub fn AuthSwitch(props: &AuthSwitchProps) -> Html {
	let auth = use_store_value::<AuthState>();
	let empty = || html! {};
	match *auth {
		AuthState::Pending => empty(),
		AuthState::SignedIn(_) => props.identified.clone().unwrap_or_else(empty),
		AuthState::SignedOut => props.anonymous.clone().unwrap_or_else(empty),
	}
}
