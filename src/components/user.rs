use crate::auth::AuthState;
use yew::prelude::*;
use yewdux::prelude::*;

#[function_component]
pub fn Identification() -> Html {
	let auth = use_store_value::<AuthState>();
	match auth.session() {
		Some(session) => html! {
			<span class="navbar-item">{&session.email}</span>
		},
		None => html! {},
	}
}
