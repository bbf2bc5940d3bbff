use crate::{
	auth::AuthState,
	page::{login::Login, signup::SignUp, tasks::Tasks},
};
use yew::prelude::*;
use yew_router::{prelude::*, Routable};
use yewdux::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Routable)]
pub enum Route {
	#[at("/")]
	Login,
	#[at("/signup")]
	SignUp,
	#[at("/tasks")]
	Tasks,
	#[not_found]
	#[at("/404")]
	NotFound,
}

impl Route {
	/// Whether the route shows data that belongs to a signed in user.
	pub fn requires_session(&self) -> bool {
		matches!(self, Self::Tasks)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
	Render(Route),
	Redirect(Route),
	/// The session state is still unknown; render nothing until it is.
	Wait,
}

pub fn resolve(route: Route, auth: &AuthState) -> Resolution {
	match (route, auth) {
		(Route::NotFound, _) => Resolution::Redirect(Route::Login),
		(route, AuthState::Pending) if route.requires_session() => Resolution::Wait,
		(route, AuthState::SignedOut) if route.requires_session() => Resolution::Redirect(Route::Login),
		(route, _) => Resolution::Render(route),
	}
}

impl RouteHtml for Route {
	fn html(self) -> Html {
		html! { <Guard route={self} /> }
	}
}

#[derive(Clone, PartialEq, Properties)]
struct GuardProps {
	route: Route,
}

#[function_component]
fn Guard(props: &GuardProps) -> Html {
	let auth = use_store_value::<AuthState>();
	match resolve(props.route, &auth) {
		Resolution::Wait => html! {},
		Resolution::Redirect(route) => {
			log::debug!(target: "app", "{:?} is not available, redirecting to {route:?}", props.route);
			html! { <Redirect<Route> to={route} /> }
		}
		Resolution::Render(Route::Login) => html! { <Login /> },
		Resolution::Render(Route::SignUp) => html! { <SignUp /> },
		Resolution::Render(Route::Tasks) => html! { <Tasks /> },
		Resolution::Render(Route::NotFound) => html! {},
	}
}

pub struct Switch<T>(std::marker::PhantomData<T>);
impl<T> Component for Switch<T>
where
	T: Routable + RouteHtml + 'static,
{
	type Message = ();
	type Properties = ();

	fn create(_ctx: &Context<Self>) -> Self {
		Self(Default::default())
	}

	fn view(&self, _ctx: &Context<Self>) -> Html {
		html! {
			<yew_router::Switch<T> render={T::html} />
		}
	}
}

pub trait RouteHtml {
	fn html(self) -> Html;

	fn switch() -> Html
	where
		Self: Routable + 'static,
	{
		html! { <Switch<Self> /> }
	}
}
