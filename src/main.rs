use crate::{
	components::{AuthSwitch, Identification},
	route::{Route, RouteHtml},
};
use yew::prelude::*;
use yew_router::prelude::*;

pub mod auth;
pub mod backend;
pub mod components;
pub mod config;
pub mod controller;
pub mod data;
pub mod form;
pub mod hooks;
pub mod notify;
pub mod page;
pub mod response;
pub mod retry;
pub mod route;
pub mod session;
pub mod sync;
pub mod util;

#[cfg(target_family = "wasm")]
fn main() {
	// The logger goes first so warnings raised while reading the config are kept.
	wasm_logger::init(wasm_logger::Config::new(log::Level::Trace));
	console_error_panic_hook::set_once();
	log::set_max_level(config::CONFIG.log_level.to_level_filter());
	yew::Renderer::<App>::new().render();
}

#[cfg(not(target_family = "wasm"))]
fn main() {}

#[function_component]
fn App() -> Html {
	html! {<>
		<BrowserRouter>
			<backend::Provider>
				<sync::Provider>
					<Header />
					<main class="container">
						{Route::switch()}
					</main>
				</sync::Provider>
			</backend::Provider>
		</BrowserRouter>
	</>}
}

#[function_component]
fn Header() -> Html {
	html! {
		<nav class="navbar is-dark" role="navigation">
			<div class="navbar-brand">
				<Link<Route> classes="navbar-item" to={Route::Tasks}>{"Tasks"}</Link<Route>>
			</div>
			<div class="navbar-end">
				<AuthSwitch
					identified={html! { <Identification /> }}
					anonymous={html! {
						<Link<Route> classes="navbar-item" to={Route::Login}>{"Log In"}</Link<Route>>
					}}
				/>
			</div>
		</nav>
	}
}
