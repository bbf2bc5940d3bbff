use crate::{
	backend::Backend,
	form::{self, CredentialForm, FormError},
	hooks::{use_action, ActionFuture},
	notify,
	route::Route,
	util::web_ext::CallbackExt,
};
use yew::prelude::*;
use yew_router::prelude::*;
use yewdux::prelude::*;

#[function_component]
pub fn SignUp() -> Html {
	let backend = use_context::<Backend>();
	let navigator = use_navigator();
	let (form, dispatch) = use_store::<CredentialForm>();
	let submit = use_action({
		let dispatch = dispatch.clone();
		move || -> ActionFuture<FormError> {
			let backend = backend.clone();
			let navigator = navigator.clone();
			let dispatch = dispatch.clone();
			Box::pin(async move {
				let Some(backend) = backend else {
					return Ok(());
				};
				let mut form = (*dispatch.get()).clone();
				let result = form::sign_up(&*backend.identity, &mut form).await;
				// A mismatch clears both passwords, so the form is written back either way.
				dispatch.set(form);
				let route = result.map_err(|err| {
					notify::alert(&err.to_string());
					err
				})?;
				if let Some(navigator) = &navigator {
					navigator.push(&route);
				}
				Ok(())
			})
		}
	});
	let onsubmit = {
		let submit = submit.clone();
		Callback::from(move |e: SubmitEvent| {
			e.prevent_default();
			submit.run();
		})
	};
	let on_reset = dispatch.reduce_mut_callback(|form| form.reset());
	let on_email = dispatch.reduce_mut_callback_with(|form, value: String| form.email = value).from_input();
	let on_password = dispatch.reduce_mut_callback_with(|form, value: String| form.password = value).from_input();
	let on_confirm =
		dispatch.reduce_mut_callback_with(|form, value: String| form.confirm_password = value).from_input();

	html! {
		<section class="section">
			<form class="box" {onsubmit}>
				<h1 class="title">{"Sign Up"}</h1>
				<div class="field">
					<label class="label">{"Email"}</label>
					<input class="input" type="email" autocomplete="username" value={form.email.clone()} oninput={on_email} />
				</div>
				<div class="field">
					<label class="label">{"Password"}</label>
					<input class="input" type="password" autocomplete="new-password" value={form.password.clone()} oninput={on_password} />
				</div>
				<div class="field">
					<label class="label">{"Confirm Password"}</label>
					<input class="input" type="password" autocomplete="new-password" value={form.confirm_password.clone()} oninput={on_confirm} />
				</div>
				<div class="field is-grouped">
					<button class="button is-primary" type="submit" disabled={submit.is_running()}>{"Sign Up"}</button>
					<Link<Route> classes="button is-text" to={Route::Login}>{"Back to log in"}</Link<Route>>
					<button class="button is-text" type="button" onclick={on_reset}>{"Clear"}</button>
				</div>
			</form>
		</section>
	}
}
