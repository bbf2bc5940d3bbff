use std::{future::Future, pin::Pin, rc::Rc};
use yew::prelude::*;

pub type ActionFuture<E> = Pin<Box<dyn Future<Output = Result<(), E>>>>;

/// A user triggered async action (form submit, logout) and whether it is still running.
#[derive(Clone)]
pub struct ActionHandle {
	running: UseStateHandle<bool>,
	run: Rc<dyn Fn()>,
}
impl ActionHandle {
	pub fn run(&self) {
		(*self.run)();
	}

	pub fn is_running(&self) -> bool {
		*self.running
	}
}

/// Runs the future returned by `make_future` each time the handle is run.
/// Runs requested while one is still in flight are ignored, so a double
/// click on submit sends one request.
#[hook]
pub fn use_action<F, E>(make_future: F) -> ActionHandle
where
	F: Fn() -> ActionFuture<E> + 'static,
	E: std::fmt::Display + 'static,
{
	let running = use_state_eq(|| false);
	let in_flight = use_mut_ref(|| false);
	let make_future = Rc::new(make_future);
	let run = {
		let running = running.clone();
		Rc::new(move || {
			if *in_flight.borrow() {
				log::debug!(target: "app", "ignoring repeated action while one is running");
				return;
			}
			*in_flight.borrow_mut() = true;
			running.set(true);
			let running = running.clone();
			let in_flight = in_flight.clone();
			let make_future = make_future.clone();
			wasm_bindgen_futures::spawn_local(async move {
				if let Err(err) = make_future().await {
					log::warn!(target: "app", "{err}");
				}
				*in_flight.borrow_mut() = false;
				running.set(false);
			})
		})
	};
	ActionHandle { running, run }
}
