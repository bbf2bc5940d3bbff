use wasm_bindgen::JsCast;
use yew::prelude::*;

pub trait InputExt {
	fn input_value(&self) -> Option<String>;
}
impl InputExt for web_sys::Event {
	fn input_value(&self) -> Option<String> {
		let target = self.target()?;
		let input = target.dyn_ref::<web_sys::HtmlInputElement>()?;
		Some(input.value())
	}
}

pub trait CallbackExt {
	/// A callback that reads the event target's input value and forwards it, ignoring non-inputs.
	fn from_input(self) -> Callback<InputEvent>;
}
impl CallbackExt for Callback<String> {
	fn from_input(self) -> Callback<InputEvent> {
		let callback = self.filter_reform(|event: InputEvent| event.input_value());
		Callback::from(move |event: InputEvent| {
			callback.emit(event);
		})
	}
}
