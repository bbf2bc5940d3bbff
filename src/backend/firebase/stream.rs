//! The Realtime Database streams changes as server-sent events. Each event
//! carries `{"path": .., "data": ..}` relative to the watched location; they
//! are folded into a cached copy so every change yields a full snapshot.
use crate::backend::{tree, BackendError, Snapshot, StorePath};
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::rc::Rc;
use wasm_bindgen::{closure::Closure, JsCast};

static EVENT_NAMES: [&str; 5] = ["put", "patch", "keep-alive", "cancel", "auth_revoked"];

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Change {
	pub path: String,
	pub data: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
	/// Replace whatever is at `path`.
	Put(Change),
	/// Merge the children of `data` into `path`.
	Patch(Change),
	KeepAlive,
	/// The server stopped the stream, usually because read access was lost.
	Cancel(String),
	/// The id token used to open the stream expired.
	AuthRevoked,
}

pub fn parse_event(name: &str, data: &str) -> anyhow::Result<StreamEvent> {
	Ok(match name {
		"put" => StreamEvent::Put(serde_json::from_str(data).with_context(|| format!("put payload {data:?}"))?),
		"patch" => StreamEvent::Patch(serde_json::from_str(data).with_context(|| format!("patch payload {data:?}"))?),
		"keep-alive" => StreamEvent::KeepAlive,
		"cancel" => StreamEvent::Cancel(match serde_json::from_str::<Value>(data) {
			Ok(Value::String(reason)) => reason,
			_ => data.to_owned(),
		}),
		"auth_revoked" => StreamEvent::AuthRevoked,
		other => anyhow::bail!("unknown stream event {other:?}"),
	})
}

#[derive(Default, Debug)]
pub struct SnapshotCache {
	root: Value,
}

impl SnapshotCache {
	/// Applies a data event. Returns whether the cached snapshot may have changed.
	pub fn apply(&mut self, event: &StreamEvent) -> bool {
		match event {
			StreamEvent::Put(change) => {
				tree::set(&mut self.root, StorePath::parse(&change.path).segments(), change.data.clone());
				true
			}
			StreamEvent::Patch(change) => {
				let Some(fields) = change.data.as_object() else {
					log::warn!(target: "store", "Ignoring patch without fields at {:?}", change.path);
					return false;
				};
				tree::merge(&mut self.root, StorePath::parse(&change.path).segments(), fields.clone());
				true
			}
			_ => false,
		}
	}

	pub fn snapshot(&self) -> Snapshot {
		self.root.clone()
	}

	pub fn reset(&mut self) {
		self.root = Value::Null;
	}
}

/// An open `EventSource`. Dropping it closes the connection.
pub struct EventStream {
	source: web_sys::EventSource,
	_listeners: Vec<Closure<dyn FnMut(web_sys::MessageEvent)>>,
	_on_error: Closure<dyn FnMut(web_sys::Event)>,
}

impl EventStream {
	pub fn open(url: &str, on_event: Rc<dyn Fn(StreamEvent)>) -> Result<Self, BackendError> {
		let js_err = |err: wasm_bindgen::JsValue| BackendError::Network(format!("{err:?}"));
		let source = web_sys::EventSource::new(url).map_err(js_err)?;
		let mut listeners = Vec::with_capacity(EVENT_NAMES.len());
		for name in EVENT_NAMES {
			let on_event = on_event.clone();
			let listener = Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
				let data = event.data().as_string().unwrap_or_default();
				match parse_event(name, &data) {
					Ok(event) => (*on_event)(event),
					Err(err) => log::warn!(target: "store", "{err:?}"),
				}
			});
			source
				.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
				.map_err(js_err)?;
			listeners.push(listener);
		}
		let on_error = Closure::<dyn FnMut(web_sys::Event)>::new(|_event: web_sys::Event| {
			log::warn!(target: "store", "Event stream interrupted; the browser will reconnect");
		});
		source.set_onerror(Some(on_error.as_ref().unchecked_ref()));
		Ok(Self {
			source,
			_listeners: listeners,
			_on_error: on_error,
		})
	}
}

impl Drop for EventStream {
	fn drop(&mut self) {
		self.source.close();
	}
}
