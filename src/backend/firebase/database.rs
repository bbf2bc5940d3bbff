use super::{
	stream::{EventStream, SnapshotCache, StreamEvent},
	FirebaseAuth,
};
use crate::{
	backend::{BackendError, RemoteStore, Snapshot, StorePath, Subscription},
	response::Response,
};
use futures_util::future::LocalBoxFuture;
use reqwest::Method;
use serde_json::{Map, Value};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};

/// Realtime Database access over REST, authenticated with the signed in user's id token.
#[derive(Clone)]
pub struct FirebaseDatabase {
	base: url::Url,
	auth: FirebaseAuth,
	client: reqwest::Client,
}

impl FirebaseDatabase {
	pub fn new(mut base: url::Url, auth: FirebaseAuth) -> Self {
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());
			base.set_path(&path);
		}
		Self {
			base,
			auth,
			client: reqwest::Client::new(),
		}
	}

	fn endpoint(&self, path: &StorePath, token: &str) -> Result<url::Url, BackendError> {
		let mut url = self
			.base
			.join(&format!("{path}.json"))
			.map_err(|err| BackendError::rejected(format!("invalid store path {path}: {err}")))?;
		url.query_pairs_mut().append_pair("auth", token);
		Ok(url)
	}

	async fn request(&self, method: Method, path: &StorePath, body: Option<Value>) -> Result<(), BackendError> {
		let token = self.auth.id_token().await?;
		let url = self.endpoint(path, &token)?;
		log::debug!(target: "store", "{method} {path}");
		let mut response = Response::<Value>::from(self.client.request(method, url));
		if let Some(body) = &body {
			response = response.with_json(body);
		}
		response.send().await?;
		Ok(())
	}
}

impl RemoteStore for FirebaseDatabase {
	fn write_record(&self, path: &StorePath, value: Value) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		let path = path.clone();
		Box::pin(async move { self.request(Method::PUT, &path, Some(value)).await })
	}

	fn update_fields(&self, path: &StorePath, fields: Map<String, Value>) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		let path = path.clone();
		Box::pin(async move { self.request(Method::PATCH, &path, Some(Value::Object(fields))).await })
	}

	fn delete_record(&self, path: &StorePath) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		let path = path.clone();
		Box::pin(async move { self.request(Method::DELETE, &path, None).await })
	}

	fn subscribe(&self, path: &StorePath, on_snapshot: Box<dyn Fn(Snapshot)>) -> Result<Subscription, BackendError> {
		let watch = Rc::new(Watch {
			database: self.clone(),
			path: path.clone(),
			on_snapshot,
			state: RefCell::new(WatchState::default()),
		});
		connect(&watch);
		Ok(Subscription::new(move || {
			let mut state = watch.state.borrow_mut();
			state.closed = true;
			state.stream = None;
			log::debug!(target: "store", "Closed watch on {}", watch.path);
		}))
	}
}

struct Watch {
	database: FirebaseDatabase,
	path: StorePath,
	on_snapshot: Box<dyn Fn(Snapshot)>,
	state: RefCell<WatchState>,
}

#[derive(Default)]
struct WatchState {
	cache: SnapshotCache,
	stream: Option<EventStream>,
	closed: bool,
}

/// Opens (or reopens) the event stream for a watch, with a fresh id token.
fn connect(watch: &Rc<Watch>) {
	let weak = Rc::downgrade(watch);
	crate::util::spawn_local("store", async move {
		let Some(watch) = weak.upgrade() else {
			return Ok(());
		};
		let token = watch.database.auth.id_token().await?;
		let url = watch.database.endpoint(&watch.path, &token)?;
		let stream = EventStream::open(url.as_str(), {
			let weak = Rc::downgrade(&watch);
			Rc::new(move |event| on_event(&weak, event))
		})?;
		let mut state = watch.state.borrow_mut();
		if !state.closed {
			log::debug!(target: "store", "Watching {}", watch.path);
			state.cache.reset();
			state.stream = Some(stream);
		}
		Ok(()) as Result<(), BackendError>
	});
}

fn on_event(watch: &Weak<Watch>, event: StreamEvent) {
	let Some(watch) = watch.upgrade() else {
		return;
	};
	match &event {
		StreamEvent::Put(_) | StreamEvent::Patch(_) => {
			let snapshot = {
				let mut state = watch.state.borrow_mut();
				if state.closed || !state.cache.apply(&event) {
					return;
				}
				state.cache.snapshot()
			};
			(watch.on_snapshot)(snapshot);
		}
		StreamEvent::KeepAlive => {}
		StreamEvent::Cancel(reason) => {
			log::error!(target: "store", "Server stopped watching {}: {reason}", watch.path);
			retire_stream(&watch);
		}
		StreamEvent::AuthRevoked => {
			log::info!(target: "store", "Stream credentials expired, reconnecting {}", watch.path);
			retire_stream(&watch);
			connect(&watch);
		}
	}
}

/// Closes the current stream once the listener that is running right now has returned.
fn retire_stream(watch: &Watch) {
	let stale = watch.state.borrow_mut().stream.take();
	if let Some(stale) = stale {
		wasm_bindgen_futures::spawn_local(async move {
			drop(stale);
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::data::TaskId;

	#[test]
	fn endpoints_append_json_and_token() {
		let base = url::Url::parse("https://demo.firebaseio.com/todo").unwrap();
		let database = FirebaseDatabase::new(base, FirebaseAuth::with_session("key".into(), None));
		let path = StorePath::record("u1", &TaskId::from("t1".to_owned()));
		let url = database.endpoint(&path, "tok").unwrap();
		assert_eq!(url.as_str(), "https://demo.firebaseio.com/todo/u1/t1.json?auth=tok");
	}
}
