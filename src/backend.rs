use crate::auth::{AuthState, Credentials, Session};
use futures_util::future::LocalBoxFuture;
use std::{cell::RefCell, rc::Rc};
use yew::prelude::*;
use yewdux::prelude::use_dispatch;

mod error;
pub use error::*;
mod path;
pub use path::*;
pub mod firebase;
pub mod memory;
pub mod tree;

/// The full contents of a collection, as the store last saw it.
/// `Value::Null` when the collection does not exist.
pub type Snapshot = serde_json::Value;

/// Account creation, credential checks and session-state notification.
pub trait IdentityGateway {
	fn create_account(&self, credentials: Credentials) -> LocalBoxFuture<'_, Result<(), BackendError>>;

	fn verify_credentials(&self, credentials: Credentials) -> LocalBoxFuture<'_, Result<Session, BackendError>>;

	fn terminate_session(&self) -> LocalBoxFuture<'_, Result<(), BackendError>>;

	fn current(&self) -> AuthState;

	/// The callback is invoked with the current state immediately, and again on every change.
	fn subscribe(&self, on_change: Box<dyn Fn(AuthState)>) -> Subscription;
}

/// Per-user keyed record storage with live change notification.
pub trait RemoteStore {
	fn write_record(&self, path: &StorePath, value: serde_json::Value) -> LocalBoxFuture<'_, Result<(), BackendError>>;

	fn update_fields(
		&self,
		path: &StorePath,
		fields: serde_json::Map<String, serde_json::Value>,
	) -> LocalBoxFuture<'_, Result<(), BackendError>>;

	fn delete_record(&self, path: &StorePath) -> LocalBoxFuture<'_, Result<(), BackendError>>;

	/// Emits a full snapshot of `path` once the subscription is live and after every change beneath it.
	fn subscribe(&self, path: &StorePath, on_snapshot: Box<dyn Fn(Snapshot)>) -> Result<Subscription, BackendError>;
}

/// Live registration with a gateway or store. Dropping it stops notifications.
#[must_use]
pub struct Subscription(Option<Box<dyn FnOnce()>>);
impl Subscription {
	pub fn new(cancel: impl FnOnce() + 'static) -> Self {
		Self(Some(Box::new(cancel)))
	}
}
impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(cancel) = self.0.take() {
			cancel();
		}
	}
}
impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Subscription").field(&self.0.is_some()).finish()
	}
}

/// Callback registry shared by the gateway implementations.
pub(crate) struct Listeners<T> {
	next_id: u64,
	entries: Vec<(u64, Rc<dyn Fn(T)>)>,
}
impl<T> Default for Listeners<T> {
	fn default() -> Self {
		Self {
			next_id: 0,
			entries: Vec::new(),
		}
	}
}
impl<T: Clone + 'static> Listeners<T> {
	/// Registers `callback` in the shared registry, removing it again when the subscription drops.
	pub fn register<S: 'static>(
		owner: &Rc<RefCell<S>>,
		select: fn(&mut S) -> &mut Listeners<T>,
		callback: Box<dyn Fn(T)>,
	) -> Subscription {
		let id = {
			let mut state = owner.borrow_mut();
			let listeners = select(&mut *state);
			let id = listeners.next_id;
			listeners.next_id += 1;
			listeners.entries.push((id, Rc::from(callback)));
			id
		};
		let weak = Rc::downgrade(owner);
		Subscription::new(move || {
			if let Some(owner) = weak.upgrade() {
				select(&mut *owner.borrow_mut()).entries.retain(|(entry, _)| *entry != id);
			}
		})
	}

	pub fn callbacks(&self) -> Vec<Rc<dyn Fn(T)>> {
		self.entries.iter().map(|(_, callback)| callback.clone()).collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

/// Notifies every callback outside of any borrow of the registry's owner.
pub(crate) fn notify_all<T: Clone>(callbacks: Vec<Rc<dyn Fn(T)>>, value: T) {
	for callback in callbacks {
		(*callback)(value.clone());
	}
}

#[derive(Clone)]
pub struct Backend {
	pub identity: Rc<dyn IdentityGateway>,
	pub store: Rc<dyn RemoteStore>,
}
impl PartialEq for Backend {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.identity, &other.identity) && Rc::ptr_eq(&self.store, &other.store)
	}
}
impl std::fmt::Debug for Backend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Backend").finish_non_exhaustive()
	}
}

impl Backend {
	pub fn from_config(config: &crate::config::Config) -> Self {
		match &config.firebase {
			Some(firebase) => {
				log::info!(target: "store", "Using firebase project at {}", firebase.database_url);
				let identity = firebase::FirebaseAuth::new(firebase.api_key.clone());
				let store = firebase::FirebaseDatabase::new(firebase.database_url.clone(), identity.clone());
				Self {
					identity: Rc::new(identity),
					store: Rc::new(store),
				}
			}
			None => {
				log::warn!(target: "store", "No firebase project configured, tasks will only live in memory");
				Self::memory()
			}
		}
	}

	pub fn memory() -> Self {
		Self {
			identity: Rc::new(memory::MemoryGateway::default()),
			store: Rc::new(memory::MemoryStore::default()),
		}
	}
}

/// Owns the backend for the lifetime of the app and mirrors the gateway's
/// session state into the global `AuthState` store.
#[function_component]
pub fn Provider(props: &html::ChildrenProps) -> Html {
	let backend = use_memo((), |_| Backend::from_config(&crate::config::CONFIG));
	let dispatch = use_dispatch::<AuthState>();
	use_effect_with(backend.clone(), move |backend| {
		let subscription = backend.identity.subscribe(Box::new(move |state: AuthState| {
			log::debug!(target: "auth", "session state changed: {state:?}");
			dispatch.set(state);
		}));
		move || drop(subscription)
	});
	html! {
		<ContextProvider<Backend> context={(*backend).clone()}>
			{props.children.clone()}
		</ContextProvider<Backend>>
	}
}
