//! In-process gateway and store. They follow the hosted services' observable
//! behavior, including their error messages, so the app runs without a
//! backend project and tests run without a browser.
use super::{notify_all, tree, BackendError, IdentityGateway, Listeners, RemoteStore, Snapshot, StorePath, Subscription};
use crate::auth::{AuthState, Credentials, Session};
use futures_util::future::{self, LocalBoxFuture};
use serde_json::{Map, Value};
use std::{
	cell::RefCell,
	collections::{BTreeMap, VecDeque},
	rc::Rc,
};

static MIN_PASSWORD_LEN: usize = 6;

#[derive(Default)]
struct GatewayState {
	/// email -> (user id, password)
	accounts: BTreeMap<String, (String, String)>,
	session: Option<Session>,
	listeners: Listeners<AuthState>,
	requests: usize,
}
impl GatewayState {
	fn listeners(&mut self) -> &mut Listeners<AuthState> {
		&mut self.listeners
	}

	fn state(&self) -> AuthState {
		match &self.session {
			Some(session) => AuthState::SignedIn(session.clone()),
			None => AuthState::SignedOut,
		}
	}
}

#[derive(Clone, Default)]
pub struct MemoryGateway(Rc<RefCell<GatewayState>>);

impl MemoryGateway {
	/// How many create/verify/terminate requests reached the gateway.
	pub fn request_count(&self) -> usize {
		self.0.borrow().requests
	}

	fn register(&self, credentials: Credentials) -> Result<(), BackendError> {
		let mut inner = self.0.borrow_mut();
		inner.requests += 1;
		validate_email(&credentials.email)?;
		if credentials.password.len() < MIN_PASSWORD_LEN {
			return Err(BackendError::rejected(
				"WEAK_PASSWORD : Password should be at least 6 characters",
			));
		}
		if inner.accounts.contains_key(&credentials.email) {
			return Err(BackendError::rejected("EMAIL_EXISTS"));
		}
		let user_id = uuid::Uuid::new_v4().simple().to_string();
		log::debug!(target: "auth", "created account {user_id} for {}", credentials.email);
		inner.accounts.insert(credentials.email, (user_id, credentials.password));
		Ok(())
	}

	fn set_session(&self, session: Option<Session>) {
		let (callbacks, state) = {
			let mut inner = self.0.borrow_mut();
			inner.session = session;
			(inner.listeners.callbacks(), inner.state())
		};
		notify_all(callbacks, state);
	}
}

fn validate_email(email: &str) -> Result<(), BackendError> {
	let valid = match email.split_once('@') {
		Some((user, domain)) => !user.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
		None => false,
	};
	match valid {
		true => Ok(()),
		false => Err(BackendError::rejected("INVALID_EMAIL")),
	}
}

impl IdentityGateway for MemoryGateway {
	fn create_account(&self, credentials: Credentials) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		Box::pin(future::ready(self.register(credentials)))
	}

	fn verify_credentials(&self, credentials: Credentials) -> LocalBoxFuture<'_, Result<Session, BackendError>> {
		let result = {
			let mut inner = self.0.borrow_mut();
			inner.requests += 1;
			match inner.accounts.get(&credentials.email) {
				Some((user_id, password)) if *password == credentials.password => Ok(Session {
					user_id: user_id.clone(),
					email: credentials.email.clone(),
					id_token: uuid::Uuid::new_v4().to_string(),
					refresh_token: uuid::Uuid::new_v4().to_string(),
					expires_at: i64::MAX,
				}),
				_ => Err(BackendError::rejected("INVALID_LOGIN_CREDENTIALS")),
			}
		};
		if let Ok(session) = &result {
			self.set_session(Some(session.clone()));
		}
		Box::pin(future::ready(result))
	}

	fn terminate_session(&self) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		self.0.borrow_mut().requests += 1;
		self.set_session(None);
		Box::pin(future::ready(Ok(())))
	}

	fn current(&self) -> AuthState {
		self.0.borrow().state()
	}

	fn subscribe(&self, on_change: Box<dyn Fn(AuthState)>) -> Subscription {
		let state = self.current();
		on_change(state);
		Listeners::register(&self.0, GatewayState::listeners, on_change)
	}
}

struct Watcher {
	id: u64,
	path: StorePath,
	on_snapshot: Rc<dyn Fn(Snapshot)>,
}

#[derive(Default)]
struct StoreState {
	root: Value,
	watchers: Vec<Watcher>,
	next_watcher: u64,
	failures: VecDeque<BackendError>,
	operations: Vec<Operation>,
}

/// A request as the memory store received it.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
	Write(StorePath, Value),
	Update(StorePath, Map<String, Value>),
	Delete(StorePath),
}

#[derive(Clone, Default)]
pub struct MemoryStore(Rc<RefCell<StoreState>>);

impl MemoryStore {
	/// The next requests fail with these errors, in order, before anything is applied.
	pub fn fail_next(&self, errors: impl IntoIterator<Item = BackendError>) {
		self.0.borrow_mut().failures.extend(errors);
	}

	/// Every request that reached the store, including failed ones.
	pub fn operations(&self) -> Vec<Operation> {
		self.0.borrow().operations.clone()
	}

	pub fn read(&self, path: &StorePath) -> Value {
		let inner = self.0.borrow();
		tree::get(&inner.root, path.segments()).cloned().unwrap_or(Value::Null)
	}

	pub fn watcher_count(&self) -> usize {
		self.0.borrow().watchers.len()
	}

	fn apply(&self, operation: Operation) -> Result<(), BackendError> {
		let notifications = {
			let mut inner = self.0.borrow_mut();
			inner.operations.push(operation.clone());
			if let Some(err) = inner.failures.pop_front() {
				return Err(err);
			}
			let changed = match operation {
				Operation::Write(path, value) => {
					tree::set(&mut inner.root, path.segments(), value);
					path
				}
				Operation::Update(path, fields) => {
					tree::merge(&mut inner.root, path.segments(), fields);
					path
				}
				Operation::Delete(path) => {
					tree::set(&mut inner.root, path.segments(), Value::Null);
					path
				}
			};
			inner
				.watchers
				.iter()
				.filter(|watcher| changed.starts_with(&watcher.path) || watcher.path.starts_with(&changed))
				.map(|watcher| {
					let snapshot = tree::get(&inner.root, watcher.path.segments()).cloned().unwrap_or(Value::Null);
					(watcher.on_snapshot.clone(), snapshot)
				})
				.collect::<Vec<_>>()
		};
		for (on_snapshot, snapshot) in notifications {
			(*on_snapshot)(snapshot);
		}
		Ok(())
	}
}

impl RemoteStore for MemoryStore {
	fn write_record(&self, path: &StorePath, value: Value) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		Box::pin(future::ready(self.apply(Operation::Write(path.clone(), value))))
	}

	fn update_fields(&self, path: &StorePath, fields: Map<String, Value>) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		Box::pin(future::ready(self.apply(Operation::Update(path.clone(), fields))))
	}

	fn delete_record(&self, path: &StorePath) -> LocalBoxFuture<'_, Result<(), BackendError>> {
		Box::pin(future::ready(self.apply(Operation::Delete(path.clone()))))
	}

	fn subscribe(&self, path: &StorePath, on_snapshot: Box<dyn Fn(Snapshot)>) -> Result<Subscription, BackendError> {
		let on_snapshot: Rc<dyn Fn(Snapshot)> = Rc::from(on_snapshot);
		let id = {
			let mut inner = self.0.borrow_mut();
			let id = inner.next_watcher;
			inner.next_watcher += 1;
			inner.watchers.push(Watcher {
				id,
				path: path.clone(),
				on_snapshot: on_snapshot.clone(),
			});
			id
		};
		(*on_snapshot)(self.read(path));
		let weak = Rc::downgrade(&self.0);
		Ok(Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.borrow_mut().watchers.retain(|watcher| watcher.id != id);
			}
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::block_on;
	use serde_json::json;
	use std::cell::Cell;

	fn credentials(email: &str, password: &str) -> Credentials {
		Credentials {
			email: email.into(),
			password: password.into(),
		}
	}

	#[test]
	fn account_lifecycle() {
		let gateway = MemoryGateway::default();
		block_on(gateway.create_account(credentials("a@b.co", "hunter22"))).unwrap();
		assert_eq!(gateway.current(), AuthState::SignedOut);

		let session = block_on(gateway.verify_credentials(credentials("a@b.co", "hunter22"))).unwrap();
		assert_eq!(session.email, "a@b.co");
		assert_eq!(gateway.current(), AuthState::SignedIn(session));

		block_on(gateway.terminate_session()).unwrap();
		assert_eq!(gateway.current(), AuthState::SignedOut);
		assert_eq!(gateway.request_count(), 3);
	}

	#[test]
	fn rejections_use_service_messages() {
		let gateway = MemoryGateway::default();
		let err = |result: Result<(), BackendError>| result.unwrap_err().to_string();
		assert_eq!(err(block_on(gateway.create_account(credentials("nope", "hunter22")))), "INVALID_EMAIL");
		assert_eq!(
			err(block_on(gateway.create_account(credentials("a@b.co", "123")))),
			"WEAK_PASSWORD : Password should be at least 6 characters"
		);
		block_on(gateway.create_account(credentials("a@b.co", "hunter22"))).unwrap();
		assert_eq!(err(block_on(gateway.create_account(credentials("a@b.co", "other123")))), "EMAIL_EXISTS");
		let login = block_on(gateway.verify_credentials(credentials("a@b.co", "wrong-pass")));
		assert_eq!(login.unwrap_err().to_string(), "INVALID_LOGIN_CREDENTIALS");
	}

	#[test]
	fn subscribers_see_current_state_then_changes() {
		let gateway = MemoryGateway::default();
		block_on(gateway.create_account(credentials("a@b.co", "hunter22"))).unwrap();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let subscription = gateway.subscribe({
			let seen = seen.clone();
			Box::new(move |state: AuthState| seen.borrow_mut().push(state.session().is_some()))
		});
		block_on(gateway.verify_credentials(credentials("a@b.co", "hunter22"))).unwrap();
		block_on(gateway.terminate_session()).unwrap();
		assert_eq!(*seen.borrow(), [false, true, false]);

		drop(subscription);
		block_on(gateway.verify_credentials(credentials("a@b.co", "hunter22"))).unwrap();
		assert_eq!(seen.borrow().len(), 3);
	}

	#[test]
	fn store_applies_writes_updates_and_deletes() {
		let store = MemoryStore::default();
		let path = StorePath::parse("u1/t1");
		block_on(store.write_record(&path, json!({"content": "a", "done": false}))).unwrap();
		let fields = json!({"done": true}).as_object().cloned().unwrap();
		block_on(store.update_fields(&path, fields)).unwrap();
		assert_eq!(store.read(&path), json!({"content": "a", "done": true}));

		block_on(store.delete_record(&path)).unwrap();
		assert_eq!(store.read(&StorePath::collection("u1")), Value::Null);
		assert_eq!(store.operations().len(), 3);
	}

	#[test]
	fn watchers_receive_collection_snapshots() {
		let store = MemoryStore::default();
		let snapshots = Rc::new(RefCell::new(Vec::new()));
		let subscription = store
			.subscribe(&StorePath::collection("u1"), {
				let snapshots = snapshots.clone();
				Box::new(move |snapshot| snapshots.borrow_mut().push(snapshot))
			})
			.unwrap();
		block_on(store.write_record(&StorePath::parse("u1/t1"), json!({"content": "a"}))).unwrap();
		block_on(store.write_record(&StorePath::parse("u2/t1"), json!({"content": "b"}))).unwrap();
		assert_eq!(*snapshots.borrow(), [Value::Null, json!({"t1": {"content": "a"}})]);

		drop(subscription);
		assert_eq!(store.watcher_count(), 0);
	}

	#[test]
	fn injected_failures_leave_data_untouched() {
		let store = MemoryStore::default();
		let calls = Rc::new(Cell::new(0));
		let _subscription = store
			.subscribe(&StorePath::collection("u1"), {
				let calls = calls.clone();
				Box::new(move |_| calls.set(calls.get() + 1))
			})
			.unwrap();
		store.fail_next([BackendError::Network("offline".into())]);
		let path = StorePath::parse("u1/t1");
		let result = block_on(store.write_record(&path, json!({"content": "a"})));
		assert_eq!(result, Err(BackendError::Network("offline".into())));
		assert_eq!(store.read(&path), Value::Null);
		assert_eq!(calls.get(), 1);
	}
}
