use crate::{
	backend::{Backend, BackendError, RemoteStore},
	controller::RemoteOp,
	data::TaskId,
	retry::{RetryPolicy, SyncFailure},
};
use derivative::Derivative;
use futures_util::future::LocalBoxFuture;
use std::{cell::RefCell, rc::Rc};
use yew::{html::ChildrenProps, prelude::*};
use yew_hooks::*;

#[derive(Clone)]
pub struct Channel(Rc<RequestChannel>);
impl PartialEq for Channel {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl std::ops::Deref for Channel {
	type Target = RequestChannel;

	fn deref(&self) -> &Self::Target {
		&*self.0
	}
}

/// What travels through the queue: an operation, or a marker that is
/// answered once everything queued before it has settled.
#[derive(Debug)]
enum Queued {
	Op(Request),
	Flush(async_channel::Sender<()>),
}

pub struct RequestChannel {
	send_req: async_channel::Sender<Queued>,
	recv_req: async_channel::Receiver<Queued>,
}
impl RequestChannel {
	fn new() -> Self {
		let (send_req, recv_req) = async_channel::unbounded();
		Self { send_req, recv_req }
	}

	pub fn try_send_req(&self, req: Request) {
		if let Err(err) = self.send_req.try_send(Queued::Op(req)) {
			log::error!(target: "sync", "sync queue is closed, dropping {:?}", err.into_inner());
		}
	}

	/// Resolves once every operation queued so far has been sent and settled.
	pub async fn flush(&self) {
		let (done, settled) = async_channel::bounded(1);
		if self.send_req.send(Queued::Flush(done)).await.is_err() {
			log::warn!(target: "sync", "sync queue is closed, nothing to flush");
			return;
		}
		if settled.recv().await.is_err() {
			log::warn!(target: "sync", "sync queue stopped before flushing");
		}
	}
}

/// A remote operation plus who to tell once it has settled.
pub struct Request {
	pub op: RemoteOp,
	pub on_settled: Callback<Settled>,
}
impl std::fmt::Debug for Request {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Request").field(&self.op).finish()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settled {
	pub task_id: TaskId,
	pub result: Result<u32, SyncFailure>,
}

#[derive(Clone, Derivative)]
#[derivative(PartialEq)]
pub struct Status {
	#[derivative(PartialEq = "ignore")]
	rw_internal: Rc<RefCell<StatusState>>,
	r_external: UseStateHandle<StatusState>,
}
impl std::fmt::Debug for Status {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Status")
			.field("State", &self.rw_internal)
			.field("Display", &self.r_external)
			.finish()
	}
}

#[derive(Clone, PartialEq, Default, Debug)]
struct StatusState {
	in_flight: usize,
	failed: usize,
}

impl Status {
	fn mutate(&self, perform: impl FnOnce(&mut StatusState)) {
		let mut state = self.rw_internal.borrow_mut();
		perform(&mut *state);
		self.r_external.set(state.clone());
	}

	fn begin(&self) {
		self.mutate(|state| state.in_flight += 1);
	}

	fn finish(&self, succeeded: bool) {
		self.mutate(|state| {
			state.in_flight = state.in_flight.saturating_sub(1);
			if !succeeded {
				state.failed += 1;
			}
		});
	}

	/// Whether a remote operation is being sent right now.
	pub fn is_active(&self) -> bool {
		self.r_external.in_flight > 0
	}

	/// Operations given up on since the app started.
	pub fn failed(&self) -> usize {
		self.r_external.failed
	}
}

/// Sends one operation to the store, retrying transient failures.
pub async fn execute(store: &dyn RemoteStore, policy: &RetryPolicy, op: &RemoteOp) -> Result<u32, SyncFailure> {
	policy.run(|| send(store, op)).await
}

fn send<'a>(store: &'a dyn RemoteStore, op: &RemoteOp) -> LocalBoxFuture<'a, Result<(), BackendError>> {
	match op {
		RemoteOp::Write { path, record, .. } => store.write_record(path, record.clone()),
		RemoteOp::Update { path, fields, .. } => store.update_fields(path, fields.clone()),
		RemoteOp::Delete { path, .. } => store.delete_record(path),
	}
}

/// Owns the queue every remote operation goes through. Operations are sent
/// one at a time in the order they were queued, so two edits of the same task
/// can never race each other.
#[function_component]
pub fn Provider(props: &ChildrenProps) -> Html {
	let backend = use_context::<Backend>();
	let channel = Channel(use_memo((), |_| RequestChannel::new()));
	let status = Status {
		rw_internal: use_memo((), |_| RefCell::new(StatusState::default())),
		r_external: use_state_eq(StatusState::default),
	};
	use_async_with_options(
		{
			let recv_req = channel.recv_req.clone();
			let status = status.clone();
			async move {
				let Some(backend) = backend else {
					log::error!(target: "sync", "No backend available, remote operations will not be sent");
					return Ok(());
				};
				let policy = crate::config::CONFIG.retry.clone();
				run_queue(recv_req, &*backend.store, &policy, |progress| match progress {
					Progress::Began => status.begin(),
					Progress::Finished(succeeded) => status.finish(succeeded),
				})
				.await;
				Ok(()) as Result<(), ()>
			}
		},
		UseAsyncOptions::enable_auto(),
	);

	html! {
		<ContextProvider<Channel> context={channel}>
			<ContextProvider<Status> context={status}>
				{props.children.clone()}
			</ContextProvider<Status>>
		</ContextProvider<Channel>>
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Progress {
	Began,
	Finished(bool),
}

/// Sends queued operations one at a time until the queue is closed.
async fn run_queue(
	recv_req: async_channel::Receiver<Queued>,
	store: &dyn RemoteStore,
	policy: &RetryPolicy,
	mut on_progress: impl FnMut(Progress),
) {
	while let Ok(queued) = recv_req.recv().await {
		match queued {
			Queued::Op(req) => process_request(req, store, policy, &mut on_progress).await,
			Queued::Flush(done) => {
				if done.try_send(()).is_err() {
					log::debug!(target: "sync", "flush requester went away");
				}
			}
		}
	}
}

async fn process_request(req: Request, store: &dyn RemoteStore, policy: &RetryPolicy, on_progress: &mut impl FnMut(Progress)) {
	on_progress(Progress::Began);
	let result = execute(store, policy, &req.op).await;
	match &result {
		Ok(attempts) => log::debug!(target: "sync", "{} {} ({attempts} attempts)", req.op.verb(), req.op.path()),
		Err(err) => log::error!(target: "sync", "{} {} failed: {err}", req.op.verb(), req.op.path()),
	}
	on_progress(Progress::Finished(result.is_ok()));
	req.on_settled.emit(Settled {
		task_id: req.op.task_id().clone(),
		result,
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		backend::{
			memory::{MemoryStore, Operation},
			StorePath,
		},
		config::ReorderMode,
		controller::TaskListController,
	};
	use futures::executor::block_on;
	use serde_json::json;

	fn drain(controller: &mut TaskListController, store: &MemoryStore, ops: Vec<RemoteOp>) {
		for op in ops {
			match block_on(execute(store, &RetryPolicy::immediate(3), &op)) {
				Ok(_) => controller.acknowledge(op.task_id()),
				Err(_) => {
					controller.abandon(op.task_id());
				}
			}
		}
	}

	#[test]
	fn each_edit_sends_exactly_one_targeted_request() {
		let store = MemoryStore::default();
		let mut controller = TaskListController::new("u1", ReorderMode::Move);
		let add = controller.add("Buy milk").unwrap();
		let id = add.task_id().clone();
		drain(&mut controller, &store, vec![add]);
		let toggle = controller.toggle(&id).unwrap();
		drain(&mut controller, &store, vec![toggle]);
		let record = StorePath::record("u1", &id);
		assert_eq!(
			store.read(&record),
			json!({"uniqueId": id, "content": "Buy milk", "done": true})
		);

		let delete = controller.delete(&id).unwrap();
		drain(&mut controller, &store, vec![delete]);
		let operations = store.operations();
		assert_eq!(operations.len(), 3);
		assert!(matches!(&operations[0], Operation::Write(path, _) if *path == record));
		assert!(matches!(&operations[1], Operation::Update(path, fields) if *path == record && fields.len() == 1));
		assert_eq!(operations[2], Operation::Delete(record.clone()));
		assert_eq!(store.read(&StorePath::collection("u1")), serde_json::Value::Null);
	}

	#[test]
	fn transient_failures_are_retried_until_applied() {
		let store = MemoryStore::default();
		store.fail_next([BackendError::Network("offline".into()), BackendError::Unavailable { status: 503 }]);
		let mut controller = TaskListController::new("u1", ReorderMode::Move);
		let op = controller.add("Walk dog").unwrap();
		let result = block_on(execute(&store, &RetryPolicy::immediate(3), &op));
		assert_eq!(result, Ok(3));
		assert_eq!(store.operations().len(), 3);
		assert!(!store.read(op.path()).is_null());
	}

	#[test]
	fn rejected_operations_are_reported_once() {
		let store = MemoryStore::default();
		store.fail_next([BackendError::rejected("Permission denied")]);
		let mut controller = TaskListController::new("u1", ReorderMode::Move);
		let op = controller.add("Walk dog").unwrap();
		let result = block_on(execute(&store, &RetryPolicy::immediate(3), &op));
		assert!(matches!(result, Err(SyncFailure::Rejected(_))));
		assert_eq!(store.operations().len(), 1);
	}

	#[test]
	fn exhausted_add_is_dropped_from_the_list() {
		let store = MemoryStore::default();
		let mut controller = TaskListController::new("u1", ReorderMode::Move);
		controller.apply_snapshot(&store.read(&controller.collection()));
		store.fail_next((0..3).map(|_| BackendError::Network("offline".into())));
		let op = controller.add("Buy milk").unwrap();
		let result = block_on(execute(&store, &RetryPolicy::immediate(3), &op));
		assert!(matches!(result, Err(SyncFailure::Exhausted { attempts: 3, .. })));

		let report = controller.abandon(op.task_id());
		assert_eq!(report.removed, [op.task_id().clone()]);
		assert!(controller.tasks().is_empty());
		assert!(store.read(&controller.collection()).is_null());
	}

	#[test]
	fn flush_waits_for_queued_operations() {
		let store = MemoryStore::default();
		let channel = RequestChannel::new();
		let mut controller = TaskListController::new("u1", ReorderMode::Move);
		let op = controller.add("Buy milk").unwrap();
		let path = op.path().clone();
		let settled = Rc::new(RefCell::new(Vec::new()));
		channel.try_send_req(Request {
			op,
			on_settled: {
				let settled = settled.clone();
				Callback::from(move |result: Settled| settled.borrow_mut().push(result))
			},
		});

		let mut progress = Vec::new();
		let policy = RetryPolicy::immediate(1);
		let queue = run_queue(channel.recv_req.clone(), &store, &policy, |step| progress.push(step));
		let flushed = async {
			channel.flush().await;
			// Everything queued before the flush has reached the store.
			assert!(!store.read(&path).is_null());
			assert_eq!(settled.borrow().len(), 1);
			channel.send_req.close();
		};
		block_on(futures::future::join(queue, flushed));
		assert_eq!(progress, [Progress::Began, Progress::Finished(true)]);
		assert!(settled.borrow()[0].result.is_ok());
	}

	#[test]
	fn live_snapshots_round_trip_into_a_second_session() {
		let store = MemoryStore::default();
		let mut writer = TaskListController::new("u1", ReorderMode::Move);
		let reader = Rc::new(RefCell::new(TaskListController::new("u1", ReorderMode::Move)));
		let _subscription = store
			.subscribe(&writer.collection(), {
				let reader = reader.clone();
				Box::new(move |snapshot| {
					reader.borrow_mut().apply_snapshot(&snapshot);
				})
			})
			.unwrap();

		let ops = ["a", "b", "c"].into_iter().filter_map(|content| writer.add(content)).collect();
		drain(&mut writer, &store, ops);
		assert_eq!(reader.borrow().tasks().len(), 3);

		let first = writer.tasks().get(0).unwrap().unique_id.clone();
		let ops = writer.delete(&first).into_iter().collect();
		drain(&mut writer, &store, ops);
		let reader = reader.borrow();
		assert_eq!(reader.tasks().len(), 2);
		assert!(reader.tasks().find(&first).is_none());
	}
}
