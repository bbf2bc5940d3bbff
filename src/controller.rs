//! The task list for one signed in user: local optimistic edits, the remote
//! operation each edit implies, and reconciliation of remote snapshots.
use crate::{
	backend::{Snapshot, StorePath},
	config::ReorderMode,
	data::{tasks_from_snapshot, ReconcileReport, RecordData, Task, TaskId, TaskList},
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A targeted change the remote store must apply to catch up with a local edit.
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteOp {
	Write { path: StorePath, task_id: TaskId, record: Value },
	Update { path: StorePath, task_id: TaskId, fields: Map<String, Value> },
	Delete { path: StorePath, task_id: TaskId },
}
impl RemoteOp {
	pub fn task_id(&self) -> &TaskId {
		match self {
			Self::Write { task_id, .. } | Self::Update { task_id, .. } | Self::Delete { task_id, .. } => task_id,
		}
	}

	pub fn path(&self) -> &StorePath {
		match self {
			Self::Write { path, .. } | Self::Update { path, .. } | Self::Delete { path, .. } => path,
		}
	}

	pub fn verb(&self) -> &'static str {
		match self {
			Self::Write { .. } => "write",
			Self::Update { .. } => "update",
			Self::Delete { .. } => "delete",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
struct DragState {
	source: Option<usize>,
	destination: Option<usize>,
}

pub struct TaskListController {
	user_id: String,
	reorder_mode: ReorderMode,
	tasks: TaskList,
	/// Count of issued but unsettled remote operations per task.
	pending: BTreeMap<TaskId, usize>,
	/// What the store last reported, for reverting abandoned edits.
	saved: Snapshot,
	drag: DragState,
}

impl TaskListController {
	pub fn new(user_id: impl Into<String>, reorder_mode: ReorderMode) -> Self {
		Self {
			user_id: user_id.into(),
			reorder_mode,
			tasks: TaskList::default(),
			pending: BTreeMap::new(),
			saved: Snapshot::Null,
			drag: DragState::default(),
		}
	}

	pub fn tasks(&self) -> &TaskList {
		&self.tasks
	}

	/// Where the user's whole list lives in the remote store.
	pub fn collection(&self) -> StorePath {
		StorePath::collection(&self.user_id)
	}

	pub fn is_pending(&self, id: &TaskId) -> bool {
		self.pending.contains_key(id)
	}

	fn issue(&mut self, op: RemoteOp) -> RemoteOp {
		*self.pending.entry(op.task_id().clone()).or_default() += 1;
		op
	}

	fn write(&mut self, task: &Task) -> RemoteOp {
		self.issue(RemoteOp::Write {
			path: StorePath::record(&self.user_id, &task.unique_id),
			task_id: task.unique_id.clone(),
			record: task.to_record(),
		})
	}

	/// Appends a new open task. Blank content is ignored.
	pub fn add(&mut self, content: &str) -> Option<RemoteOp> {
		let content = content.trim();
		if content.is_empty() {
			return None;
		}
		let mut task = Task::new(content);
		while self.tasks.find(&task.unique_id).is_some() {
			task.unique_id = TaskId::generate();
		}
		let op = self.write(&task);
		log::debug!(target: "sync", "added {:?}", task.unique_id);
		self.tasks.push(task);
		Some(op)
	}

	pub fn toggle(&mut self, id: &TaskId) -> Option<RemoteOp> {
		let done = self.tasks.toggle(id)?.done;
		let mut fields = Map::new();
		fields.insert("done".to_owned(), Value::Bool(done));
		Some(self.issue(RemoteOp::Update {
			path: StorePath::record(&self.user_id, id),
			task_id: id.clone(),
			fields,
		}))
	}

	pub fn delete(&mut self, id: &TaskId) -> Option<RemoteOp> {
		self.tasks.remove(id)?;
		Some(self.issue(RemoteOp::Delete {
			path: StorePath::record(&self.user_id, id),
			task_id: id.clone(),
		}))
	}

	pub fn drag_start(&mut self, index: usize) {
		self.drag = DragState {
			source: Some(index),
			destination: None,
		};
	}

	pub fn drag_enter(&mut self, index: usize) {
		if self.drag.source.is_some() {
			self.drag.destination = Some(index);
		}
	}

	/// Finishes a drag, reordering if it ended over another row.
	pub fn drag_end(&mut self) -> Vec<RemoteOp> {
		let drag = std::mem::take(&mut self.drag);
		match (drag.source, drag.destination) {
			(Some(source), Some(destination)) => self.reorder(source, destination),
			_ => Vec::new(),
		}
	}

	/// Applies the configured reorder. Moving is local only because order is not stored remotely;
	/// swapping payloads rewrites both slots' records.
	pub fn reorder(&mut self, source: usize, destination: usize) -> Vec<RemoteOp> {
		match self.reorder_mode {
			ReorderMode::Move => {
				if self.tasks.move_task(source, destination) {
					log::debug!(target: "sync", "moved task {source} -> {destination}");
				}
				Vec::new()
			}
			ReorderMode::SwapPayload => {
				if !self.tasks.swap_payload(source, destination) {
					return Vec::new();
				}
				let swapped = [source, destination]
					.into_iter()
					.filter_map(|index| self.tasks.get(index).cloned())
					.collect::<Vec<_>>();
				swapped.iter().map(|task| self.write(task)).collect()
			}
		}
	}

	/// Marks one remote operation for `id` as applied.
	pub fn acknowledge(&mut self, id: &TaskId) {
		self.settle(id);
	}

	/// Marks one remote operation for `id` as abandoned. Once nothing else is
	/// in flight for the task, it is put back the way the store last reported it.
	pub fn abandon(&mut self, id: &TaskId) -> ReconcileReport {
		self.settle(id);
		if self.is_pending(id) {
			return ReconcileReport::default();
		}
		let saved = tasks_from_snapshot(&self.saved).into_iter().find(|task| task.unique_id == *id);
		let report = self.tasks.restore(id, saved);
		log::warn!(target: "sync", "remote change for {id:?} abandoned, reverted to the saved copy: {report:?}");
		report
	}

	fn settle(&mut self, id: &TaskId) {
		if let Some(count) = self.pending.get_mut(id) {
			*count -= 1;
			if *count == 0 {
				self.pending.remove(id);
			}
		}
	}

	pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> ReconcileReport {
		let remote = tasks_from_snapshot(snapshot);
		let pending = &self.pending;
		let report = self.tasks.reconcile(remote, |id| pending.contains_key(id));
		self.saved = snapshot.clone();
		if !report.is_empty() {
			log::debug!(target: "sync", "snapshot reconciled: {report:?}");
		}
		report
	}

	/// Forgets every task locally. Nothing is sent to the store.
	pub fn clear(&mut self) {
		self.tasks.clear();
		self.pending.clear();
		self.saved = Snapshot::Null;
		self.drag = DragState::default();
	}
}
