use super::{RecordData, Task, TaskId};
use crate::backend::Snapshot;
use std::collections::BTreeMap;

/// The user's tasks in display order. Order is local only; the remote store keeps records by id.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TaskList {
	tasks: Vec<Task>,
}

/// What a snapshot changed in the local list.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ReconcileReport {
	pub added: Vec<TaskId>,
	pub updated: Vec<TaskId>,
	pub removed: Vec<TaskId>,
}
impl ReconcileReport {
	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
	}
}

impl TaskList {
	pub fn from_tasks(tasks: Vec<Task>) -> Self {
		Self { tasks }
	}

	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Task> {
		self.tasks.iter()
	}

	pub fn get(&self, index: usize) -> Option<&Task> {
		self.tasks.get(index)
	}

	pub fn find(&self, id: &TaskId) -> Option<&Task> {
		self.tasks.iter().find(|task| &task.unique_id == id)
	}

	pub fn position(&self, id: &TaskId) -> Option<usize> {
		self.tasks.iter().position(|task| &task.unique_id == id)
	}

	pub fn push(&mut self, task: Task) {
		self.tasks.push(task);
	}

	/// Flips the done flag, returning the task as it now is.
	pub fn toggle(&mut self, id: &TaskId) -> Option<&Task> {
		let task = self.tasks.iter_mut().find(|task| &task.unique_id == id)?;
		task.done = !task.done;
		Some(task)
	}

	pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
		let index = self.position(id)?;
		Some(self.tasks.remove(index))
	}

	/// Moves the task at `from` so it ends up at `to`, shifting the tasks in between.
	pub fn move_task(&mut self, from: usize, to: usize) -> bool {
		if from >= self.tasks.len() || to >= self.tasks.len() || from == to {
			return false;
		}
		let task = self.tasks.remove(from);
		self.tasks.insert(to, task);
		true
	}

	/// Exchanges content and done between two slots. Each slot keeps its id.
	pub fn swap_payload(&mut self, a: usize, b: usize) -> bool {
		if a >= self.tasks.len() || b >= self.tasks.len() || a == b {
			return false;
		}
		let (low, high) = (a.min(b), a.max(b));
		let (head, tail) = self.tasks.split_at_mut(high);
		let (first, second) = (&mut head[low], &mut tail[0]);
		std::mem::swap(&mut first.content, &mut second.content);
		std::mem::swap(&mut first.done, &mut second.done);
		true
	}

	pub fn clear(&mut self) {
		self.tasks.clear();
	}

	/// Folds a remote snapshot into the list, keeping local order.
	///
	/// Tasks for which `is_pending` holds have local changes the store has not acknowledged yet,
	/// so the snapshot may predate them: they are neither overwritten, removed nor re-added.
	pub fn reconcile(&mut self, remote: Vec<Task>, is_pending: impl Fn(&TaskId) -> bool) -> ReconcileReport {
		let mut report = ReconcileReport::default();
		let mut remote_by_id = BTreeMap::new();
		let mut remote_order = Vec::with_capacity(remote.len());
		for task in remote {
			remote_order.push(task.unique_id.clone());
			remote_by_id.insert(task.unique_id.clone(), task);
		}

		self.tasks.retain_mut(|local| match remote_by_id.remove(&local.unique_id) {
			_ if is_pending(&local.unique_id) => true,
			Some(remote) => {
				if !local.same_payload(&remote) {
					report.updated.push(local.unique_id.clone());
					*local = remote;
				}
				true
			}
			None => {
				report.removed.push(local.unique_id.clone());
				false
			}
		});

		for id in remote_order {
			let Some(task) = remote_by_id.remove(&id) else {
				continue;
			};
			if is_pending(&id) {
				continue;
			}
			report.added.push(id);
			self.tasks.push(task);
		}
		report
	}
}

impl TaskList {
	/// Puts one task back to its saved state: `saved` replaces the local copy,
	/// or the task is dropped when nothing was saved for it.
	pub fn restore(&mut self, id: &TaskId, saved: Option<Task>) -> ReconcileReport {
		let mut report = ReconcileReport::default();
		match (self.position(id), saved) {
			(Some(index), Some(saved)) => {
				if !self.tasks[index].same_payload(&saved) {
					report.updated.push(id.clone());
					self.tasks[index] = saved;
				}
			}
			(Some(index), None) => {
				self.tasks.remove(index);
				report.removed.push(id.clone());
			}
			(None, Some(saved)) => {
				report.added.push(id.clone());
				self.tasks.push(saved);
			}
			(None, None) => {}
		}
		report
	}
}

/// Parses a collection snapshot into tasks in the store's iteration order.
/// Records that fail to parse are logged and skipped.
pub fn tasks_from_snapshot(snapshot: &Snapshot) -> Vec<Task> {
	let Some(records) = snapshot.as_object() else {
		if !snapshot.is_null() {
			log::warn!(target: "sync", "Ignoring snapshot that is not a collection: {snapshot}");
		}
		return Vec::new();
	};
	let mut tasks = Vec::with_capacity(records.len());
	for (key, record) in records {
		match Task::parse_record(key, record) {
			Ok(task) => tasks.push(task),
			Err(err) => log::warn!(target: "sync", "Skipping record: {err}"),
		}
	}
	tasks
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn task(id: &str, content: &str, done: bool) -> Task {
		Task {
			unique_id: TaskId::from(id.to_owned()),
			content: content.into(),
			done,
		}
	}

	fn sample() -> TaskList {
		TaskList::from_tasks(vec![task("a", "one", false), task("b", "two", true), task("c", "three", false)])
	}

	fn ids(list: &TaskList) -> Vec<&str> {
		list.iter().map(|task| task.unique_id.as_str()).collect()
	}

	fn contents(list: &TaskList) -> Vec<&str> {
		list.iter().map(|task| task.content.as_str()).collect()
	}

	fn never(_: &TaskId) -> bool {
		false
	}

	#[test]
	fn toggle_twice_restores_flag() {
		let mut list = sample();
		let id = TaskId::from("b".to_owned());
		assert_eq!(list.toggle(&id).map(|t| t.done), Some(false));
		assert_eq!(list.toggle(&id).map(|t| t.done), Some(true));
		assert_eq!(list, sample());
	}

	#[test]
	fn toggle_unknown_is_none() {
		assert!(sample().toggle(&TaskId::from("zz".to_owned())).is_none());
	}

	#[test]
	fn remove_leaves_others_untouched() {
		let mut list = sample();
		let removed = list.remove(&TaskId::from("b".to_owned())).unwrap();
		assert_eq!(removed.content, "two");
		assert_eq!(ids(&list), ["a", "c"]);
		assert_eq!(contents(&list), ["one", "three"]);
	}

	#[test]
	fn swap_payload_keeps_ids_in_place() {
		let mut list = sample();
		assert!(list.swap_payload(0, 2));
		assert_eq!(ids(&list), ["a", "b", "c"]);
		assert_eq!(contents(&list), ["three", "two", "one"]);
		assert!(!list.get(0).unwrap().done);
	}

	#[test]
	fn swap_payload_moves_done_flag() {
		let mut list = sample();
		assert!(list.swap_payload(1, 0));
		assert!(list.get(0).unwrap().done);
		assert!(!list.get(1).unwrap().done);
	}

	#[test]
	fn move_task_carries_identity() {
		let mut list = sample();
		assert!(list.move_task(0, 2));
		assert_eq!(ids(&list), ["b", "c", "a"]);
		assert_eq!(contents(&list), ["two", "three", "one"]);
		assert!(list.move_task(2, 0));
		assert_eq!(list, sample());
	}

	#[test]
	fn out_of_range_reorders_are_ignored() {
		let mut list = sample();
		assert!(!list.move_task(0, 3));
		assert!(!list.swap_payload(5, 0));
		assert!(!list.move_task(1, 1));
		assert_eq!(list, sample());
	}

	#[test]
	fn reconcile_keeps_local_order_and_applies_changes() {
		let mut list = sample();
		let remote = vec![task("c", "three", true), task("d", "four", false), task("a", "one", false)];
		let report = list.reconcile(remote, never);
		assert_eq!(ids(&list), ["a", "c", "d"]);
		assert!(list.get(1).unwrap().done);
		assert_eq!(report.added, [TaskId::from("d".to_owned())]);
		assert_eq!(report.updated, [TaskId::from("c".to_owned())]);
		assert_eq!(report.removed, [TaskId::from("b".to_owned())]);
	}

	#[test]
	fn reconcile_of_identical_snapshot_is_a_no_op() {
		let mut list = sample();
		let remote = sample().iter().cloned().collect();
		assert!(list.reconcile(remote, never).is_empty());
		assert_eq!(list, sample());
	}

	#[test]
	fn reconcile_preserves_pending_edits() {
		let mut list = sample();
		let pending = |id: &TaskId| matches!(id.as_str(), "b" | "e");
		// "b" has an unacknowledged toggle, "e" has a delete in flight.
		let remote = vec![task("a", "one", false), task("b", "two", false), task("e", "gone", false)];
		let report = list.reconcile(remote, pending);
		assert!(list.find(&TaskId::from("b".to_owned())).unwrap().done);
		assert!(list.find(&TaskId::from("e".to_owned())).is_none());
		assert_eq!(report.removed, [TaskId::from("c".to_owned())]);
		assert!(report.added.is_empty());
	}

	#[test]
	fn reconcile_keeps_unacknowledged_additions() {
		let mut list = sample();
		list.push(task("new", "fresh", false));
		let pending = |id: &TaskId| id.as_str() == "new";
		list.reconcile(sample().iter().cloned().collect(), pending);
		assert_eq!(ids(&list), ["a", "b", "c", "new"]);
	}

	#[test]
	fn snapshot_parsing_skips_bad_records() {
		let snapshot = json!({
			"a": {"uniqueId": "a", "content": "one", "done": false},
			"b": 12,
			"c": {"uniqueId": "c", "content": "three", "done": true},
		});
		let tasks = tasks_from_snapshot(&snapshot);
		assert_eq!(tasks.len(), 2);
		assert_eq!(tasks[1].content, "three");
		assert!(tasks_from_snapshot(&serde_json::Value::Null).is_empty());
	}
}
