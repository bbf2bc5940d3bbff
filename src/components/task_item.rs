use crate::data::{Task, TaskId};
use yew::prelude::*;
use yew_hooks::{use_drag_with_options, UseDragOptions};

static DRAG_FORMAT: &str = "text/plain";

#[derive(Clone, PartialEq, Properties)]
pub struct TaskItemProps {
	pub index: usize,
	pub task: Task,
	pub on_toggle: Callback<TaskId>,
	pub on_delete: Callback<TaskId>,
	pub on_drag_start: Callback<usize>,
	pub on_drag_enter: Callback<usize>,
	pub on_drag_end: Callback<()>,
}

/// One row of the list: a checkbox, the task's text, and a delete button.
/// Rows are native drag sources and drop targets.
#[function_component]
pub fn TaskItem(props: &TaskItemProps) -> Html {
	let node = use_node_ref();
	let drag = use_drag_with_options(
		node.clone(),
		UseDragOptions {
			ondragstart: Some({
				let index = props.index;
				let on_drag_start = props.on_drag_start.clone();
				Box::new(move |e| {
					// Firefox only starts a drag if the transfer carries data.
					if let Some(data_transfer) = e.data_transfer() {
						if let Err(err) = data_transfer.set_data(DRAG_FORMAT, &index.to_string()) {
							log::debug!(target: "app", "could not set drag data for row {index}: {err:?}");
						}
					}
					on_drag_start.emit(index);
				})
			}),
			ondragend: Some({
				let on_drag_end = props.on_drag_end.clone();
				Box::new(move |_| on_drag_end.emit(()))
			}),
			..Default::default()
		},
	);
	let ondragenter = {
		let index = props.index;
		props.on_drag_enter.reform(move |e: DragEvent| {
			e.prevent_default();
			index
		})
	};
	let ondragover = Callback::from(|e: DragEvent| e.prevent_default());
	let onchange = {
		let id = props.task.unique_id.clone();
		props.on_toggle.reform(move |_: Event| id.clone())
	};
	let onclick = {
		let id = props.task.unique_id.clone();
		props.on_delete.reform(move |_: MouseEvent| id.clone())
	};

	let style = match (*drag.dragging, props.task.done) {
		(true, _) => "background-color: #dedede;",
		(_, true) => "text-decoration: line-through; color: #9a9a9a;",
		_ => "",
	};
	html! {
		<li ref={node} class="panel-block" draggable="true" {ondragenter} {ondragover} {style}>
			<label class="checkbox is-flex-grow-1">
				<input type="checkbox" checked={props.task.done} {onchange} />
				<span class="ml-2">{&props.task.content}</span>
			</label>
			<button class="delete" aria-label="delete" {onclick} />
		</li>
	}
}
