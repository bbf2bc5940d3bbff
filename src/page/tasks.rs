use crate::{
	auth::AuthState,
	backend::{Backend, BackendError},
	components::TaskItem,
	config::CONFIG,
	controller::{RemoteOp, TaskListController},
	data::{TaskId, TaskList},
	hooks::{use_action, ActionFuture},
	notify,
	route::Route,
	sync::{self, Request, Settled},
	util::web_ext::CallbackExt,
};
use std::{cell::RefCell, rc::Rc};
use yew::prelude::*;
use yew_router::prelude::*;
use yewdux::prelude::*;

#[function_component]
pub fn Tasks() -> Html {
	let auth = use_store_value::<AuthState>();
	match auth.session() {
		Some(session) => html! {
			<TaskBoard key={session.user_id.clone()} user_id={session.user_id.clone()} />
		},
		None => html! {},
	}
}

/// Edits go to the controller first, the view is refreshed from it, and the
/// remote operations it hands back are queued for the store.
#[derive(Clone)]
struct Board {
	controller: Rc<RefCell<TaskListController>>,
	view: UseStateHandle<TaskList>,
	channel: Option<sync::Channel>,
}

impl Board {
	fn refresh(&self) {
		self.view.set(self.controller.borrow().tasks().clone());
	}

	fn edit(&self, perform: impl FnOnce(&mut TaskListController) -> Vec<RemoteOp>) {
		let ops = perform(&mut *self.controller.borrow_mut());
		self.refresh();
		let Some(channel) = &self.channel else {
			log::error!(target: "sync", "no sync queue, {} remote operations dropped", ops.len());
			return;
		};
		for op in ops {
			let action = describe_op(&op);
			let on_settled = {
				let board = self.clone();
				Callback::from(move |settled: Settled| board.settle(action, settled))
			};
			channel.try_send_req(Request { op, on_settled });
		}
	}

	fn settle(&self, action: &'static str, settled: Settled) {
		match settled.result {
			Ok(_) => self.controller.borrow_mut().acknowledge(&settled.task_id),
			Err(failure) => {
				let report = self.controller.borrow_mut().abandon(&settled.task_id);
				if !report.is_empty() {
					self.refresh();
				}
				notify::alert(&notify::describe(action, &failure));
			}
		}
	}

	fn on_snapshot(&self, snapshot: &serde_json::Value) {
		let report = self.controller.borrow_mut().apply_snapshot(snapshot);
		if !report.is_empty() {
			self.refresh();
		}
	}
}

fn describe_op(op: &RemoteOp) -> &'static str {
	match op {
		RemoteOp::Write { .. } => "save task",
		RemoteOp::Update { .. } => "update task",
		RemoteOp::Delete { .. } => "delete task",
	}
}

#[derive(Clone, PartialEq, Properties)]
struct TaskBoardProps {
	user_id: AttrValue,
}

#[function_component]
fn TaskBoard(props: &TaskBoardProps) -> Html {
	let backend = use_context::<Backend>();
	let status = use_context::<sync::Status>();
	let navigator = use_navigator();
	let board = Board {
		controller: use_memo(props.user_id.clone(), |user_id| {
			RefCell::new(TaskListController::new(user_id.to_string(), CONFIG.reorder_mode))
		}),
		view: use_state_eq(TaskList::default),
		channel: use_context::<sync::Channel>(),
	};
	let draft = use_state(String::new);

	use_effect_with((props.user_id.clone(), backend.clone()), {
		let board = board.clone();
		move |(user_id, backend)| {
			let subscription = backend.as_ref().and_then(|backend| {
				let path = board.controller.borrow().collection();
				let on_snapshot = {
					let board = board.clone();
					Box::new(move |snapshot: serde_json::Value| board.on_snapshot(&snapshot))
				};
				match backend.store.subscribe(&path, on_snapshot) {
					Ok(subscription) => Some(subscription),
					Err(err) => {
						log::error!(target: "sync", "could not watch tasks of {user_id}: {err}");
						notify::alert(&format!("Could not load tasks: {err}"));
						None
					}
				}
			});
			move || {
				drop(subscription);
				board.controller.borrow_mut().clear();
			}
		}
	});

	let logout = use_action({
		let board = board.clone();
		move || -> ActionFuture<BackendError> {
			let backend = backend.clone();
			let navigator = navigator.clone();
			let board = board.clone();
			Box::pin(async move {
				let Some(backend) = backend else {
					return Ok(());
				};
				// Queued edits still need the session to reach the store.
				if let Some(channel) = &board.channel {
					channel.flush().await;
				}
				if let Err(err) = backend.identity.terminate_session().await {
					notify::alert(&err.to_string());
					return Err(err);
				}
				board.controller.borrow_mut().clear();
				board.refresh();
				if let Some(navigator) = &navigator {
					navigator.push(&Route::Login);
				}
				Ok(())
			})
		}
	});

	let on_add = {
		let board = board.clone();
		let draft = draft.clone();
		Callback::from(move |e: SubmitEvent| {
			e.prevent_default();
			board.edit(|controller| controller.add(&draft).into_iter().collect());
			draft.set(String::new());
		})
	};
	let on_draft = {
		let draft = draft.clone();
		Callback::from(move |value: String| draft.set(value)).from_input()
	};
	let on_toggle = {
		let board = board.clone();
		Callback::from(move |id: TaskId| board.edit(|controller| controller.toggle(&id).into_iter().collect()))
	};
	let on_delete = {
		let board = board.clone();
		Callback::from(move |id: TaskId| board.edit(|controller| controller.delete(&id).into_iter().collect()))
	};
	let on_drag_start = {
		let controller = board.controller.clone();
		Callback::from(move |index: usize| controller.borrow_mut().drag_start(index))
	};
	let on_drag_enter = {
		let controller = board.controller.clone();
		Callback::from(move |index: usize| controller.borrow_mut().drag_enter(index))
	};
	let on_drag_end = {
		let board = board.clone();
		Callback::from(move |_: ()| board.edit(|controller| controller.drag_end()))
	};
	let on_logout = {
		let logout = logout.clone();
		Callback::from(move |_: MouseEvent| logout.run())
	};
	let saving = status.as_ref().map(sync::Status::is_active).unwrap_or_default();
	let failed = status.as_ref().map(sync::Status::failed).unwrap_or_default();

	html! {
		<section class="section">
			<nav class="level">
				<div class="level-left">
					<h1 class="title level-item">{"Tasks"}</h1>
					if saving {
						<span class="tag is-info is-light level-item">{"Saving…"}</span>
					}
					if failed > 0 {
						<span class="tag is-danger is-light level-item">{format!("{failed} unsaved")}</span>
					}
				</div>
				<div class="level-right">
					<button class="button is-small level-item" onclick={on_logout} disabled={logout.is_running()}>{"Log Out"}</button>
				</div>
			</nav>
			<form class="field has-addons" onsubmit={on_add}>
				<div class="control is-expanded">
					<input class="input" type="text" placeholder="What needs doing?" value={(*draft).clone()} oninput={on_draft} />
				</div>
				<div class="control">
					<button class="button is-primary" type="submit">{"Add"}</button>
				</div>
			</form>
			<ul class="panel">
				{board.view.iter().enumerate().map(|(index, task)| html! {
					<TaskItem
						key={task.unique_id.to_string()}
						{index}
						task={task.clone()}
						on_toggle={on_toggle.clone()}
						on_delete={on_delete.clone()}
						on_drag_start={on_drag_start.clone()}
						on_drag_enter={on_drag_enter.clone()}
						on_drag_end={on_drag_end.clone()}
					/>
				}).collect::<Html>()}
			</ul>
		</section>
	}
}
