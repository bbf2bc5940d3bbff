use crate::retry::SyncFailure;

/// Blocking browser alert, used for errors the user has to acknowledge.
pub fn alert(message: &str) {
	if let Err(err) = gloo_utils::window().alert_with_message(message) {
		log::error!(target: "app", "Failed to show alert {message:?}: {err:?}");
	}
}

/// How a failed remote edit is worded to the user.
pub fn describe(action: &str, failure: &SyncFailure) -> String {
	match failure {
		SyncFailure::Rejected(err) => format!("Could not {action}: {err}"),
		SyncFailure::Exhausted { attempts, last } => {
			format!("Could not {action} after {attempts} attempts ({last}). The task was put back as last saved.")
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::BackendError;

	#[test]
	fn rejections_quote_the_service() {
		let failure = SyncFailure::Rejected(BackendError::rejected("Permission denied"));
		assert_eq!(describe("save task", &failure), "Could not save task: Permission denied");
	}

	#[test]
	fn exhausted_retries_mention_attempts() {
		let failure = SyncFailure::Exhausted {
			attempts: 4,
			last: BackendError::Unavailable { status: 503 },
		};
		let text = describe("delete task", &failure);
		assert!(text.starts_with("Could not delete task after 4 attempts"));
		assert!(text.contains("503"));
	}
}
