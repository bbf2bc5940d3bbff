//! Path addressed edits on a JSON document, with the remote store's rules:
//! writing `null` deletes, and emptied objects disappear.
use serde_json::{Map, Value};

pub fn get<'a, 'p>(root: &'a Value, path: impl IntoIterator<Item = &'p str>) -> Option<&'a Value> {
	let mut node = root;
	for segment in path {
		node = node.as_object()?.get(segment)?;
	}
	Some(node)
}

/// Replaces the value at `path`, creating intermediate objects as needed.
pub fn set<'p>(root: &mut Value, path: impl IntoIterator<Item = &'p str>, value: Value) {
	let path = path.into_iter().collect::<Vec<_>>();
	set_at(root, &path, value);
}

fn set_at(node: &mut Value, path: &[&str], value: Value) {
	let Some((segment, rest)) = path.split_first() else {
		*node = value;
		return;
	};
	if !node.is_object() {
		if value.is_null() {
			return;
		}
		*node = Value::Object(Map::new());
	}
	let Value::Object(children) = node else {
		return;
	};
	match rest.is_empty() {
		true if value.is_null() => {
			children.remove(*segment);
		}
		true => {
			children.insert(segment.to_string(), value);
		}
		false => {
			let child = children.entry(segment.to_string()).or_insert(Value::Null);
			set_at(child, rest, value);
			if is_empty(child) {
				children.remove(*segment);
			}
		}
	}
}

/// Writes each entry of `fields` beneath `path`, leaving siblings untouched.
pub fn merge<'p>(root: &mut Value, path: impl IntoIterator<Item = &'p str>, fields: Map<String, Value>) {
	let path = path.into_iter().collect::<Vec<_>>();
	for (key, value) in fields {
		let mut child_path = path.clone();
		child_path.extend(key.split('/').filter(|segment| !segment.is_empty()));
		set_at(root, &child_path, value);
	}
}

fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Object(children) => children.is_empty(),
		_ => false,
	}
}
