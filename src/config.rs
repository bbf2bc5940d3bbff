//! Build-time configuration. Values come from environment variables present
//! when the app is compiled, so the browser bundle needs no config file.
use lazy_static::lazy_static;
use std::{str::FromStr, time::Duration};

lazy_static! {
	pub static ref CONFIG: Config = Config::from_lookup(|key| match key {
		"TASKLIST_FIREBASE_API_KEY" => option_env!("TASKLIST_FIREBASE_API_KEY"),
		"TASKLIST_FIREBASE_DATABASE_URL" => option_env!("TASKLIST_FIREBASE_DATABASE_URL"),
		"TASKLIST_LOG_LEVEL" => option_env!("TASKLIST_LOG_LEVEL"),
		"TASKLIST_REORDER_MODE" => option_env!("TASKLIST_REORDER_MODE"),
		"TASKLIST_RETRY_ATTEMPTS" => option_env!("TASKLIST_RETRY_ATTEMPTS"),
		"TASKLIST_RETRY_DELAY_MS" => option_env!("TASKLIST_RETRY_DELAY_MS"),
		"TASKLIST_RETRY_MAX_DELAY_MS" => option_env!("TASKLIST_RETRY_MAX_DELAY_MS"),
		_ => None,
	});
}

#[derive(Clone, Debug, PartialEq)]
pub struct FirebaseConfig {
	pub api_key: String,
	pub database_url: url::Url,
}

/// How a drag from one row onto another rearranges the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReorderMode {
	/// The dragged task is taken out and inserted at the drop position.
	#[default]
	Move,
	/// The two rows trade content and done state; ids stay where they were.
	SwapPayload,
}
impl FromStr for ReorderMode {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"move" => Ok(Self::Move),
			"swap" | "swap_payload" => Ok(Self::SwapPayload),
			other => Err(format!("unknown reorder mode {other:?}")),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
	/// `None` runs against the in-memory backend.
	pub firebase: Option<FirebaseConfig>,
	pub log_level: log::Level,
	pub reorder_mode: ReorderMode,
	pub retry: crate::retry::RetryPolicy,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			firebase: None,
			log_level: log::Level::Info,
			reorder_mode: ReorderMode::default(),
			retry: crate::retry::RetryPolicy::default(),
		}
	}
}

impl Config {
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<&'static str>) -> Self {
		let mut config = Self::default();
		config.firebase = firebase(&lookup);
		parse_into(&lookup, "TASKLIST_LOG_LEVEL", &mut config.log_level);
		parse_into(&lookup, "TASKLIST_REORDER_MODE", &mut config.reorder_mode);
		parse_into(&lookup, "TASKLIST_RETRY_ATTEMPTS", &mut config.retry.max_attempts);
		let mut millis = None;
		parse_into(&lookup, "TASKLIST_RETRY_DELAY_MS", &mut millis);
		if let Some(millis) = millis {
			config.retry.initial_delay = Duration::from_millis(millis);
		}
		let mut millis = None;
		parse_into(&lookup, "TASKLIST_RETRY_MAX_DELAY_MS", &mut millis);
		if let Some(millis) = millis {
			config.retry.max_delay = Duration::from_millis(millis);
		}
		config
	}
}

fn firebase(lookup: &impl Fn(&str) -> Option<&'static str>) -> Option<FirebaseConfig> {
	let api_key = lookup("TASKLIST_FIREBASE_API_KEY").filter(|key| !key.is_empty());
	let database_url = lookup("TASKLIST_FIREBASE_DATABASE_URL").filter(|url| !url.is_empty());
	let (api_key, database_url) = match (api_key, database_url) {
		(Some(api_key), Some(database_url)) => (api_key, database_url),
		(None, None) => return None,
		_ => {
			log::warn!("Firebase needs both an api key and a database url; ignoring partial configuration");
			return None;
		}
	};
	match url::Url::parse(database_url) {
		Ok(database_url) => Some(FirebaseConfig {
			api_key: api_key.to_owned(),
			database_url,
		}),
		Err(err) => {
			log::warn!("Invalid firebase database url {database_url:?}: {err}");
			None
		}
	}
}

/// Overwrites `target` when `key` is set and parses; anything else keeps the default.
fn parse_into<T>(lookup: &impl Fn(&str) -> Option<&'static str>, key: &str, target: &mut T)
where
	T: ParseValue,
{
	let Some(raw) = lookup(key) else {
		return;
	};
	match T::parse_value(raw) {
		Ok(value) => *target = value,
		Err(err) => log::warn!("Ignoring {key}={raw:?}: {err}"),
	}
}

trait ParseValue: Sized {
	fn parse_value(raw: &str) -> Result<Self, String>;
}
impl ParseValue for log::Level {
	fn parse_value(raw: &str) -> Result<Self, String> {
		raw.trim().parse().map_err(|_| "expected error, warn, info, debug or trace".to_owned())
	}
}
impl ParseValue for ReorderMode {
	fn parse_value(raw: &str) -> Result<Self, String> {
		raw.parse()
	}
}
impl ParseValue for u32 {
	fn parse_value(raw: &str) -> Result<Self, String> {
		match raw.trim().parse::<u32>().map_err(|err| err.to_string())? {
			0 => Err("must be at least 1".to_owned()),
			value => Ok(value),
		}
	}
}
impl ParseValue for Option<u64> {
	fn parse_value(raw: &str) -> Result<Self, String> {
		raw.trim().parse().map(Some).map_err(|err: std::num::ParseIntError| err.to_string())
	}
}
