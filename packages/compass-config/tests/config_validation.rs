use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use compass_config::Config;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn set(value: &mut Value, path: &[&str], new_value: Value) {
	let mut current = value;

	for key in &path[..path.len() - 1] {
		current = current
			.as_table_mut()
			.and_then(|table| table.get_mut(*key))
			.unwrap_or_else(|| panic!("Sample config must include {key}."));
	}

	current
		.as_table_mut()
		.expect("Sample config sections must be tables.")
		.insert(path[path.len() - 1].to_string(), new_value);
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("compass_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_mutated(mutate: impl FnOnce(&mut Value)) -> compass_config::Result<Config> {
	let mut value = sample_value();

	mutate(&mut value);

	let payload = toml::to_string(&value).expect("Failed to render test config.");
	let path = write_temp_config(payload);
	let result = compass_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation_error(mutate: impl FnOnce(&mut Value), needle: &str) {
	let err = load_mutated(mutate).expect_err("Expected a validation error.");
	let message = err.to_string();

	assert!(message.contains(needle), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads() {
	let cfg = load_mutated(|_| {}).expect("Sample config must validate.");

	assert_eq!(cfg.storage.qdrant.vector_dim, 1_536);
	assert_eq!(cfg.chat.history_window, 6);
	assert_eq!(cfg.profile.aggregation, "mean");
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	expect_validation_error(
		|value| set(value, &["providers", "embedding", "dimensions"], Value::Integer(768)),
		"must match storage.qdrant.vector_dim",
	);
}

#[test]
fn aggregation_policy_must_be_known() {
	expect_validation_error(
		|value| set(value, &["profile", "aggregation"], Value::String("median".to_string())),
		"profile.aggregation must be one of",
	);
}

#[test]
fn collections_must_differ() {
	expect_validation_error(
		|value| {
			set(
				value,
				&["storage", "qdrant", "profile_collection"],
				Value::String("compass_notes".to_string()),
			)
		},
		"must differ",
	);
}

#[test]
fn candidate_pool_must_cover_note_limit() {
	expect_validation_error(
		|value| set(value, &["chat", "candidate_pool"], Value::Integer(2)),
		"chat.candidate_pool must be at least chat.note_limit",
	);
}

#[test]
fn provider_keys_must_be_non_empty() {
	expect_validation_error(
		|value| set(value, &["providers", "chat", "api_key"], Value::String("  ".to_string())),
		"Provider chat api_key must be non-empty",
	);
}

#[test]
fn blank_catalog_key_normalizes_to_none() {
	let cfg = load_mutated(|value| {
		set(value, &["providers", "catalog", "api_key"], Value::String("  ".to_string()))
	})
	.expect("Blank catalog key must be accepted.");

	assert!(cfg.providers.catalog.api_key.is_none());
}

#[test]
fn peer_limits_are_checked_only_when_enabled() {
	let cfg = load_mutated(|value| {
		set(value, &["chat", "include_peer_notes"], Value::Boolean(false));
		set(value, &["chat", "peer_limit"], Value::Integer(0));
	})
	.expect("Peer limits must be ignored when peer notes are off.");

	assert!(!cfg.chat.include_peer_notes);

	expect_validation_error(
		|value| {
			set(value, &["chat", "include_peer_notes"], Value::Boolean(true));
			set(value, &["chat", "peer_limit"], Value::Integer(0));
		},
		"chat.peer_limit must be greater than zero",
	);
}
