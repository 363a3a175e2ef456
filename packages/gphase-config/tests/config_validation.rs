use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use gphase_config::{Config, DerivedProfile, Error, NormalizerEntry, Property};

const SAMPLE_PROFILES_TOML: &str = include_str!("fixtures/sample_profiles.toml");

fn hybrid_profile_mut(value: &mut Value) -> &mut toml::Table {
	value
		.get_mut("profiles")
		.and_then(Value::as_array_mut)
		.and_then(|profiles| profiles.get_mut(1))
		.and_then(Value::as_table_mut)
		.expect("Fixture must include the hybrid profile.")
}

fn sample_with(edit: impl FnOnce(&mut toml::Table)) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_PROFILES_TOML).expect("Failed to parse fixture config.");

	edit(hybrid_profile_mut(&mut value));

	toml::to_string(&value).expect("Failed to render fixture config.")
}

fn validation_message(raw: &str) -> String {
	match gphase_config::from_toml_str(raw) {
		Err(Error::Validation { message }) => message,
		other => panic!("Expected validation error, got {other:?}."),
	}
}

fn write_temp_config(payload: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock must be after the epoch.")
		.as_nanos();
	let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
	let path = env::temp_dir().join(format!("gphase_config_{nanos}_{seq}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

#[test]
fn loads_sample_profiles_from_disk() {
	let path = write_temp_config(SAMPLE_PROFILES_TOML);
	let cfg: Config = gphase_config::load(&path).expect("Failed to load sample config.");

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert_eq!(cfg.profiles.len(), 2);
	assert!(cfg.profiles[0].global_phase.is_none());

	let hybrid = &cfg.profiles[1];

	assert_eq!(hybrid.functions.len(), 2);
	assert_eq!(hybrid.functions[1].params, vec!["x".to_string()]);
	assert_eq!(hybrid.global_phase.as_ref().and_then(|gp| gp.rerank_count), Some(50));
}

#[test]
fn drops_blank_match_features() {
	let cfg = gphase_config::from_toml_str(SAMPLE_PROFILES_TOML).expect("Failed to parse config.");

	assert_eq!(
		cfg.profiles[1].match_features,
		vec!["bm25(title)".to_string(), "attribute(popularity)".to_string()]
	);
}

#[test]
fn reports_missing_file() {
	let path = env::temp_dir().join("gphase_config_missing_file.toml");

	assert!(matches!(gphase_config::load(&path), Err(Error::ReadConfig { .. })));
}

#[test]
fn rejects_negative_rerank_count() {
	let raw = sample_with(|profile| {
		let global_phase = profile
			.get_mut("global_phase")
			.and_then(Value::as_table_mut)
			.expect("Fixture must include global_phase.");

		global_phase.insert("rerank_count".to_string(), Value::Integer(-1));
	});

	assert!(validation_message(&raw).contains("rerank_count must be zero or greater"));
}

#[test]
fn rejects_duplicate_profile_names() {
	let raw = sample_with(|profile| {
		profile.insert("name".to_string(), Value::String("default".to_string()));
	});

	assert!(validation_message(&raw).contains("declared more than once"));
}

#[test]
fn rejects_reserved_function_name() {
	let raw = sample_with(|profile| {
		let functions = profile
			.get_mut("functions")
			.and_then(Value::as_array_mut)
			.expect("Fixture must include functions.");
		let first = functions[0].as_table_mut().expect("Function must be a table.");

		first.insert("name".to_string(), Value::String("globalphase".to_string()));
	});

	assert!(validation_message(&raw).contains("is reserved"));
}

#[test]
fn rejects_duplicate_params() {
	let raw = sample_with(|profile| {
		let functions = profile
			.get_mut("functions")
			.and_then(Value::as_array_mut)
			.expect("Fixture must include functions.");
		let second = functions[1].as_table_mut().expect("Function must be a table.");

		second.insert(
			"params".to_string(),
			Value::Array(vec![Value::String("x".to_string()), Value::String("x".to_string())]),
		);
	});

	assert!(validation_message(&raw).contains("params must be non-empty and unique"));
}

#[test]
fn rejects_blank_global_phase_expression() {
	let raw = sample_with(|profile| {
		let global_phase = profile
			.get_mut("global_phase")
			.and_then(Value::as_table_mut)
			.expect("Fixture must include global_phase.");

		global_phase.insert("expression".to_string(), Value::String("  ".to_string()));
	});

	assert!(validation_message(&raw).contains("global_phase.expression must be non-empty"));
}

#[test]
fn rejects_empty_profile_list() {
	assert!(matches!(
		gphase_config::from_toml_str("profiles = []"),
		Err(Error::Validation { .. })
	));
}

#[test]
fn derived_profile_reads_properties_by_exact_key() {
	let profile = DerivedProfile {
		name: "p".to_string(),
		normalizers: Vec::new(),
		properties: vec![
			Property::new("hidden.matchfeature", "a"),
			Property::new("hidden.matchfeature.extra", "ignored"),
			Property::new("hidden.matchfeature", "b"),
		],
	};

	assert_eq!(profile.property("hidden.matchfeature"), Some("a"));
	assert_eq!(profile.property_values("hidden.matchfeature").collect::<Vec<_>>(), vec!["a", "b"]);
	assert_eq!(profile.property("globalphase.rerankcount"), None);
}

#[test]
fn normalizer_entry_defaults_kparam() {
	let entry: NormalizerEntry = serde_json::from_value(serde_json::json!({
		"name": "normalize@1@rrank",
		"input": "bm25(title)",
		"algo": "RRANK",
	}))
	.expect("Failed to decode normalizer entry.");

	assert_eq!(entry.kparam, 60.0);
}
