use std::sync::OnceLock;

use regex::Regex;

/// Returns `x` when `name` is the simple query feature `query(x)`.
pub fn query_feature_argument(name: &str) -> Option<String> {
	static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

	let pattern = PATTERN
		.get_or_init(|| Regex::new(r"^query\(\s*([A-Za-z_$][A-Za-z0-9_$@.\-]*)\s*\)$").ok())
		.as_ref()?;

	pattern.captures(name).and_then(|caps| caps.get(1)).map(|arg| arg.as_str().to_string())
}
