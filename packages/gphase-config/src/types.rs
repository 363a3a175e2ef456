use serde::{Deserialize, Serialize};

/// Property naming the compiled function evaluated in the global phase.
pub const GLOBAL_PHASE_PROPERTY: &str = "rank.globalphase";
/// Property holding the number of top hits rescored in the global phase.
pub const RERANK_COUNT_PROPERTY: &str = "globalphase.rerankcount";
/// Property listing one match feature that must not be shown to users.
pub const HIDDEN_MATCH_FEATURE_PROPERTY: &str = "hidden.matchfeature";
/// Property listing one match feature the retrieval layer must produce per hit.
pub const MATCH_FEATURE_PROPERTY: &str = "rank.matchfeature";
/// Name under which the compiled global-phase function is registered.
pub const GLOBAL_PHASE_FUNCTION: &str = "globalphase";

pub const LINEAR_ALGORITHM: &str = "LINEAR";
pub const RRANK_ALGORITHM: &str = "RRANK";

#[derive(Debug, Deserialize)]
pub struct Config {
	pub profiles: Vec<RankProfile>,
}

#[derive(Debug, Deserialize)]
pub struct RankProfile {
	pub name: String,
	/// Match features the user asked to see on each hit.
	#[serde(default)]
	pub match_features: Vec<String>,
	#[serde(default)]
	pub functions: Vec<FunctionConfig>,
	pub global_phase: Option<GlobalPhase>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionConfig {
	pub name: String,
	#[serde(default)]
	pub params: Vec<String>,
	pub expression: String,
}

#[derive(Debug, Deserialize)]
pub struct GlobalPhase {
	pub expression: String,
	pub rerank_count: Option<i32>,
}

/// Rank-profile config derived at compile time and read when queries are served.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DerivedProfile {
	pub name: String,
	#[serde(default)]
	pub normalizers: Vec<NormalizerEntry>,
	#[serde(default)]
	pub properties: Vec<Property>,
}
impl DerivedProfile {
	pub fn property(&self, name: &str) -> Option<&str> {
		self.properties.iter().find(|prop| prop.name == name).map(|prop| prop.value.as_str())
	}

	pub fn property_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.properties.iter().filter(move |prop| prop.name == name).map(|prop| prop.value.as_str())
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NormalizerEntry {
	pub name: String,
	pub input: String,
	pub algo: String,
	#[serde(default = "default_kparam")]
	pub kparam: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Property {
	pub name: String,
	pub value: String,
}
impl Property {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into() }
	}
}

fn default_kparam() -> f64 {
	60.0
}
