mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, DerivedProfile, FunctionConfig, GLOBAL_PHASE_FUNCTION, GLOBAL_PHASE_PROPERTY,
	GlobalPhase, HIDDEN_MATCH_FEATURE_PROPERTY, LINEAR_ALGORITHM, MATCH_FEATURE_PROPERTY,
	NormalizerEntry, Property, RERANK_COUNT_PROPERTY, RRANK_ALGORITHM, RankProfile,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	finish(cfg)
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	let cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseInline { source: err })?;

	finish(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.profiles.is_empty() {
		return Err(Error::Validation { message: "profiles must be non-empty.".to_string() });
	}

	let mut profile_names = HashSet::new();

	for profile in &cfg.profiles {
		if profile.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "profiles.name must be non-empty.".to_string(),
			});
		}
		if !profile_names.insert(profile.name.as_str()) {
			return Err(Error::Validation {
				message: format!("profiles.name {:?} is declared more than once.", profile.name),
			});
		}

		validate_functions(&profile.name, &profile.functions)?;

		if let Some(global_phase) = profile.global_phase.as_ref() {
			if global_phase.expression.trim().is_empty() {
				return Err(Error::Validation {
					message: format!(
						"profiles.global_phase.expression must be non-empty in profile {:?}.",
						profile.name
					),
				});
			}

			if let Some(rerank_count) = global_phase.rerank_count
				&& rerank_count < 0
			{
				return Err(Error::Validation {
					message: format!(
						"profiles.global_phase.rerank_count must be zero or greater in profile {:?}.",
						profile.name
					),
				});
			}
		}
	}

	Ok(())
}

fn validate_functions(profile: &str, functions: &[FunctionConfig]) -> Result<()> {
	let mut names = HashSet::new();

	for function in functions {
		let name = function.name.as_str();

		if name.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("profiles.functions.name must be non-empty in profile {profile:?}."),
			});
		}
		if name == GLOBAL_PHASE_FUNCTION {
			return Err(Error::Validation {
				message: format!(
					"profiles.functions.name {name:?} is reserved in profile {profile:?}."
				),
			});
		}
		if !names.insert(name) {
			return Err(Error::Validation {
				message: format!(
					"profiles.functions.name {name:?} is declared more than once in profile {profile:?}."
				),
			});
		}
		if function.expression.trim().is_empty() {
			return Err(Error::Validation {
				message: format!(
					"profiles.functions.expression must be non-empty for function {name:?}."
				),
			});
		}

		let mut params = HashSet::new();

		for param in &function.params {
			if param.trim().is_empty() || !params.insert(param.as_str()) {
				return Err(Error::Validation {
					message: format!(
						"profiles.functions.params must be non-empty and unique for function {name:?}."
					),
				});
			}
		}
	}

	Ok(())
}

fn finish(mut cfg: Config) -> Result<Config> {
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	for profile in &mut cfg.profiles {
		profile.name = profile.name.trim().to_string();
		profile.match_features = profile
			.match_features
			.iter()
			.map(|feature| feature.trim())
			.filter(|feature| !feature.is_empty())
			.map(str::to_string)
			.collect();

		for function in &mut profile.functions {
			function.name = function.name.trim().to_string();
		}
	}
}
