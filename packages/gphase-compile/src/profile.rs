use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
	Error, Result,
	expander::{DEFAULT_K, FunctionExpander, NormalizerDeclaration},
};
use gphase_config::{
	Config, DerivedProfile, GLOBAL_PHASE_FUNCTION, GLOBAL_PHASE_PROPERTY,
	HIDDEN_MATCH_FEATURE_PROPERTY, MATCH_FEATURE_PROPERTY, NormalizerEntry, Property,
	RERANK_COUNT_PROPERTY, RankProfile,
};
use gphase_expr::{Function, FunctionBody, inline_functions, query_feature_argument};

/// A rank profile after expansion and inlining.
#[derive(Clone, Debug)]
pub struct CompiledProfile {
	pub derived: DerivedProfile,
	/// Zero-parameter declared functions plus the global-phase function, fully inlined.
	pub functions: BTreeMap<String, Function>,
}
impl CompiledProfile {
	pub fn name(&self) -> &str {
		&self.derived.name
	}
}

pub fn compile(cfg: &Config) -> Result<Vec<CompiledProfile>> {
	cfg.profiles
		.iter()
		.map(|profile| {
			compile_profile(profile).map_err(|err| Error::Profile {
				profile: profile.name.clone(),
				source: Box::new(err),
			})
		})
		.collect()
}

pub fn compile_profile(profile: &RankProfile) -> Result<CompiledProfile> {
	let mut declared = HashMap::new();

	for function in &profile.functions {
		declared.insert(
			function.name.clone(),
			FunctionBody {
				params: function.params.clone(),
				body: gphase_expr::parse(&function.expression)?,
			},
		);
	}

	let mut expander = FunctionExpander::new(&declared);
	let mut expanded = HashMap::new();

	for function in &profile.functions {
		let Some(parsed) = declared.get(&function.name) else {
			continue;
		};
		let body = expander.transform(parsed.body.clone())?;

		expanded.insert(
			function.name.clone(),
			FunctionBody { params: parsed.params.clone(), body },
		);
	}

	let global_phase = profile
		.global_phase
		.as_ref()
		.map(|global_phase| -> Result<_> {
			let parsed = gphase_expr::parse(&global_phase.expression)?;

			Ok((expander.transform(parsed)?, global_phase.rerank_count))
		})
		.transpose()?;
	let normalizers = expander.into_normalizers();
	let mut functions = BTreeMap::new();

	for function in &profile.functions {
		let Some(body) = expanded.get(&function.name) else {
			continue;
		};
		// Functions with parameters are inlined only to surface cycles and arity errors.
		let inlined = inline_functions(body.body.clone(), &expanded)?;

		if body.params.is_empty() {
			functions.insert(function.name.clone(), Function::new(&function.name, inlined));
		}
	}

	let mut properties = Vec::new();
	let mut match_features = profile.match_features.clone();

	if let Some((body, rerank_count)) = global_phase {
		let global = Function::new(GLOBAL_PHASE_FUNCTION, inline_functions(body, &expanded)?);
		let hidden = hidden_match_features(profile, &global, &functions, &normalizers);

		properties.push(Property::new(GLOBAL_PHASE_PROPERTY, GLOBAL_PHASE_FUNCTION));

		if let Some(rerank_count) = rerank_count {
			properties.push(Property::new(RERANK_COUNT_PROPERTY, rerank_count.to_string()));
		}

		for name in &hidden {
			properties.push(Property::new(HIDDEN_MATCH_FEATURE_PROPERTY, name.as_str()));
		}

		match_features.extend(hidden);
		functions.insert(GLOBAL_PHASE_FUNCTION.to_string(), global);
	}

	for name in match_features {
		properties.push(Property::new(MATCH_FEATURE_PROPERTY, name));
	}

	let derived = DerivedProfile {
		name: profile.name.clone(),
		normalizers: normalizers.into_iter().map(normalizer_entry).collect(),
		properties,
	};

	tracing::debug!(
		profile = %derived.name,
		functions = functions.len(),
		normalizers = derived.normalizers.len(),
		"Compiled rank profile."
	);

	Ok(CompiledProfile { derived, functions })
}

/// Inputs the global phase needs from the match layer that the user did not ask to see.
fn hidden_match_features(
	profile: &RankProfile,
	global: &Function,
	functions: &BTreeMap<String, Function>,
	normalizers: &[NormalizerDeclaration],
) -> Vec<String> {
	let normalizer_names: HashSet<&str> =
		normalizers.iter().map(|normalizer| normalizer.name.as_str()).collect();
	let shown: HashSet<&str> = profile.match_features.iter().map(String::as_str).collect();
	let mut seen = HashSet::new();
	let mut out = Vec::new();
	let mut needed: Vec<&str> = global.arguments().iter().map(String::as_str).collect();
	let referenced: HashSet<&str> = needed.iter().copied().collect();

	// Only normalizers the global phase binds; others come from uncalled declared functions.
	for normalizer in
		normalizers.iter().filter(|normalizer| referenced.contains(normalizer.name.as_str()))
	{
		match functions.get(&normalizer.input) {
			Some(function) => needed.extend(function.arguments().iter().map(String::as_str)),
			None => needed.push(normalizer.input.as_str()),
		}
	}

	for name in needed {
		if query_feature_argument(name).is_some()
			|| normalizer_names.contains(name)
			|| shown.contains(name)
		{
			continue;
		}
		if seen.insert(name) {
			out.push(name.to_string());
		}
	}

	out
}

fn normalizer_entry(declaration: NormalizerDeclaration) -> NormalizerEntry {
	NormalizerEntry {
		name: declaration.name,
		input: declaration.input,
		algo: declaration.algorithm.tag().to_string(),
		kparam: declaration.k_param.unwrap_or(DEFAULT_K),
	}
}
