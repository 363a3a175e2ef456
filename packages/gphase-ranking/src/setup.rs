use std::{
	collections::{BTreeSet, HashMap},
	fmt::{Debug, Formatter, Result as FmtResult},
};

use crate::{
	Error, Result,
	classify::classify_inputs,
	evaluator::{Evaluator, EvaluatorFactory, EvaluatorSource, InputEvaluator},
	normalizer::{NormalizerFactory, NormalizerKind},
};
use gphase_config::{
	DerivedProfile, GLOBAL_PHASE_PROPERTY, HIDDEN_MATCH_FEATURE_PROPERTY, LINEAR_ALGORITHM,
	NormalizerEntry, RERANK_COUNT_PROPERTY, RRANK_ALGORITHM,
};

pub const DEFAULT_RERANK_COUNT: usize = 100;

/// An evaluator factory together with where each of its inputs is bound from.
#[derive(Clone)]
pub struct FunEvalCtx {
	pub evaluator_factory: EvaluatorFactory,
	/// Query parameter names; bound as `query(<name>)`.
	pub query_inputs: Vec<String>,
	pub match_feature_inputs: Vec<String>,
}
impl FunEvalCtx {
	pub fn evaluator(&self) -> Box<dyn Evaluator> {
		(self.evaluator_factory)()
	}
}
impl Debug for FunEvalCtx {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("FunEvalCtx")
			.field("query_inputs", &self.query_inputs)
			.field("match_feature_inputs", &self.match_feature_inputs)
			.finish_non_exhaustive()
	}
}

#[derive(Clone, Debug)]
pub struct NormalizerSetup {
	pub name: String,
	pub factory: NormalizerFactory,
	pub input_eval: FunEvalCtx,
}

/// Everything needed to rescore the top hits of one rank profile. Built once, shared read-only.
#[derive(Clone, Debug)]
pub struct GlobalPhaseSetup {
	pub global_eval: FunEvalCtx,
	pub rerank_count: usize,
	pub match_features_to_hide: BTreeSet<String>,
	/// In the input order of the global-phase function.
	pub normalizers: Vec<NormalizerSetup>,
}
impl GlobalPhaseSetup {
	/// Returns `None` when the profile does not configure a global phase.
	pub fn maybe_make_setup(
		profile: &DerivedProfile,
		source: &dyn EvaluatorSource,
	) -> Result<Option<Self>> {
		let available: HashMap<&str, &NormalizerEntry> =
			profile.normalizers.iter().map(|entry| (entry.name.as_str(), entry)).collect();
		let mut function_name = None;
		let mut rerank_count = None;
		let mut match_features_to_hide = BTreeSet::new();

		for property in &profile.properties {
			match property.name.as_str() {
				GLOBAL_PHASE_PROPERTY => function_name = Some(property.value.as_str()),
				RERANK_COUNT_PROPERTY => {
					let count = property.value.trim().parse::<i32>().map_err(|_| Error::Config {
						message: format!(
							"{RERANK_COUNT_PROPERTY} must be an integer in profile {:?}, got {:?}.",
							profile.name, property.value
						),
					})?;

					rerank_count = Some(count);
				},
				HIDDEN_MATCH_FEATURE_PROPERTY => {
					match_features_to_hide.insert(property.value.clone());
				},
				_ => {},
			}
		}

		let Some(function_name) = function_name else {
			return Ok(None);
		};
		let evaluator_factory =
			source.supplier(&profile.name, function_name).ok_or_else(|| Error::Config {
				message: format!(
					"Global-phase function {function_name:?} is not available in profile {:?}.",
					profile.name
				),
			})?;
		let rerank_count = rerank_count
			.and_then(|count| usize::try_from(count).ok())
			.unwrap_or(DEFAULT_RERANK_COUNT);
		let inputs = evaluator_factory().all_inputs().to_vec();
		let classified = classify_inputs(inputs.iter().map(String::as_str), |name| {
			available.contains_key(name)
		});

		for name in &classified.match_features {
			if name.starts_with("normalize@") {
				tracing::warn!(
					profile = %profile.name,
					input = %name,
					"Input looks like a normalizer but none is declared; binding it from match features."
				);
			}
		}

		let mut normalizers = Vec::with_capacity(classified.normalizers.len());

		for name in &classified.normalizers {
			if let Some(entry) = available.get(name.as_str()) {
				normalizers.push(make_normalizer_setup(entry, &profile.name, source, rerank_count)?);
			}
		}

		tracing::debug!(
			profile = %profile.name,
			rerank_count,
			normalizers = normalizers.len(),
			hidden = match_features_to_hide.len(),
			"Built global-phase setup."
		);

		Ok(Some(Self {
			global_eval: FunEvalCtx {
				evaluator_factory,
				query_inputs: classified.query,
				match_feature_inputs: classified.match_features,
			},
			rerank_count,
			match_features_to_hide,
			normalizers,
		}))
	}
}

fn make_normalizer_setup(
	entry: &NormalizerEntry,
	profile: &str,
	source: &dyn EvaluatorSource,
	rerank_count: usize,
) -> Result<NormalizerSetup> {
	let kind = match entry.algo.as_str() {
		LINEAR_ALGORITHM => NormalizerKind::Linear,
		RRANK_ALGORITHM => NormalizerKind::ReciprocalRank { k: entry.kparam },
		other => {
			return Err(Error::Config {
				message: format!(
					"Unknown normalizer algorithm {other:?} for normalizer {:?}.",
					entry.name
				),
			});
		},
	};
	let evaluator_factory = source
		.supplier(profile, &entry.input)
		.unwrap_or_else(|| InputEvaluator::factory(entry.input.clone()));
	let inputs = evaluator_factory().all_inputs().to_vec();
	// Normalizer inputs never reference other normalizers.
	let classified = classify_inputs(inputs.iter().map(String::as_str), |_| false);

	Ok(NormalizerSetup {
		name: entry.name.clone(),
		factory: NormalizerFactory {
			name: entry.name.clone(),
			kind,
			capacity: rerank_count,
		},
		input_eval: FunEvalCtx {
			evaluator_factory,
			query_inputs: classified.query,
			match_feature_inputs: classified.match_features,
		},
	})
}
