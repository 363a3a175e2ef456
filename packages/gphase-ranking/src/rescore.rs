use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
	Result,
	evaluator::Evaluator,
	normalizer::descending,
	setup::{FunEvalCtx, GlobalPhaseSetup},
};

/// Scalar lookup by name: query parameters or per-hit match features.
pub trait FeatureLookup {
	fn feature(&self, name: &str) -> Option<f64>;
}
impl FeatureLookup for HashMap<String, f64> {
	fn feature(&self, name: &str) -> Option<f64> {
		self.get(name).copied()
	}
}
impl FeatureLookup for BTreeMap<String, f64> {
	fn feature(&self, name: &str) -> Option<f64> {
		self.get(name).copied()
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Hit {
	pub id: String,
	pub relevance: f64,
	#[serde(default)]
	pub match_features: BTreeMap<String, f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RescoreReport {
	pub rescored: usize,
	pub normalizers: usize,
}

/// Rescores the first `rerank_count` hits and re-sorts them by the new score.
///
/// Hits past the window keep their scores and positions. On error no hit is modified.
pub fn rescore(
	setup: &GlobalPhaseSetup,
	query: &dyn FeatureLookup,
	hits: &mut [Hit],
) -> Result<RescoreReport> {
	let window = setup.rerank_count.min(hits.len());

	if window == 0 {
		return Ok(RescoreReport { rescored: 0, normalizers: 0 });
	}

	let scored = &hits[..window];
	let mut normalized = Vec::with_capacity(setup.normalizers.len());

	for normalizer in &setup.normalizers {
		let mut instance = normalizer.factory.create();
		let mut evaluator = normalizer.input_eval.evaluator();

		bind_query_inputs(evaluator.as_mut(), &normalizer.input_eval, query);

		for hit in scored {
			bind_match_features(evaluator.as_mut(), &normalizer.input_eval, hit);
			instance.add_input(evaluator.evaluate_score()?)?;
		}

		instance.normalize()?;
		normalized.push(instance);
	}

	let mut evaluator = setup.global_eval.evaluator();
	let mut scores = Vec::with_capacity(window);

	bind_query_inputs(evaluator.as_mut(), &setup.global_eval, query);

	for (index, hit) in scored.iter().enumerate() {
		bind_match_features(evaluator.as_mut(), &setup.global_eval, hit);

		for instance in &normalized {
			let value = instance.get_output(index)?;

			evaluator.bind(instance.name(), Some(value));
		}

		scores.push(evaluator.evaluate_score()?);
	}

	let window_hits = &mut hits[..window];

	for (hit, score) in window_hits.iter_mut().zip(scores) {
		hit.relevance = score;
	}

	window_hits.sort_by(|a, b| descending(a.relevance, b.relevance));

	tracing::debug!(
		rescored = window,
		normalizers = normalized.len(),
		"Rescored global-phase window."
	);

	Ok(RescoreReport { rescored: window, normalizers: normalized.len() })
}

/// Removes the match features the setup needs internally but the user did not ask for.
pub fn hide_match_features(setup: &GlobalPhaseSetup, hits: &mut [Hit]) {
	if setup.match_features_to_hide.is_empty() {
		return;
	}

	for hit in hits {
		hit.match_features.retain(|name, _| !setup.match_features_to_hide.contains(name));
	}
}

fn bind_query_inputs(evaluator: &mut dyn Evaluator, ctx: &FunEvalCtx, query: &dyn FeatureLookup) {
	for name in &ctx.query_inputs {
		evaluator.bind(&format!("query({name})"), query.feature(name));
	}
}

fn bind_match_features(evaluator: &mut dyn Evaluator, ctx: &FunEvalCtx, hit: &Hit) {
	for name in &ctx.match_feature_inputs {
		evaluator.bind(name, hit.match_features.feature(name));
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use super::*;
	use crate::{
		Error,
		evaluator::FunctionEvaluator,
		normalizer::{NormalizerFactory, NormalizerKind},
		setup::NormalizerSetup,
	};
	use gphase_expr::Function;

	fn ctx(source: &str, query_inputs: &[&str], match_feature_inputs: &[&str]) -> FunEvalCtx {
		let body = gphase_expr::parse(source).expect("Failed to parse expression.");
		let function = Function::new("f", body);

		FunEvalCtx {
			evaluator_factory: FunctionEvaluator::factory(function.into()),
			query_inputs: query_inputs.iter().map(ToString::to_string).collect(),
			match_feature_inputs: match_feature_inputs.iter().map(ToString::to_string).collect(),
		}
	}

	fn hit(id: &str, relevance: f64, features: &[(&str, f64)]) -> Hit {
		Hit {
			id: id.to_string(),
			relevance,
			match_features: features.iter().map(|(name, value)| (name.to_string(), *value)).collect(),
		}
	}

	fn ids(hits: &[Hit]) -> Vec<&str> {
		hits.iter().map(|hit| hit.id.as_str()).collect()
	}

	#[test]
	fn rescores_only_the_window() {
		let setup = GlobalPhaseSetup {
			global_eval: ctx("a * query(w)", &["w"], &["a"]),
			rerank_count: 2,
			match_features_to_hide: BTreeSet::new(),
			normalizers: Vec::new(),
		};
		let mut hits = vec![
			hit("h1", 5.0, &[("a", 1.0)]),
			hit("h2", 4.0, &[("a", 3.0)]),
			hit("h3", 3.0, &[("a", 9.0)]),
		];
		let query = HashMap::from([("w".to_string(), 2.0)]);
		let report = rescore(&setup, &query, &mut hits).expect("Failed to rescore hits.");

		assert_eq!(report, RescoreReport { rescored: 2, normalizers: 0 });
		assert_eq!(ids(&hits), ["h2", "h1", "h3"]);
		assert_eq!(hits[0].relevance, 6.0);
		assert_eq!(hits[2].relevance, 3.0);
	}

	#[test]
	fn feeds_normalized_values_to_the_global_function() {
		let setup = GlobalPhaseSetup {
			global_eval: ctx("n", &[], &[]),
			rerank_count: 10,
			match_features_to_hide: BTreeSet::new(),
			normalizers: vec![NormalizerSetup {
				name: "n".to_string(),
				factory: NormalizerFactory {
					name: "n".to_string(),
					kind: NormalizerKind::Linear,
					capacity: 10,
				},
				input_eval: ctx("a", &[], &["a"]),
			}],
		};
		let mut hits = vec![
			hit("h1", 3.0, &[("a", 2.0)]),
			hit("h2", 2.0, &[("a", 6.0)]),
			hit("h3", 1.0, &[("a", 4.0)]),
		];

		rescore(&setup, &HashMap::<String, f64>::new(), &mut hits).expect("Failed to rescore hits.");

		assert_eq!(ids(&hits), ["h2", "h3", "h1"]);
		assert_eq!(hits.iter().map(|hit| hit.relevance).collect::<Vec<_>>(), [1.0, 0.5, 0.0]);
	}

	#[test]
	fn ties_keep_incoming_order() {
		let setup = GlobalPhaseSetup {
			global_eval: ctx("1", &[], &[]),
			rerank_count: 10,
			match_features_to_hide: BTreeSet::new(),
			normalizers: Vec::new(),
		};
		let mut hits = vec![hit("h1", 3.0, &[]), hit("h2", 2.0, &[]), hit("h3", 1.0, &[])];

		rescore(&setup, &HashMap::<String, f64>::new(), &mut hits).expect("Failed to rescore hits.");

		assert_eq!(ids(&hits), ["h1", "h2", "h3"]);
	}

	#[test]
	fn nan_scores_sort_last_in_the_window() {
		let setup = GlobalPhaseSetup {
			global_eval: ctx("log(a)", &[], &["a"]),
			rerank_count: 10,
			match_features_to_hide: BTreeSet::new(),
			normalizers: Vec::new(),
		};
		let mut hits = vec![
			hit("h1", 3.0, &[("a", -1.0)]),
			hit("h2", 2.0, &[("a", 1.0)]),
			hit("h3", 1.0, &[("a", std::f64::consts::E)]),
			hit("h4", 0.5, &[("a", -2.0)]),
		];

		rescore(&setup, &HashMap::<String, f64>::new(), &mut hits).expect("Failed to rescore hits.");

		assert_eq!(ids(&hits), ["h3", "h2", "h1", "h4"]);
		assert!(hits[2].relevance.is_nan());
		assert!(hits[3].relevance.is_nan());
	}

	#[test]
	fn leaves_hits_untouched_on_error() {
		let setup = GlobalPhaseSetup {
			global_eval: ctx("a", &[], &["a"]),
			rerank_count: 10,
			match_features_to_hide: BTreeSet::new(),
			normalizers: Vec::new(),
		};
		let mut hits = vec![hit("h1", 1.0, &[]), hit("h2", 2.0, &[("a", 5.0)])];
		let before = hits.clone();
		let err = rescore(&setup, &HashMap::<String, f64>::new(), &mut hits)
			.expect_err("Unbound input must fail.");

		assert!(matches!(err, Error::Expr(gphase_expr::Error::UnboundInput { .. })));
		assert_eq!(hits, before);
	}

	#[test]
	fn hides_listed_match_features() {
		let setup = GlobalPhaseSetup {
			global_eval: ctx("1", &[], &[]),
			rerank_count: 10,
			match_features_to_hide: BTreeSet::from(["secret".to_string()]),
			normalizers: Vec::new(),
		};
		let mut hits = vec![hit("h1", 1.0, &[("secret", 1.0), ("shown", 2.0)])];

		hide_match_features(&setup, &mut hits);

		assert_eq!(hits[0].match_features.keys().collect::<Vec<_>>(), ["shown"]);
	}
}
