use std::{collections::HashMap, sync::Arc};

use crate::{
	Result,
	evaluator::{EvaluatorSource, FunctionRegistry},
	rescore::{FeatureLookup, Hit, RescoreReport, hide_match_features, rescore},
	setup::GlobalPhaseSetup,
};
use gphase_compile::CompiledProfile;
use gphase_config::DerivedProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RerankOutcome {
	/// The profile has no global phase; hits are untouched.
	NotConfigured,
	Rescored(RescoreReport),
	/// Rescoring failed for this query; hits keep their incoming order and scores.
	FellBack,
}

/// Global-phase setups for every rank profile, built once at load time.
#[derive(Clone, Debug, Default)]
pub struct GlobalPhaseRanker {
	setups: HashMap<String, Option<Arc<GlobalPhaseSetup>>>,
}
impl GlobalPhaseRanker {
	pub fn new(profiles: &[DerivedProfile], source: &dyn EvaluatorSource) -> Result<Self> {
		let mut setups = HashMap::with_capacity(profiles.len());

		for profile in profiles {
			let setup = GlobalPhaseSetup::maybe_make_setup(profile, source)?;

			setups.insert(profile.name.clone(), setup.map(Arc::new));
		}

		Ok(Self { setups })
	}

	pub fn from_compiled(profiles: &[CompiledProfile]) -> Result<Self> {
		let registry = FunctionRegistry::new(profiles);
		let derived: Vec<DerivedProfile> =
			profiles.iter().map(|profile| profile.derived.clone()).collect();

		Self::new(&derived, &registry)
	}

	pub fn setup(&self, profile: &str) -> Option<&Arc<GlobalPhaseSetup>> {
		self.setups.get(profile).and_then(Option::as_ref)
	}

	/// Rescores the hits of one query for `profile`.
	///
	/// Per-query evaluation errors never fail the query; the incoming ranking is kept instead.
	pub fn rerank(&self, profile: &str, query: &dyn FeatureLookup, hits: &mut [Hit]) -> RerankOutcome {
		let Some(setup) = self.setup(profile) else {
			return RerankOutcome::NotConfigured;
		};
		let outcome = match rescore(setup, query, hits) {
			Ok(report) => RerankOutcome::Rescored(report),
			Err(err) => {
				tracing::warn!(
					profile,
					error = %err,
					"Global-phase rescoring failed; keeping first-phase order."
				);

				RerankOutcome::FellBack
			},
		};

		hide_match_features(setup, hits);

		outcome
	}
}
