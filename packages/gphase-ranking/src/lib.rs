//! Query-time global-phase rescoring: evaluators, windowed normalizers and the rescorer.

pub mod classify;
pub mod evaluator;
pub mod normalizer;
pub mod ranker;
pub mod rescore;
pub mod setup;

mod error;

pub use classify::{ClassifiedInputs, InputSource, classify_input, classify_inputs};
pub use error::{Error, Result};
pub use evaluator::{
	Evaluator, EvaluatorFactory, EvaluatorSource, FunctionEvaluator, FunctionRegistry,
	InputEvaluator,
};
pub use normalizer::{
	LinearNormalizer, Normalizer, NormalizerFactory, NormalizerKind, ReciprocalRankNormalizer,
};
pub use ranker::{GlobalPhaseRanker, RerankOutcome};
pub use rescore::{FeatureLookup, Hit, RescoreReport, hide_match_features, rescore};
pub use setup::{DEFAULT_RERANK_COUNT, FunEvalCtx, GlobalPhaseSetup, NormalizerSetup};
