use std::{collections::HashMap, sync::Arc};

use crate::Result;
use gphase_compile::CompiledProfile;
use gphase_expr::Function;

/// Creates a fresh evaluator for one query.
pub type EvaluatorFactory = Arc<dyn Fn() -> Box<dyn Evaluator> + Send + Sync>;

/// A bindable scalar expression.
pub trait Evaluator
where
	Self: Send,
{
	/// Every input that must be bound before [`Evaluator::evaluate_score`]; stable across calls.
	fn all_inputs(&self) -> &[String];

	/// Binds one input. Names the evaluator does not need are ignored; `None` leaves the input
	/// unbound, clearing any earlier value.
	fn bind(&mut self, name: &str, value: Option<f64>) -> &mut dyn Evaluator;

	fn evaluate_score(&self) -> Result<f64>;
}

/// Looks up compiled functions by rank profile and function name.
pub trait EvaluatorSource {
	fn supplier(&self, profile: &str, function: &str) -> Option<EvaluatorFactory>;
}

pub struct FunctionEvaluator {
	function: Arc<Function>,
	bound: HashMap<String, f64>,
}
impl FunctionEvaluator {
	pub fn new(function: Arc<Function>) -> Self {
		Self { function, bound: HashMap::new() }
	}

	pub fn factory(function: Arc<Function>) -> EvaluatorFactory {
		Arc::new(move || Box::new(Self::new(function.clone())))
	}
}
impl Evaluator for FunctionEvaluator {
	fn all_inputs(&self) -> &[String] {
		self.function.arguments()
	}

	fn bind(&mut self, name: &str, value: Option<f64>) -> &mut dyn Evaluator {
		if self.function.arguments().iter().any(|input| input == name) {
			match value {
				Some(value) => {
					self.bound.insert(name.to_string(), value);
				},
				None => {
					self.bound.remove(name);
				},
			}
		}

		self
	}

	fn evaluate_score(&self) -> Result<f64> {
		Ok(self.function.evaluate(|name| self.bound.get(name).copied())?)
	}
}

/// Stands in for a normalizer input that has no compiled function: the score is the value
/// bound to the input itself.
pub struct InputEvaluator {
	inputs: Vec<String>,
	value: Option<f64>,
}
impl InputEvaluator {
	pub fn new(input: impl Into<String>) -> Self {
		Self { inputs: vec![input.into()], value: None }
	}

	pub fn factory(input: String) -> EvaluatorFactory {
		Arc::new(move || Box::new(Self::new(input.clone())))
	}
}
impl Evaluator for InputEvaluator {
	fn all_inputs(&self) -> &[String] {
		&self.inputs
	}

	fn bind(&mut self, name: &str, value: Option<f64>) -> &mut dyn Evaluator {
		if self.inputs.iter().any(|input| input == name) {
			self.value = value;
		}

		self
	}

	fn evaluate_score(&self) -> Result<f64> {
		self.value.ok_or_else(|| {
			gphase_expr::Error::UnboundInput { name: self.inputs.join(",") }.into()
		})
	}
}

/// Compiled functions of every rank profile, shared read-only across queries.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
	profiles: HashMap<String, HashMap<String, Arc<Function>>>,
}
impl FunctionRegistry {
	pub fn new(profiles: &[CompiledProfile]) -> Self {
		let mut registry = Self::default();

		for profile in profiles {
			for function in profile.functions.values() {
				registry.insert(profile.name(), function.clone());
			}
		}

		registry
	}

	pub fn insert(&mut self, profile: &str, function: Function) {
		self.profiles
			.entry(profile.to_string())
			.or_default()
			.insert(function.name().to_string(), Arc::new(function));
	}
}
impl EvaluatorSource for FunctionRegistry {
	fn supplier(&self, profile: &str, function: &str) -> Option<EvaluatorFactory> {
		let function = self.profiles.get(profile)?.get(function)?;

		Some(FunctionEvaluator::factory(function.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Error;

	fn function(source: &str) -> Arc<Function> {
		Arc::new(Function::new("f", gphase_expr::parse(source).expect("Failed to parse expression.")))
	}

	#[test]
	fn binds_and_evaluates_chained() {
		let mut evaluator = FunctionEvaluator::new(function("a * 2 + query(w)"));
		let score = evaluator
			.bind("a", Some(3.0))
			.bind("query(w)", Some(0.5))
			.bind("unknown", Some(100.0))
			.evaluate_score()
			.expect("Failed to evaluate score.");

		assert_eq!(score, 6.5);
		assert_eq!(evaluator.all_inputs(), ["a", "query(w)"]);
	}

	#[test]
	fn unbinding_clears_previous_values() {
		let mut evaluator = FunctionEvaluator::new(function("a + 1"));

		evaluator.bind("a", Some(1.0));
		evaluator.bind("a", None);

		assert!(matches!(
			evaluator.evaluate_score(),
			Err(Error::Expr(gphase_expr::Error::UnboundInput { name })) if name == "a"
		));
	}

	#[test]
	fn input_evaluator_returns_its_bound_input() {
		let mut evaluator = InputEvaluator::new("bm25(title)");

		assert!(evaluator.evaluate_score().is_err());
		assert_eq!(evaluator.all_inputs(), ["bm25(title)"]);

		evaluator.bind("bm25(body)", Some(9.0)).bind("bm25(title)", Some(4.0));

		assert_eq!(evaluator.evaluate_score().expect("Failed to evaluate score."), 4.0);
	}

	#[test]
	fn registry_hands_out_independent_evaluators() {
		let mut registry = FunctionRegistry::default();

		let body = gphase_expr::parse("a").expect("Failed to parse expression.");

		registry.insert("p", Function::new("g", body));

		let factory = registry.supplier("p", "g").expect("Function must be registered.");
		let mut first = factory();
		let second = factory();

		first.bind("a", Some(1.0));

		assert_eq!(first.evaluate_score().expect("Failed to evaluate score."), 1.0);
		assert!(second.evaluate_score().is_err());
		assert!(registry.supplier("p", "missing").is_none());
		assert!(registry.supplier("missing", "g").is_none());
	}
}
