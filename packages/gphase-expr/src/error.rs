pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid expression {expression:?}: {message}.")]
	Parse { expression: String, message: String },
	#[error("Input {name:?} was not bound before evaluation.")]
	UnboundInput { name: String },
	#[error("Function {name:?} calls itself through {path}.")]
	CyclicFunction { name: String, path: String },
	#[error("Function {name:?} takes {expected} argument(s) but was called with {actual}.")]
	ArgumentMismatch { name: String, expected: usize, actual: usize },
	#[error("Math function {name} takes {expected} argument(s) but was called with {actual}.")]
	MathArity { name: &'static str, expected: usize, actual: usize },
}
