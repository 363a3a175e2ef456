pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid global-phase configuration: {message}")]
	Config { message: String },
	#[error("Normalizer {name:?} can hold at most {capacity} value(s).")]
	Capacity { name: String, capacity: usize },
	#[error("Normalizer {name:?} {message}.")]
	State { name: String, message: &'static str },
	#[error("Normalizer {name:?} has no output at index {index}.")]
	OutOfRange { name: String, index: usize },
	#[error(transparent)]
	Expr(#[from] gphase_expr::Error),
}
