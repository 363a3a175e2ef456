pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{function} must have {expected} argument(s): {node}")]
	ArgumentCount { function: &'static str, expected: &'static str, node: String },
	#[error("The first argument of {function} must be a simple feature: {node}")]
	NotSimpleFeature { function: &'static str, node: String },
	#[error("The second argument (k) of {function} must be a constant: {node}")]
	NotConstant { function: &'static str, node: String },
	#[error("Rank profile {profile:?} failed to compile.")]
	Profile {
		profile: String,
		#[source]
		source: Box<Error>,
	},
	#[error(transparent)]
	Expr(#[from] gphase_expr::Error),
}
