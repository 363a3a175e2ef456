pub mod expander;
pub mod profile;

mod error;

pub use error::{Error, Result};
pub use expander::{
	DEFAULT_K, Expansion, FunctionExpander, FunctionLookup, NormalizerAlgorithm,
	NormalizerDeclaration, expand, synthesize_name,
};
pub use profile::{CompiledProfile, compile, compile_profile};
