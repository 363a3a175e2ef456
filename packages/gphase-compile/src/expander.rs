use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{Error, Result};
use gphase_config::{LINEAR_ALGORITHM, RRANK_ALGORITHM};
use gphase_expr::{ExpressionNode, Reference};

pub const RECIPROCAL_RANK_FUSION: &str = "reciprocal_rank_fusion";
pub const NORMALIZE_LINEAR: &str = "normalize_linear";
pub const RECIPROCAL_RANK: &str = "reciprocal_rank";
/// `k` used by `reciprocal_rank` when the call does not pass one.
pub const DEFAULT_K: f64 = 60.0;

// Added to the 32-bit hash of the call.
const NAME_HIGH_BIT: u64 = 0x1_0000_0000;

/// Read-only view of the functions declared on a rank profile.
pub trait FunctionLookup {
	fn is_declared(&self, name: &str) -> bool;
}
impl<V> FunctionLookup for HashMap<String, V> {
	fn is_declared(&self, name: &str) -> bool {
		self.contains_key(name)
	}
}
impl<V> FunctionLookup for BTreeMap<String, V> {
	fn is_declared(&self, name: &str) -> bool {
		self.contains_key(name)
	}
}
impl FunctionLookup for HashSet<String> {
	fn is_declared(&self, name: &str) -> bool {
		self.contains(name)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NormalizerAlgorithm {
	Linear,
	ReciprocalRank,
}
impl NormalizerAlgorithm {
	pub fn tag(self) -> &'static str {
		match self {
			Self::Linear => LINEAR_ALGORITHM,
			Self::ReciprocalRank => RRANK_ALGORITHM,
		}
	}

	fn suffix(self) -> &'static str {
		match self {
			Self::Linear => "linear",
			Self::ReciprocalRank => "rrank",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizerDeclaration {
	pub name: String,
	/// Rendered source expression whose per-hit value is normalized.
	pub input: String,
	pub algorithm: NormalizerAlgorithm,
	pub k_param: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expansion {
	pub node: ExpressionNode,
	pub normalizers: Vec<NormalizerDeclaration>,
}

/// Expands `node` and returns the rewritten tree along with the normalizers it declares.
pub fn expand(node: ExpressionNode, functions: &dyn FunctionLookup) -> Result<Expansion> {
	let mut expander = FunctionExpander::new(functions);
	let node = expander.transform(node)?;

	Ok(Expansion { node, normalizers: expander.into_normalizers() })
}

/// Rewrites `reciprocal_rank_fusion`, `normalize_linear` and `reciprocal_rank` calls into
/// references to synthesized normalizers.
///
/// One expander can be run over several trees of the same profile; declarations are collected
/// once per synthesized name in first-registration order.
pub struct FunctionExpander<'a> {
	functions: &'a dyn FunctionLookup,
	normalizers: Vec<NormalizerDeclaration>,
	registered: HashSet<String>,
}
impl<'a> FunctionExpander<'a> {
	pub fn new(functions: &'a dyn FunctionLookup) -> Self {
		Self { functions, normalizers: Vec::new(), registered: HashSet::new() }
	}

	pub fn transform(&mut self, node: ExpressionNode) -> Result<ExpressionNode> {
		if let ExpressionNode::Reference(reference) = &node
			&& let Some(expanded) = self.transform_reference(reference)?
		{
			return Ok(expanded);
		}

		node.map_children(|child| self.transform(child))
	}

	pub fn into_normalizers(self) -> Vec<NormalizerDeclaration> {
		self.normalizers
	}

	/// Returns `None` when the reference is not one this expander rewrites.
	fn transform_reference(&mut self, reference: &Reference) -> Result<Option<ExpressionNode>> {
		if reference.output.is_some() || self.functions.is_declared(&reference.name) {
			return Ok(None);
		}

		let args = &reference.arguments;

		match reference.name.as_str() {
			RECIPROCAL_RANK_FUSION => {
				if args.len() < 2 {
					return Err(Error::ArgumentCount {
						function: RECIPROCAL_RANK_FUSION,
						expected: "at least 2",
						node: reference.to_string(),
					});
				}

				let terms = args
					.iter()
					.map(|arg| {
						ExpressionNode::Reference(Reference::new(RECIPROCAL_RANK, vec![arg.clone()]))
					})
					.collect();

				self.transform(ExpressionNode::sum(terms)).map(Some)
			},
			NORMALIZE_LINEAR => {
				if args.len() != 1 {
					return Err(Error::ArgumentCount {
						function: NORMALIZE_LINEAR,
						expected: "exactly 1",
						node: reference.to_string(),
					});
				}

				let input = simple_feature(NORMALIZE_LINEAR, reference)?;

				Ok(Some(self.register(reference, input, NormalizerAlgorithm::Linear, None)))
			},
			RECIPROCAL_RANK => {
				if !(1..=2).contains(&args.len()) {
					return Err(Error::ArgumentCount {
						function: RECIPROCAL_RANK,
						expected: "1 or 2",
						node: reference.to_string(),
					});
				}

				let k = match args.get(1) {
					Some(arg) => arg.as_constant().ok_or_else(|| Error::NotConstant {
						function: RECIPROCAL_RANK,
						node: reference.to_string(),
					})?,
					None => DEFAULT_K,
				};
				let input = simple_feature(RECIPROCAL_RANK, reference)?;

				Ok(Some(self.register(
					reference,
					input,
					NormalizerAlgorithm::ReciprocalRank,
					Some(k),
				)))
			},
			_ => Ok(None),
		}
	}

	fn register(
		&mut self,
		call: &Reference,
		input: &Reference,
		algorithm: NormalizerAlgorithm,
		k_param: Option<f64>,
	) -> ExpressionNode {
		let name = synthesize_name(call, algorithm);

		if self.registered.insert(name.clone()) {
			let input = input.to_string();

			tracing::debug!(
				normalizer = %name,
				input = %input,
				algorithm = algorithm.tag(),
				"Registered global-phase normalizer."
			);

			self.normalizers.push(NormalizerDeclaration {
				name: name.clone(),
				input,
				algorithm,
				k_param,
			});
		}

		ExpressionNode::reference(name)
	}
}

/// Derives `normalize@<num>@<suffix>` from the rendered call, so repeated identical calls share
/// one normalizer.
pub fn synthesize_name(call: &Reference, algorithm: NormalizerAlgorithm) -> String {
	let hash = blake3::hash(call.to_string().as_bytes());
	let mut prefix = [0_u8; 4];

	prefix.copy_from_slice(&hash.as_bytes()[..4]);

	let num = u64::from(u32::from_le_bytes(prefix)) + NAME_HIGH_BIT;

	format!("normalize@{num}@{}", algorithm.suffix())
}

fn simple_feature<'r>(function: &'static str, reference: &'r Reference) -> Result<&'r Reference> {
	reference
		.arguments
		.first()
		.and_then(ExpressionNode::as_reference)
		.ok_or_else(|| Error::NotSimpleFeature { function, node: reference.to_string() })
}
