use std::collections::{HashMap, HashSet};

use crate::{
	Error, Result,
	node::{ExpressionNode, Operator, Reference},
};

/// A compiled expression together with the free inputs it needs bound before evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
	name: String,
	body: ExpressionNode,
	arguments: Vec<String>,
}
impl Function {
	pub fn new(name: impl Into<String>, body: ExpressionNode) -> Self {
		let arguments = collect_inputs(&body);

		Self { name: name.into(), body, arguments }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn body(&self) -> &ExpressionNode {
		&self.body
	}

	/// Rendered references in first-occurrence order.
	pub fn arguments(&self) -> &[String] {
		&self.arguments
	}

	pub fn evaluate<F>(&self, lookup: F) -> Result<f64>
	where
		F: Fn(&str) -> Option<f64>,
	{
		evaluate_node(&self.body, &lookup)
	}
}

/// A declared function body before inlining.
#[derive(Clone, Debug)]
pub struct FunctionBody {
	pub params: Vec<String>,
	pub body: ExpressionNode,
}

/// Replaces every reference to a declared function with its body, substituting call arguments
/// for parameters.
pub fn inline_functions(
	node: ExpressionNode,
	declared: &HashMap<String, FunctionBody>,
) -> Result<ExpressionNode> {
	Inliner { declared, stack: Vec::new() }.inline(node)
}

fn collect_inputs(body: &ExpressionNode) -> Vec<String> {
	fn walk(node: &ExpressionNode, seen: &mut HashSet<String>, out: &mut Vec<String>) {
		match node {
			ExpressionNode::Constant(_) => {},
			ExpressionNode::Reference(reference) => {
				let name = reference.to_string();

				if seen.insert(name.clone()) {
					out.push(name);
				}
			},
			ExpressionNode::Operation { children, .. } => {
				children.iter().for_each(|child| walk(child, seen, out));
			},
			ExpressionNode::If { condition, if_true, if_false } => {
				walk(condition, seen, out);
				walk(if_true, seen, out);
				walk(if_false, seen, out);
			},
			ExpressionNode::Negate(inner) => walk(inner, seen, out),
			ExpressionNode::Call { args, .. } => {
				args.iter().for_each(|arg| walk(arg, seen, out));
			},
		}
	}

	let mut seen = HashSet::new();
	let mut out = Vec::new();

	walk(body, &mut seen, &mut out);

	out
}

fn evaluate_node<F>(node: &ExpressionNode, lookup: &F) -> Result<f64>
where
	F: Fn(&str) -> Option<f64>,
{
	match node {
		ExpressionNode::Constant(value) => Ok(*value),
		ExpressionNode::Reference(reference) => {
			let name = reference.to_string();

			lookup(&name).ok_or(Error::UnboundInput { name })
		},
		ExpressionNode::Operation { children, operators } => {
			let values =
				children.iter().map(|child| evaluate_node(child, lookup)).collect::<Result<_>>()?;

			Ok(reduce_by_precedence(values, operators.clone()))
		},
		ExpressionNode::If { condition, if_true, if_false } => {
			if evaluate_node(condition, lookup)? != 0.0 {
				evaluate_node(if_true, lookup)
			} else {
				evaluate_node(if_false, lookup)
			}
		},
		ExpressionNode::Negate(inner) => Ok(-evaluate_node(inner, lookup)?),
		ExpressionNode::Call { function, args } => {
			let values =
				args.iter().map(|arg| evaluate_node(arg, lookup)).collect::<Result<Vec<_>>>()?;

			Ok(function.apply(&values))
		},
	}
}

/// Operators of equal precedence fold left to right, `^` included: `2 ^ 3 ^ 2` is `64`.
fn reduce_by_precedence(mut values: Vec<f64>, mut operators: Vec<Operator>) -> f64 {
	for precedence in (1..=Operator::MAX_PRECEDENCE).rev() {
		let mut next_values = Vec::with_capacity(values.len());
		let mut next_operators = Vec::with_capacity(operators.len());
		let mut iter = values.into_iter();
		let mut acc = iter.next().unwrap_or(f64::NAN);

		for (op, rhs) in operators.into_iter().zip(iter) {
			if op.precedence() == precedence {
				acc = op.apply(acc, rhs);
			} else {
				next_values.push(acc);
				next_operators.push(op);
				acc = rhs;
			}
		}

		next_values.push(acc);

		values = next_values;
		operators = next_operators;
	}

	values.first().copied().unwrap_or(f64::NAN)
}

struct Inliner<'a> {
	declared: &'a HashMap<String, FunctionBody>,
	stack: Vec<String>,
}
impl Inliner<'_> {
	fn inline(&mut self, node: ExpressionNode) -> Result<ExpressionNode> {
		let reference = match node {
			ExpressionNode::Reference(reference) => reference,
			other => return other.map_children(|child| self.inline(child)),
		};
		let declared = self.declared;
		let Some(function) = declared.get(&reference.name).filter(|_| reference.output.is_none())
		else {
			return ExpressionNode::Reference(reference).map_children(|child| self.inline(child));
		};

		if function.params.len() != reference.arguments.len() {
			return Err(Error::ArgumentMismatch {
				name: reference.name,
				expected: function.params.len(),
				actual: reference.arguments.len(),
			});
		}
		if self.stack.contains(&reference.name) {
			let mut path = self.stack.clone();

			path.push(reference.name.clone());

			return Err(Error::CyclicFunction { name: reference.name, path: path.join(" -> ") });
		}

		let Reference { name, arguments, .. } = reference;
		let arguments =
			arguments.into_iter().map(|arg| self.inline(arg)).collect::<Result<Vec<_>>>()?;
		let bindings: HashMap<&str, &ExpressionNode> =
			function.params.iter().map(String::as_str).zip(arguments.iter()).collect();
		let body = substitute(function.body.clone(), &bindings);

		self.stack.push(name);

		let inlined = self.inline(body);

		self.stack.pop();

		inlined
	}
}

fn substitute(node: ExpressionNode, bindings: &HashMap<&str, &ExpressionNode>) -> ExpressionNode {
	if let ExpressionNode::Reference(reference) = &node
		&& reference.is_identifier()
		&& let Some(value) = bindings.get(reference.name.as_str())
	{
		return (*value).clone();
	}

	match node.map_children(|child| Ok::<_, std::convert::Infallible>(substitute(child, bindings))) {
		Ok(node) => node,
		Err(never) => match never {},
	}
}
