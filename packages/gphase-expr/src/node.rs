use std::fmt::{self, Display, Formatter};

#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionNode {
	Constant(f64),
	Reference(Reference),
	/// `children.len() == operators.len() + 1`; evaluated by operator precedence, left to right
	/// within one precedence level.
	Operation { children: Vec<ExpressionNode>, operators: Vec<Operator> },
	If { condition: Box<ExpressionNode>, if_true: Box<ExpressionNode>, if_false: Box<ExpressionNode> },
	Negate(Box<ExpressionNode>),
	Call { function: MathFunction, args: Vec<ExpressionNode> },
}
impl ExpressionNode {
	pub fn reference(name: impl Into<String>) -> Self {
		Self::Reference(Reference::simple(name))
	}

	/// Joins the given terms with `+`. A single term is returned as is.
	pub fn sum(mut terms: Vec<ExpressionNode>) -> Self {
		if terms.len() == 1
			&& let Some(term) = terms.pop()
		{
			return term;
		}

		let operators = vec![Operator::Add; terms.len().saturating_sub(1)];

		Self::Operation { children: terms, operators }
	}

	pub fn as_reference(&self) -> Option<&Reference> {
		match self {
			Self::Reference(reference) => Some(reference),
			_ => None,
		}
	}

	pub fn as_constant(&self) -> Option<f64> {
		match self {
			Self::Constant(value) => Some(*value),
			_ => None,
		}
	}

	/// Rebuilds this node with every direct child passed through `f`. Reference arguments count
	/// as children; constants have none.
	pub fn map_children<F, E>(self, mut f: F) -> Result<Self, E>
	where
		F: FnMut(ExpressionNode) -> Result<ExpressionNode, E>,
	{
		let node = match self {
			Self::Constant(_) => self,
			Self::Reference(Reference { name, arguments, output }) => Self::Reference(Reference {
				name,
				arguments: arguments.into_iter().map(&mut f).collect::<Result<_, E>>()?,
				output,
			}),
			Self::Operation { children, operators } => Self::Operation {
				children: children.into_iter().map(&mut f).collect::<Result<_, E>>()?,
				operators,
			},
			Self::If { condition, if_true, if_false } => Self::If {
				condition: Box::new(f(*condition)?),
				if_true: Box::new(f(*if_true)?),
				if_false: Box::new(f(*if_false)?),
			},
			Self::Negate(inner) => Self::Negate(Box::new(f(*inner)?)),
			Self::Call { function, args } => Self::Call {
				function,
				args: args.into_iter().map(&mut f).collect::<Result<_, E>>()?,
			},
		};

		Ok(node)
	}

	fn write_operand(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Operation { .. } => write!(f, "({self})"),
			_ => write!(f, "{self}"),
		}
	}
}
impl Display for ExpressionNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant(value) => write!(f, "{value}"),
			Self::Reference(reference) => write!(f, "{reference}"),
			Self::Operation { children, operators } => {
				for (idx, child) in children.iter().enumerate() {
					if idx > 0
						&& let Some(op) = operators.get(idx - 1)
					{
						write!(f, " {} ", op.symbol())?;
					}

					child.write_operand(f)?;
				}

				Ok(())
			},
			Self::If { condition, if_true, if_false } => {
				write!(f, "if ({condition}, {if_true}, {if_false})")
			},
			Self::Negate(inner) => {
				f.write_str("-")?;

				inner.write_operand(f)
			},
			Self::Call { function, args } => {
				write!(f, "{}(", function.name())?;
				write_joined(f, args)?;

				f.write_str(")")
			},
		}
	}
}

/// A named feature or function reference, e.g. `bm25(title)` or `fieldMatch(title).completeness`.
///
/// Identity is `(name, arguments)`; the output selector picks one value out of a multi-output
/// feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
	pub name: String,
	pub arguments: Vec<ExpressionNode>,
	pub output: Option<String>,
}
impl Reference {
	pub fn simple(name: impl Into<String>) -> Self {
		Self { name: name.into(), arguments: Vec::new(), output: None }
	}

	pub fn new(name: impl Into<String>, arguments: Vec<ExpressionNode>) -> Self {
		Self { name: name.into(), arguments, output: None }
	}

	pub fn is_identifier(&self) -> bool {
		self.arguments.is_empty() && self.output.is_none()
	}
}
impl Display for Reference {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)?;

		if !self.arguments.is_empty() {
			f.write_str("(")?;
			write_joined(f, &self.arguments)?;
			f.write_str(")")?;
		}
		if let Some(output) = self.output.as_deref() {
			write!(f, ".{output}")?;
		}

		Ok(())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
	Or,
	And,
	Lt,
	Le,
	Gt,
	Ge,
	Eq,
	Ne,
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	Pow,
}
impl Operator {
	pub const MAX_PRECEDENCE: u8 = 6;

	pub fn symbol(self) -> &'static str {
		match self {
			Self::Or => "||",
			Self::And => "&&",
			Self::Lt => "<",
			Self::Le => "<=",
			Self::Gt => ">",
			Self::Ge => ">=",
			Self::Eq => "==",
			Self::Ne => "!=",
			Self::Add => "+",
			Self::Sub => "-",
			Self::Mul => "*",
			Self::Div => "/",
			Self::Mod => "%",
			Self::Pow => "^",
		}
	}

	pub fn precedence(self) -> u8 {
		match self {
			Self::Or => 1,
			Self::And => 2,
			Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne => 3,
			Self::Add | Self::Sub => 4,
			Self::Mul | Self::Div | Self::Mod => 5,
			Self::Pow => Self::MAX_PRECEDENCE,
		}
	}

	pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
		match self {
			Self::Or => truth(lhs != 0.0 || rhs != 0.0),
			Self::And => truth(lhs != 0.0 && rhs != 0.0),
			Self::Lt => truth(lhs < rhs),
			Self::Le => truth(lhs <= rhs),
			Self::Gt => truth(lhs > rhs),
			Self::Ge => truth(lhs >= rhs),
			Self::Eq => truth(lhs == rhs),
			Self::Ne => truth(lhs != rhs),
			Self::Add => lhs + rhs,
			Self::Sub => lhs - rhs,
			Self::Mul => lhs * rhs,
			Self::Div => lhs / rhs,
			Self::Mod => lhs % rhs,
			Self::Pow => lhs.powf(rhs),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathFunction {
	Abs,
	Ceil,
	Exp,
	Floor,
	Log,
	Log10,
	Max,
	Min,
	Pow,
	Sqrt,
}
impl MathFunction {
	pub fn from_name(name: &str) -> Option<Self> {
		let function = match name {
			"abs" => Self::Abs,
			"ceil" => Self::Ceil,
			"exp" => Self::Exp,
			"floor" => Self::Floor,
			"log" => Self::Log,
			"log10" => Self::Log10,
			"max" => Self::Max,
			"min" => Self::Min,
			"pow" => Self::Pow,
			"sqrt" => Self::Sqrt,
			_ => return None,
		};

		Some(function)
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Abs => "abs",
			Self::Ceil => "ceil",
			Self::Exp => "exp",
			Self::Floor => "floor",
			Self::Log => "log",
			Self::Log10 => "log10",
			Self::Max => "max",
			Self::Min => "min",
			Self::Pow => "pow",
			Self::Sqrt => "sqrt",
		}
	}

	pub fn arity(self) -> usize {
		match self {
			Self::Max | Self::Min | Self::Pow => 2,
			_ => 1,
		}
	}

	pub fn apply(self, args: &[f64]) -> f64 {
		let x = args.first().copied().unwrap_or(f64::NAN);
		let y = args.get(1).copied().unwrap_or(f64::NAN);

		match self {
			Self::Abs => x.abs(),
			Self::Ceil => x.ceil(),
			Self::Exp => x.exp(),
			Self::Floor => x.floor(),
			Self::Log => x.ln(),
			Self::Log10 => x.log10(),
			Self::Max => x.max(y),
			Self::Min => x.min(y),
			Self::Pow => x.powf(y),
			Self::Sqrt => x.sqrt(),
		}
	}
}

fn truth(value: bool) -> f64 {
	if value { 1.0 } else { 0.0 }
}

fn write_joined(f: &mut Formatter<'_>, nodes: &[ExpressionNode]) -> fmt::Result {
	for (idx, node) in nodes.iter().enumerate() {
		if idx > 0 {
			f.write_str(",")?;
		}

		write!(f, "{node}")?;
	}

	Ok(())
}
