use std::{iter::Peekable, str::Chars};

use crate::{
	Error, Result,
	node::{ExpressionNode, MathFunction, Operator, Reference},
};

pub fn parse(source: &str) -> Result<ExpressionNode> {
	let mut parser = Parser::new(source);
	let node = parser.parse_expression()?;

	match parser.next_token()? {
		Token::Eof => Ok(node),
		other => Err(parser.error(format!("unexpected trailing token {other:?}"))),
	}
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
	Ident(String),
	Number(f64),
	Op(Operator),
	Minus,
	Comma,
	Dot,
	LParen,
	RParen,
	Eof,
}

struct Lexer<'a> {
	chars: Peekable<Chars<'a>>,
}
impl<'a> Lexer<'a> {
	fn new(source: &'a str) -> Self {
		Self { chars: source.chars().peekable() }
	}

	fn next_token(&mut self) -> std::result::Result<Token, String> {
		while self.chars.next_if(|c| c.is_whitespace()).is_some() {}

		let Some(&ch) = self.chars.peek() else {
			return Ok(Token::Eof);
		};

		if is_ident_start(ch) {
			return Ok(Token::Ident(self.read_while(is_ident_continue)));
		}
		if ch.is_ascii_digit() {
			return self.read_number();
		}

		self.chars.next();

		let token = match ch {
			'+' => Token::Op(Operator::Add),
			'-' => Token::Minus,
			'*' => Token::Op(Operator::Mul),
			'/' => Token::Op(Operator::Div),
			'%' => Token::Op(Operator::Mod),
			'^' => Token::Op(Operator::Pow),
			',' => Token::Comma,
			'(' => Token::LParen,
			')' => Token::RParen,
			'.' if self.chars.peek().is_some_and(char::is_ascii_digit) => {
				let digits = self.read_while(|c| c.is_ascii_digit());

				return format!("0.{digits}")
					.parse()
					.map(Token::Number)
					.map_err(|_| format!("invalid number .{digits}"));
			},
			'.' => Token::Dot,
			'<' => self.with_eq(Operator::Le, Operator::Lt),
			'>' => self.with_eq(Operator::Ge, Operator::Gt),
			'=' if self.chars.next_if_eq(&'=').is_some() => Token::Op(Operator::Eq),
			'!' if self.chars.next_if_eq(&'=').is_some() => Token::Op(Operator::Ne),
			'&' if self.chars.next_if_eq(&'&').is_some() => Token::Op(Operator::And),
			'|' if self.chars.next_if_eq(&'|').is_some() => Token::Op(Operator::Or),
			other => return Err(format!("unexpected character {other:?}")),
		};

		Ok(token)
	}

	fn with_eq(&mut self, with: Operator, without: Operator) -> Token {
		if self.chars.next_if_eq(&'=').is_some() { Token::Op(with) } else { Token::Op(without) }
	}

	fn read_while(&mut self, mut keep: impl FnMut(char) -> bool) -> String {
		let mut out = String::new();

		while let Some(c) = self.chars.next_if(|c| keep(*c)) {
			out.push(c);
		}

		out
	}

	fn read_number(&mut self) -> std::result::Result<Token, String> {
		let mut raw = self.read_while(|c| c.is_ascii_digit());

		if self.chars.next_if_eq(&'.').is_some() {
			raw.push('.');
			raw.push_str(&self.read_while(|c| c.is_ascii_digit()));
		}
		if let Some(exp) = self.chars.next_if(|c| *c == 'e' || *c == 'E') {
			raw.push(exp);

			if let Some(sign) = self.chars.next_if(|c| *c == '+' || *c == '-') {
				raw.push(sign);
			}

			raw.push_str(&self.read_while(|c| c.is_ascii_digit()));
		}

		raw.parse().map(Token::Number).map_err(|_| format!("invalid number {raw}"))
	}
}

struct Parser<'a> {
	source: &'a str,
	lexer: Lexer<'a>,
	lookahead: Option<Token>,
}
impl<'a> Parser<'a> {
	fn new(source: &'a str) -> Self {
		Self { source, lexer: Lexer::new(source), lookahead: None }
	}

	fn error(&self, message: String) -> Error {
		Error::Parse { expression: self.source.to_string(), message }
	}

	fn next_token(&mut self) -> Result<Token> {
		if let Some(token) = self.lookahead.take() {
			return Ok(token);
		}

		self.lexer.next_token().map_err(|message| self.error(message))
	}

	fn peek_token(&mut self) -> Result<&Token> {
		if self.lookahead.is_none() {
			let token = self.lexer.next_token().map_err(|message| self.error(message))?;

			self.lookahead = Some(token);
		}

		Ok(self.lookahead.get_or_insert(Token::Eof))
	}

	fn expect(&mut self, expected: Token) -> Result<()> {
		let got = self.next_token()?;

		if got == expected {
			Ok(())
		} else {
			Err(self.error(format!("expected {expected:?}, got {got:?}")))
		}
	}

	/// Parses `operand (op operand)*` into one flat operation node; precedence is resolved at
	/// evaluation time.
	fn parse_expression(&mut self) -> Result<ExpressionNode> {
		let mut children = vec![self.parse_operand()?];
		let mut operators = Vec::new();

		loop {
			let op = match self.peek_token()? {
				Token::Op(op) => *op,
				Token::Minus => Operator::Sub,
				_ => break,
			};

			self.next_token()?;
			operators.push(op);
			children.push(self.parse_operand()?);
		}

		if operators.is_empty() {
			return Ok(children.remove(0));
		}

		Ok(ExpressionNode::Operation { children, operators })
	}

	/// Unary minus binds to the operand alone, tighter than any operator: `-2 ^ 2` is `4`.
	fn parse_operand(&mut self) -> Result<ExpressionNode> {
		match self.next_token()? {
			Token::Minus => match self.parse_operand()? {
				ExpressionNode::Constant(value) => Ok(ExpressionNode::Constant(-value)),
				other => Ok(ExpressionNode::Negate(Box::new(other))),
			},
			Token::Number(value) => Ok(ExpressionNode::Constant(value)),
			Token::LParen => {
				let node = self.parse_expression()?;

				self.expect(Token::RParen)?;

				Ok(node)
			},
			Token::Ident(name) => self.parse_named(name),
			other => Err(self.error(format!("unexpected token {other:?}"))),
		}
	}

	fn parse_named(&mut self, name: String) -> Result<ExpressionNode> {
		let has_args = matches!(self.peek_token()?, Token::LParen);
		let arguments = if has_args {
			self.next_token()?;
			self.parse_arguments()?
		} else {
			Vec::new()
		};

		if has_args && name == "if" {
			return self.make_if(arguments);
		}
		if has_args && let Some(function) = MathFunction::from_name(&name) {
			if arguments.len() != function.arity() {
				return Err(Error::MathArity {
					name: function.name(),
					expected: function.arity(),
					actual: arguments.len(),
				});
			}

			return Ok(ExpressionNode::Call { function, args: arguments });
		}

		let mut reference = Reference::new(name, arguments);

		if matches!(self.peek_token()?, Token::Dot) {
			self.next_token()?;

			match self.next_token()? {
				Token::Ident(output) => reference.output = Some(output),
				other => return Err(self.error(format!("expected output name, got {other:?}"))),
			}
		}

		Ok(ExpressionNode::Reference(reference))
	}

	fn parse_arguments(&mut self) -> Result<Vec<ExpressionNode>> {
		let mut arguments = Vec::new();

		if matches!(self.peek_token()?, Token::RParen) {
			self.next_token()?;

			return Ok(arguments);
		}

		loop {
			arguments.push(self.parse_expression()?);

			match self.next_token()? {
				Token::Comma => continue,
				Token::RParen => return Ok(arguments),
				other => {
					return Err(self.error(format!("invalid token in argument list {other:?}")));
				},
			}
		}
	}

	fn make_if(&self, arguments: Vec<ExpressionNode>) -> Result<ExpressionNode> {
		let Ok([condition, if_true, if_false]) = <[ExpressionNode; 3]>::try_from(arguments) else {
			return Err(self.error("if takes exactly 3 arguments".to_string()));
		};

		Ok(ExpressionNode::If {
			condition: Box::new(condition),
			if_true: Box::new(if_true),
			if_false: Box::new(if_false),
		})
	}
}

fn is_ident_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '@')
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_flat_operation() {
		let node = parse("a + b * 2 - c").expect("Failed to parse expression.");

		match node {
			ExpressionNode::Operation { children, operators } => {
				assert_eq!(children.len(), 4);
				assert_eq!(operators, vec![Operator::Add, Operator::Mul, Operator::Sub]);
			},
			other => panic!("unexpected node: {other:?}"),
		}
	}

	#[test]
	fn parses_feature_references() {
		let node = parse("fieldMatch(title).completeness").expect("Failed to parse expression.");
		let reference = node.as_reference().expect("Expected a reference.");

		assert_eq!(reference.name, "fieldMatch");
		assert_eq!(reference.arguments, vec![ExpressionNode::reference("title")]);
		assert_eq!(reference.output.as_deref(), Some("completeness"));
	}

	#[test]
	fn parses_synthesized_names() {
		let node = parse("normalize@4294967297@linear * 2").expect("Failed to parse expression.");

		assert_eq!(node.to_string(), "normalize@4294967297@linear * 2");
	}

	#[test]
	fn parses_if_and_math_functions() {
		let node = parse("if (a > 0.5, max(a, b), -1)").expect("Failed to parse expression.");

		assert_eq!(node.to_string(), "if (a > 0.5, max(a,b), -1)");
	}

	#[test]
	fn rejects_wrong_math_arity() {
		assert!(matches!(parse("max(a)"), Err(Error::MathArity { name: "max", .. })));
	}

	#[test]
	fn rejects_trailing_tokens() {
		assert!(matches!(parse("a b"), Err(Error::Parse { .. })));
		assert!(matches!(parse("bm25(title"), Err(Error::Parse { .. })));
	}

	#[test]
	fn rendering_round_trips_through_the_parser() {
		let source = "reciprocal_rank(bm25(title),10) + (a - b) / query(w)";
		let node = parse(source).expect("Failed to parse expression.");

		assert_eq!(node.to_string(), source);
		assert_eq!(parse(&node.to_string()).expect("Failed to reparse rendering."), node);
	}
}
