use std::cmp::Ordering;

use crate::{Error, Result};

/// A per-query, windowed score normalizer.
///
/// Raw values are added in hit order, then [`Normalizer::normalize`] computes every output from
/// the full window at once. Instances are never shared across queries.
pub trait Normalizer
where
	Self: Send,
{
	fn name(&self) -> &str;

	fn add_input(&mut self, value: f64) -> Result<()>;

	fn normalize(&mut self) -> Result<()>;

	fn get_output(&self, index: usize) -> Result<f64>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NormalizerKind {
	Linear,
	ReciprocalRank { k: f64 },
}

/// Creates one normalizer per query for a declared normalizer.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizerFactory {
	pub name: String,
	pub kind: NormalizerKind,
	pub capacity: usize,
}
impl NormalizerFactory {
	pub fn create(&self) -> Box<dyn Normalizer> {
		match self.kind {
			NormalizerKind::Linear => Box::new(LinearNormalizer::new(&self.name, self.capacity)),
			NormalizerKind::ReciprocalRank { k } =>
				Box::new(ReciprocalRankNormalizer::new(&self.name, self.capacity, k)),
		}
	}
}

pub struct LinearNormalizer {
	window: Window,
}
impl LinearNormalizer {
	pub fn new(name: impl Into<String>, capacity: usize) -> Self {
		Self { window: Window::new(name.into(), capacity) }
	}
}
impl Normalizer for LinearNormalizer {
	fn name(&self) -> &str {
		&self.window.name
	}

	fn add_input(&mut self, value: f64) -> Result<()> {
		self.window.push(value)
	}

	fn normalize(&mut self) -> Result<()> {
		self.window.finish(linear)
	}

	fn get_output(&self, index: usize) -> Result<f64> {
		self.window.output(index)
	}
}

pub struct ReciprocalRankNormalizer {
	window: Window,
	k: f64,
}
impl ReciprocalRankNormalizer {
	pub fn new(name: impl Into<String>, capacity: usize, k: f64) -> Self {
		Self { window: Window::new(name.into(), capacity), k }
	}
}
impl Normalizer for ReciprocalRankNormalizer {
	fn name(&self) -> &str {
		&self.window.name
	}

	fn add_input(&mut self, value: f64) -> Result<()> {
		self.window.push(value)
	}

	fn normalize(&mut self) -> Result<()> {
		let k = self.k;

		self.window.finish(|values| reciprocal_rank(values, k))
	}

	fn get_output(&self, index: usize) -> Result<f64> {
		self.window.output(index)
	}
}

/// `(v - min) / (max - min)`; a window where every value is equal maps to zeros.
pub fn linear(values: &[f64]) -> Vec<f64> {
	let min = values.iter().copied().fold(f64::INFINITY, f64::min);
	let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
	let range = max - min;

	if range == 0.0 || !range.is_finite() {
		return vec![0.0; values.len()];
	}

	values.iter().map(|value| (value - min) / range).collect()
}

/// `1 / (k + rank)` with rank 1 for the largest value; ties keep hit order.
pub fn reciprocal_rank(values: &[f64], k: f64) -> Vec<f64> {
	let mut order: Vec<usize> = (0..values.len()).collect();

	order.sort_by(|&a, &b| descending(values[a], values[b]));

	let mut out = vec![0.0; values.len()];

	for (position, index) in order.into_iter().enumerate() {
		out[index] = 1.0 / (k + (position + 1) as f64);
	}

	out
}

/// Orders larger values first and NaN after every number.
pub(crate) fn descending(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(true, true) => Ordering::Equal,
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WindowState {
	Collecting,
	Consumable,
}

struct Window {
	name: String,
	capacity: usize,
	values: Vec<f64>,
	outputs: Vec<f64>,
	state: WindowState,
}
impl Window {
	fn new(name: String, capacity: usize) -> Self {
		Self {
			name,
			capacity,
			values: Vec::new(),
			outputs: Vec::new(),
			state: WindowState::Collecting,
		}
	}

	fn push(&mut self, value: f64) -> Result<()> {
		if self.state != WindowState::Collecting {
			return Err(self.state_error("cannot accept input after it was normalized"));
		}
		if self.values.len() >= self.capacity {
			return Err(Error::Capacity { name: self.name.clone(), capacity: self.capacity });
		}

		self.values.push(value);

		Ok(())
	}

	fn finish(&mut self, compute: impl FnOnce(&[f64]) -> Vec<f64>) -> Result<()> {
		if self.state != WindowState::Collecting {
			return Err(self.state_error("was already normalized"));
		}
		if self.values.is_empty() {
			return Err(self.state_error("cannot normalize an empty window"));
		}

		self.outputs = compute(&self.values);
		self.state = WindowState::Consumable;

		Ok(())
	}

	fn output(&self, index: usize) -> Result<f64> {
		if self.state != WindowState::Consumable {
			return Err(self.state_error("has no output before it is normalized"));
		}

		self.outputs
			.get(index)
			.copied()
			.ok_or_else(|| Error::OutOfRange { name: self.name.clone(), index })
	}

	fn state_error(&self, message: &'static str) -> Error {
		Error::State { name: self.name.clone(), message }
	}
}
