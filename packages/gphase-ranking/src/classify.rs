use gphase_expr::query_feature_argument;

/// Where the value of one evaluator input comes from at query time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
	/// Bound from the query parameter named by the argument of `query(x)`.
	Query(String),
	/// Bound from a declared normalizer's output for the hit.
	Normalizer,
	/// Bound from the hit's match features.
	MatchFeature,
}

/// Inputs of one evaluator grouped by source, each group in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassifiedInputs {
	pub query: Vec<String>,
	pub normalizers: Vec<String>,
	pub match_features: Vec<String>,
}

pub fn classify_input<F>(name: &str, is_normalizer: F) -> InputSource
where
	F: Fn(&str) -> bool,
{
	if let Some(argument) = query_feature_argument(name) {
		InputSource::Query(argument)
	} else if is_normalizer(name) {
		InputSource::Normalizer
	} else {
		InputSource::MatchFeature
	}
}

pub fn classify_inputs<'a, I, F>(inputs: I, is_normalizer: F) -> ClassifiedInputs
where
	I: IntoIterator<Item = &'a str>,
	F: Fn(&str) -> bool,
{
	let mut classified = ClassifiedInputs::default();

	for name in inputs {
		match classify_input(name, &is_normalizer) {
			InputSource::Query(argument) => classified.query.push(argument),
			InputSource::Normalizer => classified.normalizers.push(name.to_string()),
			InputSource::MatchFeature => classified.match_features.push(name.to_string()),
		}
	}

	classified
}
