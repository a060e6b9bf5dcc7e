use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The closed set of signal sources fused by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
	Collaborative,
	Content,
	Graph,
	Llm,
}
impl SignalSource {
	pub const ALL: [SignalSource; 4] = [Self::Collaborative, Self::Content, Self::Graph, Self::Llm];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Collaborative => "collaborative",
			Self::Content => "content",
			Self::Graph => "graph",
			Self::Llm => "llm",
		}
	}
}
impl fmt::Display for SignalSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for SignalSource {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"collaborative" => Ok(Self::Collaborative),
			"content" => Ok(Self::Content),
			"graph" => Ok(Self::Graph),
			"llm" => Ok(Self::Llm),
			other => Err(format!("Unknown signal source {other:?}.")),
		}
	}
}

/// One scorer's measurement of one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalScore {
	pub raw: f64,
	/// Always within 0.0-1.0.
	pub normalized: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rationale: Option<String>,
}
impl SignalScore {
	pub fn new(raw: f64, normalized: f64) -> Self {
		Self { raw, normalized: clamp_unit(normalized), rationale: None }
	}

	pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
		self.rationale = Some(rationale.into());

		self
	}
}

/// Scores keyed by candidate id. A candidate missing from the map is absent for that signal,
/// which is different from a reported score of zero.
pub type SignalScores = BTreeMap<String, SignalScore>;

/// Clamps to 0.0-1.0 and maps NaN to 0.0.
pub fn clamp_unit(value: f64) -> f64 {
	if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Divides every raw score by the maximum raw score. Returns an empty map when the maximum is not
/// positive, so callers can decide between "absent" and "all zero".
pub fn max_normalize(raw: BTreeMap<String, f64>) -> SignalScores {
	let max = raw.values().copied().filter(|value| value.is_finite()).fold(0.0_f64, f64::max);

	if max <= 0.0 {
		return SignalScores::new();
	}

	raw.into_iter()
		.map(|(candidate_id, value)| {
			let value = if value.is_finite() { value } else { 0.0 };

			(candidate_id, SignalScore::new(value, value / max))
		})
		.collect()
}
