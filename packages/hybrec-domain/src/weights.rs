use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Error, Result, signal::SignalSource};

/// Validated per-signal fusion weights: non-negative and summing to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FusionWeights {
	collaborative: f64,
	content: f64,
	graph: f64,
	llm: f64,
}
impl FusionWeights {
	/// Builds a weight set from signal-name keys. Missing signals get weight zero.
	pub fn from_map(weights: &BTreeMap<String, f64>) -> Result<Self> {
		hybrec_config::check_signal_weights("signal_weights", weights)
			.map_err(|err| Error::InvalidWeights { message: err.to_string() })?;

		let mut out = Self { collaborative: 0.0, content: 0.0, graph: 0.0, llm: 0.0 };

		for (name, weight) in weights {
			let source = name
				.parse::<SignalSource>()
				.map_err(|message| Error::InvalidWeights { message })?;

			*out.slot_mut(source) = *weight;
		}

		Ok(out)
	}

	pub fn get(&self, source: SignalSource) -> f64 {
		match source {
			SignalSource::Collaborative => self.collaborative,
			SignalSource::Content => self.content,
			SignalSource::Graph => self.graph,
			SignalSource::Llm => self.llm,
		}
	}

	/// Sources with a positive weight; only these are run and expected to report.
	pub fn active_sources(&self) -> Vec<SignalSource> {
		SignalSource::ALL.into_iter().filter(|source| self.get(*source) > 0.0).collect()
	}

	/// Renormalizes the configured weights over the sources that reported for one candidate.
	///
	/// The returned weights sum to 1.0. Returns an empty list when none of the reported sources
	/// carries a positive weight.
	pub fn effective(&self, reported: &[SignalSource]) -> Vec<(SignalSource, f64)> {
		let total: f64 = reported.iter().map(|source| self.get(*source)).sum();

		if total <= 0.0 {
			return Vec::new();
		}

		reported
			.iter()
			.filter(|source| self.get(**source) > 0.0)
			.map(|source| (*source, self.get(*source) / total))
			.collect()
	}

	fn slot_mut(&mut self, source: SignalSource) -> &mut f64 {
		match source {
			SignalSource::Collaborative => &mut self.collaborative,
			SignalSource::Content => &mut self.content,
			SignalSource::Graph => &mut self.graph,
			SignalSource::Llm => &mut self.llm,
		}
	}
}
