use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hybrec_config::{
	Recommend, RecommendCollaborative, RecommendConfidence, RecommendContent, RecommendGraph,
	RecommendLlm, RecommendTimeouts,
};
use hybrec_domain::weights::FusionWeights;

use crate::{Error, Result};

/// Per-request overrides of the `[recommend]` defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendOptions {
	pub max_results: Option<u32>,
	pub signal_weights: Option<BTreeMap<String, f64>>,
	pub graph_traversal_depth: Option<u32>,
	/// Budget for the whole LLM stage. The per-call timeout never exceeds it.
	pub llm_timeout_ms: Option<u64>,
	pub confidence_thresholds: Option<ConfidenceThresholds>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfidenceThresholds {
	pub high_min_sources: Option<u32>,
	pub medium_min_sources: Option<u32>,
	pub high_max_dispersion: Option<f64>,
	pub medium_max_dispersion: Option<f64>,
}

/// Effective, validated settings for one `recommend` call.
#[derive(Clone, Debug)]
pub struct ResolvedOptions {
	pub max_results: usize,
	pub candidate_pool_limit: u32,
	pub weights: FusionWeights,
	pub graph: RecommendGraph,
	pub timeouts: RecommendTimeouts,
	pub llm: RecommendLlm,
	pub confidence: RecommendConfidence,
	pub collaborative: RecommendCollaborative,
	pub content: RecommendContent,
	/// blake3 of the resolved settings, hex encoded.
	pub policy_hash: String,
}
impl ResolvedOptions {
	pub fn resolve(defaults: &Recommend, options: &RecommendOptions) -> Result<Self> {
		let mut recommend = defaults.clone();

		if let Some(max_results) = options.max_results {
			recommend.max_results = max_results;
		}
		if let Some(weights) = &options.signal_weights {
			recommend.signal_weights = weights
				.iter()
				.map(|(name, weight)| (name.trim().to_ascii_lowercase(), *weight))
				.collect();
		}
		if let Some(depth) = options.graph_traversal_depth {
			recommend.graph.traversal_depth = depth;
		}
		if let Some(llm_timeout_ms) = options.llm_timeout_ms {
			recommend.timeouts.llm_batch_ms = llm_timeout_ms;
			recommend.timeouts.llm_call_ms = recommend.timeouts.llm_call_ms.min(llm_timeout_ms);
		}
		if let Some(thresholds) = &options.confidence_thresholds {
			let confidence = &mut recommend.confidence;

			if let Some(value) = thresholds.high_min_sources {
				confidence.high_min_sources = value;
			}
			if let Some(value) = thresholds.medium_min_sources {
				confidence.medium_min_sources = value;
			}
			if let Some(value) = thresholds.high_max_dispersion {
				confidence.high_max_dispersion = value;
			}
			if let Some(value) = thresholds.medium_max_dispersion {
				confidence.medium_max_dispersion = value;
			}
		}

		hybrec_config::validate_recommend(&recommend)?;

		let weights = FusionWeights::from_map(&recommend.signal_weights)?;
		let policy_hash = policy_hash(&recommend)?;

		Ok(Self {
			max_results: recommend.max_results as usize,
			candidate_pool_limit: recommend.candidate_pool_limit,
			weights,
			graph: recommend.graph,
			timeouts: recommend.timeouts,
			llm: recommend.llm,
			confidence: recommend.confidence,
			collaborative: recommend.collaborative,
			content: recommend.content,
			policy_hash,
		})
	}
}

fn policy_hash(recommend: &Recommend) -> Result<String> {
	let snapshot = serde_json::to_vec(recommend).map_err(|err| Error::Configuration {
		message: format!("Failed to encode policy snapshot: {err}."),
	})?;

	Ok(blake3::hash(&snapshot).to_hex().to_string())
}
