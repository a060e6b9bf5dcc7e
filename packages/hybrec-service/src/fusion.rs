use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};

use hybrec_config::RecommendConfidence;
use hybrec_domain::{
	candidate::CandidateEntity,
	signal::{SignalScores, SignalSource},
	weights::FusionWeights,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
	Low,
	Medium,
	High,
}

/// How one signal contributed to a candidate's final score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
	pub source: SignalSource,
	pub raw: f64,
	pub normalized: f64,
	pub effective_weight: f64,
	/// `effective_weight * normalized`.
	pub contribution: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
	pub candidate_id: String,
	pub display_name: String,
	/// Within 0.0-1.0.
	pub score: f64,
	pub confidence: ConfidenceLevel,
	/// Population standard deviation of the reporting signals' normalized scores.
	pub dispersion: f64,
	pub breakdown: Vec<SignalContribution>,
	pub rationale: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub llm_rationale: Option<String>,
}

/// Combines per-source scores into a ranked list.
///
/// Each candidate is scored only over the sources that reported for it, with weights
/// renormalized over those sources. Candidates no source reported on are dropped. When
/// `degraded` is set no result is labelled [`ConfidenceLevel::High`].
pub fn fuse(
	signals: &BTreeMap<SignalSource, SignalScores>,
	weights: &FusionWeights,
	candidates: &[CandidateEntity],
	confidence: &RecommendConfidence,
	degraded: bool,
) -> Vec<RecommendationResult> {
	let mut results = Vec::with_capacity(candidates.len());

	for candidate in candidates {
		let reported = signals
			.iter()
			.filter(|(source, scores)| {
				weights.get(**source) > 0.0 && scores.contains_key(&candidate.candidate_id)
			})
			.map(|(source, _)| *source)
			.collect::<Vec<_>>();
		let effective = weights.effective(&reported);

		if effective.is_empty() {
			continue;
		}

		let mut breakdown = Vec::with_capacity(effective.len());
		let mut llm_rationale = None;

		for (source, effective_weight) in effective {
			let Some(score) =
				signals.get(&source).and_then(|scores| scores.get(&candidate.candidate_id))
			else {
				continue;
			};

			if source == SignalSource::Llm {
				llm_rationale = score.rationale.clone();
			}

			breakdown.push(SignalContribution {
				source,
				raw: score.raw,
				normalized: score.normalized,
				effective_weight,
				contribution: effective_weight * score.normalized,
			});
		}

		let score = breakdown.iter().map(|item| item.contribution).sum::<f64>().clamp(0.0, 1.0);
		let normalized = breakdown.iter().map(|item| item.normalized).collect::<Vec<_>>();
		let dispersion = population_std_dev(&normalized);
		let mut level = confidence_level(normalized.len(), dispersion, confidence);

		if degraded {
			level = level.min(ConfidenceLevel::Medium);
		}

		let rationale = rationale(&breakdown, llm_rationale.as_deref());

		results.push(RecommendationResult {
			candidate_id: candidate.candidate_id.clone(),
			display_name: candidate.display_name.clone(),
			score,
			confidence: level,
			dispersion,
			breakdown,
			rationale,
			llm_rationale,
		});
	}

	results.sort_by(|a, b| {
		b.score
			.partial_cmp(&a.score)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.candidate_id.cmp(&b.candidate_id))
	});

	results
}

/// The lower of the coverage tier (how many sources reported) and the agreement tier (how far
/// their normalized scores spread).
pub fn confidence_level(
	sources: usize,
	dispersion: f64,
	thresholds: &RecommendConfidence,
) -> ConfidenceLevel {
	let coverage = if sources >= thresholds.high_min_sources as usize {
		ConfidenceLevel::High
	} else if sources >= thresholds.medium_min_sources as usize {
		ConfidenceLevel::Medium
	} else {
		ConfidenceLevel::Low
	};
	let agreement = if dispersion <= thresholds.high_max_dispersion {
		ConfidenceLevel::High
	} else if dispersion <= thresholds.medium_max_dispersion {
		ConfidenceLevel::Medium
	} else {
		ConfidenceLevel::Low
	};

	coverage.min(agreement)
}

pub fn population_std_dev(values: &[f64]) -> f64 {
	if values.len() < 2 {
		return 0.0;
	}

	let n = values.len() as f64;
	let mean = values.iter().sum::<f64>() / n;
	let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / n;

	variance.sqrt()
}

fn rationale(breakdown: &[SignalContribution], llm_rationale: Option<&str>) -> String {
	let mut ranked = breakdown.iter().collect::<Vec<_>>();

	ranked.sort_by(|a, b| {
		b.contribution
			.partial_cmp(&a.contribution)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.source.cmp(&b.source))
	});

	let parts = ranked
		.iter()
		.map(|item| format!("{} {:.2}", item.source, item.normalized))
		.collect::<Vec<_>>();
	let mut out = format!("Signals: {}.", parts.join(", "));

	if let Some(text) = llm_rationale {
		out.push(' ');
		out.push_str(text);
	}

	out
}
