//! The four signal scorers.
//!
//! Each scorer returns a [`SignalOutcome`]. A candidate missing from a reported score map is
//! absent for that signal, which fusion treats differently from a reported zero.

pub mod collaborative;
pub mod content;
pub mod graph;
pub mod llm;

pub use collaborative::CollaborativeScorer;
pub use content::ContentScorer;
pub use graph::GraphScorer;
pub use llm::LlmScorer;

use std::{collections::BTreeMap, time::Duration};

use tokio::time::Instant;

use hybrec_domain::{
	candidate::CandidateEntity,
	query::Query,
	signal::{SignalScore, SignalScores, SignalSource, max_normalize},
};

use crate::{BoxFuture, KeywordMatch, ResolvedOptions, recommend::AbsentReason};

/// Everything a scorer may read for one request. Read-only.
pub struct ScoringContext<'a> {
	pub query: &'a Query,
	pub candidates: &'a [CandidateEntity],
	pub resolved: &'a [KeywordMatch],
	pub options: &'a ResolvedOptions,
	/// Hard stop for the whole request.
	pub deadline: Instant,
}

#[derive(Clone, Debug)]
pub enum SignalOutcome {
	Reported(SignalScores),
	Absent(AbsentReason),
	Unavailable(String),
	TimedOut,
}

pub trait Scorer
where
	Self: Send + Sync,
{
	const SOURCE: SignalSource;

	fn score<'a>(&'a self, ctx: &'a ScoringContext<'a>) -> BoxFuture<'a, SignalOutcome>;
}

/// `base + budget_ms`, saturating at [`hybrec_config::MAX_TIMEOUT_MS`] past `base`.
pub fn deadline_after(base: Instant, budget_ms: u64) -> Instant {
	let budget = Duration::from_millis(budget_ms.min(hybrec_config::MAX_TIMEOUT_MS));

	base.checked_add(budget).unwrap_or(base)
}

/// Category and task identifiers for the request: keyword resolutions plus explicit hints.
///
/// Hints may be bare ids (treated as categories) or `<kind>:<id>` node ids.
pub fn resolved_targets(query: &Query, resolved: &[KeywordMatch]) -> BTreeMap<String, f64> {
	let mut out = BTreeMap::<String, f64>::new();

	for matched in resolved {
		*out.entry(matched.node_id()).or_default() += matched.weight;
	}
	for hint in query.normalized_hints() {
		let node = match hybrec_domain::graph::split_node_id(&hint) {
			Some(_) => hint,
			None => hybrec_domain::graph::node_id(hybrec_domain::graph::CATEGORY, &hint),
		};

		out.insert(node, 1.0);
	}

	for weight in out.values_mut() {
		*weight = weight.min(1.0);
	}

	out
}

/// Max-normalizes `raw`. When every raw score is zero the candidates still report zero.
pub(crate) fn normalize_or_zero(raw: BTreeMap<String, f64>) -> SignalScores {
	let normalized = max_normalize(raw.clone());

	if !normalized.is_empty() {
		return normalized;
	}

	raw.into_keys().map(|candidate_id| (candidate_id, SignalScore::new(0.0, 0.0))).collect()
}
