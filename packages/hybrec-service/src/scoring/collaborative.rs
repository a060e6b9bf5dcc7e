use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use time::{Duration, OffsetDateTime};

use hybrec_config::MAX_HISTORY_WINDOW_DAYS;
use hybrec_domain::signal::SignalSource;
use hybrec_storage::models::InteractionEvent;

use crate::{
	BoxFuture, InteractionSource,
	recommend::AbsentReason,
	scoring::{Scorer, ScoringContext, SignalOutcome, normalize_or_zero, resolved_targets},
};

/// Scores candidates from accepted past selections under the query's resolved categories.
///
/// A candidate earns one point per accepted selection plus `co_selection_weight` per session in
/// which it was accepted together with a seed candidate (a pool candidate tagged with one of the
/// resolved categories).
pub struct CollaborativeScorer {
	interactions: Arc<dyn InteractionSource>,
}
impl CollaborativeScorer {
	pub fn new(interactions: Arc<dyn InteractionSource>) -> Self {
		Self { interactions }
	}
}
impl Scorer for CollaborativeScorer {
	const SOURCE: SignalSource = SignalSource::Collaborative;

	fn score<'a>(&'a self, ctx: &'a ScoringContext<'a>) -> BoxFuture<'a, SignalOutcome> {
		Box::pin(async move {
			if ctx.candidates.is_empty() {
				return SignalOutcome::Absent(AbsentReason::EmptyPool);
			}

			let categories = resolved_targets(ctx.query, ctx.resolved)
				.into_keys()
				.filter_map(|node| {
					hybrec_domain::graph::split_node_id(&node).map(|(_, id)| id.to_string())
				})
				.collect::<BTreeSet<_>>()
				.into_iter()
				.collect::<Vec<_>>();

			if categories.is_empty() {
				return SignalOutcome::Absent(AbsentReason::ColdStart);
			}

			let settings = &ctx.options.collaborative;
			let window = settings.history_window_days.clamp(1, MAX_HISTORY_WINDOW_DAYS);
			let since = OffsetDateTime::now_utc()
				.checked_sub(Duration::days(window))
				.unwrap_or(OffsetDateTime::UNIX_EPOCH);
			let fetch = self.interactions.interactions(&categories, since, settings.max_events);
			let events = match fetch.await {
				Ok(events) => events,
				Err(err) => {
					tracing::warn!(
						signal = "collaborative",
						error = %err,
						"Collaborative signal unavailable."
					);

					return SignalOutcome::Unavailable(err.to_string());
				},
			};

			match co_selection_scores(ctx, &categories, &events, settings.co_selection_weight) {
				Some(raw) => SignalOutcome::Reported(normalize_or_zero(raw)),
				None => SignalOutcome::Absent(AbsentReason::ColdStart),
			}
		})
	}
}

/// Returns `None` when no accepted event matches the categories.
fn co_selection_scores(
	ctx: &ScoringContext<'_>,
	categories: &[String],
	events: &[InteractionEvent],
	co_selection_weight: f64,
) -> Option<BTreeMap<String, f64>> {
	let category_set = categories.iter().map(String::as_str).collect::<BTreeSet<_>>();
	let mut sessions = BTreeMap::<&str, BTreeSet<&str>>::new();
	let mut direct = BTreeMap::<&str, f64>::new();

	for event in events {
		if !event.accepted
			|| !event.categories.iter().any(|category| category_set.contains(category.as_str()))
		{
			continue;
		}

		sessions.entry(event.session_id.as_str()).or_default().insert(event.candidate_id.as_str());

		*direct.entry(event.candidate_id.as_str()).or_default() += 1.0;
	}

	if sessions.is_empty() {
		return None;
	}

	let seeds = ctx
		.candidates
		.iter()
		.filter(|candidate| categories.iter().any(|category| candidate.has_tag(category)))
		.map(|candidate| candidate.candidate_id.as_str())
		.collect::<BTreeSet<_>>();
	let mut co_selected = BTreeMap::<&str, f64>::new();

	for selected in sessions.values() {
		for candidate_id in selected {
			if selected.iter().any(|other| other != candidate_id && seeds.contains(other)) {
				*co_selected.entry(*candidate_id).or_default() += 1.0;
			}
		}
	}

	Some(
		ctx.candidates
			.iter()
			.map(|candidate| {
				let id = candidate.candidate_id.as_str();
				let score = direct.get(id).copied().unwrap_or(0.0)
					+ co_selection_weight * co_selected.get(id).copied().unwrap_or(0.0);

				(candidate.candidate_id.clone(), score)
			})
			.collect(),
	)
}
