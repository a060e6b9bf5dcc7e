use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{
	sync::Semaphore,
	task::JoinSet,
	time::{self, Instant},
};

use hybrec_config::{LlmProviderConfig, RecommendLlm};
use hybrec_domain::{
	candidate::CandidateEntity,
	query::Query,
	signal::{SignalScore, SignalScores, SignalSource},
};
use hybrec_providers::llm::{self as llm_parse, Judgment};

use crate::{
	BoxFuture, LlmProvider,
	recommend::AbsentReason,
	scoring::{Scorer, ScoringContext, SignalOutcome, deadline_after},
};

enum CallOutcome {
	Answered(Judgment),
	Malformed(String),
	Failed(String),
	TimedOut,
}

/// Asks the model for a bounded relevance judgment on each shortlisted candidate.
///
/// `ctx.candidates` must already be the shortlist. Calls run concurrently up to
/// `max_concurrency`, each under the per-call timeout, and the whole batch under the batch
/// timeout. Candidates without a usable answer are absent from the result.
pub struct LlmScorer {
	llm: Arc<dyn LlmProvider>,
	cfg: Arc<LlmProviderConfig>,
}
impl LlmScorer {
	pub fn new(llm: Arc<dyn LlmProvider>, cfg: LlmProviderConfig) -> Self {
		Self { llm, cfg: Arc::new(cfg) }
	}
}
impl Scorer for LlmScorer {
	const SOURCE: SignalSource = SignalSource::Llm;

	fn score<'a>(&'a self, ctx: &'a ScoringContext<'a>) -> BoxFuture<'a, SignalOutcome> {
		Box::pin(async move {
			if ctx.candidates.is_empty() {
				return SignalOutcome::Absent(AbsentReason::NoShortlist);
			}

			let settings = &ctx.options.llm;
			let timeouts = &ctx.options.timeouts;
			let semaphore = Arc::new(Semaphore::new(settings.max_concurrency as usize));
			let call_timeout = Duration::from_millis(timeouts.llm_call_ms);
			let deadline = deadline_after(Instant::now(), timeouts.llm_batch_ms).min(ctx.deadline);
			let score_max = settings.score_max;
			let mut tasks = JoinSet::new();

			for candidate in ctx.candidates {
				let messages = build_messages(ctx.query, candidate, settings);
				let candidate_id = candidate.candidate_id.clone();
				let llm = self.llm.clone();
				let cfg = self.cfg.clone();
				let semaphore = semaphore.clone();

				tasks.spawn(async move {
					let Ok(_permit) = semaphore.acquire_owned().await else {
						let outcome = CallOutcome::Failed("Semaphore closed.".to_string());

						return (candidate_id, outcome);
					};
					let call = llm.complete(&cfg, &messages);
					let outcome = match time::timeout(call_timeout, call).await {
						Err(_) => CallOutcome::TimedOut,
						Ok(Err(err)) => CallOutcome::Failed(err.to_string()),
						Ok(Ok(text)) => match llm_parse::parse_judgment(&text, score_max) {
							Ok(judgment) => CallOutcome::Answered(judgment),
							Err(err) => CallOutcome::Malformed(err.to_string()),
						},
					};

					(candidate_id, outcome)
				});
			}

			let mut scores = SignalScores::new();
			let mut malformed = 0_usize;
			let mut failed = 0_usize;
			let mut timed_out = 0_usize;

			loop {
				let joined = match time::timeout_at(deadline, tasks.join_next()).await {
					Ok(Some(joined)) => joined,
					Ok(None) => break,
					Err(_) => {
						timed_out += tasks.len();

						tasks.abort_all();

						break;
					},
				};

				match joined {
					Ok((candidate_id, CallOutcome::Answered(judgment))) => {
						let normalized = judgment.score / score_max;
						let mut score = SignalScore::new(judgment.score, normalized);

						if !judgment.rationale.is_empty() {
							score = score.with_rationale(judgment.rationale);
						}

						scores.insert(candidate_id, score);
					},
					Ok((candidate_id, CallOutcome::Malformed(error))) => {
						malformed += 1;

						tracing::warn!(
							signal = "llm",
							candidate_id = %candidate_id,
							error = %error,
							"Malformed LLM judgment. Treating the candidate as unscored."
						);
					},
					Ok((candidate_id, CallOutcome::Failed(error))) => {
						failed += 1;

						tracing::warn!(
							signal = "llm",
							candidate_id = %candidate_id,
							error = %error,
							"LLM call failed."
						);
					},
					Ok((_, CallOutcome::TimedOut)) => timed_out += 1,
					Err(err) => {
						failed += 1;

						tracing::warn!(signal = "llm", error = %err, "LLM task failed.");
					},
				}
			}

			tracing::debug!(
				answered = scores.len(),
				malformed,
				failed,
				timed_out,
				"LLM batch finished."
			);

			if !scores.is_empty() {
				return SignalOutcome::Reported(scores);
			}
			if malformed == 0 && failed == 0 {
				return SignalOutcome::TimedOut;
			}

			SignalOutcome::Unavailable(format!(
				"No usable LLM judgments (malformed={malformed}, failed={failed}, \
				 timed_out={timed_out})."
			))
		})
	}
}

fn build_messages(
	query: &Query,
	candidate: &CandidateEntity,
	settings: &RecommendLlm,
) -> Vec<Value> {
	let description =
		truncate_chars(&candidate.description, settings.max_description_chars as usize);
	let system = format!(
		"You judge how well a catalog entry satisfies a business requirement. \
Reply with only a JSON object {{\"score\": <number from 0 to {max}>, \"rationale\": \"<one short sentence>\"}}. \
Use higher scores for better fits.",
		max = settings.score_max
	);
	let user = serde_json::json!({
		"requirement": query.text.trim(),
		"hints": query.normalized_hints(),
		"candidate": {
			"id": candidate.candidate_id,
			"kind": candidate.kind,
			"name": candidate.display_name,
			"tags": candidate.tags,
			"description": description,
			"attributes": candidate.attributes,
		},
	});

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user.to_string() }),
	]
}

fn truncate_chars(input: &str, max_chars: usize) -> &str {
	match input.char_indices().nth(max_chars) {
		Some((idx, _)) => &input[..idx],
		None => input,
	}
}
