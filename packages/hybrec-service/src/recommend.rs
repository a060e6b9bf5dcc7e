use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use uuid::Uuid;

use hybrec_domain::{
	candidate::CandidateEntity,
	query::Query,
	signal::{SignalScores, SignalSource},
};

use crate::{
	KeywordMatch, RecommendOptions, RecommendService, ResolvedOptions, Result,
	fusion::{self, RecommendationResult},
	scoring::{
		CollaborativeScorer, ContentScorer, GraphScorer, LlmScorer, Scorer, ScoringContext,
		SignalOutcome, deadline_after,
	},
};

/// Why a signal produced no scores without failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentReason {
	/// The signal weight is zero.
	Disabled,
	EmptyQuery,
	EmptyPool,
	/// No interaction history for the query's categories.
	ColdStart,
	/// Nothing to start a graph traversal from.
	NoSeeds,
	NoShortlist,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignalStatus {
	Reported { candidates: usize },
	Absent { reason: AbsentReason },
	Unavailable { error: String },
	TimedOut,
}
impl SignalStatus {
	/// True when the signal was expected to report but failed or ran out of time.
	pub fn is_degraded(&self) -> bool {
		matches!(self, Self::Unavailable { .. } | Self::TimedOut)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
	pub source: SignalSource,
	#[serde(flatten)]
	pub status: SignalStatus,
	pub elapsed_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendOutcome {
	Ranked,
	/// The structured filters left no candidates.
	EmptyPool,
	/// Candidates existed but no signal could measure any of them, or the pool failed to load.
	NoViableCandidates,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendDiagnostics {
	pub policy_hash: String,
	pub pool_size: usize,
	pub resolved_keywords: Vec<KeywordMatch>,
	pub signals: Vec<SignalReport>,
	/// Set when confidence was capped because an enabled signal failed or timed out.
	pub degraded: bool,
	pub elapsed_ms: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub catalog_error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
	pub request_id: Uuid,
	pub outcome: RecommendOutcome,
	pub results: Vec<RecommendationResult>,
	pub diagnostics: RecommendDiagnostics,
}

struct StageResult {
	source: SignalSource,
	outcome: SignalOutcome,
	elapsed_ms: u64,
}

impl RecommendService {
	/// Ranks the candidate pool for `query`.
	///
	/// Only invalid options (`Error::Configuration`) and invalid filters (`Error::InvalidRequest`)
	/// fail the call, and both are rejected before any scoring. Every other failure degrades the
	/// affected signal and shows up in the diagnostics.
	pub async fn recommend(
		&self,
		query: &Query,
		options: &RecommendOptions,
	) -> Result<RecommendResponse> {
		let started = Instant::now();

		query.validate()?;

		let options = ResolvedOptions::resolve(&self.cfg.recommend, options)?;
		let request_id = Uuid::new_v4();
		let deadline = deadline_after(started, options.timeouts.global_ms);

		if !self.keywords.is_loaded() {
			let keywords_deadline =
				deadline_after(Instant::now(), options.timeouts.keywords_ms).min(deadline);

			match time::timeout_at(keywords_deadline, self.keywords.reload()).await {
				Ok(Ok(_)) => {},
				Ok(Err(err)) => {
					tracing::warn!(
						error = %err,
						"Keyword reload failed. Resolving without mappings."
					);
				},
				Err(_) => {
					tracing::warn!("Keyword reload timed out. Resolving without mappings.");
				},
			}
		}

		let resolved = self.keywords.resolve(&query.text);
		let (candidates, catalog_error) = self.load_pool(query, &options, deadline).await;

		if candidates.is_empty() {
			let outcome = if catalog_error.is_some() {
				RecommendOutcome::NoViableCandidates
			} else {
				RecommendOutcome::EmptyPool
			};
			let signals = SignalSource::ALL
				.into_iter()
				.map(|source| {
					let reason = if options.weights.get(source) > 0.0 {
						AbsentReason::EmptyPool
					} else {
						AbsentReason::Disabled
					};

					SignalReport { source, status: SignalStatus::Absent { reason }, elapsed_ms: 0 }
				})
				.collect::<Vec<_>>();

			tracing::info!(
				request_id = %request_id,
				outcome = ?outcome,
				elapsed_ms = elapsed_ms(started),
				"Recommendation finished with an empty pool."
			);

			return Ok(RecommendResponse {
				request_id,
				outcome,
				results: Vec::new(),
				diagnostics: RecommendDiagnostics {
					policy_hash: options.policy_hash,
					pool_size: 0,
					resolved_keywords: resolved,
					signals,
					degraded: false,
					elapsed_ms: elapsed_ms(started),
					catalog_error,
				},
			});
		}

		let ctx = ScoringContext {
			query,
			candidates: &candidates,
			resolved: &resolved,
			options: &options,
			deadline,
		};
		let content = ContentScorer::new(
			self.providers.embedding.clone(),
			self.cfg.providers.embedding.clone(),
		);
		let collaborative = CollaborativeScorer::new(self.sources.interactions.clone());
		let graph = GraphScorer::new(self.sources.graph.clone());
		let timeouts = &options.timeouts;
		let stage_deadline =
			|budget_ms: u64| deadline_after(Instant::now(), budget_ms).min(deadline);
		let (content, collaborative, graph) = tokio::join!(
			run_stage(&content, &ctx, stage_deadline(timeouts.content_ms)),
			run_stage(&collaborative, &ctx, stage_deadline(timeouts.collaborative_ms)),
			run_stage(&graph, &ctx, stage_deadline(timeouts.graph_ms)),
		);
		let mut stages = vec![collaborative, content, graph];
		let mut signals = reported_scores(&stages);
		let shortlist = shortlist(&candidates, &signals, &options);
		let llm_ctx = ScoringContext { candidates: &shortlist, ..ctx };
		let llm = LlmScorer::new(self.providers.llm.clone(), self.cfg.providers.llm.clone());
		// The scorer enforces the batch budget itself and keeps partial answers.
		let llm = run_stage(&llm, &llm_ctx, deadline).await;

		if let SignalOutcome::Reported(scores) = &llm.outcome {
			signals.insert(SignalSource::Llm, scores.clone());
		}

		stages.push(llm);

		let reports = stages
			.into_iter()
			.map(|stage| SignalReport {
				source: stage.source,
				status: status_of(stage.outcome),
				elapsed_ms: stage.elapsed_ms,
			})
			.collect::<Vec<_>>();
		let degraded = reports.iter().any(|report| report.status.is_degraded());
		let mut results =
			fusion::fuse(&signals, &options.weights, &candidates, &options.confidence, degraded);

		results.truncate(options.max_results);

		let outcome = if results.is_empty() {
			RecommendOutcome::NoViableCandidates
		} else {
			RecommendOutcome::Ranked
		};
		let elapsed = elapsed_ms(started);

		tracing::info!(
			request_id = %request_id,
			pool_size = candidates.len(),
			keywords = resolved.len(),
			results = results.len(),
			reported = signals.len(),
			degraded,
			elapsed_ms = elapsed,
			"Recommendation finished."
		);

		Ok(RecommendResponse {
			request_id,
			outcome,
			results,
			diagnostics: RecommendDiagnostics {
				policy_hash: options.policy_hash,
				pool_size: candidates.len(),
				resolved_keywords: resolved,
				signals: reports,
				degraded,
				elapsed_ms: elapsed,
				catalog_error: None,
			},
		})
	}

	/// Refreshes the keyword cache. Returns the number of cached rows.
	pub async fn reload_keywords(&self) -> Result<usize> {
		self.keywords.reload().await
	}

	async fn load_pool(
		&self,
		query: &Query,
		options: &ResolvedOptions,
		deadline: Instant,
	) -> (Vec<CandidateEntity>, Option<String>) {
		let limit = options.candidate_pool_limit;
		let load = self.sources.catalog.list_candidates(&query.filters, limit);
		let error = match time::timeout_at(deadline, load).await {
			Ok(Ok(mut candidates)) => {
				candidates.retain(|candidate| query.filters.matches(candidate));
				candidates.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));
				candidates.dedup_by(|a, b| a.candidate_id == b.candidate_id);

				return (candidates, None);
			},
			Ok(Err(err)) => err.to_string(),
			Err(_) => "Candidate pool load timed out.".to_string(),
		};

		tracing::warn!(error = %error, "Candidate pool unavailable.");

		(Vec::new(), Some(error))
	}
}

async fn run_stage<'a, S>(
	scorer: &'a S,
	ctx: &'a ScoringContext<'a>,
	deadline: Instant,
) -> StageResult
where
	S: Scorer,
{
	let source = S::SOURCE;

	if ctx.options.weights.get(source) <= 0.0 {
		return StageResult {
			source,
			outcome: SignalOutcome::Absent(AbsentReason::Disabled),
			elapsed_ms: 0,
		};
	}

	let started = Instant::now();
	let outcome = match time::timeout_at(deadline, scorer.score(ctx)).await {
		Ok(outcome) => outcome,
		Err(_) => {
			tracing::warn!(signal = source.as_str(), "Signal timed out.");

			SignalOutcome::TimedOut
		},
	};

	StageResult { source, outcome, elapsed_ms: elapsed_ms(started) }
}

fn reported_scores(stages: &[StageResult]) -> BTreeMap<SignalSource, SignalScores> {
	stages
		.iter()
		.filter_map(|stage| match &stage.outcome {
			SignalOutcome::Reported(scores) => Some((stage.source, scores.clone())),
			_ => None,
		})
		.collect()
}

/// The candidates sent to the LLM: the `top_n` best by the other signals, or the first `top_n`
/// by id when none of them reported.
fn shortlist(
	candidates: &[CandidateEntity],
	signals: &BTreeMap<SignalSource, SignalScores>,
	options: &ResolvedOptions,
) -> Vec<CandidateEntity> {
	let top_n = options.llm.top_n as usize;
	let preliminary =
		fusion::fuse(signals, &options.weights, candidates, &options.confidence, false);

	if preliminary.is_empty() {
		return candidates.iter().take(top_n).cloned().collect();
	}

	let by_id = candidates
		.iter()
		.map(|candidate| (candidate.candidate_id.as_str(), candidate))
		.collect::<BTreeMap<_, _>>();

	preliminary
		.iter()
		.take(top_n)
		.filter_map(|result| by_id.get(result.candidate_id.as_str()).map(|c| (*c).clone()))
		.collect()
}

fn status_of(outcome: SignalOutcome) -> SignalStatus {
	match outcome {
		SignalOutcome::Reported(scores) => SignalStatus::Reported { candidates: scores.len() },
		SignalOutcome::Absent(reason) => SignalStatus::Absent { reason },
		SignalOutcome::Unavailable(error) => SignalStatus::Unavailable { error },
		SignalOutcome::TimedOut => SignalStatus::TimedOut,
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
