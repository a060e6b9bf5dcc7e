use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use hybrec_config::EmbeddingProviderConfig;
use hybrec_domain::{candidate::CandidateEntity, signal::SignalSource, text};

use crate::{
	BoxFuture, EmbeddingProvider,
	recommend::AbsentReason,
	scoring::{Scorer, ScoringContext, SignalOutcome, normalize_or_zero},
};

type TermVector = BTreeMap<String, f64>;

/// Lexical TF-IDF cosine between the query and each candidate, blended with embedding cosine when
/// the candidate carries a vector and the query can be embedded.
pub struct ContentScorer {
	embedding: Arc<dyn EmbeddingProvider>,
	cfg: EmbeddingProviderConfig,
}
impl ContentScorer {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, cfg: EmbeddingProviderConfig) -> Self {
		Self { embedding, cfg }
	}

	async fn query_embedding(
		&self,
		query_text: &str,
		candidates: &[CandidateEntity],
	) -> Option<Vec<f32>> {
		if !self.cfg.enabled || !candidates.iter().any(|candidate| candidate.embedding.is_some()) {
			return None;
		}

		let texts = vec![query_text.to_string()];

		match self.embedding.embed(&self.cfg, &texts).await {
			Ok(mut vectors) => vectors.pop().filter(|vec| !vec.is_empty()),
			Err(err) => {
				tracing::warn!(
					signal = "content",
					error = %err,
					"Query embedding failed. Falling back to lexical similarity."
				);

				None
			},
		}
	}
}
impl Scorer for ContentScorer {
	const SOURCE: SignalSource = SignalSource::Content;

	fn score<'a>(&'a self, ctx: &'a ScoringContext<'a>) -> BoxFuture<'a, SignalOutcome> {
		Box::pin(async move {
			if ctx.candidates.is_empty() {
				return SignalOutcome::Absent(AbsentReason::EmptyPool);
			}

			let query_text = query_text(ctx);
			let min_chars = ctx.options.content.min_token_chars as usize;
			let query_terms = text::tokenize(&query_text, min_chars);

			if query_terms.is_empty() {
				return SignalOutcome::Absent(AbsentReason::EmptyQuery);
			}

			let lexical = tfidf_cosine(&query_terms, ctx.candidates, min_chars);
			let query_vec = self.query_embedding(&query_text, ctx.candidates).await;
			let embedding_weight = ctx.options.content.embedding_weight;
			let mut raw = BTreeMap::new();

			for candidate in ctx.candidates {
				let lexical_score = lexical.get(&candidate.candidate_id).copied().unwrap_or(0.0);
				let semantic = query_vec
					.as_deref()
					.zip(candidate.embedding.as_deref())
					.and_then(|(query, doc)| cosine_dense(query, doc));
				let blended = match semantic {
					Some(semantic) =>
						embedding_weight * semantic + (1.0 - embedding_weight) * lexical_score,
					None => lexical_score,
				};

				raw.insert(candidate.candidate_id.clone(), blended);
			}

			SignalOutcome::Reported(normalize_or_zero(raw))
		})
	}
}

fn query_text(ctx: &ScoringContext<'_>) -> String {
	let mut out = ctx.query.text.clone();

	for hint in ctx.query.normalized_hints() {
		let id = hybrec_domain::graph::split_node_id(&hint).map(|(_, id)| id).unwrap_or(&hint);

		out.push(' ');
		out.push_str(&id.replace(['_', '-'], " "));
	}

	out
}

/// Smoothed TF-IDF cosine of the query against every candidate's searchable text.
fn tfidf_cosine(
	query_terms: &[String],
	candidates: &[CandidateEntity],
	min_chars: usize,
) -> BTreeMap<String, f64> {
	let docs = candidates
		.iter()
		.map(|candidate| {
			let terms = text::tokenize(&candidate.searchable_text(), min_chars);

			(candidate.candidate_id.as_str(), terms)
		})
		.collect::<Vec<_>>();
	let mut document_frequency = BTreeMap::<&str, usize>::new();

	for (_, terms) in &docs {
		for term in terms.iter().collect::<BTreeSet<_>>() {
			*document_frequency.entry(term.as_str()).or_default() += 1;
		}
	}

	let total = docs.len() as f64;
	let idf = |term: &str| {
		let df = document_frequency.get(term).copied().unwrap_or(0) as f64;

		((1.0 + total) / (1.0 + df)).ln() + 1.0
	};
	let weigh = |terms: &[String]| -> TermVector {
		let mut tf = TermVector::new();

		for term in terms {
			*tf.entry(term.clone()).or_default() += 1.0;
		}
		for (term, value) in tf.iter_mut() {
			*value *= idf(term);
		}

		tf
	};
	let query_vec = weigh(query_terms);

	docs.iter()
		.map(|(candidate_id, terms)| {
			(candidate_id.to_string(), cosine_sparse(&query_vec, &weigh(terms)))
		})
		.collect()
}

fn cosine_sparse(a: &TermVector, b: &TermVector) -> f64 {
	let dot: f64 = a.iter().filter_map(|(term, x)| b.get(term).map(|y| x * y)).sum();
	let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
	let norm_b = b.values().map(|x| x * x).sum::<f64>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { (dot / (norm_a * norm_b)).clamp(0.0, 1.0) }
}

/// Cosine similarity clamped to 0.0-1.0. `None` on dimension mismatch or zero vectors.
fn cosine_dense(a: &[f32], b: &[f32]) -> Option<f64> {
	if a.len() != b.len() || a.is_empty() {
		return None;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return None;
	}

	Some((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0))
}
