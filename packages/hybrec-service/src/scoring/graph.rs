use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use hybrec_domain::{graph, signal::SignalSource};

use crate::{
	BoxFuture, GraphSource,
	recommend::AbsentReason,
	scoring::{Scorer, ScoringContext, SignalOutcome, normalize_or_zero, resolved_targets},
};

/// Bounded breadth-first traversal from the query's category and task nodes to candidate nodes.
///
/// A path contributes `seed_weight * prod(edge_weight * edge_type_weight) * hop_decay^(hops - 1)`.
/// A node is scored at the hop that first reaches it, summing every path of that length. Each hop
/// expands at most `max_fanout` edges per node and the traversal stops after `traversal_depth`
/// hops or once `max_visited` distinct nodes are known.
pub struct GraphScorer {
	graph: Arc<dyn GraphSource>,
}
impl GraphScorer {
	pub fn new(graph: Arc<dyn GraphSource>) -> Self {
		Self { graph }
	}
}
impl Scorer for GraphScorer {
	const SOURCE: SignalSource = SignalSource::Graph;

	fn score<'a>(&'a self, ctx: &'a ScoringContext<'a>) -> BoxFuture<'a, SignalOutcome> {
		Box::pin(async move {
			if ctx.candidates.is_empty() {
				return SignalOutcome::Absent(AbsentReason::EmptyPool);
			}

			let seeds = resolved_targets(ctx.query, ctx.resolved)
				.into_iter()
				.filter(|(_, weight)| *weight > 0.0)
				.collect::<BTreeMap<_, _>>();

			if seeds.is_empty() {
				return SignalOutcome::Absent(AbsentReason::NoSeeds);
			}

			let settings = &ctx.options.graph;
			let edge_types = settings
				.edge_type_weights
				.iter()
				.filter(|(_, weight)| **weight > 0.0)
				.map(|(edge_type, _)| edge_type.clone())
				.collect::<Vec<_>>();
			let pool = ctx
				.candidates
				.iter()
				.map(|candidate| candidate.candidate_id.as_str())
				.collect::<BTreeSet<_>>();
			let max_visited = settings.max_visited as usize;
			let mut visited = seeds.keys().cloned().collect::<BTreeSet<_>>();
			let mut frontier = seeds;
			let mut reached = BTreeMap::<String, f64>::new();
			let mut hop_factor = 1.0_f64;

			for _ in 0..settings.traversal_depth {
				if frontier.is_empty() {
					break;
				}

				let nodes = frontier.keys().cloned().collect::<Vec<_>>();
				let expand = self.graph.expand(&nodes, &edge_types, settings.max_fanout);
				let edges = match expand.await {
					Ok(edges) => edges,
					Err(err) => {
						tracing::warn!(signal = "graph", error = %err, "Graph signal unavailable.");

						return SignalOutcome::Unavailable(err.to_string());
					},
				};
				let mut next = BTreeMap::<String, f64>::new();
				let mut scored = BTreeSet::<String>::new();

				for edge in edges {
					let Some(from_score) = frontier.get(&edge.node) else { continue };
					let type_weight =
						settings.edge_type_weights.get(&edge.edge_type).copied().unwrap_or(0.0);
					let path = from_score * f64::from(edge.weight) * type_weight * hop_factor;

					if path <= 0.0 || visited.contains(&edge.neighbor) {
						continue;
					}
					if let Some(candidate_id) = graph::candidate_id_of(&edge.neighbor)
						&& pool.contains(candidate_id)
					{
						*reached.entry(candidate_id.to_string()).or_default() += path;

						scored.insert(edge.neighbor.clone());
					}
					if next.contains_key(&edge.neighbor) || visited.len() + next.len() < max_visited
					{
						*next.entry(edge.neighbor).or_default() += path;
					}
				}

				// Candidates past the visit budget are scored but not expanded.
				visited.extend(scored);
				visited.extend(next.keys().cloned());

				frontier = next;
				hop_factor = settings.hop_decay;
			}

			let raw = ctx
				.candidates
				.iter()
				.map(|candidate| {
					let score = reached.get(&candidate.candidate_id).copied().unwrap_or(0.0);

					(candidate.candidate_id.clone(), score.min(1.0))
				})
				.collect::<BTreeMap<_, _>>();

			SignalOutcome::Reported(normalize_or_zero(raw))
		})
	}
}
