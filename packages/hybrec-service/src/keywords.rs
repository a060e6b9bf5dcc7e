use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use hybrec_domain::{graph, text};
use hybrec_storage::models::KeywordMapping;

use crate::{KeywordSource, Result};

/// A keyword row that matched the query text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
	/// Either "category" or "task".
	pub target_kind: String,
	pub target_id: String,
	pub keyword: String,
	pub weight: f64,
}
impl KeywordMatch {
	pub fn node_id(&self) -> String {
		graph::node_id(&self.target_kind, &self.target_id)
	}
}

#[derive(Clone, Debug)]
struct KeywordEntry {
	target_kind: String,
	target_id: String,
	keyword: String,
	keyword_norm: String,
	weight: f64,
	effective_from: OffsetDateTime,
	effective_to: Option<OffsetDateTime>,
}

#[derive(Debug, Default)]
struct Snapshot {
	entries: Vec<KeywordEntry>,
	loaded_at: Option<OffsetDateTime>,
}

/// In-process cache of active keyword mappings.
///
/// Readers clone the current `Arc<Snapshot>` and never hold the lock while matching. `reload`
/// builds a complete snapshot before swapping it in, so a reader sees either the old or the new
/// set of rows.
pub struct KeywordStore {
	source: Arc<dyn KeywordSource>,
	snapshot: RwLock<Arc<Snapshot>>,
	min_weight: f64,
}
impl KeywordStore {
	pub fn new(source: Arc<dyn KeywordSource>, min_weight: f64) -> Self {
		Self { source, snapshot: RwLock::new(Arc::new(Snapshot::default())), min_weight }
	}

	pub fn is_loaded(&self) -> bool {
		self.current().loaded_at.is_some()
	}

	/// Refreshes the cache from the backing store and returns the number of cached rows.
	///
	/// On failure the previous snapshot stays in place.
	pub async fn reload(&self) -> Result<usize> {
		let now = OffsetDateTime::now_utc();
		let rows = self.source.active_keywords(now).await?;
		let snapshot = build_snapshot(rows, self.min_weight, now);
		let count = snapshot.entries.len();
		let mut guard = self.snapshot.write().unwrap_or_else(|err| err.into_inner());

		*guard = Arc::new(snapshot);

		tracing::debug!(rows = count, "Keyword mappings reloaded.");

		Ok(count)
	}

	pub fn resolve(&self, input: &str) -> Vec<KeywordMatch> {
		self.resolve_at(input, OffsetDateTime::now_utc())
	}

	/// Matches `input` against the rows active at `at`.
	///
	/// Matching is case-insensitive and whitespace-normalized; a keyword matches when it starts on
	/// a word boundary of the input. Every matching row is returned, including several rows for
	/// the same keyword.
	pub fn resolve_at(&self, input: &str, at: OffsetDateTime) -> Vec<KeywordMatch> {
		let normalized = text::normalize_text(input);

		if normalized.is_empty() {
			return Vec::new();
		}

		let snapshot = self.current();

		snapshot
			.entries
			.iter()
			.filter(|entry| {
				entry.effective_from <= at && entry.effective_to.is_none_or(|end| end > at)
			})
			.filter(|entry| text::matches_at_word_start(&normalized, &entry.keyword_norm))
			.map(|entry| KeywordMatch {
				target_kind: entry.target_kind.clone(),
				target_id: entry.target_id.clone(),
				keyword: entry.keyword.clone(),
				weight: entry.weight,
			})
			.collect()
	}

	fn current(&self) -> Arc<Snapshot> {
		self.snapshot.read().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

fn build_snapshot(rows: Vec<KeywordMapping>, min_weight: f64, now: OffsetDateTime) -> Snapshot {
	let mut entries = rows
		.into_iter()
		.filter(|row| f64::from(row.weight) >= min_weight)
		.filter_map(|row| {
			let keyword_norm = text::normalize_text(&row.keyword_norm);

			if keyword_norm.is_empty() {
				return None;
			}

			Some(KeywordEntry {
				target_kind: row.target_kind,
				target_id: row.target_id,
				keyword: row.keyword,
				keyword_norm,
				weight: f64::from(row.weight),
				effective_from: row.effective_from,
				effective_to: row.effective_to,
			})
		})
		.collect::<Vec<_>>();

	entries.sort_by(|a, b| {
		(&a.target_kind, &a.target_id, &a.keyword_norm, a.effective_from).cmp(&(
			&b.target_kind,
			&b.target_id,
			&b.keyword_norm,
			b.effective_from,
		))
	});

	Snapshot { entries, loaded_at: Some(now) }
}
