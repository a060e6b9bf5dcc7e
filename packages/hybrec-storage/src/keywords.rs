use sqlx::{Connection, PgConnection};
use time::OffsetDateTime;
use uuid::Uuid;

use hybrec_domain::text;

use crate::{
	Error, Result,
	models::{KeywordMapping, NewKeywordMapping},
};

const TARGET_KINDS: [&str; 2] = ["category", "task"];

pub fn normalize_keyword(input: &str) -> String {
	text::normalize_text(input)
}

/// Keyword rows whose `[effective_from, effective_to)` window contains `now`.
pub async fn list_active_keywords(
	executor: &mut PgConnection,
	now: OffsetDateTime,
) -> Result<Vec<KeywordMapping>> {
	let rows = sqlx::query_as::<_, KeywordMapping>(
		"\
SELECT
	mapping_id,
	target_kind,
	target_id,
	keyword,
	keyword_norm,
	weight,
	effective_from,
	effective_to,
	created_at
FROM keyword_mappings
WHERE effective_from <= $1
	AND (effective_to IS NULL OR effective_to > $1)
ORDER BY target_kind, target_id, keyword_norm, mapping_id",
	)
	.bind(now)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}

/// Replaces the mapping for `(target_kind, target_id, keyword)`.
///
/// The currently open row for the same key is closed at the new row's `effective_from` and the
/// new row is inserted in the same transaction, so at most one row is active at any instant.
pub async fn upsert_keyword_mapping(
	executor: &mut PgConnection,
	input: &NewKeywordMapping,
) -> Result<KeywordMapping> {
	let target_kind = input.target_kind.trim();
	let target_id = input.target_id.trim();
	let keyword = input.keyword.trim();
	let keyword_norm = normalize_keyword(keyword);

	if !TARGET_KINDS.contains(&target_kind) {
		return Err(Error::InvalidArgument(format!(
			"keyword target_kind must be one of {TARGET_KINDS:?}; got {target_kind:?}"
		)));
	}
	if target_id.is_empty() {
		return Err(Error::InvalidArgument("keyword target_id must not be empty".to_string()));
	}
	if keyword_norm.is_empty() {
		return Err(Error::InvalidArgument("keyword must not be empty".to_string()));
	}
	if !input.weight.is_finite() || !(0.0..=1.0).contains(&input.weight) {
		return Err(Error::InvalidArgument(
			"keyword weight must be in the range 0.0-1.0".to_string(),
		));
	}
	if input.effective_to.is_some_and(|end| end <= input.effective_from) {
		return Err(Error::InvalidArgument(
			"keyword effective_to must be later than effective_from".to_string(),
		));
	}

	let mut tx = executor.begin().await?;
	let open: Option<(Uuid, OffsetDateTime)> = sqlx::query_as(
		"\
SELECT mapping_id, effective_from
FROM keyword_mappings
WHERE target_kind = $1 AND target_id = $2 AND keyword_norm = $3 AND effective_to IS NULL
FOR UPDATE",
	)
	.bind(target_kind)
	.bind(target_id)
	.bind(&keyword_norm)
	.fetch_optional(&mut *tx)
	.await?;

	if let Some((mapping_id, open_from)) = open {
		if open_from >= input.effective_from {
			return Err(Error::Conflict(format!(
				"open keyword mapping starts at or after the new row; mapping_id={mapping_id}"
			)));
		}

		sqlx::query("UPDATE keyword_mappings SET effective_to = $2 WHERE mapping_id = $1")
			.bind(mapping_id)
			.bind(input.effective_from)
			.execute(&mut *tx)
			.await?;
	}

	let overlapping: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM keyword_mappings
WHERE target_kind = $1
	AND target_id = $2
	AND keyword_norm = $3
	AND effective_to IS NOT NULL
	AND effective_to > $4
	AND ($5::timestamptz IS NULL OR effective_from < $5)",
	)
	.bind(target_kind)
	.bind(target_id)
	.bind(&keyword_norm)
	.bind(input.effective_from)
	.bind(input.effective_to)
	.fetch_one(&mut *tx)
	.await?;

	if overlapping > 0 {
		return Err(Error::Conflict(format!(
			"keyword mapping window overlaps an existing row; target={target_kind}:{target_id} keyword={keyword_norm:?}"
		)));
	}

	let row = sqlx::query_as::<_, KeywordMapping>(
		"\
INSERT INTO keyword_mappings (
	mapping_id,
	target_kind,
	target_id,
	keyword,
	keyword_norm,
	weight,
	effective_from,
	effective_to
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
RETURNING
	mapping_id,
	target_kind,
	target_id,
	keyword,
	keyword_norm,
	weight,
	effective_from,
	effective_to,
	created_at",
	)
	.bind(Uuid::new_v4())
	.bind(target_kind)
	.bind(target_id)
	.bind(keyword)
	.bind(&keyword_norm)
	.bind(input.weight)
	.bind(input.effective_from)
	.bind(input.effective_to)
	.fetch_one(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(row)
}

/// Ends a mapping's effective window at `at`.
pub async fn retire_keyword_mapping(
	executor: &mut PgConnection,
	mapping_id: Uuid,
	at: OffsetDateTime,
) -> Result<KeywordMapping> {
	let row = sqlx::query_as::<_, KeywordMapping>(
		"\
UPDATE keyword_mappings
SET effective_to = $2
WHERE mapping_id = $1
	AND effective_from < $2
	AND (effective_to IS NULL OR effective_to > $2)
RETURNING
	mapping_id,
	target_kind,
	target_id,
	keyword,
	keyword_norm,
	weight,
	effective_from,
	effective_to,
	created_at",
	)
	.bind(mapping_id)
	.bind(at)
	.fetch_optional(&mut *executor)
	.await?;

	row.ok_or_else(|| {
		Error::NotFound(format!("retirable keyword mapping not found; mapping_id={mapping_id}"))
	})
}
