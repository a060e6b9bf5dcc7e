use serde_json::Value;
use sqlx::PgConnection;

use hybrec_domain::{candidate::CandidateEntity, query::QueryFilters, text};

use crate::{Error, Result, models::CandidateRow};

/// Active candidates matching `filters`, ordered by id.
///
/// Filters are applied in SQL to bound the pool; callers re-check them in memory since location
/// normalization here is approximate.
pub async fn list_candidates(
	executor: &mut PgConnection,
	filters: &QueryFilters,
	limit: i64,
) -> Result<Vec<CandidateRow>> {
	if limit <= 0 {
		return Err(Error::InvalidArgument("candidate limit must be greater than zero".to_string()));
	}

	let location = filters.location.as_deref().map(text::normalize_text).filter(|v| !v.is_empty());
	let rows = sqlx::query_as::<_, CandidateRow>(
		"\
SELECT
	candidate_id,
	kind,
	display_name,
	description,
	tags,
	attributes,
	embedding,
	price,
	location,
	status,
	updated_at
FROM candidate_entities
WHERE status = 'active'
	AND ($1::float8 IS NULL OR price >= $1)
	AND ($2::float8 IS NULL OR price <= $2)
	AND ($3::text IS NULL OR lower(regexp_replace(btrim(location), '\\s+', ' ', 'g')) = $3)
	AND (cardinality($4::text[]) = 0 OR kind = ANY($4::text[]))
	AND tags @> $5::text[]
ORDER BY candidate_id
LIMIT $6",
	)
	.bind(filters.price_min)
	.bind(filters.price_max)
	.bind(location)
	.bind(&filters.kinds)
	.bind(&filters.required_tags)
	.bind(limit)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}

pub async fn upsert_candidate(
	executor: &mut PgConnection,
	candidate: &CandidateEntity,
) -> Result<()> {
	if candidate.candidate_id.trim().is_empty() {
		return Err(Error::InvalidArgument("candidate_id must not be empty".to_string()));
	}
	if candidate.price.is_some_and(|price| !price.is_finite() || price < 0.0) {
		return Err(Error::InvalidArgument(format!(
			"candidate price must be a finite number zero or greater; candidate_id={}",
			candidate.candidate_id
		)));
	}

	let tags = candidate.tags.iter().cloned().collect::<Vec<_>>();
	let attributes = Value::Object(
		candidate.attributes.iter().map(|(key, value)| (key.clone(), value.clone())).collect(),
	);

	sqlx::query(
		"\
INSERT INTO candidate_entities (
	candidate_id,
	kind,
	display_name,
	description,
	tags,
	attributes,
	embedding,
	price,
	location,
	status,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', now())
ON CONFLICT (candidate_id) DO UPDATE
SET
	kind = EXCLUDED.kind,
	display_name = EXCLUDED.display_name,
	description = EXCLUDED.description,
	tags = EXCLUDED.tags,
	attributes = EXCLUDED.attributes,
	embedding = EXCLUDED.embedding,
	price = EXCLUDED.price,
	location = EXCLUDED.location,
	status = 'active',
	updated_at = now()",
	)
	.bind(&candidate.candidate_id)
	.bind(&candidate.kind)
	.bind(&candidate.display_name)
	.bind(&candidate.description)
	.bind(&tags)
	.bind(attributes)
	.bind(&candidate.embedding)
	.bind(candidate.price)
	.bind(&candidate.location)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn retire_candidate(executor: &mut PgConnection, candidate_id: &str) -> Result<()> {
	let result = sqlx::query(
		"\
UPDATE candidate_entities
SET status = 'retired', updated_at = now()
WHERE candidate_id = $1 AND status = 'active'",
	)
	.bind(candidate_id)
	.execute(&mut *executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!(
			"active candidate not found; candidate_id={candidate_id}"
		)));
	}

	Ok(())
}
