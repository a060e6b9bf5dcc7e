use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{InteractionEvent, NewInteraction},
};

/// Events recorded since `since` whose categories overlap `categories`, newest first.
pub async fn list_interactions(
	executor: &mut PgConnection,
	categories: &[String],
	since: OffsetDateTime,
	limit: i64,
) -> Result<Vec<InteractionEvent>> {
	if categories.is_empty() || limit <= 0 {
		return Ok(vec![]);
	}

	let rows = sqlx::query_as::<_, InteractionEvent>(
		"\
SELECT event_id, session_id, candidate_id, categories, accepted, occurred_at
FROM interaction_events
WHERE categories && $1::text[]
	AND occurred_at >= $2
ORDER BY occurred_at DESC, event_id
LIMIT $3",
	)
	.bind(categories)
	.bind(since)
	.bind(limit)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}

pub async fn record_interaction(
	executor: &mut PgConnection,
	input: &NewInteraction,
) -> Result<Uuid> {
	if input.session_id.trim().is_empty() {
		return Err(Error::InvalidArgument("interaction session_id must not be empty".to_string()));
	}
	if input.candidate_id.trim().is_empty() {
		return Err(Error::InvalidArgument(
			"interaction candidate_id must not be empty".to_string(),
		));
	}

	let event_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO interaction_events (
	event_id,
	session_id,
	candidate_id,
	categories,
	accepted,
	occurred_at
)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(event_id)
	.bind(input.session_id.trim())
	.bind(input.candidate_id.trim())
	.bind(&input.categories)
	.bind(input.accepted)
	.bind(input.occurred_at)
	.execute(&mut *executor)
	.await?;

	Ok(event_id)
}
