use sqlx::PgConnection;
use uuid::Uuid;

use crate::{Error, Result, models::GraphNeighbor};

/// Edges incident to any of `nodes`, in either direction, restricted to `edge_types`.
///
/// At most `max_fanout` neighbors are returned per node, strongest edges first with ties broken
/// by neighbor id, so the expansion is deterministic.
pub async fn expand_edges(
	executor: &mut PgConnection,
	nodes: &[String],
	edge_types: &[String],
	max_fanout: i64,
) -> Result<Vec<GraphNeighbor>> {
	if nodes.is_empty() || edge_types.is_empty() {
		return Ok(vec![]);
	}
	if max_fanout <= 0 {
		return Err(Error::InvalidArgument("max_fanout must be greater than zero".to_string()));
	}

	let rows = sqlx::query_as::<_, GraphNeighbor>(
		"\
WITH incident AS (
	SELECT from_node AS node, to_node AS neighbor, edge_type, weight
	FROM graph_edges
	WHERE from_node = ANY($1::text[]) AND edge_type = ANY($2::text[])
	UNION ALL
	SELECT to_node AS node, from_node AS neighbor, edge_type, weight
	FROM graph_edges
	WHERE to_node = ANY($1::text[]) AND edge_type = ANY($2::text[])
),
ranked AS (
	SELECT
		node,
		neighbor,
		edge_type,
		weight,
		ROW_NUMBER() OVER (
			PARTITION BY node
			ORDER BY weight DESC, neighbor, edge_type
		) AS fanout_rank
	FROM incident
)
SELECT node, neighbor, edge_type, weight
FROM ranked
WHERE fanout_rank <= $3
ORDER BY node, fanout_rank",
	)
	.bind(nodes)
	.bind(edge_types)
	.bind(max_fanout)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}

/// Inserts an edge or updates the weight of an existing `(from, to, type)` edge.
pub async fn insert_edge(
	executor: &mut PgConnection,
	from_node: &str,
	to_node: &str,
	edge_type: &str,
	weight: f32,
) -> Result<Uuid> {
	if !hybrec_config::EDGE_TYPES.contains(&edge_type) {
		return Err(Error::InvalidArgument(format!(
			"edge_type must be one of {:?}; got {edge_type:?}",
			hybrec_config::EDGE_TYPES
		)));
	}
	if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
		return Err(Error::InvalidArgument("edge weight must be in the range 0.0-1.0".to_string()));
	}
	if from_node == to_node {
		return Err(Error::InvalidArgument(format!(
			"self-loop edges are not allowed; node={from_node}"
		)));
	}
	for node in [from_node, to_node] {
		if hybrec_domain::graph::split_node_id(node).is_none() {
			return Err(Error::InvalidArgument(format!(
				"graph node ids must have the form <kind>:<id>; got {node:?}"
			)));
		}
	}

	let edge_id: Uuid = sqlx::query_scalar(
		"\
INSERT INTO graph_edges (edge_id, from_node, to_node, edge_type, weight)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (from_node, to_node, edge_type) DO UPDATE
SET weight = EXCLUDED.weight
RETURNING edge_id",
	)
	.bind(Uuid::new_v4())
	.bind(from_node)
	.bind(to_node)
	.bind(edge_type)
	.bind(weight)
	.fetch_one(&mut *executor)
	.await?;

	Ok(edge_id)
}
