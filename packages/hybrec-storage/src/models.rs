use std::collections::BTreeMap;

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use hybrec_domain::candidate::CandidateEntity;

#[derive(Debug, sqlx::FromRow)]
pub struct CandidateRow {
	pub candidate_id: String,
	pub kind: String,
	pub display_name: String,
	pub description: String,
	pub tags: Vec<String>,
	pub attributes: Value,
	pub embedding: Option<Vec<f32>>,
	pub price: Option<f64>,
	pub location: Option<String>,
	pub status: String,
	pub updated_at: OffsetDateTime,
}
impl CandidateRow {
	pub fn into_entity(self) -> CandidateEntity {
		let attributes = match self.attributes {
			Value::Object(map) => map.into_iter().collect::<BTreeMap<_, _>>(),
			_ => BTreeMap::new(),
		};

		CandidateEntity {
			candidate_id: self.candidate_id,
			kind: self.kind,
			display_name: self.display_name,
			tags: self.tags.into_iter().collect(),
			description: self.description,
			attributes,
			embedding: self.embedding.filter(|vec| !vec.is_empty()),
			price: self.price,
			location: self.location,
		}
	}
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct KeywordMapping {
	pub mapping_id: Uuid,
	/// Either "category" or "task".
	pub target_kind: String,
	pub target_id: String,
	pub keyword: String,
	pub keyword_norm: String,
	pub weight: f32,
	pub effective_from: OffsetDateTime,
	pub effective_to: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
}
impl KeywordMapping {
	pub fn is_active_at(&self, at: OffsetDateTime) -> bool {
		self.effective_from <= at && self.effective_to.is_none_or(|end| end > at)
	}
}

#[derive(Clone, Debug)]
pub struct NewKeywordMapping {
	pub target_kind: String,
	pub target_id: String,
	pub keyword: String,
	pub weight: f32,
	pub effective_from: OffsetDateTime,
	pub effective_to: Option<OffsetDateTime>,
}

/// One edge incident to `node`, seen from `node`'s side.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct GraphNeighbor {
	pub node: String,
	pub neighbor: String,
	pub edge_type: String,
	pub weight: f32,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct InteractionEvent {
	pub event_id: Uuid,
	pub session_id: String,
	pub candidate_id: String,
	pub categories: Vec<String>,
	pub accepted: bool,
	pub occurred_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewInteraction {
	pub session_id: String,
	pub candidate_id: String,
	pub categories: Vec<String>,
	pub accepted: bool,
	pub occurred_at: OffsetDateTime,
}
