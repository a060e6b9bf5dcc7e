use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::text;

/// A product, supplier, or service the engine can recommend. Read-only to the engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CandidateEntity {
	pub candidate_id: String,
	/// Catalog kind, e.g. "product" or "supplier".
	pub kind: String,
	pub display_name: String,
	/// Category and task identifiers the candidate is tagged with.
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub attributes: BTreeMap<String, Value>,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub price: Option<f64>,
	#[serde(default)]
	pub location: Option<String>,
}
impl CandidateEntity {
	/// Text used by lexical similarity: name, description, tags, and scalar attribute values.
	pub fn searchable_text(&self) -> String {
		let mut out = String::with_capacity(self.display_name.len() + self.description.len() + 64);

		out.push_str(&self.display_name);
		out.push(' ');
		out.push_str(&self.description);

		for tag in &self.tags {
			out.push(' ');
			out.push_str(&tag.replace(['_', '-'], " "));
		}
		for (name, value) in &self.attributes {
			let Some(rendered) = render_scalar(value) else { continue };

			out.push(' ');
			out.push_str(&name.replace(['_', '-'], " "));
			out.push(' ');
			out.push_str(&rendered);
		}

		out
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.contains(tag)
	}

	pub fn normalized_location(&self) -> Option<String> {
		self.location.as_deref().map(text::normalize_text).filter(|value| !value.is_empty())
	}
}

fn render_scalar(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		Value::Array(items) => {
			let rendered = items.iter().filter_map(render_scalar).collect::<Vec<_>>();

			if rendered.is_empty() { None } else { Some(rendered.join(" ")) }
		},
		Value::Null | Value::Object(_) => None,
	}
}
