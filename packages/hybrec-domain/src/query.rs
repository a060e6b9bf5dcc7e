use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, candidate::CandidateEntity, text};

/// A single recommendation request. Ephemeral.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Query {
	pub text: String,
	/// Explicit category or task identifiers supplied by the caller.
	#[serde(default)]
	pub hints: Vec<String>,
	#[serde(default)]
	pub filters: QueryFilters,
}
impl Query {
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), hints: Vec::new(), filters: QueryFilters::default() }
	}

	pub fn with_hints<I, S>(mut self, hints: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.hints = hints.into_iter().map(Into::into).collect();

		self
	}

	pub fn with_filters(mut self, filters: QueryFilters) -> Self {
		self.filters = filters;

		self
	}

	/// True when there is nothing to match on: blank text and no hints.
	pub fn is_blank(&self) -> bool {
		self.text.trim().is_empty() && self.hints.iter().all(|hint| hint.trim().is_empty())
	}

	pub fn normalized_hints(&self) -> BTreeSet<String> {
		self.hints
			.iter()
			.map(|hint| hint.trim().to_string())
			.filter(|hint| !hint.is_empty())
			.collect()
	}

	pub fn validate(&self) -> Result<()> {
		self.filters.validate()
	}
}

/// Structured constraints applied to the candidate pool before any scoring.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryFilters {
	#[serde(default)]
	pub price_min: Option<f64>,
	#[serde(default)]
	pub price_max: Option<f64>,
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub kinds: Vec<String>,
	#[serde(default)]
	pub required_tags: Vec<String>,
}
impl QueryFilters {
	pub fn validate(&self) -> Result<()> {
		for (label, value) in
			[("filters.price_min", self.price_min), ("filters.price_max", self.price_max)]
		{
			let Some(value) = value else { continue };

			if !value.is_finite() || value < 0.0 {
				return Err(Error::InvalidQuery {
					message: format!("{label} must be a finite number zero or greater."),
				});
			}
		}

		if let (Some(min), Some(max)) = (self.price_min, self.price_max)
			&& min > max
		{
			return Err(Error::InvalidQuery {
				message: "filters.price_min must not exceed filters.price_max.".to_string(),
			});
		}

		Ok(())
	}

	/// Candidates without a price or location are excluded only when that filter is set.
	pub fn matches(&self, candidate: &CandidateEntity) -> bool {
		if self.price_min.is_some() || self.price_max.is_some() {
			let Some(price) = candidate.price else { return false };

			if self.price_min.is_some_and(|min| price < min) {
				return false;
			}
			if self.price_max.is_some_and(|max| price > max) {
				return false;
			}
		}
		if let Some(location) = self.location.as_deref().map(text::normalize_text)
			&& !location.is_empty()
			&& candidate.normalized_location().as_deref() != Some(location.as_str())
		{
			return false;
		}
		if !self.kinds.is_empty() && !self.kinds.iter().any(|kind| kind == &candidate.kind) {
			return false;
		}

		self.required_tags.iter().all(|tag| candidate.has_tag(tag))
	}
}
