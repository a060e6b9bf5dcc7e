use std::collections::{BTreeMap, BTreeSet};

use hybrec_domain::{
	Error,
	candidate::CandidateEntity,
	query::{Query, QueryFilters},
	signal::SignalSource,
	weights::FusionWeights,
};

const TOLERANCE: f64 = 1e-6;

fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
	entries.iter().map(|(name, weight)| (name.to_string(), *weight)).collect()
}

fn candidate(id: &str, price: Option<f64>, location: Option<&str>) -> CandidateEntity {
	CandidateEntity {
		candidate_id: id.to_string(),
		kind: "product".to_string(),
		display_name: format!("Candidate {id}"),
		tags: BTreeSet::from(["power_tools".to_string()]),
		description: String::new(),
		attributes: BTreeMap::new(),
		embedding: None,
		price,
		location: location.map(str::to_string),
	}
}

fn sample_weight_sets() -> Vec<BTreeMap<String, f64>> {
	vec![
		weights(&[("collaborative", 0.25), ("content", 0.25), ("graph", 0.25), ("llm", 0.25)]),
		weights(&[("collaborative", 0.1), ("content", 0.2), ("graph", 0.3), ("llm", 0.4)]),
		weights(&[("collaborative", 0.05), ("content", 0.55), ("graph", 0.3), ("llm", 0.1)]),
		weights(&[("content", 0.7), ("graph", 0.3)]),
	]
}

#[test]
fn valid_weight_sets_sum_to_one() {
	for set in sample_weight_sets() {
		let fusion = FusionWeights::from_map(&set).expect("Weight set must be valid.");
		let sum: f64 = SignalSource::ALL.iter().map(|source| fusion.get(*source)).sum();

		assert!((sum - 1.0).abs() < TOLERANCE, "Sum was {sum} for {set:?}.");
	}
}

#[test]
fn invalid_weight_sets_are_rejected_deterministically() {
	let invalid = [
		weights(&[("content", 0.5), ("graph", 0.4)]),
		weights(&[("content", 1.1), ("graph", -0.1)]),
		weights(&[("content", 0.0), ("graph", 0.0)]),
		weights(&[("content", 0.5), ("novelty", 0.5)]),
		weights(&[]),
	];

	for set in invalid {
		let first = FusionWeights::from_map(&set).expect_err("Expected invalid weights.");
		let second = FusionWeights::from_map(&set).expect_err("Expected invalid weights.");

		assert!(matches!(first, Error::InvalidWeights { .. }));
		assert_eq!(first.to_string(), second.to_string());
	}
}

#[test]
fn effective_weights_sum_to_one_when_all_sources_report() {
	for set in sample_weight_sets() {
		let fusion = FusionWeights::from_map(&set).expect("Weight set must be valid.");
		let effective = fusion.effective(&fusion.active_sources());
		let sum: f64 = effective.iter().map(|(_, weight)| weight).sum();

		assert!((sum - 1.0).abs() < TOLERANCE);
	}
}

#[test]
fn effective_weights_renormalize_when_one_source_is_missing() {
	let set = weights(&[("collaborative", 0.1), ("content", 0.2), ("graph", 0.3), ("llm", 0.4)]);
	let fusion = FusionWeights::from_map(&set).expect("Weight set must be valid.");

	for missing in SignalSource::ALL {
		let reported =
			SignalSource::ALL.into_iter().filter(|source| *source != missing).collect::<Vec<_>>();
		let effective = fusion.effective(&reported);
		let sum: f64 = effective.iter().map(|(_, weight)| weight).sum();

		assert_eq!(effective.len(), 3);
		assert!((sum - 1.0).abs() < TOLERANCE, "Sum was {sum} without {missing}.");
	}

	let effective = fusion.effective(&[SignalSource::Content, SignalSource::Graph]);

	assert!((effective[0].1 - 0.4).abs() < TOLERANCE);
	assert!((effective[1].1 - 0.6).abs() < TOLERANCE);
}

#[test]
fn effective_weights_skip_zero_weight_sources() {
	let fusion = FusionWeights::from_map(&weights(&[("content", 1.0)]))
		.expect("Weight set must be valid.");

	assert_eq!(fusion.active_sources(), vec![SignalSource::Content]);
	assert!(fusion.effective(&[SignalSource::Graph]).is_empty());
}

#[test]
fn filters_apply_price_location_and_tags() {
	let filters = QueryFilters {
		price_min: Some(50.0),
		price_max: Some(150.0),
		location: Some("  Berlin ".to_string()),
		kinds: vec!["product".to_string()],
		required_tags: vec!["power_tools".to_string()],
	};

	assert!(filters.matches(&candidate("a", Some(99.0), Some("berlin"))));
	assert!(!filters.matches(&candidate("b", Some(200.0), Some("berlin"))));
	assert!(!filters.matches(&candidate("c", None, Some("berlin"))));
	assert!(!filters.matches(&candidate("d", Some(99.0), Some("Munich"))));
	assert!(QueryFilters::default().matches(&candidate("e", None, None)));
}

#[test]
fn inverted_price_range_is_invalid() {
	let query = Query::new("drill").with_filters(QueryFilters {
		price_min: Some(10.0),
		price_max: Some(5.0),
		..Default::default()
	});
	let err = query.validate().expect_err("Expected invalid price range.");

	assert!(err.to_string().contains("filters.price_min must not exceed filters.price_max."));
}

#[test]
fn blank_query_detection_considers_hints() {
	assert!(Query::new("   ").is_blank());
	assert!(!Query::new(" ").with_hints(["category:drills"]).is_blank());
}
