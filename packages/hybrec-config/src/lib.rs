mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Keywords, LlmProviderConfig, Postgres, Providers, Recommend,
	RecommendCollaborative, RecommendConfidence, RecommendContent, RecommendGraph, RecommendLlm,
	RecommendTimeouts, Service, Storage,
};

use std::{collections::BTreeMap, fs, path::Path};

/// Signal names accepted as `signal_weights` keys.
pub const SIGNAL_NAMES: [&str; 4] = ["collaborative", "content", "graph", "llm"];
/// Edge types accepted as `edge_type_weights` keys.
pub const EDGE_TYPES: [&str; 4] = ["BELONGS_TO", "REQUIRED_FOR", "RELATED_TO", "SUPPLIED_BY"];
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
pub const MAX_TRAVERSAL_DEPTH: u32 = 6;
/// Upper bound for every `*_ms` timeout: one day.
pub const MAX_TIMEOUT_MS: u64 = 86_400_000;
/// Upper bound for `history_window_days`: one hundred years.
pub const MAX_HISTORY_WINDOW_DAYS: i64 = 36_500;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.enabled && cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key, timeout_ms) in [
		("embedding", &cfg.providers.embedding.api_key, cfg.providers.embedding.timeout_ms),
		("llm", &cfg.providers.llm.api_key, cfg.providers.llm.timeout_ms),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
		if timeout_ms == 0 || timeout_ms > MAX_TIMEOUT_MS {
			return Err(Error::Validation {
				message: format!(
					"Provider {label} timeout_ms must be in the range 1-{MAX_TIMEOUT_MS}."
				),
			});
		}
	}

	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number zero or greater."
				.to_string(),
		});
	}

	validate_recommend(&cfg.recommend)?;

	if cfg.keywords.reload_interval_secs == 0 {
		return Err(Error::Validation {
			message: "keywords.reload_interval_secs must be greater than zero.".to_string(),
		});
	}

	check_unit_range("keywords.min_weight", cfg.keywords.min_weight)?;

	Ok(())
}

pub fn validate_recommend(recommend: &Recommend) -> Result<()> {
	if recommend.max_results == 0 {
		return Err(Error::Validation {
			message: "recommend.max_results must be greater than zero.".to_string(),
		});
	}
	if recommend.candidate_pool_limit == 0 {
		return Err(Error::Validation {
			message: "recommend.candidate_pool_limit must be greater than zero.".to_string(),
		});
	}

	check_signal_weights("recommend.signal_weights", &recommend.signal_weights)?;
	check_graph(&recommend.graph)?;
	check_timeouts(&recommend.timeouts)?;
	check_confidence(&recommend.confidence)?;

	if recommend.llm.top_n == 0 {
		return Err(Error::Validation {
			message: "recommend.llm.top_n must be greater than zero.".to_string(),
		});
	}
	if recommend.llm.max_concurrency == 0 {
		return Err(Error::Validation {
			message: "recommend.llm.max_concurrency must be greater than zero.".to_string(),
		});
	}
	if recommend.llm.max_description_chars == 0 {
		return Err(Error::Validation {
			message: "recommend.llm.max_description_chars must be greater than zero.".to_string(),
		});
	}
	if !recommend.llm.score_max.is_finite() || recommend.llm.score_max <= 0.0 {
		return Err(Error::Validation {
			message: "recommend.llm.score_max must be a finite number greater than zero."
				.to_string(),
		});
	}

	let collaborative = &recommend.collaborative;

	if !collaborative.co_selection_weight.is_finite() || collaborative.co_selection_weight < 0.0 {
		return Err(Error::Validation {
			message: "recommend.collaborative.co_selection_weight must be zero or greater."
				.to_string(),
		});
	}
	if collaborative.max_events == 0 {
		return Err(Error::Validation {
			message: "recommend.collaborative.max_events must be greater than zero.".to_string(),
		});
	}
	if !(1..=MAX_HISTORY_WINDOW_DAYS).contains(&collaborative.history_window_days) {
		return Err(Error::Validation {
			message: format!(
				"recommend.collaborative.history_window_days must be in the range 1-{MAX_HISTORY_WINDOW_DAYS}."
			),
		});
	}

	check_unit_range("recommend.content.embedding_weight", recommend.content.embedding_weight)?;

	if recommend.content.min_token_chars == 0 {
		return Err(Error::Validation {
			message: "recommend.content.min_token_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

/// Rejects unknown signal names, negative or non-finite weights, an all-zero set, and sets whose
/// sum is not 1.0 within [`WEIGHT_SUM_TOLERANCE`].
pub fn check_signal_weights(label: &str, weights: &BTreeMap<String, f64>) -> Result<()> {
	if weights.is_empty() {
		return Err(Error::Validation { message: format!("{label} must be non-empty.") });
	}

	let mut sum = 0.0_f64;
	let mut any_positive = false;

	for (name, weight) in weights {
		if !SIGNAL_NAMES.contains(&name.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"{label} contains unknown signal {name:?}; expected one of collaborative, content, graph, or llm."
				),
			});
		}
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("{label}.{name} must be a finite number."),
			});
		}
		if *weight < 0.0 {
			return Err(Error::Validation {
				message: format!("{label}.{name} must be zero or greater."),
			});
		}

		any_positive |= *weight > 0.0;
		sum += weight;
	}

	if !any_positive {
		return Err(Error::Validation {
			message: format!("{label} must contain at least one weight greater than zero."),
		});
	}
	if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
		return Err(Error::Validation { message: format!("{label} must sum to 1.0.") });
	}

	Ok(())
}

pub fn check_graph(graph: &RecommendGraph) -> Result<()> {
	check_traversal_depth("recommend.graph.traversal_depth", graph.traversal_depth)?;

	if graph.max_fanout == 0 {
		return Err(Error::Validation {
			message: "recommend.graph.max_fanout must be greater than zero.".to_string(),
		});
	}
	if graph.max_visited < graph.max_fanout {
		return Err(Error::Validation {
			message: "recommend.graph.max_visited must be at least recommend.graph.max_fanout."
				.to_string(),
		});
	}
	if !graph.hop_decay.is_finite() || graph.hop_decay <= 0.0 || graph.hop_decay > 1.0 {
		return Err(Error::Validation {
			message: "recommend.graph.hop_decay must be in the range (0.0, 1.0].".to_string(),
		});
	}
	if graph.edge_type_weights.is_empty() {
		return Err(Error::Validation {
			message: "recommend.graph.edge_type_weights must be non-empty.".to_string(),
		});
	}

	for (edge_type, weight) in &graph.edge_type_weights {
		if !EDGE_TYPES.contains(&edge_type.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"recommend.graph.edge_type_weights contains unknown edge type {edge_type:?}."
				),
			});
		}

		check_unit_range(&format!("recommend.graph.edge_type_weights.{edge_type}"), *weight)?;
	}

	Ok(())
}

pub fn check_traversal_depth(label: &str, depth: u32) -> Result<()> {
	if depth == 0 || depth > MAX_TRAVERSAL_DEPTH {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 1-{MAX_TRAVERSAL_DEPTH}."),
		});
	}

	Ok(())
}

pub fn check_timeouts(timeouts: &RecommendTimeouts) -> Result<()> {
	for (label, value) in [
		("recommend.timeouts.keywords_ms", timeouts.keywords_ms),
		("recommend.timeouts.content_ms", timeouts.content_ms),
		("recommend.timeouts.collaborative_ms", timeouts.collaborative_ms),
		("recommend.timeouts.graph_ms", timeouts.graph_ms),
		("recommend.timeouts.llm_call_ms", timeouts.llm_call_ms),
		("recommend.timeouts.llm_batch_ms", timeouts.llm_batch_ms),
		("recommend.timeouts.global_ms", timeouts.global_ms),
	] {
		if value == 0 || value > MAX_TIMEOUT_MS {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 1-{MAX_TIMEOUT_MS}."),
			});
		}
	}

	if timeouts.llm_call_ms > timeouts.llm_batch_ms {
		return Err(Error::Validation {
			message: "recommend.timeouts.llm_call_ms must not exceed recommend.timeouts.llm_batch_ms."
				.to_string(),
		});
	}
	if timeouts.llm_batch_ms > timeouts.global_ms {
		return Err(Error::Validation {
			message: "recommend.timeouts.llm_batch_ms must not exceed recommend.timeouts.global_ms."
				.to_string(),
		});
	}

	Ok(())
}

pub fn check_confidence(confidence: &RecommendConfidence) -> Result<()> {
	for (label, value) in [
		("recommend.confidence.high_min_sources", confidence.high_min_sources),
		("recommend.confidence.medium_min_sources", confidence.medium_min_sources),
	] {
		if value == 0 || value as usize > SIGNAL_NAMES.len() {
			return Err(Error::Validation { message: format!("{label} must be in the range 1-4.") });
		}
	}

	if confidence.high_min_sources < confidence.medium_min_sources {
		return Err(Error::Validation {
			message: "recommend.confidence.high_min_sources must be at least recommend.confidence.medium_min_sources."
				.to_string(),
		});
	}

	for (label, value) in [
		("recommend.confidence.high_max_dispersion", confidence.high_max_dispersion),
		("recommend.confidence.medium_max_dispersion", confidence.medium_max_dispersion),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if confidence.high_max_dispersion > confidence.medium_max_dispersion {
		return Err(Error::Validation {
			message: "recommend.confidence.high_max_dispersion must not exceed recommend.confidence.medium_max_dispersion."
				.to_string(),
		});
	}

	Ok(())
}

fn check_unit_range(label: &str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let weights = std::mem::take(&mut cfg.recommend.signal_weights);

	cfg.recommend.signal_weights =
		weights.into_iter().map(|(name, weight)| (name.trim().to_lowercase(), weight)).collect();

	let edge_weights = std::mem::take(&mut cfg.recommend.graph.edge_type_weights);

	cfg.recommend.graph.edge_type_weights = edge_weights
		.into_iter()
		.map(|(edge_type, weight)| (edge_type.trim().to_uppercase(), weight))
		.collect();

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
