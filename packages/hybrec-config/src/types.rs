use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub recommend: Recommend,
	pub keywords: Keywords,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	/// When false the content signal falls back to TF-IDF for every candidate.
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Recommend {
	pub max_results: u32,
	pub candidate_pool_limit: u32,
	/// Keys are signal names: collaborative, content, graph, llm.
	pub signal_weights: BTreeMap<String, f64>,
	#[serde(default)]
	pub graph: RecommendGraph,
	#[serde(default)]
	pub timeouts: RecommendTimeouts,
	#[serde(default)]
	pub llm: RecommendLlm,
	#[serde(default)]
	pub confidence: RecommendConfidence,
	#[serde(default)]
	pub collaborative: RecommendCollaborative,
	#[serde(default)]
	pub content: RecommendContent,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendGraph {
	pub traversal_depth: u32,
	pub max_fanout: u32,
	pub max_visited: u32,
	pub hop_decay: f64,
	/// Keys are edge types, e.g. "BELONGS_TO".
	pub edge_type_weights: BTreeMap<String, f64>,
}
impl Default for RecommendGraph {
	fn default() -> Self {
		Self {
			traversal_depth: 2,
			max_fanout: 32,
			max_visited: 512,
			hop_decay: 0.7,
			edge_type_weights: BTreeMap::from([
				("BELONGS_TO".to_string(), 1.0),
				("REQUIRED_FOR".to_string(), 0.9),
				("SUPPLIED_BY".to_string(), 0.7),
				("RELATED_TO".to_string(), 0.5),
			]),
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendTimeouts {
	/// Budget for loading keyword mappings when the cache is cold.
	pub keywords_ms: u64,
	pub content_ms: u64,
	pub collaborative_ms: u64,
	pub graph_ms: u64,
	pub llm_call_ms: u64,
	pub llm_batch_ms: u64,
	pub global_ms: u64,
}
impl Default for RecommendTimeouts {
	fn default() -> Self {
		Self {
			keywords_ms: 500,
			content_ms: 750,
			collaborative_ms: 1_000,
			graph_ms: 1_500,
			llm_call_ms: 6_000,
			llm_batch_ms: 9_000,
			global_ms: 12_000,
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendLlm {
	pub top_n: u32,
	pub max_concurrency: u32,
	pub max_description_chars: u32,
	pub score_max: f64,
}
impl Default for RecommendLlm {
	fn default() -> Self {
		Self { top_n: 8, max_concurrency: 4, max_description_chars: 1_200, score_max: 10.0 }
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendConfidence {
	pub high_min_sources: u32,
	pub medium_min_sources: u32,
	pub high_max_dispersion: f64,
	pub medium_max_dispersion: f64,
}
impl Default for RecommendConfidence {
	fn default() -> Self {
		Self {
			high_min_sources: 3,
			medium_min_sources: 2,
			high_max_dispersion: 0.15,
			medium_max_dispersion: 0.30,
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendCollaborative {
	pub co_selection_weight: f64,
	pub max_events: u32,
	pub history_window_days: i64,
}
impl Default for RecommendCollaborative {
	fn default() -> Self {
		Self { co_selection_weight: 0.5, max_events: 5_000, history_window_days: 365 }
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendContent {
	pub embedding_weight: f64,
	pub min_token_chars: u32,
}
impl Default for RecommendContent {
	fn default() -> Self {
		Self { embedding_weight: 0.6, min_token_chars: 2 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Keywords {
	pub reload_interval_secs: u64,
	#[serde(default)]
	pub min_weight: f64,
}

fn default_true() -> bool {
	true
}
