pub mod fusion;
pub mod keywords;
pub mod options;
pub mod recommend;
pub mod scoring;

mod error;

pub use error::{Error, Result};
pub use fusion::{ConfidenceLevel, RecommendationResult, SignalContribution};
pub use keywords::{KeywordMatch, KeywordStore};
pub use options::{ConfidenceThresholds, RecommendOptions, ResolvedOptions};
pub use recommend::{
	AbsentReason, RecommendDiagnostics, RecommendOutcome, RecommendResponse, SignalReport,
	SignalStatus,
};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;

use hybrec_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use hybrec_domain::{candidate::CandidateEntity, query::QueryFilters};
use hybrec_providers::{embedding, llm};
use hybrec_storage::{
	candidates, graph, interactions, keywords as keyword_rows,
	models::{GraphNeighbor, InteractionEvent, KeywordMapping},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Current candidate entities, already narrowed by structured filters.
pub trait CatalogSource
where
	Self: Send + Sync,
{
	fn list_candidates<'a>(
		&'a self,
		filters: &'a QueryFilters,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateEntity>>>;
}

pub trait KeywordSource
where
	Self: Send + Sync,
{
	fn active_keywords(&self, now: OffsetDateTime) -> BoxFuture<'_, Result<Vec<KeywordMapping>>>;
}

/// One hop of bounded graph expansion.
pub trait GraphSource
where
	Self: Send + Sync,
{
	fn expand<'a>(
		&'a self,
		nodes: &'a [String],
		edge_types: &'a [String],
		max_fanout: u32,
	) -> BoxFuture<'a, Result<Vec<GraphNeighbor>>>;
}

pub trait InteractionSource
where
	Self: Send + Sync,
{
	fn interactions<'a>(
		&'a self,
		categories: &'a [String],
		since: OffsetDateTime,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<InteractionEvent>>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait LlmProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>>;
}

#[derive(Clone)]
pub struct Sources {
	pub catalog: Arc<dyn CatalogSource>,
	pub keywords: Arc<dyn KeywordSource>,
	pub graph: Arc<dyn GraphSource>,
	pub interactions: Arc<dyn InteractionSource>,
}
impl Sources {
	pub fn new(
		catalog: Arc<dyn CatalogSource>,
		keywords: Arc<dyn KeywordSource>,
		graph: Arc<dyn GraphSource>,
		interactions: Arc<dyn InteractionSource>,
	) -> Self {
		Self { catalog, keywords, graph, interactions }
	}

	pub fn postgres(pool: PgPool) -> Self {
		let source = Arc::new(PgSources { pool });

		Self {
			catalog: source.clone(),
			keywords: source.clone(),
			graph: source.clone(),
			interactions: source,
		}
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub llm: Arc<dyn LlmProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LlmProvider>) -> Self {
		Self { embedding, llm }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), llm: provider }
	}
}

pub struct RecommendService {
	pub cfg: Config,
	pub sources: Sources,
	pub providers: Providers,
	pub keywords: KeywordStore,
}
impl RecommendService {
	pub fn new(cfg: Config, sources: Sources) -> Self {
		Self::with_providers(cfg, sources, Providers::default())
	}

	pub fn with_providers(cfg: Config, sources: Sources, providers: Providers) -> Self {
		let keywords = KeywordStore::new(sources.keywords.clone(), cfg.keywords.min_weight);

		Self { cfg, sources, providers, keywords }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl LlmProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(llm::complete(cfg, messages).await?) })
	}
}

struct PgSources {
	pool: PgPool,
}
impl CatalogSource for PgSources {
	fn list_candidates<'a>(
		&'a self,
		filters: &'a QueryFilters,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateEntity>>> {
		Box::pin(async move {
			let mut conn = self.pool.acquire().await?;
			let rows = candidates::list_candidates(&mut conn, filters, i64::from(limit)).await?;

			Ok(rows.into_iter().map(|row| row.into_entity()).collect())
		})
	}
}
impl KeywordSource for PgSources {
	fn active_keywords(&self, now: OffsetDateTime) -> BoxFuture<'_, Result<Vec<KeywordMapping>>> {
		Box::pin(async move {
			let mut conn = self.pool.acquire().await?;

			Ok(keyword_rows::list_active_keywords(&mut conn, now).await?)
		})
	}
}
impl GraphSource for PgSources {
	fn expand<'a>(
		&'a self,
		nodes: &'a [String],
		edge_types: &'a [String],
		max_fanout: u32,
	) -> BoxFuture<'a, Result<Vec<GraphNeighbor>>> {
		Box::pin(async move {
			let mut conn = self.pool.acquire().await?;

			Ok(graph::expand_edges(&mut conn, nodes, edge_types, i64::from(max_fanout)).await?)
		})
	}
}
impl InteractionSource for PgSources {
	fn interactions<'a>(
		&'a self,
		categories: &'a [String],
		since: OffsetDateTime,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<InteractionEvent>>> {
		Box::pin(async move {
			let mut conn = self.pool.acquire().await?;

			Ok(interactions::list_interactions(&mut conn, categories, since, i64::from(limit))
				.await?)
		})
	}
}
