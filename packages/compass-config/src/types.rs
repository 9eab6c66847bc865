use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub profile: Profile,
	pub chat: Chat,
	pub recommend: Recommend,
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
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub note_collection: String,
	pub profile_collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub chat: LlmProviderConfig,
	pub themes: LlmProviderConfig,
	pub catalog: CatalogProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
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

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: Option<u32>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogProviderConfig {
	pub api_base: String,
	/// Optional. Recommendations report themselves unavailable when absent.
	pub api_key: Option<String>,
	pub path: String,
	pub page_size: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
	/// One of "mean" or "similarity_weighted".
	pub aggregation: String,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
	pub history_window: usize,
	pub note_limit: u32,
	pub candidate_pool: u32,
	pub include_peer_notes: bool,
	pub peer_limit: u32,
	pub peer_note_limit: u32,
	pub instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Recommend {
	pub max_themes: usize,
	pub note_limit: u32,
	pub candidate_pool: u32,
}
