pub mod admin;
pub mod chat;
pub mod notes;
pub mod profile;
pub mod recommend;
pub mod time_serde;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

pub use admin::RebuildReport;
pub use chat::{ChatMessage, ChatRequest};
use compass_config::{
	CatalogProviderConfig, Config, EmbeddingProviderConfig, LlmProviderConfig,
};
pub use compass_providers::{catalog::CourseListing, chat::ChatStream};
use compass_providers::{catalog, chat as chat_provider, embedding, themes};
use compass_storage::{db::Db, qdrant::QdrantStore};
pub use notes::{
	CreateNoteRequest, CreateNoteResponse, DeleteNoteRequest, DeleteNoteResponse,
	ListNotesRequest, ListNotesResponse, NoteView, UpdateNoteRequest, UpdateNoteResponse,
};
pub use profile::ProfileOutcome;
pub use recommend::{RecommendRequest, RecommendResponse, RecommendStatus};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn stream_chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<ChatStream>>;
}

pub trait ThemesProvider
where
	Self: Send + Sync,
{
	fn derive_themes<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		notes_text: &'a [String],
		max_themes: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>>;
}

pub trait CatalogProvider
where
	Self: Send + Sync,
{
	fn search_courses<'a>(
		&'a self,
		cfg: &'a CatalogProviderConfig,
		api_key: &'a str,
		query: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<CourseListing>>>;
}

#[derive(Debug)]
pub enum Error {
	InvalidRequest { message: String },
	Unauthorized { message: String },
	NotFound { message: String },
	Provider { message: String },
	Storage { message: String },
	Qdrant { message: String },
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::Unauthorized { message } => write!(f, "Unauthorized: {message}"),
			Self::NotFound { message } => write!(f, "Not found: {message}"),
			Self::Provider { message } => write!(f, "Provider error: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::Qdrant { message } => write!(f, "Qdrant error: {message}"),
		}
	}
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<compass_storage::Error> for Error {
	fn from(err: compass_storage::Error) -> Self {
		match err {
			compass_storage::Error::Qdrant(err) => Self::Qdrant { message: err.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
	pub themes: Arc<dyn ThemesProvider>,
	pub catalog: Arc<dyn CatalogProvider>,
}

pub struct CompassService {
	pub cfg: Config,
	pub db: Db,
	pub qdrant: QdrantStore,
	pub providers: Providers,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl ChatProvider for DefaultProviders {
	fn stream_chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<ChatStream>> {
		Box::pin(chat_provider::stream_chat(cfg, messages))
	}
}

impl ThemesProvider for DefaultProviders {
	fn derive_themes<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		notes_text: &'a [String],
		max_themes: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(themes::derive_themes(cfg, notes_text, max_themes))
	}
}

impl CatalogProvider for DefaultProviders {
	fn search_courses<'a>(
		&'a self,
		cfg: &'a CatalogProviderConfig,
		api_key: &'a str,
		query: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<CourseListing>>> {
		Box::pin(catalog::search_courses(cfg, api_key, query))
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		chat: Arc<dyn ChatProvider>,
		themes: Arc<dyn ThemesProvider>,
		catalog: Arc<dyn CatalogProvider>,
	) -> Self {
		Self { embedding, chat, themes, catalog }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self {
			embedding: provider.clone(),
			chat: provider.clone(),
			themes: provider.clone(),
			catalog: provider,
		}
	}
}

impl CompassService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self { cfg, db, qdrant, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, qdrant: QdrantStore, providers: Providers) -> Self {
		Self { cfg, db, qdrant, providers }
	}

	pub(crate) async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, std::slice::from_ref(&text.to_string()))
			.await?;
		let vec = embeddings.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vec.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vec)
	}
}

/// The text a note is embedded from. Title and content carry the semantics;
/// color is presentation only.
pub(crate) fn note_embedding_text(title: &str, content: Option<&str>) -> String {
	format!("{title}\n\n{}", content.unwrap_or(""))
}

pub(crate) fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);
	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}
		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub(crate) fn parse_pg_vector(text: &str) -> Result<Vec<f32>> {
	let trimmed = text.trim();
	let without_brackets =
		trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')).ok_or_else(|| {
			Error::Storage { message: "Vector text is not bracketed.".to_string() }
		})?;

	if without_brackets.trim().is_empty() {
		return Ok(Vec::new());
	}

	let mut vec = Vec::new();

	for part in without_brackets.split(',') {
		let value: f32 = part.trim().parse().map_err(|_| Error::Storage {
			message: "Vector text contains a non-numeric value.".to_string(),
		})?;
		vec.push(value);
	}

	Ok(vec)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vector_pg_text_round_trips() {
		let vec = vec![0.5, -1.25, 3.0];
		let text = vector_to_pg(&vec);

		assert_eq!(text, "[0.5,-1.25,3]");
		assert_eq!(parse_pg_vector(&text).unwrap(), vec);
	}

	#[test]
	fn parse_rejects_unbracketed_text() {
		assert!(parse_pg_vector("1.0,2.0").is_err());
	}

	#[test]
	fn note_text_tolerates_missing_content() {
		assert_eq!(note_embedding_text("Title", None), "Title\n\n");
		assert_eq!(note_embedding_text("Title", Some("Body")), "Title\n\nBody");
	}
}
