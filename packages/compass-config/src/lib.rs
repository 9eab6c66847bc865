mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	CatalogProviderConfig, Chat, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres,
	Profile, Providers, Qdrant, Recommend, Service, Storage,
};

use std::{fs, path::Path};

pub const AGGREGATION_MEAN: &str = "mean";
pub const AGGREGATION_SIMILARITY_WEIGHTED: &str = "similarity_weighted";

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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.note_collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.note_collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.profile_collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.profile_collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.note_collection == cfg.storage.qdrant.profile_collection {
		return Err(Error::Validation {
			message: "storage.qdrant.note_collection and profile_collection must differ."
				.to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	let aggregation = cfg.profile.aggregation.as_str();

	if !matches!(aggregation, AGGREGATION_MEAN | AGGREGATION_SIMILARITY_WEIGHTED) {
		return Err(Error::Validation {
			message: "profile.aggregation must be one of mean or similarity_weighted.".to_string(),
		});
	}

	if cfg.chat.history_window == 0 {
		return Err(Error::Validation {
			message: "chat.history_window must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.note_limit == 0 {
		return Err(Error::Validation {
			message: "chat.note_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.candidate_pool < cfg.chat.note_limit {
		return Err(Error::Validation {
			message: "chat.candidate_pool must be at least chat.note_limit.".to_string(),
		});
	}
	if cfg.chat.include_peer_notes {
		if cfg.chat.peer_limit == 0 {
			return Err(Error::Validation {
				message: "chat.peer_limit must be greater than zero when include_peer_notes is true."
					.to_string(),
			});
		}
		if cfg.chat.peer_note_limit == 0 {
			return Err(Error::Validation {
				message:
					"chat.peer_note_limit must be greater than zero when include_peer_notes is true."
						.to_string(),
			});
		}
	}

	if cfg.recommend.max_themes == 0 {
		return Err(Error::Validation {
			message: "recommend.max_themes must be greater than zero.".to_string(),
		});
	}
	if cfg.recommend.note_limit == 0 {
		return Err(Error::Validation {
			message: "recommend.note_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.recommend.candidate_pool < cfg.recommend.note_limit {
		return Err(Error::Validation {
			message: "recommend.candidate_pool must be at least recommend.note_limit.".to_string(),
		});
	}
	if cfg.providers.catalog.page_size == 0 {
		return Err(Error::Validation {
			message: "providers.catalog.page_size must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("chat", &cfg.providers.chat.api_key),
		("themes", &cfg.providers.themes.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.catalog
		.api_key
		.as_deref()
		.map(|key| key.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.catalog.api_key = None;
	}
	if cfg
		.chat
		.instructions
		.as_deref()
		.map(|instructions| instructions.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.chat.instructions = None;
	}
}
