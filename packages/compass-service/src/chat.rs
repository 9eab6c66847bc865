use std::collections::HashMap;

use qdrant_client::qdrant::{Condition, Filter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ChatStream, CompassService, Error, Result};
use compass_domain::prompt::{self, NoteSnippet};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: String,
	pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
	pub user_id: String,
	pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SnippetRow {
	note_id: Uuid,
	title: String,
	content: Option<String>,
}

impl CompassService {
	/// Embeds the recent message window, retrieves the caller's relevant
	/// notes plus notes from semantically similar users, and hands the
	/// assembled system prompt to the chat stream.
	pub async fn chat(&self, req: ChatRequest) -> Result<ChatStream> {
		let user_id = req.user_id.trim();

		if user_id.is_empty() {
			return Err(Error::Unauthorized { message: "Missing user identity.".to_string() });
		}
		if req.messages.is_empty() {
			return Err(Error::InvalidRequest {
				message: "At least one message is required.".to_string(),
			});
		}

		// Only the tail of the conversation is embedded and forwarded, which
		// bounds token cost at the expense of long-term memory.
		let window_start = req.messages.len().saturating_sub(self.cfg.chat.history_window);
		let window = &req.messages[window_start..];
		let query_text =
			window.iter().map(|message| message.content.as_str()).collect::<Vec<_>>().join("\n");
		let query_vector = self.embed_single(&query_text).await?;

		let own_filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);
		let own_matches = self
			.qdrant
			.search(
				&self.qdrant.note_collection,
				query_vector.clone(),
				self.cfg.chat.candidate_pool,
				self.cfg.chat.note_limit,
				Some(own_filter),
			)
			.await?;
		let own_notes = self
			.fetch_snippets(&own_matches.iter().map(|m| m.point_id).collect::<Vec<_>>())
			.await?;

		let peer_notes = if self.cfg.chat.include_peer_notes {
			self.fetch_peer_snippets(user_id, query_vector).await?
		} else {
			Vec::new()
		};

		let instructions =
			self.cfg.chat.instructions.as_deref().unwrap_or(prompt::DEFAULT_INSTRUCTIONS);
		let system_prompt = prompt::build_system_prompt(instructions, &own_notes, &peer_notes);
		let mut messages = Vec::with_capacity(window.len() + 1);

		messages.push(serde_json::json!({ "role": "system", "content": system_prompt }));
		for message in window {
			messages
				.push(serde_json::json!({ "role": message.role, "content": message.content }));
		}

		let stream = self.providers.chat.stream_chat(&self.cfg.providers.chat, &messages).await?;

		Ok(stream)
	}

	/// Finds profile-vector neighbors, then pulls those users' notes closest
	/// to the query. Peer retrieval is additive context; any of it failing to
	/// match simply yields an empty section.
	async fn fetch_peer_snippets(
		&self,
		user_id: &str,
		query_vector: Vec<f32>,
	) -> Result<Vec<NoteSnippet>> {
		let peer_filter = Filter::must_not([Condition::matches("user_id", user_id.to_string())]);
		let profile_matches = self
			.qdrant
			.search(
				&self.qdrant.profile_collection,
				query_vector.clone(),
				self.cfg.chat.candidate_pool,
				self.cfg.chat.peer_limit,
				Some(peer_filter),
			)
			.await?;
		let peer_ids =
			profile_matches.into_iter().map(|m| m.user_id).collect::<Vec<_>>();

		if peer_ids.is_empty() {
			return Ok(Vec::new());
		}

		let note_filter = Filter::must([Condition::matches("user_id", peer_ids)]);
		let note_matches = self
			.qdrant
			.search(
				&self.qdrant.note_collection,
				query_vector,
				self.cfg.chat.candidate_pool,
				self.cfg.chat.peer_note_limit,
				Some(note_filter),
			)
			.await?;

		self.fetch_snippets(&note_matches.iter().map(|m| m.point_id).collect::<Vec<_>>()).await
	}

	/// Loads title and content for retrieved note ids from Postgres, keeping
	/// the retrieval order. Text always comes from the source of truth, never
	/// from index payloads.
	pub(crate) async fn fetch_snippets(&self, note_ids: &[Uuid]) -> Result<Vec<NoteSnippet>> {
		if note_ids.is_empty() {
			return Ok(Vec::new());
		}

		let rows: Vec<SnippetRow> =
			sqlx::query_as("SELECT note_id, title, content FROM notes WHERE note_id = ANY($1)")
				.bind(note_ids.to_vec())
				.fetch_all(&self.db.pool)
				.await?;
		let mut by_id: HashMap<Uuid, SnippetRow> =
			rows.into_iter().map(|row| (row.note_id, row)).collect();
		let snippets = note_ids
			.iter()
			.filter_map(|note_id| by_id.remove(note_id))
			.map(|row| NoteSnippet { title: row.title, content: row.content.unwrap_or_default() })
			.collect();

		Ok(snippets)
	}
}
