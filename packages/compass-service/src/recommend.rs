use qdrant_client::qdrant::{Condition, Filter};
use serde::{Deserialize, Serialize};

use crate::{CompassService, CourseListing, Error, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendRequest {
	pub user_id: String,
}

/// Distinguishes "the catalog had nothing for you" from "the lookup could
/// not run", so callers can render the two differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendStatus {
	Ok,
	Unavailable,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
	pub status: RecommendStatus,
	pub themes: Vec<String>,
	pub courses: Vec<CourseListing>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileEmbeddingRow {
	embedding_text: String,
}

impl CompassService {
	/// Turns the caller's profile vector into catalog search keywords and
	/// queries the course catalog. Upstream failures degrade to an
	/// `Unavailable` response instead of propagating.
	pub async fn recommend_courses(&self, req: RecommendRequest) -> Result<RecommendResponse> {
		let user_id = req.user_id.trim();

		if user_id.is_empty() {
			return Err(Error::Unauthorized { message: "Missing user identity.".to_string() });
		}

		let row: Option<ProfileEmbeddingRow> = sqlx::query_as(
			"SELECT embedding::text AS embedding_text FROM user_profiles WHERE user_id = $1",
		)
		.bind(user_id)
		.fetch_optional(&self.db.pool)
		.await?;
		let Some(row) = row else {
			return Err(Error::NotFound {
				message: "No profile yet; add some notes first.".to_string(),
			});
		};
		let profile_vector = crate::parse_pg_vector(&row.embedding_text)?;

		// Theme derivation works on the text of the notes nearest the profile
		// vector. Raw embedding values never enter a prompt.
		let own_filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);
		let matches = self
			.qdrant
			.search(
				&self.qdrant.note_collection,
				profile_vector,
				self.cfg.recommend.candidate_pool,
				self.cfg.recommend.note_limit,
				Some(own_filter),
			)
			.await?;
		let snippets = self
			.fetch_snippets(&matches.iter().map(|m| m.point_id).collect::<Vec<_>>())
			.await?;

		if snippets.is_empty() {
			// A stale profile can outlive its notes; with nothing to derive
			// themes from there is nothing to search for.
			return Ok(RecommendResponse {
				status: RecommendStatus::Ok,
				themes: Vec::new(),
				courses: Vec::new(),
			});
		}

		let notes_text = snippets
			.iter()
			.map(|snippet| format!("{}\n{}", snippet.title, snippet.content))
			.collect::<Vec<_>>();
		let themes = match self
			.providers
			.themes
			.derive_themes(
				&self.cfg.providers.themes,
				&notes_text,
				self.cfg.recommend.max_themes,
			)
			.await
		{
			Ok(themes) => themes,
			Err(err) => {
				tracing::warn!(error = %err, user_id, "Theme derivation failed.");

				return Ok(unavailable());
			},
		};

		if themes.is_empty() {
			return Ok(RecommendResponse {
				status: RecommendStatus::Ok,
				themes,
				courses: Vec::new(),
			});
		}

		let Some(api_key) = self.cfg.providers.catalog.api_key.as_deref() else {
			tracing::warn!(user_id, "Catalog credential is missing.");

			return Ok(unavailable());
		};
		let query = themes.join(" ");
		let courses = match self
			.providers
			.catalog
			.search_courses(&self.cfg.providers.catalog, api_key, &query)
			.await
		{
			Ok(courses) => courses,
			Err(err) => {
				tracing::warn!(error = %err, user_id, "Catalog search failed.");

				return Ok(unavailable());
			},
		};

		Ok(RecommendResponse { status: RecommendStatus::Ok, themes, courses })
	}
}

fn unavailable() -> RecommendResponse {
	RecommendResponse {
		status: RecommendStatus::Unavailable,
		themes: Vec::new(),
		courses: Vec::new(),
	}
}
