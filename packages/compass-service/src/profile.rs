use std::hash::{DefaultHasher, Hash, Hasher};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CompassService, Error, Result};
use compass_domain::vector::{self, AggregatePolicy};
use compass_storage::models::NoteEmbeddingRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOutcome {
	Updated { note_count: usize },
	/// The user has no notes. Nothing is written; an older profile row, if
	/// any, stays in place and stays queryable.
	Noop,
}

impl CompassService {
	/// Rebuilds the user's profile vector from the full current note set and
	/// upserts it. Runs after every note mutation commits, so the profile
	/// never lags behind an observable request.
	pub async fn recompute_profile(&self, user_id: &str) -> Result<ProfileOutcome> {
		let policy = AggregatePolicy::from_config(&self.cfg.profile);
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		// Serialize recomputes per user; concurrent edits would otherwise race
		// on the upsert and could persist a profile built from a partial set.
		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(user_lock_key(user_id))
			.execute(&mut *tx)
			.await?;

		let rows: Vec<NoteEmbeddingRow> = sqlx::query_as(
			"SELECT note_id, embedding::text AS embedding_text FROM notes WHERE user_id = $1",
		)
		.bind(user_id)
		.fetch_all(&mut *tx)
		.await?;

		if rows.is_empty() {
			tx.commit().await?;

			return Ok(ProfileOutcome::Noop);
		}

		let mut embeddings = Vec::with_capacity(rows.len());

		for row in rows {
			embeddings.push(crate::parse_pg_vector(&row.embedding_text)?);
		}

		let note_count = embeddings.len();
		let profile = vector::aggregate(policy, &embeddings).map_err(|err| Error::Storage {
			message: format!("Profile aggregation failed: {err}"),
		})?;

		sqlx::query(
			"\
INSERT INTO user_profiles (user_id, embedding, note_count, updated_at)
VALUES ($1, $2::text::vector, $3, $4)
ON CONFLICT (user_id) DO UPDATE
SET embedding = EXCLUDED.embedding,
	note_count = EXCLUDED.note_count,
	updated_at = EXCLUDED.updated_at",
		)
		.bind(user_id)
		.bind(crate::vector_to_pg(&profile))
		.bind(note_count as i32)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		// The Qdrant mirror is derived state; a failed upsert is logged and
		// repaired by the admin rebuild.
		let collection = self.qdrant.profile_collection.clone();

		if let Err(err) = self
			.qdrant
			.upsert_point(&collection, profile_point_id(user_id), user_id, profile)
			.await
		{
			tracing::warn!(error = %err, user_id, "Profile point upsert failed.");
		}

		Ok(ProfileOutcome::Updated { note_count })
	}
}

/// Qdrant point ids must be UUIDs; user ids come from the identity provider
/// in an arbitrary format, so profile points get a stable derived id.
pub(crate) fn profile_point_id(user_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, user_id.as_bytes())
}

fn user_lock_key(user_id: &str) -> i64 {
	let mut hasher = DefaultHasher::new();

	user_id.hash(&mut hasher);

	hasher.finish() as i64
}
