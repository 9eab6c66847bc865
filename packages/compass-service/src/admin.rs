use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CompassService, Result, profile::profile_point_id};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebuildReport {
	pub note_points: u64,
	pub profile_points: u64,
	pub error_count: u64,
}

#[derive(Debug, sqlx::FromRow)]
struct NoteVectorRow {
	note_id: Uuid,
	user_id: String,
	embedding_text: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileVectorRow {
	user_id: String,
	embedding_text: String,
}

impl CompassService {
	/// Reindexes every note and profile point from the Postgres source of
	/// truth. Repairs index drift left behind by failed synchronous upserts.
	pub async fn rebuild_qdrant(&self) -> Result<RebuildReport> {
		let mut report = RebuildReport { note_points: 0, profile_points: 0, error_count: 0 };
		let note_rows: Vec<NoteVectorRow> = sqlx::query_as(
			"SELECT note_id, user_id, embedding::text AS embedding_text FROM notes",
		)
		.fetch_all(&self.db.pool)
		.await?;

		for row in note_rows {
			let Some(vec) = self.decode_vector(&row.embedding_text, &mut report) else {
				continue;
			};
			let result = self
				.qdrant
				.upsert_point(&self.qdrant.note_collection, row.note_id, &row.user_id, vec)
				.await;

			if result.is_err() {
				report.error_count += 1;

				continue;
			}

			report.note_points += 1;
		}

		let profile_rows: Vec<ProfileVectorRow> = sqlx::query_as(
			"SELECT user_id, embedding::text AS embedding_text FROM user_profiles",
		)
		.fetch_all(&self.db.pool)
		.await?;

		for row in profile_rows {
			let Some(vec) = self.decode_vector(&row.embedding_text, &mut report) else {
				continue;
			};
			let result = self
				.qdrant
				.upsert_point(
					&self.qdrant.profile_collection,
					profile_point_id(&row.user_id),
					&row.user_id,
					vec,
				)
				.await;

			if result.is_err() {
				report.error_count += 1;

				continue;
			}

			report.profile_points += 1;
		}

		Ok(report)
	}

	fn decode_vector(&self, embedding_text: &str, report: &mut RebuildReport) -> Option<Vec<f32>> {
		let vec = match crate::parse_pg_vector(embedding_text) {
			Ok(vec) => vec,
			Err(_) => {
				report.error_count += 1;

				return None;
			},
		};

		if vec.len() != self.cfg.storage.qdrant.vector_dim as usize {
			report.error_count += 1;

			return None;
		}

		Some(vec)
	}
}
