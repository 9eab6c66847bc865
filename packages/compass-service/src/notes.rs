use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CompassService, Error, Result};
use compass_storage::models::NoteRow;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteView {
	pub note_id: Uuid,
	pub title: String,
	pub content: Option<String>,
	pub color: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateNoteRequest {
	pub user_id: String,
	pub title: String,
	pub content: Option<String>,
	pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateNoteResponse {
	pub note: NoteView,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
	pub user_id: String,
	pub note_id: Uuid,
	pub title: String,
	pub content: Option<String>,
	pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateNoteResponse {
	pub note: NoteView,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteNoteRequest {
	pub user_id: String,
	pub note_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteNoteResponse {
	pub note_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListNotesRequest {
	pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListNotesResponse {
	pub notes: Vec<NoteView>,
}

impl CompassService {
	pub async fn create_note(&self, req: CreateNoteRequest) -> Result<CreateNoteResponse> {
		let user_id = validate_user_id(&req.user_id)?;
		validate_note_fields(&req.title, &req.color)?;

		let embedding =
			self.embed_single(&crate::note_embedding_text(&req.title, req.content.as_deref())).await?;
		let now = OffsetDateTime::now_utc();
		let note_id = Uuid::new_v4();
		let mut tx = self.db.pool.begin().await?;

		sqlx::query(
			"\
INSERT INTO notes (note_id, user_id, title, content, color, embedding, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6::text::vector, $7, $7)",
		)
		.bind(note_id)
		.bind(user_id)
		.bind(req.title.as_str())
		.bind(req.content.as_deref())
		.bind(req.color.as_str())
		.bind(crate::vector_to_pg(&embedding))
		.bind(now)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		// The committed note is the source of truth; index and profile are
		// derived and must not fail the request.
		self.index_note(note_id, user_id, embedding).await;
		self.sync_profile(user_id).await;

		Ok(CreateNoteResponse {
			note: NoteView {
				note_id,
				title: req.title,
				content: req.content,
				color: req.color,
				created_at: now,
				updated_at: now,
			},
		})
	}

	pub async fn update_note(&self, req: UpdateNoteRequest) -> Result<UpdateNoteResponse> {
		let user_id = validate_user_id(&req.user_id)?;
		validate_note_fields(&req.title, &req.color)?;

		let mut tx = self.db.pool.begin().await?;
		let note: Option<NoteRow> = sqlx::query_as(
			"\
SELECT note_id, user_id, title, content, color, created_at, updated_at
FROM notes
WHERE note_id = $1
FOR UPDATE",
		)
		.bind(req.note_id)
		.fetch_optional(&mut *tx)
		.await?;
		let note =
			note.ok_or_else(|| Error::NotFound { message: "Note not found.".to_string() })?;

		if note.user_id != user_id {
			return Err(Error::Unauthorized {
				message: "Note belongs to another user.".to_string(),
			});
		}

		let embedding =
			self.embed_single(&crate::note_embedding_text(&req.title, req.content.as_deref())).await?;
		let now = OffsetDateTime::now_utc();

		sqlx::query(
			"\
UPDATE notes
SET title = $1, content = $2, color = $3, embedding = $4::text::vector, updated_at = $5
WHERE note_id = $6",
		)
		.bind(req.title.as_str())
		.bind(req.content.as_deref())
		.bind(req.color.as_str())
		.bind(crate::vector_to_pg(&embedding))
		.bind(now)
		.bind(req.note_id)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		self.index_note(req.note_id, user_id, embedding).await;
		self.sync_profile(user_id).await;

		Ok(UpdateNoteResponse {
			note: NoteView {
				note_id: req.note_id,
				title: req.title,
				content: req.content,
				color: req.color,
				created_at: note.created_at,
				updated_at: now,
			},
		})
	}

	pub async fn delete_note(&self, req: DeleteNoteRequest) -> Result<DeleteNoteResponse> {
		let user_id = validate_user_id(&req.user_id)?;
		let mut tx = self.db.pool.begin().await?;
		let note: Option<NoteRow> = sqlx::query_as(
			"\
SELECT note_id, user_id, title, content, color, created_at, updated_at
FROM notes
WHERE note_id = $1
FOR UPDATE",
		)
		.bind(req.note_id)
		.fetch_optional(&mut *tx)
		.await?;
		let note =
			note.ok_or_else(|| Error::NotFound { message: "Note not found.".to_string() })?;

		if note.user_id != user_id {
			return Err(Error::Unauthorized {
				message: "Note belongs to another user.".to_string(),
			});
		}

		sqlx::query("DELETE FROM notes WHERE note_id = $1")
			.bind(req.note_id)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		let collection = self.qdrant.note_collection.clone();

		if let Err(err) = self.qdrant.delete_point(&collection, req.note_id).await {
			tracing::warn!(error = %err, note_id = %req.note_id, "Note point delete failed.");
		}

		self.sync_profile(user_id).await;

		Ok(DeleteNoteResponse { note_id: req.note_id })
	}

	pub async fn list_notes(&self, req: ListNotesRequest) -> Result<ListNotesResponse> {
		let user_id = validate_user_id(&req.user_id)?;
		let rows: Vec<NoteRow> = sqlx::query_as(
			"\
SELECT note_id, user_id, title, content, color, created_at, updated_at
FROM notes
WHERE user_id = $1
ORDER BY created_at DESC",
		)
		.bind(user_id)
		.fetch_all(&self.db.pool)
		.await?;
		let notes = rows
			.into_iter()
			.map(|row| NoteView {
				note_id: row.note_id,
				title: row.title,
				content: row.content,
				color: row.color,
				created_at: row.created_at,
				updated_at: row.updated_at,
			})
			.collect();

		Ok(ListNotesResponse { notes })
	}

	async fn index_note(&self, note_id: Uuid, user_id: &str, embedding: Vec<f32>) {
		let collection = self.qdrant.note_collection.clone();

		if let Err(err) = self.qdrant.upsert_point(&collection, note_id, user_id, embedding).await
		{
			tracing::warn!(error = %err, note_id = %note_id, "Note point upsert failed.");
		}
	}

	async fn sync_profile(&self, user_id: &str) {
		match self.recompute_profile(user_id).await {
			Ok(outcome) => {
				tracing::debug!(user_id, ?outcome, "Profile recomputed.");
			},
			Err(err) => {
				tracing::warn!(error = %err, user_id, "Profile recompute failed.");
			},
		}
	}
}

fn validate_user_id(user_id: &str) -> Result<&str> {
	let trimmed = user_id.trim();

	if trimmed.is_empty() {
		return Err(Error::Unauthorized { message: "Missing user identity.".to_string() });
	}

	Ok(trimmed)
}

fn validate_note_fields(title: &str, color: &str) -> Result<()> {
	if title.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "Title is required.".to_string() });
	}
	if color.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "Color is required.".to_string() });
	}

	Ok(())
}
