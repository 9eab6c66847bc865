use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct NoteRow {
	pub note_id: Uuid,
	pub user_id: String,
	pub title: String,
	pub content: Option<String>,
	pub color: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct NoteEmbeddingRow {
	pub note_id: Uuid,
	pub embedding_text: String,
}
