use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
		Query, QueryPointsBuilder, SearchParamsBuilder, UpsertPointsBuilder, Value, Vector,
		VectorParamsBuilder, VectorsConfigBuilder, point_id::PointIdOptions, value::Kind,
	},
};
use uuid::Uuid;

use crate::Result;

pub const DENSE_VECTOR_NAME: &str = "dense";

/// One nearest-neighbor hit, best first. `user_id` comes from the point
/// payload; every compass point carries its owner there.
#[derive(Debug, Clone)]
pub struct RetrievalMatch {
	pub point_id: Uuid,
	pub user_id: String,
	pub score: f32,
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub note_collection: String,
	pub profile_collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &compass_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			note_collection: cfg.note_collection.clone(),
			profile_collection: cfg.profile_collection.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	pub async fn ensure_collections(&self) -> Result<()> {
		for collection in [&self.note_collection, &self.profile_collection] {
			if self.client.collection_exists(collection.clone()).await? {
				continue;
			}

			let mut vectors_config = VectorsConfigBuilder::default();

			vectors_config.add_named_vector_params(
				DENSE_VECTOR_NAME,
				VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
			);

			let builder = CreateCollectionBuilder::new(collection.clone())
				.vectors_config(vectors_config);

			self.client.create_collection(builder).await?;
		}

		Ok(())
	}

	/// Nearest-neighbor search ordered by descending score. `filter` is part
	/// of the index query, so the result set is an exact top-`limit` after
	/// filtering rather than a post-filtered approximation.
	pub async fn search(
		&self,
		collection: &str,
		vector: Vec<f32>,
		candidate_pool: u32,
		limit: u32,
		filter: Option<Filter>,
	) -> Result<Vec<RetrievalMatch>> {
		let mut search = QueryPointsBuilder::new(collection.to_string())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.params(SearchParamsBuilder::default().hnsw_ef(u64::from(candidate_pool)))
			.limit(u64::from(limit))
			.with_payload(true);

		if let Some(filter) = filter {
			search = search.filter(filter);
		}

		let response = self.client.query(search).await?;
		let mut matches = Vec::with_capacity(response.result.len());

		for point in response.result {
			let Some(point_id) = point.id.as_ref().and_then(point_id_to_uuid) else {
				continue;
			};
			let Some(user_id) = payload_string(&point.payload, "user_id") else {
				continue;
			};

			matches.push(RetrievalMatch { point_id, user_id, score: point.score });
		}

		Ok(matches)
	}

	pub async fn upsert_point(
		&self,
		collection: &str,
		point_id: Uuid,
		user_id: &str,
		vector: Vec<f32>,
	) -> Result<()> {
		let mut payload = Payload::new();

		payload.insert("user_id", user_id.to_string());

		let mut vectors = HashMap::new();

		vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector));

		let point = PointStruct::new(point_id.to_string(), vectors, payload);
		let upsert = UpsertPointsBuilder::new(collection.to_string(), vec![point]).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn delete_point(&self, collection: &str, point_id: Uuid) -> Result<()> {
		let filter = Filter::must([Condition::has_id([point_id.to_string()])]);
		let delete =
			DeletePointsBuilder::new(collection.to_string()).points(filter).wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}
}

fn point_id_to_uuid(point_id: &qdrant_client::qdrant::PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;
	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}
