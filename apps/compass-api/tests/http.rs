use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value};
use tower::util::ServiceExt;

use compass_api::{routes, state::AppState};
use compass_config::{
	CatalogProviderConfig, Chat, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres,
	Profile, Providers, Qdrant, Recommend, Service, Storage,
};
use compass_testkit::TestDatabase;

const DIM: u32 = 4;

fn test_config(dsn: String, qdrant_url: String, notes: String, profiles: String) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres { dsn, pool_max_conns: 2 },
			qdrant: Qdrant {
				url: qdrant_url,
				note_collection: notes,
				profile_collection: profiles,
				vector_dim: DIM,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "stub".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "stub".to_string(),
				dimensions: DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			chat: llm_provider(),
			themes: llm_provider(),
			catalog: CatalogProviderConfig {
				api_base: "http://localhost".to_string(),
				api_key: None,
				path: "/courses/".to_string(),
				page_size: 10,
				timeout_ms: 1_000,
			},
		},
		profile: Profile { aggregation: "mean".to_string() },
		chat: Chat {
			history_window: 6,
			note_limit: 4,
			candidate_pool: 16,
			include_peer_notes: false,
			peer_limit: 1,
			peer_note_limit: 1,
			instructions: None,
		},
		recommend: Recommend { max_themes: 5, note_limit: 4, candidate_pool: 16 },
	}
}

fn llm_provider() -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "stub".to_string(),
		api_base: "http://localhost".to_string(),
		api_key: "key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "stub".to_string(),
		temperature: 0.2,
		max_tokens: None,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

async fn test_env() -> Option<(TestDatabase, String, String, String)> {
	let Some(dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping HTTP tests; set COMPASS_PG_DSN to run this test.");

		return None;
	};
	let Some(qdrant_url) = compass_testkit::env_qdrant_url() else {
		eprintln!("Skipping HTTP tests; set COMPASS_QDRANT_URL to run this test.");

		return None;
	};
	let test_db = TestDatabase::new(&dsn).await.expect("Failed to create test database.");
	let notes = test_db.collection_name("notes");
	let profiles = test_db.collection_name("profiles");

	Some((test_db, qdrant_url, notes, profiles))
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set COMPASS_PG_DSN and COMPASS_QDRANT_URL to run."]
async fn health_ok() {
	let Some((test_db, qdrant_url, notes, profiles)) = test_env().await else { return };
	let config = test_config(test_db.dsn().to_string(), qdrant_url, notes, profiles);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state.clone());
	let _ = routes::admin_router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri("/health")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set COMPASS_PG_DSN and COMPASS_QDRANT_URL to run."]
async fn missing_identity_header_is_unauthorized() {
	let Some((test_db, qdrant_url, notes, profiles)) = test_env().await else { return };
	let config = test_config(test_db.dsn().to_string(), qdrant_url, notes, profiles);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri("/v1/notes")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/notes.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	let json: Value = serde_json::from_slice(&bytes).unwrap();

	assert_eq!(json["error_code"], "unauthorized");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set COMPASS_PG_DSN and COMPASS_QDRANT_URL to run."]
async fn blank_title_is_rejected() {
	let Some((test_db, qdrant_url, notes, profiles)) = test_env().await else { return };
	let config = test_config(test_db.dsn().to_string(), qdrant_url, notes, profiles);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let payload = serde_json::json!({ "title": "  ", "content": "body", "color": "#fff" });
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/notes")
				.header("content-type", "application/json")
				.header("x-user-id", "user_1")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/notes.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	let json: Value = serde_json::from_slice(&bytes).unwrap();

	assert_eq!(json["error_code"], "invalid_request");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set COMPASS_PG_DSN and COMPASS_QDRANT_URL to run."]
async fn unknown_note_is_not_found() {
	let Some((test_db, qdrant_url, notes, profiles)) = test_env().await else { return };
	let config = test_config(test_db.dsn().to_string(), qdrant_url, notes, profiles);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let payload = serde_json::json!({ "id": uuid::Uuid::new_v4() });
	let response = app
		.oneshot(
			Request::builder()
				.method("DELETE")
				.uri("/v1/notes")
				.header("content-type", "application/json")
				.header("x-user-id", "user_1")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/notes.");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
