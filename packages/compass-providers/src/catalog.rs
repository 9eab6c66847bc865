use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::{Map, Value};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CourseListing {
	pub id: i64,
	pub title: String,
	pub url: String,
	pub headline: Option<String>,
	pub image: Option<String>,
	pub price: Option<String>,
}

/// Full-text search against the external course catalog. `keywords` are
/// joined with spaces by the caller; results come back in catalog order.
pub async fn search_courses(
	cfg: &compass_config::CatalogProviderConfig,
	api_key: &str,
	query: &str,
) -> Result<Vec<CourseListing>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let page_size = cfg.page_size.to_string();
	let res = client
		.get(url)
		.headers(crate::auth_headers(api_key, &Map::new())?)
		.query(&[("search", query), ("page", "1"), ("page_size", page_size.as_str())])
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_catalog_response(json)
}

fn parse_catalog_response(json: Value) -> Result<Vec<CourseListing>> {
	let results = json
		.get("results")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Catalog response is missing results array."))?;
	let mut listings = Vec::with_capacity(results.len());

	for item in results {
		let id = item
			.get("id")
			.and_then(|v| v.as_i64())
			.ok_or_else(|| eyre::eyre!("Catalog result missing id."))?;
		let title = item
			.get("title")
			.and_then(|v| v.as_str())
			.ok_or_else(|| eyre::eyre!("Catalog result missing title."))?;
		let url = item
			.get("url")
			.and_then(|v| v.as_str())
			.ok_or_else(|| eyre::eyre!("Catalog result missing url."))?;
		let headline = item.get("headline").and_then(|v| v.as_str()).map(str::to_string);
		let image = item.get("image_480x270").and_then(|v| v.as_str()).map(str::to_string);
		let price = item.get("price").and_then(|v| v.as_str()).map(str::to_string);

		listings.push(CourseListing {
			id,
			title: title.to_string(),
			url: url.to_string(),
			headline,
			image,
			price,
		});
	}

	Ok(listings)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_listings_with_optional_fields() {
		let json = serde_json::json!({
			"results": [
				{
					"id": 42,
					"title": "Intro to Rust",
					"url": "/course/intro-to-rust/",
					"headline": "Ownership without tears",
					"image_480x270": "https://img.example/42.jpg",
					"price": "$19.99"
				},
				{ "id": 7, "title": "SQL Basics", "url": "/course/sql-basics/" }
			]
		});
		let listings = parse_catalog_response(json).expect("parse failed");

		assert_eq!(listings.len(), 2);
		assert_eq!(listings[0].id, 42);
		assert_eq!(listings[0].headline.as_deref(), Some("Ownership without tears"));
		assert!(listings[1].headline.is_none());
		assert!(listings[1].price.is_none());
	}

	#[test]
	fn missing_results_array_is_an_error() {
		assert!(parse_catalog_response(serde_json::json!({})).is_err());
	}

	#[test]
	fn empty_results_parse_to_empty_list() {
		let listings =
			parse_catalog_response(serde_json::json!({ "results": [] })).expect("parse failed");

		assert!(listings.is_empty());
	}
}
