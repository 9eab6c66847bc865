use compass_config::Profile;
use compass_domain::vector::{self, AggregatePolicy};

#[test]
fn aggregation_policy_is_read_from_config() {
	let mean = Profile { aggregation: "mean".to_string() };
	let weighted = Profile { aggregation: "similarity_weighted".to_string() };

	assert_eq!(AggregatePolicy::from_config(&mean), AggregatePolicy::Mean);
	assert_eq!(AggregatePolicy::from_config(&weighted), AggregatePolicy::SimilarityWeighted);
}

#[test]
fn recomputed_profile_is_closer_to_its_notes_than_to_unrelated_text() {
	// A user writes one note about databases, then one about Rust. The profile
	// must sit closer to each of those notes than to an unrelated embedding.
	let database_note = vec![0.9, 0.1, 0.0, 0.0];
	let rust_note = vec![0.1, 0.9, 0.0, 0.0];
	let unrelated = vec![0.0, 0.0, 1.0, 0.0];
	let profile = vector::aggregate(
		AggregatePolicy::Mean,
		&[database_note.clone(), rust_note.clone()],
	)
	.unwrap();

	let to_database = vector::cosine_similarity(&profile, &database_note);
	let to_rust = vector::cosine_similarity(&profile, &rust_note);
	let to_unrelated = vector::cosine_similarity(&profile, &unrelated);

	assert!(to_database > to_unrelated);
	assert!(to_rust > to_unrelated);
}
