pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot aggregate zero vectors.")]
	Empty,
	#[error("Vector length {actual} does not match expected length {expected}.")]
	DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatePolicy {
	/// Componentwise average. Order-independent; the result is NOT normalized,
	/// so the mean of a single vector is the vector itself.
	Mean,
	/// Legacy accumulator: starts from the first vector and folds each later
	/// vector in weighted by its cosine similarity to the running sum, then
	/// normalizes. Order-dependent and self-reinforcing; kept only for parity
	/// with deployments that derived profiles this way.
	SimilarityWeighted,
}

impl AggregatePolicy {
	pub fn from_config(cfg: &compass_config::Profile) -> Self {
		match cfg.aggregation.as_str() {
			compass_config::AGGREGATION_SIMILARITY_WEIGHTED => Self::SimilarityWeighted,
			_ => Self::Mean,
		}
	}
}

/// Scales `vec` to unit length. The zero vector has no direction and is
/// returned unchanged.
pub fn normalize(vec: &[f32]) -> Vec<f32> {
	let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm == 0.0 {
		return vec.to_vec();
	}

	vec.iter().map(|value| value / norm).collect()
}

/// Cosine similarity in [-1, 1]. Returns 0.0 instead of NaN when either
/// vector has zero norm, and 0.0 when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() {
		return 0.0;
	}

	let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
	let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a * norm_b)
}

/// Combines `vectors` into one representative vector under `policy`.
///
/// All inputs must share one length. Zero inputs are an error the caller
/// must handle before persisting anything.
pub fn aggregate(policy: AggregatePolicy, vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
	let Some(first) = vectors.first() else {
		return Err(Error::Empty);
	};
	let dim = first.len();

	for vec in vectors {
		if vec.len() != dim {
			return Err(Error::DimensionMismatch { expected: dim, actual: vec.len() });
		}
	}

	match policy {
		AggregatePolicy::Mean => Ok(mean(vectors, dim)),
		AggregatePolicy::SimilarityWeighted => Ok(similarity_weighted(vectors)),
	}
}

fn mean(vectors: &[Vec<f32>], dim: usize) -> Vec<f32> {
	let mut out = vec![0.0_f32; dim];

	for vec in vectors {
		for (idx, value) in vec.iter().enumerate() {
			out[idx] += value;
		}
	}
	for value in &mut out {
		*value /= vectors.len() as f32;
	}

	out
}

fn similarity_weighted(vectors: &[Vec<f32>]) -> Vec<f32> {
	// A single vector passes through untouched, matching the legacy behavior.
	if vectors.len() == 1 {
		return vectors[0].clone();
	}

	let mut acc = vectors[0].clone();

	for vec in &vectors[1..] {
		let similarity = cosine_similarity(&acc, vec);

		for (idx, value) in vec.iter().enumerate() {
			acc[idx] += similarity * value;
		}
	}

	normalize(&acc)
}
