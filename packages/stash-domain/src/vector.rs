//! Embedding vector helpers: the storage codec and cosine similarity.

const F32_LEN: usize = size_of::<f32>();

/// Encodes a vector as consecutive little-endian `f32` values.
pub fn to_bytes(vector: &[f32]) -> Vec<u8> {
	let mut out = Vec::with_capacity(vector.len() * F32_LEN);

	for value in vector {
		out.extend_from_slice(&value.to_le_bytes());
	}

	out
}

/// Decodes a buffer written by [`to_bytes`]. Returns `None` when the length is not a multiple of
/// four bytes.
pub fn from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
	if bytes.len() % F32_LEN != 0 {
		return None;
	}

	let vector = bytes
		.chunks_exact(F32_LEN)
		.map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
		.collect();

	Some(vector)
}

pub fn norm(vector: &[f32]) -> f32 {
	vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

/// Cosine similarity in `[-1, 1]`.
///
/// A zero vector on either side, or vectors of different length, yield `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	similarity_with_norm(a, norm(a), b)
}

/// Compares `query` against every candidate, preserving candidate order.
pub fn batch_cosine_similarity<V>(query: &[f32], candidates: &[V]) -> Vec<f32>
where
	V: AsRef<[f32]>,
{
	let query_norm = norm(query);

	candidates
		.iter()
		.map(|candidate| similarity_with_norm(query, query_norm, candidate.as_ref()))
		.collect()
}

fn similarity_with_norm(a: &[f32], a_norm: f32, b: &[f32]) -> f32 {
	if a.len() != b.len() {
		return 0.0;
	}

	let b_norm = norm(b);

	if a_norm == 0.0 || b_norm == 0.0 {
		return 0.0;
	}

	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();

	(dot / (a_norm * b_norm)).clamp(-1.0, 1.0)
}
