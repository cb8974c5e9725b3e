use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Euclidean distance. Vectors of different length are infinitely far apart.
    pub fn l2_distance(&self, other: &Embedding) -> f32 {
        if self.0.len() != other.0.len() {
            return f32::INFINITY;
        }

        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vec: Vec<f32>) -> Self {
        Self(vec)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// A row of the vector collection: sequential id plus its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: u64,
    pub vector: Embedding,
}

impl CollectionRecord {
    pub fn new(id: u64, vector: Embedding) -> Self {
        Self { id, vector }
    }

    /// Pairs vectors with ids `0..n` in order.
    pub fn sequential(vectors: Vec<Embedding>) -> Vec<Self> {
        vectors
            .into_iter()
            .enumerate()
            .map(|(i, vector)| Self::new(i as u64, vector))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub distance: f32,
}
