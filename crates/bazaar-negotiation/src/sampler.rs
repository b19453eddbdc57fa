//! Decision sampling
//!
//! The accept/reject draw goes through an injectable source so tests pin
//! the outcome exactly.

/// Source of uniform draws in [0, 1)
pub trait DecisionSampler: Send + Sync {
    fn draw(&self) -> f64;
}

/// Thread-local RNG sampler, the production default
#[derive(Default)]
pub struct RandomSampler;

impl DecisionSampler for RandomSampler {
    fn draw(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Sampler returning one fixed value; for deterministic tests
pub struct FixedSampler(pub f64);

impl DecisionSampler for FixedSampler {
    fn draw(&self) -> f64 {
        self.0
    }
}
