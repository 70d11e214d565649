#![allow(dead_code)]

pub mod mocks;

use medrag::db::{DistanceMetric, IndexSpec};
use medrag::utils::retry::RetryPolicy;
use std::time::Duration;

pub const TEST_INDEX: &str = "medical-chatbot";

pub fn index_spec(dimension: usize) -> IndexSpec {
    IndexSpec {
        name: TEST_INDEX.to_string(),
        dimension,
        metric: DistanceMetric::Cosine,
        cloud: "aws".to_string(),
        region: "us-east-1".to_string(),
    }
}

/// Retries without real sleeps so tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(1),
        Duration::from_millis(5),
        Duration::from_secs(5),
    )
}
