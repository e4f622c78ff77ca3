//! Example demonstrating custom retry policies.
//!
//! This example shows how to:
//! - Replace the default single immediate retry with backoff
//! - Write a predicate that retries specific statuses
//! - Retry only on transport failures
//!
//! Run with: `cargo run --example custom_retry`

use encore_sdk::retry::{AttemptOutcome, RetryOnTransportError};
use encore_sdk::{
    ApiContext, ApiRequestExecutor, Environment, RequestParameters, RetryPolicy,
    RetryPredicate, RetryStrategy,
};
use std::sync::Arc;
use std::time::Duration;

/// Retry while the service is unavailable, for the first few attempts.
struct RetryWhileUnavailable {
    max_attempts: usize,
}

impl RetryPredicate for RetryWhileUnavailable {
    fn should_retry(&self, outcome: AttemptOutcome<'_>, attempt: usize) -> bool {
        let unavailable = match outcome {
            Ok(response) => response.status.as_u16() == 503,
            Err(e) => e.is_transport(),
        };
        unavailable && attempt <= self.max_attempts
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("encore_sdk=debug")
        .init();

    println!("=== Example 1: Exponential backoff ===");
    let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
        .service("pricing", 3)
        .retry_policy(RetryPolicy::default().with_strategy(RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            max_extra_attempts: 3,
            jitter: true,
        }))
        .build()?;
    let result = executor
        .execute_wrapped::<serde_json::Value>(RequestParameters::get("products/1587/prices"))
        .await?;
    println!("Status: {}", result.response().status);

    println!("\n=== Example 2: Custom predicate ===");
    let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
        .service("inventory", 4)
        .retry_policy(RetryPolicy::new(
            RetryStrategy::Linear {
                delay: Duration::from_millis(250),
                max_extra_attempts: 5,
            },
            Arc::new(RetryWhileUnavailable { max_attempts: 2 }),
        ))
        .build()?;
    let result = executor
        .execute_wrapped::<serde_json::Value>(RequestParameters::get("products/1587/availability"))
        .await?;
    println!("Status: {}", result.response().status);

    println!("\n=== Example 3: Transport failures only ===");
    let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
        .service("venue", 2)
        .retry_policy(RetryPolicy::default().with_predicate(Arc::new(RetryOnTransportError)))
        .build()?;
    let result = executor
        .execute_unwrapped::<serde_json::Value>(RequestParameters::get("venues"))
        .await?;
    println!("Status: {}", result.response().status);

    Ok(())
}
