//! Example demonstrating how API failures and call errors are reported.
//!
//! This example shows how to:
//! - Tell an API failure (an `ApiResult` with an exception) from a call error
//! - Read error messages from the recognised error envelopes
//! - Treat flagged context info on a 200 as an application error
//! - Observe every exception through the `on_error` hook
//!
//! Run with: `cargo run --example error_handling`

use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, Error, RequestParameters};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct Basket {
    reference: String,
    item_count: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("encore_sdk=info")
        .init();

    let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
        .service("basket", 1)
        .on_error(|exception| {
            eprintln!(
                "[hook] {} from {}: {:?}",
                exception.response_code(),
                exception.request().endpoint,
                exception.errors()
            );
        })
        .build()?;

    println!("=== Example 1: Missing resource ===");
    match executor
        .execute_wrapped::<Basket>(RequestParameters::get("baskets/does-not-exist"))
        .await
    {
        Ok(result) => match result.data_or_exception() {
            Ok(basket) => println!("Found: {:?}", basket),
            Err(exception) => {
                println!("API error {}: {}", exception.response_code(), exception);
                for message in exception.errors() {
                    println!("  - {}", message);
                }
            }
        },
        Err(Error::UnrecognizedApiError {
            status,
            raw_response,
            ..
        }) => {
            println!("Unknown error body (status {}): {}", status, raw_response);
        }
        Err(e) => println!("Call failed: {}", e),
    }

    println!("\n=== Example 2: Flagged info on a 200 ===");
    let request = RequestParameters::patch("baskets/{reference}/applyPromotion")
        .with_url_segment("reference", "AB12")
        .with_info_as_errors(["notValidPromotionCode"]);
    match executor.execute_wrapped::<Basket>(request).await {
        Ok(result) => {
            if let Some(exception) = result.api_exception() {
                println!("Promotion rejected: {:?}", exception.errors());
            }
            println!("Basket: {:?}", result.data_or_default());
        }
        Err(e) => println!("Call failed: {}", e),
    }

    println!("\n=== Example 3: Timeout ===");
    let impatient = ApiRequestExecutor::builder(
        ApiContext::new(Environment::Qa).with_timeout(std::time::Duration::from_millis(1)),
    )
    .service("basket", 1)
    .build()?;
    match impatient
        .execute_wrapped::<Basket>(RequestParameters::get("baskets/AB12"))
        .await
    {
        Err(Error::Timeout) => println!("Timed out, as expected"),
        Err(e) if e.is_transport() => println!("Transport error: {}", e),
        Err(e) => println!("Other error: {}", e),
        Ok(result) => println!("Answered in time with {}", result.response().status),
    }

    Ok(())
}
