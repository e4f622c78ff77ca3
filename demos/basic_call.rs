//! Basic example fetching a venue and adding items to a basket.
//!
//! This example shows how to:
//! - Build an executor for one service in one environment
//! - Call an endpoint that returns a bare payload
//! - Call an endpoint that wraps its payload in `response`
//! - Send a body with camelCase keys
//!
//! Run with: `cargo run --example basic_call`

use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, Error, RequestParameters};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct Venue {
    venue_id: String,
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Basket {
    reference: String,
    item_count: u32,
}

#[derive(Debug, Serialize)]
struct AddItem {
    product_id: String,
    quantity: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("encore_sdk=debug,basic_call=info")
        .init();

    let venues = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
        .service("venue", 2)
        .build()?;

    println!("=== Unwrapped payload ===");
    let result = venues
        .execute_unwrapped::<Venue>(
            RequestParameters::get("venues/{venueId}").with_url_segment("venueId", "138"),
        )
        .await?;
    println!("Status: {}", result.response().status);
    println!("Venue: {:?}", result.data_or_default());

    println!("\n=== Wrapped payload with a body ===");
    let context = ApiContext::for_token(Environment::Qa, "demo-token").with_affiliate("boxoffice");
    let baskets = ApiRequestExecutor::builder(context)
        .service("basket", 1)
        .build()?;

    let request = RequestParameters::post("baskets/{reference}/items")
        .with_url_segment("reference", "AB12")
        .with_body(&AddItem {
            product_id: "1587".to_string(),
            quantity: 2,
        })?;
    let result = baskets.execute_wrapped::<Basket>(request).await?;

    if result.is_successful() {
        let basket = result.data_or_default();
        println!("Basket {} holds {} items", basket.reference, basket.item_count);
    } else {
        println!("Basket call failed with {}", result.response().status);
    }

    Ok(())
}
