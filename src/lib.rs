//! # Encore SDK - core of a typed client for the ticketing REST services
//!
//! The services behind this SDK (basket, payment, pricing, venue, content,
//! inventory, authentication) share one request pipeline. This crate is that
//! pipeline: it resolves credentials per context, builds requests from
//! declarative parameters, runs them through a bounded retry loop, and
//! decodes either the success envelope or one of several error envelopes into
//! a uniform [`ApiResult`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, RequestParameters};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct AddItem {
//!     product_id: String,
//!     quantity: u32,
//! }
//!
//! #[derive(Debug, Default, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Basket {
//!     reference: String,
//!     item_count: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), encore_sdk::Error> {
//!     let context = ApiContext::for_token(Environment::Qa, "my-token").with_affiliate("boxoffice");
//!     let executor = ApiRequestExecutor::builder(context)
//!         .service("basket", 1)
//!         .build()?;
//!
//!     // Bodies are sent with camelCase keys
//!     let request = RequestParameters::post("baskets/{reference}/items")
//!         .with_url_segment("reference", "AB12")
//!         .with_body(&AddItem {
//!             product_id: "1587".to_string(),
//!             quantity: 2,
//!         })?;
//!
//!     let result = executor.execute_wrapped::<Basket>(request).await?;
//!     println!("Status: {}", result.response().status);
//!
//!     let basket = result.data_or_default();
//!     println!("Basket {} holds {} items", basket.reference, basket.item_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Results and errors
//!
//! API failures are values, not errors. A 404 with a recognised envelope comes
//! back as an `Ok(ApiResult)` carrying an [`ApiException`]; the executor only
//! returns `Err` when no response could be obtained or understood:
//!
//! ```no_run
//! use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, Error, RequestParameters};
//!
//! # async fn example() -> Result<(), Error> {
//! # let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa)).service("venue", 1).build()?;
//! match executor.execute_wrapped::<serde_json::Value>(RequestParameters::get("venues/1")).await {
//!     Ok(result) => match result.data_or_exception() {
//!         Ok(venue) => println!("Venue: {}", venue),
//!         Err(exception) => eprintln!("API error {}: {}", exception.response_code(), exception),
//!     },
//!     Err(Error::UnrecognizedApiError { status, raw_response, .. }) => {
//!         eprintln!("Unknown error body (status {}): {}", status, raw_response);
//!     }
//!     Err(e) => eprintln!("Call failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retries
//!
//! By default a call gets one immediate extra attempt when the transport fails
//! or the status is neither 2xx nor one of
//! [`GOOD_STATUS_CODES`](retry::GOOD_STATUS_CODES). Whatever the last attempt
//! produced is then accepted:
//!
//! ```no_run
//! use encore_sdk::retry::RetryOnTransportError;
//! use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, RetryPolicy, RetryStrategy};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), encore_sdk::Error> {
//! let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
//!     .service("payment", 1)
//!     .retry_policy(
//!         RetryPolicy::default()
//!             .with_strategy(RetryStrategy::ExponentialBackoff {
//!                 initial_delay: Duration::from_millis(100),
//!                 max_delay: Duration::from_secs(2),
//!                 max_extra_attempts: 3,
//!                 jitter: true,
//!             })
//!             .with_predicate(Arc::new(RetryOnTransportError)),
//!     )
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod context;
pub mod envelope;
mod error;
pub mod error_factory;
pub mod exception;
mod executor;
pub mod parameters;
mod result;
pub mod retry;
pub mod serializer;
pub mod transport;

pub use context::{ApiContext, AuthenticationMethod, Environment};
pub use error::{Error, Result, CANNOT_CONVERT_API_ERROR};
pub use exception::ApiException;
pub use executor::{ApiRequestExecutor, ApiRequestExecutorBuilder, ErrorHook};
pub use parameters::{RequestMethod, RequestParameters};
pub use result::ApiResult;
pub use retry::{RetryPolicy, RetryPredicate, RetryStrategy};
