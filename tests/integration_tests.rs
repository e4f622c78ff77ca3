//! Integration tests using wiremock to simulate the services.

use encore_sdk::envelope::ResultsBlockWrapped;
use encore_sdk::error_factory::ErrorWrapping;
use encore_sdk::retry::RetryOnTransportError;
use encore_sdk::{
    ApiContext, ApiRequestExecutor, AuthenticationMethod, Environment, Error, RequestParameters,
    RetryPolicy, RetryStrategy,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Venue {
    venue_id: String,
    name: String,
}

#[derive(Serialize)]
struct VenueSearch {
    page: u32,
    city: Option<String>,
}

fn executor(server: &MockServer, context: ApiContext) -> ApiRequestExecutor {
    ApiRequestExecutor::builder(context)
        .base_url(format!("{}/api/v1/", server.uri()))
        .unwrap()
        .build()
        .unwrap()
}

fn anonymous() -> ApiContext {
    ApiContext::new(Environment::Qa)
}

#[tokio::test]
async fn test_unwrapped_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues/199"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"venueId": "199", "name": "Apollo"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_unwrapped::<Venue>(RequestParameters::get("venues/199"))
        .await
        .unwrap();

    assert!(result.is_successful());
    assert!(result.api_exception().is_none());
    assert_eq!(
        result.data(),
        Some(&Venue {
            venue_id: "199".to_string(),
            name: "Apollo".to_string()
        })
    );
    assert_eq!(result.data_or_exception().unwrap().name, "Apollo");
}

#[tokio::test]
async fn test_wrapped_success_keeps_request_and_context() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request": {"urlParams": {"venueId": "7"}},
            "response": {"venueId": "7", "name": "Lyceum"},
            "context": {"info": [{"code": "cached", "message": "Served from cache"}]}
        })))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<Venue>(
            RequestParameters::get("venues/{venueId}").with_url_segment("venueId", "7"),
        )
        .await
        .unwrap();

    assert!(result.is_successful());
    assert_eq!(
        result.request(),
        Some(&json!({"urlParams": {"venueId": "7"}}))
    );
    let info = result.response_context().unwrap().info.as_ref().unwrap();
    assert_eq!(info[0].code.as_deref(), Some("cached"));
    assert_eq!(result.data_or_default().name, "Lyceum");
}

#[tokio::test]
async fn test_results_block_falls_back_to_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues/7/details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"result": {"venueId": "7", "name": "Lyceum"}}
        })))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped_with::<ResultsBlockWrapped<Venue>>(RequestParameters::get(
            "venues/7/details",
        ))
        .await
        .unwrap();

    assert_eq!(result.data_or_default().unwrap().venue_id, "7");
}

#[tokio::test]
async fn test_not_found_with_context_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues/0"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "request": {"urlParams": {"venueId": "0"}},
            "context": {"errors": [{"message": "Sorry, nothing was found"}]}
        })))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<Venue>(RequestParameters::get("venues/0"))
        .await
        .unwrap();

    assert!(!result.is_successful());
    assert_eq!(result.response().status.as_u16(), 404);

    let exception = result.api_exception().unwrap().clone();
    assert_eq!(exception.response_code().as_u16(), 404);
    assert_eq!(exception.message(), "Sorry, nothing was found");
    assert_eq!(exception.request().endpoint, "venues/0");
    assert_eq!(
        exception.request_in_response(),
        Some(&json!({"urlParams": {"venueId": "0"}}))
    );

    assert_eq!(result.clone().data_or_default(), Venue::default());
    assert_eq!(result.data_or_exception().unwrap_err(), exception);
}

#[tokio::test]
async fn test_message_with_code_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/baskets"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"code": 409, "message": "Basket already exists"})),
        )
        .mount(&mock_server)
        .await;

    // Default wrapping order: the body has no `context`, so the next shape applies.
    let result = executor(&mock_server, anonymous())
        .execute_unwrapped::<Venue>(RequestParameters::post("baskets"))
        .await
        .unwrap();

    assert!(!result.is_successful());
    let exception = result.api_exception().unwrap();
    assert_eq!(exception.errors(), ["Basket already exists"]);
    assert!(!exception.is_context_exception());
}

#[tokio::test]
async fn test_errors_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/customers/12"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{"field": "email", "message": "must be a valid address"}]
        })))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_unwrapped::<Venue>(
            RequestParameters::patch("customers/12").with_error_wrappings([ErrorWrapping::Errors]),
        )
        .await
        .unwrap();

    assert_eq!(
        result.api_exception().unwrap().errors(),
        ["email: must be a valid address"]
    );
}

#[tokio::test]
async fn test_unrecognized_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<Vec<Venue>>(RequestParameters::get("venues"))
        .await;

    match result {
        Err(Error::UnrecognizedApiError {
            status,
            raw_response,
            message,
        }) => {
            assert_eq!(status.as_u16(), 502);
            assert_eq!(raw_response, "<html>Bad gateway</html>");
            assert_eq!(message, encore_sdk::CANNOT_CONVERT_API_ERROR);
        }
        _ => panic!("Expected UnrecognizedApiError, got {:?}", result),
    }
}

#[tokio::test]
async fn test_array_error_body_is_unrecognized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues"))
        .respond_with(ResponseTemplate::new(502).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<Vec<Venue>>(RequestParameters::get("venues"))
        .await;

    assert!(matches!(result, Err(Error::UnrecognizedApiError { .. })));
}

#[tokio::test]
async fn test_created_is_successful_but_not_decoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/venues"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<Venue>(RequestParameters::post("venues"))
        .await
        .unwrap();

    assert!(result.is_successful());
    assert_eq!(result.api_exception().unwrap().errors(), ["Created"]);
    assert_eq!(result.data_or_default(), Venue::default());
}

#[tokio::test]
async fn test_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_unwrapped::<Venue>(RequestParameters::get("venues/1"))
        .await;

    match result {
        Err(Error::DeserializationFailed {
            raw_response,
            status,
            ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert!(raw_response.contains("unexpected"));
        }
        _ => panic!("Expected DeserializationFailed, got {:?}", result),
    }
}

#[tokio::test]
async fn test_retry_once_then_succeed() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First request fails with 500, the extra attempt succeeds
    Mock::given(method("GET"))
        .and(path("/api/v1/venues/1"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(500).set_body_string("Server error")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"venueId": "1", "name": "Adelphi"}))
            }
        })
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_unwrapped::<Venue>(RequestParameters::get("venues/1"))
        .await
        .unwrap();

    assert!(result.is_successful());
    assert_eq!(result.data_or_default().name, "Adelphi");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_last_failure_is_accepted_after_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "context": {"errors": [{"message": "Service unavailable"}]}
        })))
        .expect(3)
        .mount(&mock_server)
        .await;

    let executor = ApiRequestExecutor::builder(anonymous())
        .base_url(format!("{}/api/v1/", mock_server.uri()))
        .unwrap()
        .retry_policy(RetryPolicy::default().with_strategy(RetryStrategy::Linear {
            delay: Duration::from_millis(10),
            max_extra_attempts: 2,
        }))
        .build()
        .unwrap();

    let result = executor
        .execute_wrapped::<Vec<Venue>>(RequestParameters::get("venues"))
        .await
        .unwrap();

    assert_eq!(
        result.api_exception().unwrap().message(),
        "Service unavailable"
    );
}

#[tokio::test]
async fn test_whitelisted_status_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/payments"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "context": {"errors": [{"message": "Card declined"}]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<serde_json::Value>(RequestParameters::post("payments"))
        .await
        .unwrap();

    assert_eq!(result.api_exception().unwrap().errors(), ["Card declined"]);
}

#[tokio::test]
async fn test_soft_error_on_ok() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/baskets/AB12/applyPromotion"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"venueId": "1", "name": "Basket venue"},
            "context": {"info": [{
                "code": "notValidPromotionCode",
                "message": "Promotion code is not valid",
                "type": "warning"
            }]}
        })))
        .mount(&mock_server)
        .await;

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<Venue>(
            RequestParameters::patch("baskets/{reference}/applyPromotion")
                .with_url_segment("reference", "AB12")
                .with_info_as_errors(["notValidPromotionCode"]),
        )
        .await
        .unwrap();

    // The status decides success; the flagged info is reported as an exception.
    assert!(result.is_successful());
    let exception = result.api_exception().unwrap();
    assert!(exception.is_context_exception());
    assert_eq!(exception.context_info()[0].kind.as_deref(), Some("warning"));
    assert_eq!(exception.errors(), ["Promotion code is not valid"]);

    assert_eq!(result.clone().data_or_default().name, "Basket venue");
    assert_eq!(result.data_or_exception().unwrap().name, "Basket venue");
}

#[tokio::test]
async fn test_standard_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues"))
        .and(header_exists("x-sdk"))
        .and(header("affiliateid", "boxoffice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = anonymous().with_affiliate("boxoffice");
    let result = executor(&mock_server, context)
        .execute_wrapped::<Vec<Venue>>(RequestParameters::get("venues"))
        .await
        .unwrap();

    assert!(result.is_successful());
}

#[tokio::test]
async fn test_query_and_dated_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/performances"))
        .and(query_param("page", "2"))
        .and(body_json(json!({"performanceDate": "2024-05-01", "venueId": "199"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = RequestParameters::post("performances")
        .with_query(&VenueSearch {
            page: 2,
            city: None,
        })
        .unwrap()
        .with_body(&json!({
            "performance_date": "2024-05-01T09:30:00+01:00",
            "venue_id": "199"
        }))
        .unwrap()
        .with_date_format("%Y-%m-%d");

    let result = executor(&mock_server, anonymous())
        .execute_wrapped::<Vec<Venue>>(request)
        .await
        .unwrap();

    assert!(result.is_successful());
}

#[tokio::test]
async fn test_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .and(header("authorization", "Bearer predefined-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = ApiContext::for_token(Environment::Qa, "predefined-token");
    let result = executor(&mock_server, context)
        .execute_wrapped::<Vec<serde_json::Value>>(RequestParameters::get("orders"))
        .await
        .unwrap();

    assert!(result.is_successful());
}

#[tokio::test]
async fn test_basic_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = ApiContext::for_user(Environment::Qa, "user", "pass")
        .with_authentication_method(AuthenticationMethod::Basic);
    let mut executor = executor(&mock_server, context);
    executor.authenticate().await.unwrap();

    let result = executor
        .execute_wrapped::<Vec<serde_json::Value>>(RequestParameters::get("orders"))
        .await
        .unwrap();

    assert!(result.is_successful());
}

#[tokio::test]
async fn test_jwt_login_flow() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .and(body_json(json!({"username": "agent", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "issued-token"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .and(header("authorization", "Bearer issued-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = ApiContext::for_user(Environment::Qa, "agent", "secret");
    let mut executor = executor(&mock_server, context);
    executor.authenticate().await.unwrap();
    assert_eq!(
        executor.context().access_token.as_deref(),
        Some("issued-token")
    );

    // Already authenticated: no second login
    executor.authenticate().await.unwrap();

    let result = executor
        .execute_wrapped::<Vec<serde_json::Value>>(RequestParameters::get("orders"))
        .await
        .unwrap();
    assert!(result.is_successful());
}

#[tokio::test]
async fn test_failed_login_surfaces_exception() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "context": {"errors": [{"message": "Invalid credentials"}]}
        })))
        .mount(&mock_server)
        .await;

    let context = ApiContext::for_user(Environment::Qa, "agent", "wrong");
    let mut executor = executor(&mock_server, context);

    match executor.authenticate().await {
        Err(Error::Api(exception)) => {
            assert_eq!(exception.response_code().as_u16(), 401);
            assert_eq!(exception.message(), "Invalid credentials");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
    assert!(executor.context().access_token.is_none());
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let context = anonymous().with_timeout(Duration::from_millis(50));
    let executor = ApiRequestExecutor::builder(context)
        .base_url(format!("{}/api/v1/", mock_server.uri()))
        .unwrap()
        .retry_policy(RetryPolicy::no_retry())
        .build()
        .unwrap();

    let result = executor
        .execute_wrapped::<Vec<Venue>>(RequestParameters::get("venues"))
        .await;

    assert!(matches!(result, Err(Error::Timeout)), "{:?}", result);
}

#[tokio::test]
async fn test_transport_only_predicate_accepts_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/venues"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "context": {"errors": [{"message": "Internal error"}]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = ApiRequestExecutor::builder(anonymous())
        .base_url(format!("{}/api/v1/", mock_server.uri()))
        .unwrap()
        .retry_policy(RetryPolicy::default().with_predicate(Arc::new(RetryOnTransportError)))
        .build()
        .unwrap();

    let result = executor
        .execute_wrapped::<Vec<Venue>>(RequestParameters::get("venues"))
        .await
        .unwrap();

    assert_eq!(result.api_exception().unwrap().errors(), ["Internal error"]);
}

#[tokio::test]
async fn test_error_hook_and_response_info() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/baskets/AB12"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-request-id", "req-42")
                .set_body_json(json!({"context": {"errors": [{"message": "Basket is locked"}]}})),
        )
        .mount(&mock_server)
        .await;

    let reported = Arc::new(AtomicUsize::new(0));
    let reported_clone = reported.clone();
    let executor = ApiRequestExecutor::builder(anonymous())
        .base_url(format!("{}/api/v1/", mock_server.uri()))
        .unwrap()
        .on_error(move |exception| {
            assert_eq!(exception.message(), "Basket is locked");
            reported_clone.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let result = executor
        .execute_unwrapped::<serde_json::Value>(RequestParameters::delete("baskets/AB12"))
        .await
        .unwrap();

    assert_eq!(reported.load(Ordering::SeqCst), 1);

    let info = result.context().response_info.as_ref().unwrap();
    assert_eq!(info.status.as_u16(), 400);
    assert_eq!(info.headers.get("x-request-id").unwrap(), "req-42");

    // The executor's own context is left untouched
    assert!(executor.context().response_info.is_none());
}
