//! The request executor every endpoint method calls through.
//!
//! The [`ApiRequestExecutor`] type is the main entry point of the crate.
//! Use [`ApiRequestExecutorBuilder`] to configure and create executors.

use crate::auth::{authentication_for, AuthenticationService};
use crate::client::{ClientWrapper, TypedResponse};
use crate::context::ApiContext;
use crate::envelope::{ResponseEnvelope, StandardWrapped, Unwrapped};
use crate::error_factory::{create_failed_result, ErrorWrapping};
use crate::exception::{ApiException, RequestEcho};
use crate::parameters::{build_client_parameters, RequestParameters};
use crate::result::ApiResult;
use crate::retry::RetryPolicy;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, Result};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use url::Url;

/// Callback invoked with every [`ApiException`] an executor produces.
pub type ErrorHook = Arc<dyn Fn(&ApiException) + Send + Sync>;

/// Executes API calls for one service on behalf of one [`ApiContext`].
///
/// Only a status of exactly 200 is decoded as a success. Any other response
/// that survives the retry loop goes to the error factory and comes back as a
/// failed [`ApiResult`]. `Err` is reserved for transport failures, bodies
/// that cannot be decoded, and error bodies of no known shape.
///
/// # Examples
///
/// ```no_run
/// use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, RequestParameters};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Basket {
///     reference: String,
///     item_count: u32,
/// }
///
/// # async fn example() -> Result<(), encore_sdk::Error> {
/// let context = ApiContext::for_token(Environment::Sandbox, "token").with_affiliate("boxoffice");
/// let executor = ApiRequestExecutor::builder(context)
///     .service("basket", 1)
///     .build()?;
///
/// let result = executor
///     .execute_wrapped::<Basket>(
///         RequestParameters::get("baskets/{reference}").with_url_segment("reference", "AB12"),
///     )
///     .await?;
///
/// match result.data_or_exception() {
///     Ok(basket) => println!("{} items", basket.item_count),
///     Err(exception) => eprintln!("{} ({})", exception, exception.response_code()),
/// }
/// # Ok(())
/// # }
/// ```
pub struct ApiRequestExecutor<T = ReqwestTransport> {
    context: ApiContext,
    base_url: Url,
    wrapper: ClientWrapper<T>,
    on_error: Option<ErrorHook>,
}

impl ApiRequestExecutor<ReqwestTransport> {
    /// Creates a new builder for `context`.
    pub fn builder(context: ApiContext) -> ApiRequestExecutorBuilder {
        ApiRequestExecutorBuilder::new(context)
    }
}

impl<T: Transport> ApiRequestExecutor<T> {
    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    /// Replaces the context used for subsequent calls.
    pub fn set_context(&mut self, context: ApiContext) {
        self.context = context;
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.wrapper.retry_policy()
    }

    /// Runs the authentication strategy matching the context and keeps the
    /// authenticated context for subsequent calls.
    ///
    /// Does nothing when the context already carries authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy cannot authenticate the context.
    pub async fn authenticate(&mut self) -> Result<()> {
        let service = authentication_for(&self.context, self.base_url.clone());
        if service.is_there_authentication(&self.context) {
            return Ok(());
        }
        self.context = service.authenticate(&self.context).await?;
        Ok(())
    }

    /// Executes a call whose response body is the payload itself.
    ///
    /// # Errors
    ///
    /// See [`execute_wrapped_with`](Self::execute_wrapped_with).
    pub async fn execute_unwrapped<D: DeserializeOwned>(
        &self,
        request: RequestParameters,
    ) -> Result<ApiResult<D>> {
        self.execute_wrapped_with::<Unwrapped<D>>(request).await
    }

    /// Executes a call whose payload sits in the `response` field of the
    /// standard `{request, response, context}` envelope.
    ///
    /// # Errors
    ///
    /// See [`execute_wrapped_with`](Self::execute_wrapped_with).
    pub async fn execute_wrapped<D: DeserializeOwned>(
        &self,
        request: RequestParameters,
    ) -> Result<ApiResult<D>> {
        self.execute_wrapped_with::<StandardWrapped<D>>(request).await
    }

    /// Executes a call and decodes a 200 body as the envelope `E`.
    ///
    /// ```no_run
    /// use encore_sdk::envelope::ResultsBlockWrapped;
    /// use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, RequestParameters};
    ///
    /// # async fn example() -> Result<(), encore_sdk::Error> {
    /// let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
    ///     .service("pricing", 2)
    ///     .build()?;
    /// let prices = executor
    ///     .execute_wrapped_with::<ResultsBlockWrapped<Vec<serde_json::Value>>>(
    ///         RequestParameters::get("prices"),
    ///     )
    ///     .await?
    ///     .data_or_default()
    ///     .unwrap_or_default();
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] or [`Error::Network`] if every attempt failed
    ///   below the HTTP layer
    /// - [`Error::DeserializationFailed`] if a 2xx body did not match `E`
    /// - [`Error::UnrecognizedApiError`] if an error body matched none of the
    ///   request's error wrappings
    pub async fn execute_wrapped_with<E: ResponseEnvelope>(
        &self,
        request: RequestParameters,
    ) -> Result<ApiResult<E::Data>> {
        let span = tracing::info_span!(
            "api_request",
            method = %request.method,
            endpoint = %request.endpoint
        );
        self.execute_envelope::<E>(request).instrument(span).await
    }

    async fn execute_envelope<E: ResponseEnvelope>(
        &self,
        mut request: RequestParameters,
    ) -> Result<ApiResult<E::Data>> {
        let mut wrappings = std::mem::take(&mut request.error_wrappings);
        if wrappings.is_empty() {
            wrappings = ErrorWrapping::DEFAULT_ORDER.to_vec();
        }
        let info_as_errors = std::mem::take(&mut request.info_as_errors);

        let parameters = build_client_parameters(&self.context, &self.base_url, request)?;
        let echo = RequestEcho::from(&parameters);
        let client = self.wrapper.build_client(&parameters);
        let rest_request = self.wrapper.build_request(&parameters)?;

        let typed = self.wrapper.execute_as::<E>(&client, &rest_request).await?;

        let mut context = self.context.clone();
        context.record_response(typed.response.status, &typed.response.headers);

        let result = if typed.response.status == StatusCode::OK {
            success_result(typed, context, echo, &info_as_errors)?
        } else {
            create_failed_result(&wrappings, typed.response, context, echo, &info_as_errors)?
        };

        if let Some(exception) = result.api_exception() {
            tracing::warn!(
                status = exception.response_code().as_u16(),
                message = %exception.message(),
                "API call failed"
            );
            if let Some(hook) = &self.on_error {
                hook(exception);
            }
        }

        Ok(result)
    }
}

fn success_result<E: ResponseEnvelope>(
    typed: TypedResponse<E>,
    context: ApiContext,
    echo: RequestEcho,
    info_as_errors: &[String],
) -> Result<ApiResult<E::Data>> {
    let TypedResponse { response, data, .. } = typed;

    let envelope = match data {
        Some(envelope) => envelope,
        // An empty 200 body only decodes into envelopes that accept null.
        None => serde_json::from_value::<E>(Value::Null).map_err(|e| {
            Error::DeserializationFailed {
                raw_response: response.content.clone(),
                serde_error: e.to_string(),
                status: response.status,
            }
        })?,
    };
    let parts = envelope.into_parts();

    let flagged = parts
        .context
        .as_ref()
        .map(|c| c.info_matching(info_as_errors))
        .unwrap_or_default();

    if flagged.is_empty() {
        return Ok(ApiResult::success(
            context,
            response,
            parts.context,
            parts.request,
            parts.data,
        ));
    }

    let errors = parts
        .context
        .as_ref()
        .map(|c| c.error_messages())
        .unwrap_or_default();
    let exception = ApiException::new(response.status, errors, echo, context.clone())
        .with_context_info(flagged)
        .with_request_in_response(parts.request.clone());

    Ok(ApiResult::soft_failure(
        context,
        response,
        parts.context,
        parts.request,
        parts.data,
        exception,
    ))
}

impl<T: fmt::Debug> fmt::Debug for ApiRequestExecutor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequestExecutor")
            .field("context", &self.context)
            .field("base_url", &self.base_url.as_str())
            .field("wrapper", &self.wrapper)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Builder for configuring and creating an [`ApiRequestExecutor`].
///
/// Either [`base_url`](Self::base_url) or [`service`](Self::service) must be
/// set; an explicit base URL wins.
///
/// # Examples
///
/// ```no_run
/// use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, RetryPolicy, RetryStrategy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), encore_sdk::Error> {
/// let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Staging))
///     .service("inventory", 4)
///     .retry_policy(RetryPolicy::default().with_strategy(RetryStrategy::Linear {
///         delay: Duration::from_millis(250),
///         max_extra_attempts: 2,
///     }))
///     .on_error(|exception| eprintln!("inventory call failed: {exception}"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ApiRequestExecutorBuilder {
    context: ApiContext,
    base_url: Option<Url>,
    service: Option<(String, u32)>,
    retry_policy: RetryPolicy,
    on_error: Option<ErrorHook>,
}

impl ApiRequestExecutorBuilder {
    pub fn new(context: ApiContext) -> Self {
        Self {
            context,
            base_url: None,
            service: None,
            retry_policy: RetryPolicy::default(),
            on_error: None,
        }
    }

    /// Sets the base URL all endpoints are resolved against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Targets a service by name and API version in the context's environment.
    pub fn service(mut self, name: impl Into<String>, version: u32) -> Self {
        self.service = Some((name.into(), version));
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Registers a callback for every [`ApiException`] the executor produces.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApiException) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Builds an executor backed by a fresh [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL can be resolved or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<ApiRequestExecutor<ReqwestTransport>> {
        let transport = ReqwestTransport::new()?;
        self.build_with_transport(transport)
    }

    /// Builds an executor backed by `transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL can be resolved.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<ApiRequestExecutor<T>> {
        let base_url = match (self.base_url, self.service) {
            (Some(url), _) => url,
            (None, Some((name, version))) => self.context.environment.service_url(&name, version)?,
            (None, None) => {
                return Err(Error::ConfigurationError(
                    "Base URL or service is required".to_string(),
                ))
            }
        };

        Ok(ApiRequestExecutor {
            context: self.context,
            base_url,
            wrapper: ClientWrapper::new(transport, self.retry_policy),
            on_error: self.on_error,
        })
    }
}

impl fmt::Debug for ApiRequestExecutorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequestExecutorBuilder")
            .field("context", &self.context)
            .field("base_url", &self.base_url)
            .field("service", &self.service)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}
