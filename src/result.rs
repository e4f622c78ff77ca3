//! The uniform outcome of an executor call.

use crate::context::ApiContext;
use crate::envelope::ResponseContext;
use crate::exception::ApiException;
use crate::transport::RawResponse;
use serde_json::Value;

#[derive(Debug, Clone)]
enum Outcome<T> {
    Success(T),
    /// A 200 whose context carried info entries flagged as errors.
    SoftFailure(T, ApiException),
    Failure(ApiException),
}

/// Result of one API call, successful or not.
///
/// Ordinary API failures do not make the executor return `Err`; they land
/// here with an [`ApiException`] attached. Success is the raw response's
/// 2xx flag and nothing else: [`data_or_exception`](Self::data_or_exception)
/// and [`data_or_default`](Self::data_or_default) branch on it. Callers pick
/// how to consume it:
///
/// ```no_run
/// use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, RequestParameters};
///
/// # async fn example() -> Result<(), encore_sdk::Error> {
/// let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
///     .service("venue", 1)
///     .build()?;
/// let result = executor
///     .execute_wrapped::<Vec<serde_json::Value>>(RequestParameters::get("venues"))
///     .await?;
///
/// // Either treat a failure as an error...
/// if !result.is_successful() {
///     eprintln!("lookup failed: {:?}", result.api_exception());
/// }
/// // ...or fall back to the default value.
/// let venues = result.data_or_default();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiResult<T> {
    context: ApiContext,
    response: RawResponse,
    response_context: Option<ResponseContext>,
    request: Option<Value>,
    outcome: Outcome<T>,
}

impl<T> ApiResult<T> {
    pub(crate) fn success(
        context: ApiContext,
        response: RawResponse,
        response_context: Option<ResponseContext>,
        request: Option<Value>,
        data: T,
    ) -> Self {
        Self {
            context,
            response,
            response_context,
            request,
            outcome: Outcome::Success(data),
        }
    }

    /// A 200 response whose payload decoded but whose context reported
    /// flagged info entries. The exception is only reported through
    /// [`api_exception`](Self::api_exception) and the error hook.
    pub(crate) fn soft_failure(
        context: ApiContext,
        response: RawResponse,
        response_context: Option<ResponseContext>,
        request: Option<Value>,
        data: T,
        exception: ApiException,
    ) -> Self {
        Self {
            context,
            response,
            response_context,
            request,
            outcome: Outcome::SoftFailure(data, exception),
        }
    }

    pub(crate) fn failure(
        context: ApiContext,
        response: RawResponse,
        response_context: Option<ResponseContext>,
        request: Option<Value>,
        exception: ApiException,
    ) -> Self {
        Self {
            context,
            response,
            response_context,
            request,
            outcome: Outcome::Failure(exception),
        }
    }

    /// `true` when the raw response was 2xx.
    pub fn is_successful(&self) -> bool {
        self.response.is_successful()
    }

    /// The context snapshot used for the call, with the response info filled in.
    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    pub fn response(&self) -> &RawResponse {
        &self.response
    }

    pub fn response_context(&self) -> Option<&ResponseContext> {
        self.response_context.as_ref()
    }

    /// The request block the service echoed back, if any.
    pub fn request(&self) -> Option<&Value> {
        self.request.as_ref()
    }

    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(data) | Outcome::SoftFailure(data, _) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    pub fn api_exception(&self) -> Option<&ApiException> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::SoftFailure(_, exception) | Outcome::Failure(exception) => Some(exception),
        }
    }

    /// Returns the payload of a successful result, the stored exception
    /// otherwise.
    ///
    /// A 2xx other than 200 is successful but never decoded, so it has no
    /// payload and its exception is returned instead.
    pub fn data_or_exception(self) -> Result<T, ApiException> {
        let successful = self.is_successful();
        match self.outcome {
            Outcome::Success(data) | Outcome::SoftFailure(data, _) if successful => Ok(data),
            Outcome::SoftFailure(_, exception) | Outcome::Failure(exception) => Err(exception),
            // Only built from 200 responses.
            Outcome::Success(data) => Ok(data),
        }
    }

    /// Returns the payload of a successful result, `T::default()` otherwise.
    pub fn data_or_default(self) -> T
    where
        T: Default,
    {
        let successful = self.is_successful();
        match self.outcome {
            Outcome::Success(data) | Outcome::SoftFailure(data, _) if successful => data,
            _ => T::default(),
        }
    }

    /// Maps the payload, keeping everything else.
    pub fn map<U, F>(self, f: F) -> ApiResult<U>
    where
        F: FnOnce(T) -> U,
    {
        let outcome = match self.outcome {
            Outcome::Success(data) => Outcome::Success(f(data)),
            Outcome::SoftFailure(data, exception) => Outcome::SoftFailure(f(data), exception),
            Outcome::Failure(exception) => Outcome::Failure(exception),
        };
        ApiResult {
            context: self.context,
            response: self.response,
            response_context: self.response_context,
            request: self.request,
            outcome,
        }
    }
}
