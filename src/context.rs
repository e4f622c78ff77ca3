//! Session state shared by every call: environment, credentials and the
//! response-info slot the executor fills in after each round-trip.

use http::{HeaderMap, StatusCode};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Host suffix shared by every service in the family.
const SERVICE_HOST: &str = "tixuk.io";

/// Deployment environment the services are addressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Qa,
    Sandbox,
}

impl Environment {
    /// Host prefix for this environment; empty for production.
    pub fn prefix(self) -> &'static str {
        match self {
            Environment::Production => "",
            Environment::Staging => "staging.",
            Environment::Qa => "qa.",
            Environment::Sandbox => "sandbox.",
        }
    }

    /// Base URL of a service in this environment.
    ///
    /// The returned URL always ends with a slash so that endpoint paths join
    /// underneath `api/v{version}/`.
    ///
    /// ```
    /// use encore_sdk::Environment;
    ///
    /// let url = Environment::Qa.service_url("basket", 1).unwrap();
    /// assert_eq!(url.as_str(), "https://basket-service.qa.tixuk.io/api/v1/");
    /// ```
    pub fn service_url(self, service: &str, version: u32) -> crate::Result<Url> {
        let url = format!(
            "https://{service}-service.{}{SERVICE_HOST}/api/v{version}/",
            self.prefix()
        );
        Ok(Url::parse(&url)?)
    }
}

/// How requests made with a context are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthenticationMethod {
    /// Bearer token obtained by logging in with username and password.
    #[default]
    Jwt,
    /// HTTP basic authentication with username and password.
    Basic,
    /// Bearer token supplied up front by the caller.
    PredefinedJwt,
}

/// Status and headers of the most recent response made with a context.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Credentials and settings for one logical session.
///
/// Exactly one [`AuthenticationMethod`] is active at a time. The access token
/// is either pre-supplied or written by an
/// [`AuthenticationService`](crate::auth::AuthenticationService), which hands
/// back an updated copy instead of mutating a shared instance.
///
/// A context is a plain value: executors take their own snapshot, so callers
/// sharing one across tasks should clone it or guard it themselves.
///
/// ```
/// use encore_sdk::{ApiContext, AuthenticationMethod, Environment};
///
/// let context = ApiContext::for_user(Environment::Qa, "user", "pass").with_affiliate("boxoffice");
/// assert_eq!(context.authentication_method, AuthenticationMethod::Jwt);
/// assert!(context.access_token.is_none());
/// ```
#[derive(Clone, Default)]
pub struct ApiContext {
    pub environment: Environment,
    pub authentication_method: AuthenticationMethod,
    pub username: Option<String>,
    pub password: Option<String>,
    pub access_token: Option<String>,
    pub affiliate: Option<String>,
    /// Per-request transport timeout. `None` leaves the transport default.
    pub timeout: Option<Duration>,
    /// Filled in by the executor on the snapshot it returns with each result.
    pub response_info: Option<ResponseInfo>,
}

impl ApiContext {
    /// Creates an anonymous context for the given environment.
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Creates a context that logs in with a username and password.
    pub fn for_user(
        environment: Environment,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            authentication_method: AuthenticationMethod::Jwt,
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Creates a context carrying a token obtained elsewhere.
    pub fn for_token(environment: Environment, access_token: impl Into<String>) -> Self {
        Self {
            environment,
            authentication_method: AuthenticationMethod::PredefinedJwt,
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    pub fn with_authentication_method(mut self, method: AuthenticationMethod) -> Self {
        self.authentication_method = method;
        self
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn with_affiliate(mut self, affiliate: impl Into<String>) -> Self {
        self.affiliate = Some(affiliate.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the affiliate id if it holds anything besides whitespace.
    pub fn affiliate_id(&self) -> Option<&str> {
        self.affiliate
            .as_deref()
            .map(str::trim)
            .filter(|affiliate| !affiliate.is_empty())
    }

    /// Records the status and headers of a response on this context.
    pub fn record_response(&mut self, status: StatusCode, headers: &HeaderMap) {
        self.response_info = Some(ResponseInfo {
            status,
            headers: headers.clone(),
        });
    }
}

impl fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiContext")
            .field("environment", &self.environment)
            .field("authentication_method", &self.authentication_method)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("affiliate", &self.affiliate)
            .field("timeout", &self.timeout)
            .field("response_info", &self.response_info)
            .finish()
    }
}
