//! Credentials and pluggable authentication strategies.
//!
//! The executor never logs in by itself. It copies whatever credentials the
//! [`ApiContext`] holds into the request ([`Credentials`] → [`Authenticator`]).
//! Obtaining a token is the job of an [`AuthenticationService`], which takes a
//! context and hands back an updated copy.

use crate::context::{ApiContext, AuthenticationMethod};
use crate::parameters::RequestParameters;
use crate::{ApiRequestExecutor, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use url::Url;

/// Default path of the login endpoint, relative to the service base URL.
pub const DEFAULT_LOGIN_ENDPOINT: &str = "login";

/// Credentials copied verbatim from an [`ApiContext`] for a single call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub authentication_method: AuthenticationMethod,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("authentication_method", &self.authentication_method)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Authorization attached to an outgoing request.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Authenticator {
    #[default]
    None,
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
}

impl Authenticator {
    /// Derives the request authorization from call credentials.
    ///
    /// JWT and predefined-JWT contexts send a bearer token once one is
    /// present; basic contexts always send their username and password.
    pub fn from_credentials(credentials: Option<&Credentials>) -> Self {
        let Some(credentials) = credentials else {
            return Authenticator::None;
        };

        match credentials.authentication_method {
            AuthenticationMethod::Jwt | AuthenticationMethod::PredefinedJwt => {
                match &credentials.access_token {
                    Some(token) => Authenticator::Bearer(token.clone()),
                    None => Authenticator::None,
                }
            }
            AuthenticationMethod::Basic => Authenticator::Basic {
                username: credentials.username.clone().unwrap_or_default(),
                password: credentials.password.clone(),
            },
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Authenticator::None => request,
            Authenticator::Bearer(token) => request.bearer_auth(token),
            Authenticator::Basic { username, password } => {
                request.basic_auth(username, password.as_ref())
            }
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authenticator::None => f.write_str("None"),
            Authenticator::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Authenticator::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Capability that turns a context into an authenticated one.
pub trait AuthenticationService: Send + Sync {
    /// Returns a copy of `context` that is ready to make authenticated calls.
    fn authenticate(
        &self,
        context: &ApiContext,
    ) -> impl Future<Output = Result<ApiContext>> + Send;

    /// Returns `true` if `context` already carries usable authentication.
    fn is_there_authentication(&self, context: &ApiContext) -> bool;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Logs in with username and password and stores the returned bearer token.
#[derive(Debug, Clone)]
pub struct JwtAuthentication {
    base_url: Url,
    endpoint: String,
}

impl JwtAuthentication {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            endpoint: DEFAULT_LOGIN_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl AuthenticationService for JwtAuthentication {
    async fn authenticate(&self, context: &ApiContext) -> Result<ApiContext> {
        let (Some(username), Some(password)) = (&context.username, &context.password) else {
            return Err(Error::Authentication(
                "username and password are required to log in".to_string(),
            ));
        };

        // The login call itself goes out without a stale token.
        let mut anonymous = context.clone();
        anonymous.access_token = None;

        let executor = ApiRequestExecutor::builder(anonymous)
            .base_url(self.base_url.as_str())?
            .build()?;
        let parameters = RequestParameters::post(&self.endpoint).with_body(&LoginRequest {
            username,
            password,
        })?;

        let result = executor
            .execute_unwrapped::<LoginResponse>(parameters)
            .await?;
        let token = result.data_or_exception()?.token;

        tracing::debug!(username = %username, "Obtained access token");
        Ok(context.clone().with_access_token(token))
    }

    fn is_there_authentication(&self, context: &ApiContext) -> bool {
        context.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Accepts a token the caller obtained elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredefinedJwtAuthentication;

impl AuthenticationService for PredefinedJwtAuthentication {
    async fn authenticate(&self, context: &ApiContext) -> Result<ApiContext> {
        if self.is_there_authentication(context) {
            Ok(context.clone())
        } else {
            Err(Error::Authentication(
                "a predefined access token is required".to_string(),
            ))
        }
    }

    fn is_there_authentication(&self, context: &ApiContext) -> bool {
        context.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Basic auth needs no exchange: credentials travel with every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuthentication;

impl AuthenticationService for BasicAuthentication {
    async fn authenticate(&self, context: &ApiContext) -> Result<ApiContext> {
        if self.is_there_authentication(context) {
            Ok(context.clone())
        } else {
            Err(Error::Authentication(
                "a username is required for basic authentication".to_string(),
            ))
        }
    }

    fn is_there_authentication(&self, context: &ApiContext) -> bool {
        context.username.is_some()
    }
}

/// Strategy picked from a context's [`AuthenticationMethod`].
#[derive(Debug, Clone)]
pub enum Authentication {
    Jwt(JwtAuthentication),
    PredefinedJwt(PredefinedJwtAuthentication),
    Basic(BasicAuthentication),
}

/// Selects the authentication strategy matching `context`.
///
/// `base_url` is only used by the JWT strategy, which logs in against it.
pub fn authentication_for(context: &ApiContext, base_url: Url) -> Authentication {
    match context.authentication_method {
        AuthenticationMethod::Jwt => Authentication::Jwt(JwtAuthentication::new(base_url)),
        AuthenticationMethod::PredefinedJwt => {
            Authentication::PredefinedJwt(PredefinedJwtAuthentication)
        }
        AuthenticationMethod::Basic => Authentication::Basic(BasicAuthentication),
    }
}

impl AuthenticationService for Authentication {
    async fn authenticate(&self, context: &ApiContext) -> Result<ApiContext> {
        match self {
            Authentication::Jwt(service) => service.authenticate(context).await,
            Authentication::PredefinedJwt(service) => service.authenticate(context).await,
            Authentication::Basic(service) => service.authenticate(context).await,
        }
    }

    fn is_there_authentication(&self, context: &ApiContext) -> bool {
        match self {
            Authentication::Jwt(service) => service.is_there_authentication(context),
            Authentication::PredefinedJwt(service) => service.is_there_authentication(context),
            Authentication::Basic(service) => service.is_there_authentication(context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Environment;

    fn credentials(method: AuthenticationMethod, token: Option<&str>) -> Credentials {
        Credentials {
            authentication_method: method,
            access_token: token.map(str::to_string),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
        }
    }

    #[test]
    fn no_credentials_means_no_authenticator() {
        assert_eq!(Authenticator::from_credentials(None), Authenticator::None);
    }

    #[test]
    fn jwt_without_token_is_anonymous() {
        let creds = credentials(AuthenticationMethod::Jwt, None);
        assert_eq!(Authenticator::from_credentials(Some(&creds)), Authenticator::None);
    }

    #[test]
    fn jwt_and_predefined_tokens_become_bearer() {
        for method in [AuthenticationMethod::Jwt, AuthenticationMethod::PredefinedJwt] {
            let creds = credentials(method, Some("abc"));
            assert_eq!(
                Authenticator::from_credentials(Some(&creds)),
                Authenticator::Bearer("abc".to_string())
            );
        }
    }

    #[test]
    fn basic_ignores_token() {
        let creds = credentials(AuthenticationMethod::Basic, Some("abc"));
        assert_eq!(
            Authenticator::from_credentials(Some(&creds)),
            Authenticator::Basic {
                username: "user".to_string(),
                password: Some("pass".to_string()),
            }
        );
    }

    #[test]
    fn strategy_follows_context_method() {
        let base = Environment::Qa.service_url("auth", 1).unwrap();

        let context = ApiContext::for_user(Environment::Qa, "user", "pass");
        assert!(matches!(authentication_for(&context, base.clone()), Authentication::Jwt(_)));

        let context = ApiContext::for_token(Environment::Qa, "token");
        let strategy = authentication_for(&context, base.clone());
        assert!(matches!(strategy, Authentication::PredefinedJwt(_)));
        assert!(strategy.is_there_authentication(&context));

        let context = ApiContext::for_user(Environment::Qa, "user", "pass")
            .with_authentication_method(AuthenticationMethod::Basic);
        assert!(matches!(authentication_for(&context, base), Authentication::Basic(_)));
    }

    #[tokio::test]
    async fn predefined_strategy_requires_token() {
        let context = ApiContext::new(Environment::Qa)
            .with_authentication_method(AuthenticationMethod::PredefinedJwt);
        let err = PredefinedJwtAuthentication
            .authenticate(&context)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[tokio::test]
    async fn jwt_login_requires_username_and_password() {
        let service = JwtAuthentication::new(Environment::Qa.service_url("auth", 1).unwrap());
        let err = service
            .authenticate(&ApiContext::new(Environment::Qa))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }
}
