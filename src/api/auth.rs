//! Authentication middleware for the HTTP API.
//!
//! Requests must carry `Authorization: Bearer <token>`, checked by a
//! [`TokenValidator`]. Health checks and CORS preflight requests pass through
//! unauthenticated, and without a validator every request passes.

use crate::config::HttpConfig;
use crate::error::Error;

use actix_web::{
    Error as ActixError, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{LocalBoxFuture, Ready, ready};
use std::sync::Arc;

/// Paths reachable without a token
const PUBLIC_PATHS: &[&str] = &["/api/health"];

/// Decides whether a bearer token grants access
pub trait TokenValidator: Send + Sync {
    /// Whether `token` is valid
    fn validate(&self, token: &str) -> bool;
}

/// Accepts exactly one configured token
#[derive(Debug, Clone)]
pub struct StaticTokenValidator {
    token: String,
}

impl StaticTokenValidator {
    /// Create a validator accepting `token`
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> bool {
        token == self.token
    }
}

/// Authentication middleware factory
#[derive(Clone)]
pub struct Authentication {
    validator: Option<Arc<dyn TokenValidator>>,
}

impl Authentication {
    /// Create a new Authentication middleware; `None` disables authentication
    pub fn new(validator: Option<Arc<dyn TokenValidator>>) -> Self {
        Self { validator }
    }

    /// Authenticate against the bearer token in `config`, if one is set
    pub fn from_config(config: &HttpConfig) -> Self {
        let validator = config
            .bearer_token()
            .map(|token| Arc::new(StaticTokenValidator::new(token)) as Arc<dyn TokenValidator>);
        Self::new(validator)
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = AuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddleware {
            service,
            validator: self.validator.clone(),
        }))
    }
}

/// Authentication middleware implementation
pub struct AuthenticationMiddleware<S> {
    service: S,
    validator: Option<Arc<dyn TokenValidator>>,
}

impl<S> AuthenticationMiddleware<S> {
    fn is_authorized(&self, req: &ServiceRequest) -> bool {
        let Some(validator) = &self.validator else {
            return true;
        };

        // Skip authentication for OPTIONS requests (CORS preflight)
        if req.method() == "OPTIONS" || PUBLIC_PATHS.contains(&req.path()) {
            return true;
        }

        req.headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| validator.validate(token.trim()))
    }
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.is_authorized(&req) {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        tracing::warn!(path = %req.path(), "Authentication failed: Invalid or missing bearer token");
        let error = Error::Unauthorized("Invalid or missing bearer token".to_string());
        let res = req.into_response(error.error_response()).map_into_right_body();
        Box::pin(async move { Ok(res) })
    }
}
