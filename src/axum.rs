//! Axum integration utilities.
//!
//! Wire the [`PermissionLayer`] after authentication so every request gets
//! a fresh [`PermissionSet`] in its extensions, then guard individual
//! routes with [`require_capability`]. Handlers that render conditionally
//! can extract the [`PermissionSet`] directly and call
//! [`PermissionSet::check_many`].

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::Error;
use crate::grant::Action;
use crate::guard;
use crate::resolver::{PermissionSet, Resolver};
use crate::store::GrantStore;
use crate::types::{Identity, Resource};

use ::axum::Json;
use ::axum::body::Body;
use ::axum::extract::FromRequestParts;
use ::axum::http::request::Parts;
use ::axum::http::{Request, StatusCode};
use ::axum::response::{IntoResponse, Response};
use ::tower::{Layer, Service};

/// Structured deny payload returned on every short-circuited request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DenyPayload {
    /// Always false.
    pub success: bool,
    /// Human-readable denial reason.
    pub message: String,
}

impl DenyPayload {
    fn new(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// Rejection produced when a request is short-circuited.
#[derive(Debug)]
pub struct GuardRejection {
    status: StatusCode,
    payload: DenyPayload,
}

impl From<Error> for GuardRejection {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::AuthRequired => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::StoreUnavailable(_)
            | Error::NotInitialized
            | Error::InvalidId(_)
            | Error::InvalidResource(_)
            | Error::InvalidAction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            payload: DenyPayload::new(err.to_string()),
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.payload)).into_response()
    }
}

/// Middleware layer that resolves a [`PermissionSet`] for each request.
///
/// Reads the [`Identity`] placed in request extensions by the upstream
/// authentication step, runs [`Resolver::initialize`] once, and inserts
/// the resulting set into the request extensions for downstream guards
/// and handlers. Requests without an identity are rejected with 401;
/// store failures surface as 500.
#[derive(Debug)]
pub struct PermissionLayer<S> {
    resolver: Arc<Resolver<S>>,
}

impl<S> PermissionLayer<S> {
    /// Creates a new permission-resolving layer.
    pub fn new(resolver: Arc<Resolver<S>>) -> Self {
        Self { resolver }
    }
}

impl<S> Clone for PermissionLayer<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<S, Inner> Layer<Inner> for PermissionLayer<S>
where
    S: GrantStore,
{
    type Service = PermissionService<Inner, S>;

    fn layer(&self, inner: Inner) -> Self::Service {
        PermissionService {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

/// Middleware service behind [`PermissionLayer`].
#[derive(Debug)]
pub struct PermissionService<Inner, S> {
    inner: Inner,
    resolver: Arc<Resolver<S>>,
}

impl<Inner: Clone, S> Clone for PermissionService<Inner, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<Inner, S> Service<Request<Body>> for PermissionService<Inner, S>
where
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
    S: GrantStore + 'static,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let resolver = self.resolver.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let identity = req.extensions().get::<Identity>().cloned();
            let resolved = match identity {
                Some(identity) => {
                    let tenant = identity.tenant_scope.clone();
                    resolver.initialize(Some(&identity), &tenant).await
                }
                None => Err(Error::AuthRequired),
            };

            match resolved {
                Ok(set) => {
                    req.extensions_mut().insert(set);
                    poll_fn(|cx| inner.poll_ready(cx)).await?;
                    inner.call(req).await
                }
                Err(err) => Ok(GuardRejection::from(err).into_response()),
            }
        })
    }
}

/// Returns a layer that requires `action` on `resource` before the inner
/// service runs.
pub fn require_capability(resource: Resource, action: Action) -> RequireCapabilityLayer {
    RequireCapabilityLayer::new(resource, action)
}

/// Middleware layer that enforces one capability requirement.
///
/// Stateless: each invocation is a pure function of the request's
/// [`PermissionSet`] and the configured `(resource, action)`. Responds 403
/// with the deny payload when the capability is missing and 500 when
/// [`PermissionLayer`] did not run upstream.
#[derive(Debug, Clone)]
pub struct RequireCapabilityLayer {
    resource: Resource,
    action: Action,
}

impl RequireCapabilityLayer {
    /// Creates a new capability guard layer.
    pub fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

impl<Inner> Layer<Inner> for RequireCapabilityLayer {
    type Service = RequireCapabilityService<Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        RequireCapabilityService {
            inner,
            resource: self.resource.clone(),
            action: self.action,
        }
    }
}

/// Middleware service behind [`RequireCapabilityLayer`].
#[derive(Debug, Clone)]
pub struct RequireCapabilityService<Inner> {
    inner: Inner,
    resource: Resource,
    action: Action,
}

impl<Inner> Service<Request<Body>> for RequireCapabilityService<Inner>
where
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let resource = self.resource.clone();
        let action = self.action;

        Box::pin(async move {
            let outcome = guard::require(req.extensions().get::<PermissionSet>(), &resource, action);
            match outcome {
                Ok(()) => {
                    poll_fn(|cx| inner.poll_ready(cx)).await?;
                    inner.call(req).await
                }
                Err(err) => Ok(GuardRejection::from(err).into_response()),
            }
        })
    }
}

impl<S> FromRequestParts<S> for PermissionSet
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PermissionSet>()
            .cloned()
            .ok_or_else(|| GuardRejection::from(Error::NotInitialized))
    }
}

#[cfg(feature = "axum-jwt")]
pub mod jwt {
    //! JWT identity extraction.
    //!
    //! Supplies the authenticated [`Identity`] the permission layer
    //! consumes. Token issuance lives elsewhere; this module only decodes
    //! and validates bearer tokens.

    use std::fmt;
    use std::future::poll_fn;
    use std::marker::PhantomData;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use jsonwebtoken::{DecodingKey, Validation, decode};
    use serde::de::DeserializeOwned;
    use thiserror::Error;

    use crate::axum::DenyPayload;
    use crate::types::{Identity, IdentityId, TenantScope};

    use ::axum::Json;
    use ::axum::body::Body;
    use ::axum::extract::FromRequestParts;
    use ::axum::http::header::AUTHORIZATION;
    use ::axum::http::request::Parts;
    use ::axum::http::{HeaderMap, Request, StatusCode};
    use ::axum::response::{IntoResponse, Response};
    use ::tower::{Layer, Service};

    /// Errors returned by JWT auth helpers.
    #[derive(Debug, Error)]
    pub enum AuthError {
        /// Authorization header is missing.
        #[error("missing authorization header")]
        MissingAuthorization,
        /// Authorization header format is invalid.
        #[error("invalid authorization header")]
        InvalidAuthorization,
        /// JWT validation error.
        #[error("invalid token")]
        InvalidToken,
        /// Invalid identifier in claims.
        #[error("invalid id: {0}")]
        InvalidId(String),
    }

    /// Rejection type for JWT extractors and middleware.
    #[derive(Debug)]
    pub struct AuthRejection {
        status: StatusCode,
        message: String,
    }

    impl From<AuthError> for AuthRejection {
        fn from(err: AuthError) -> Self {
            Self {
                status: StatusCode::UNAUTHORIZED,
                message: err.to_string(),
            }
        }
    }

    impl IntoResponse for AuthRejection {
        fn into_response(self) -> Response {
            (
                self.status,
                Json(DenyPayload {
                    success: false,
                    message: self.message,
                }),
            )
                .into_response()
        }
    }

    /// Claims type used to extract the identity from JWTs.
    pub trait JwtClaims: DeserializeOwned + Send + Sync + Clone + 'static {
        /// Returns the identity identifier string.
        fn identity_id(&self) -> &str;
        /// Returns the tenant scope string.
        fn tenant_scope(&self) -> &str;
        /// Returns the email claim, when present.
        fn email(&self) -> Option<&str> {
            None
        }
    }

    /// Default JWT claims shape: `{ sub, tenant_scope, email?, exp? }`.
    #[derive(Debug, Clone, serde::Deserialize)]
    pub struct DefaultClaims {
        /// Identity identifier (standard JWT subject).
        pub sub: String,
        /// Tenant scope identifier.
        pub tenant_scope: String,
        /// Optional email address.
        pub email: Option<String>,
        /// Standard JWT expiration.
        pub exp: Option<usize>,
    }

    impl JwtClaims for DefaultClaims {
        fn identity_id(&self) -> &str {
            &self.sub
        }

        fn tenant_scope(&self) -> &str {
            &self.tenant_scope
        }

        fn email(&self) -> Option<&str> {
            self.email.as_deref()
        }
    }

    /// JWT auth state holding decoding settings.
    #[derive(Clone)]
    pub struct JwtAuthState<C: JwtClaims> {
        decoding_key: Arc<DecodingKey>,
        validation: Validation,
        _marker: PhantomData<fn() -> C>,
    }

    impl<C: JwtClaims> fmt::Debug for JwtAuthState<C> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("JwtAuthState")
                .field("decoding_key", &"<redacted>")
                .field("validation", &self.validation)
                .finish()
        }
    }

    impl<C: JwtClaims> JwtAuthState<C> {
        /// Creates a new JWT auth state.
        pub fn new(decoding_key: DecodingKey, validation: Validation) -> Self {
            Self {
                decoding_key: Arc::new(decoding_key),
                validation,
                _marker: PhantomData,
            }
        }

        fn decode_from_headers(&self, headers: &HeaderMap) -> Result<JwtIdentity<C>, AuthError> {
            let token = bearer_token(headers)?;
            let data = decode::<C>(&token, &self.decoding_key, &self.validation)
                .map_err(|_| AuthError::InvalidToken)?;
            JwtIdentity::from_claims(data.claims)
        }
    }

    /// Provides access to [`JwtAuthState`] for extractors.
    pub trait JwtAuthProvider<C: JwtClaims> {
        /// Returns the JWT auth state for decoding.
        fn jwt_auth(&self) -> &JwtAuthState<C>;
    }

    /// Extracted identity plus full claims.
    #[derive(Debug, Clone)]
    pub struct JwtIdentity<C: JwtClaims> {
        /// Parsed identity.
        pub identity: Identity,
        /// Full claims.
        pub claims: C,
    }

    impl<C: JwtClaims> JwtIdentity<C> {
        fn from_claims(claims: C) -> Result<Self, AuthError> {
            let id = IdentityId::try_from(claims.identity_id())
                .map_err(|err| AuthError::InvalidId(err.to_string()))?;
            let tenant = TenantScope::try_from(claims.tenant_scope())
                .map_err(|err| AuthError::InvalidId(err.to_string()))?;
            let mut identity = Identity::new(id, tenant);
            if let Some(email) = claims.email() {
                identity = identity.with_email(email);
            }
            Ok(Self { identity, claims })
        }
    }

    impl<S, C> FromRequestParts<S> for JwtIdentity<C>
    where
        S: Send + Sync + JwtAuthProvider<C>,
        C: JwtClaims,
    {
        type Rejection = AuthRejection;

        async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
            if let Some(existing) = parts.extensions.get::<JwtIdentity<C>>() {
                return Ok(existing.clone());
            }
            let auth = state.jwt_auth().decode_from_headers(&parts.headers)?;
            parts.extensions.insert(auth.clone());
            parts.extensions.insert(auth.identity.clone());
            Ok(auth)
        }
    }

    impl<S> FromRequestParts<S> for Identity
    where
        S: Send + Sync + JwtAuthProvider<DefaultClaims>,
    {
        type Rejection = AuthRejection;

        async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
            let auth = JwtIdentity::<DefaultClaims>::from_request_parts(parts, state).await?;
            Ok(auth.identity)
        }
    }

    /// Middleware layer that decodes JWT and inserts the identity into
    /// request extensions.
    #[derive(Debug, Clone)]
    pub struct JwtAuthLayer<C: JwtClaims> {
        state: Arc<JwtAuthState<C>>,
    }

    impl<C: JwtClaims> JwtAuthLayer<C> {
        /// Creates a new JWT auth layer.
        pub fn new(state: JwtAuthState<C>) -> Self {
            Self {
                state: Arc::new(state),
            }
        }
    }

    impl<S, C> Layer<S> for JwtAuthLayer<C>
    where
        C: JwtClaims,
    {
        type Service = JwtAuthService<S, C>;

        fn layer(&self, inner: S) -> Self::Service {
            JwtAuthService {
                inner,
                state: self.state.clone(),
            }
        }
    }

    /// Middleware service that decodes JWT and attaches [`Identity`].
    #[derive(Debug, Clone)]
    pub struct JwtAuthService<S, C: JwtClaims> {
        inner: S,
        state: Arc<JwtAuthState<C>>,
    }

    impl<S, C> Service<Request<Body>> for JwtAuthService<S, C>
    where
        S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
        S::Future: Send + 'static,
        C: JwtClaims,
    {
        type Response = Response;
        type Error = S::Error;
        type Future =
            Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, mut req: Request<Body>) -> Self::Future {
            let state = self.state.clone();
            let mut inner = self.inner.clone();

            Box::pin(async move {
                match state.decode_from_headers(req.headers()) {
                    Ok(auth) => {
                        req.extensions_mut().insert(auth.identity.clone());
                        req.extensions_mut().insert(auth);
                        poll_fn(|cx| inner.poll_ready(cx)).await?;
                        inner.call(req).await
                    }
                    Err(err) => Ok(AuthRejection::from(err).into_response()),
                }
            })
        }
    }

    fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidAuthorization)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthorization)?;
        if token.is_empty() {
            return Err(AuthError::InvalidAuthorization);
        }
        Ok(token.to_string())
    }
}
