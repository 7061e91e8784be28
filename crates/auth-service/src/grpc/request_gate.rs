//! Request gate: authentication and authorization for every inbound call.
//!
//! A tower layer in front of the tonic router. For each request it looks
//! the gRPC path up in the [`PolicyTable`]:
//!
//! 1. **Authentication**: absent paths pass through untouched. Otherwise
//!    the bearer credential is extracted and verified according to the
//!    policy's credential kind, and an [`AuthContext`] is attached to the
//!    request extensions.
//! 2. **Authorization**: when the policy has a role allow-list, the role in
//!    the attached claims must be in it.
//!
//! Any failure short-circuits with an `UNAUTHENTICATED` (or `INTERNAL`)
//! status; the handler is never invoked.

use crate::errors::AuthError;
use crate::grpc::policy::PolicyTable;
use crate::models::AuthContext;
use crate::services::credential_verifier::{extract_bearer, CredentialVerifier};
use crate::services::unix_now;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::{Request, Status};
use tower::{Layer, Service};

/// Tower layer installing the request gate.
#[derive(Clone)]
pub struct RequestGateLayer {
    policies: Arc<PolicyTable>,
    verifier: CredentialVerifier,
}

impl RequestGateLayer {
    pub fn new(policies: Arc<PolicyTable>, verifier: CredentialVerifier) -> Self {
        Self { policies, verifier }
    }
}

impl<S> Layer<S> for RequestGateLayer {
    type Service = RequestGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestGate {
            inner,
            policies: self.policies.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

/// Tower service applying the gate to one request at a time.
#[derive(Clone)]
pub struct RequestGate<S> {
    inner: S,
    policies: Arc<PolicyTable>,
    verifier: CredentialVerifier,
}

impl<S> RequestGate<S> {
    /// Run both gate stages, returning the context to attach (if any).
    async fn admit(
        policies: &PolicyTable,
        verifier: &CredentialVerifier,
        path: &str,
        headers: &http::HeaderMap,
    ) -> Result<Option<AuthContext>, AuthError> {
        let Some(policy) = policies.get(path) else {
            return Ok(None);
        };

        let token = extract_bearer(headers)?;
        let claims = verifier.verify(policy.credential, &token, unix_now()).await?;
        policy.authorize(Some(&claims))?;

        Ok(Some(AuthContext { claims, token }))
    }
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for RequestGate<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; keep the driven service for this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let policies = self.policies.clone();
        let verifier = self.verifier.clone();

        Box::pin(async move {
            let path = req.uri().path().to_owned();
            let admitted = Self::admit(&policies, &verifier, &path, req.headers()).await;

            match admitted {
                Ok(None) => inner.call(req).await,
                Ok(Some(context)) => {
                    tracing::debug!(
                        target: "auth.gate",
                        path = %path,
                        role = ?context.claims.role,
                        "Request admitted"
                    );
                    let (mut parts, body) = req.into_parts();
                    parts.extensions.insert(context);
                    inner.call(http::Request::from_parts(parts, body)).await
                }
                Err(err) => {
                    tracing::debug!(target: "auth.gate", path = %path, error = %err, "Request rejected");
                    Ok(Status::from(err).into_http())
                }
            }
        })
    }
}

/// The verified caller of a gated request.
///
/// Fails closed with `UNAUTHENTICATED` when the gate attached nothing,
/// for example when a handler is reached through a path with no policy.
#[expect(
    clippy::result_large_err,
    reason = "tonic::Status is the handler error type"
)]
pub fn caller<T>(request: &Request<T>) -> Result<&AuthContext, Status> {
    request.extensions().get::<AuthContext>().ok_or_else(|| {
        tracing::warn!(target: "auth.gate", "Handler reached without an auth context");
        Status::unauthenticated(common::jwt::BearerError::Missing.to_string())
    })
}
