//! Principal resolution middleware.
//!
//! Authentication is done upstream (typically by the reverse proxy), which
//! forwards the authenticated username in a trusted header. This middleware
//! turns that header into a [`RequestIdentity`] in the request extensions,
//! where the maintenance gate picks it up.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};

use crate::models::identity::RequestIdentity;

/// Reads the principal name from a configured request header.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    header: HeaderName,
}

impl IdentityResolver {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }

    /// Derive the identity of a request from its headers.
    ///
    /// # Mapping
    ///
    /// - Header missing → declared anonymous
    /// - Header with a non-empty UTF-8 value → that principal
    /// - Header empty or not valid UTF-8 → no principal (malformed)
    pub fn resolve(&self, headers: &HeaderMap) -> RequestIdentity {
        let Some(value) = headers.get(&self.header) else {
            return RequestIdentity::anonymous();
        };

        match value.to_str().map(str::trim) {
            Ok(name) if !name.is_empty() => RequestIdentity::principal(name),
            _ => {
                tracing::debug!(header = %self.header, "malformed principal header");
                RequestIdentity::missing()
            }
        }
    }
}

/// Attach the request's [`RequestIdentity`] and call the next handler.
pub async fn resolve_identity(
    State(resolver): State<IdentityResolver>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = resolver.resolve(request.headers());
    request.extensions_mut().insert(identity);

    next.run(request).await
}
