//! Request identity model.
//!
//! The host resolves the principal of every inbound request and attaches a
//! [`RequestIdentity`] to the request extensions. The filters only consume it.

/// Principal name the host uses for requests without an authenticated user.
pub const ANONYMOUS: &str = "anonymous";

/// Identity of the principal behind a single request.
///
/// # Principal States
///
/// - `Some("anonymous")`: the host declared the request anonymous
/// - `Some(name)`: an authenticated principal
/// - `None` or `Some("")`: the identity information was malformed
///
/// The last case is an error condition and must never be confused with the
/// declared anonymous case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    /// Username resolved by the host, if any
    pub principal_name: Option<String>,
}

impl RequestIdentity {
    /// Identity of an authenticated (or declared anonymous) principal.
    pub fn principal(name: impl Into<String>) -> Self {
        Self {
            principal_name: Some(name.into()),
        }
    }

    /// Identity of a request the host declared anonymous.
    pub fn anonymous() -> Self {
        Self::principal(ANONYMOUS)
    }

    /// Identity with no usable principal name.
    pub fn missing() -> Self {
        Self {
            principal_name: None,
        }
    }

    /// Principal name, treating an empty name the same as an absent one.
    pub fn name(&self) -> Option<&str> {
        self.principal_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_anonymous(&self) -> bool {
        self.name() == Some(ANONYMOUS)
    }
}
