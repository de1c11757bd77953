//! The identity-provider boundary.
//!
//! The provider is reached through [`SessionResolver`]. Its answer is a
//! [`SessionResponse`], which mirrors the provider's JSON shape, and is folded
//! into a [`SessionOutcome`] once per guard call.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ResolveError;

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Provider-assigned user id
    pub id: String,
    /// Primary email, if the provider shares it
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

/// Session payload from the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionData {
    /// The session's user; absent when there is no session
    #[serde(default)]
    pub user: Option<User>,
}

/// A transport-level error returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionError {
    /// HTTP status code
    pub status: u16,
    /// HTTP status text
    #[serde(default)]
    pub status_text: String,
}

impl SessionError {
    /// Creates an error with `status` and empty status text.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: String::new(),
        }
    }

    /// Returns true if the provider answered 429 Too Many Requests.
    pub fn is_too_many_requests(&self) -> bool {
        self.status == 429
    }
}

/// The provider's answer to a session fetch.
///
/// # Examples
///
/// ```
/// use route_guard::SessionResponse;
///
/// let response: SessionResponse = serde_json::from_str(
///     r#"{"data": null, "error": {"status": 401, "statusText": "Unauthorized"}}"#,
/// ).unwrap();
///
/// assert_eq!(response.error.unwrap().status, 401);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionResponse {
    /// Session data, if any
    #[serde(default)]
    pub data: Option<SessionData>,
    /// Transport error, if any
    #[serde(default)]
    pub error: Option<SessionError>,
}

impl SessionResponse {
    /// A response carrying `user`.
    pub fn authenticated(user: User) -> Self {
        Self {
            data: Some(SessionData { user: Some(user) }),
            error: None,
        }
    }

    /// A response with neither session nor error.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A response carrying a transport error with `status`.
    pub fn transport_error(status: u16) -> Self {
        Self {
            data: None,
            error: Some(SessionError::new(status)),
        }
    }
}

/// What a session fetch means for the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A user is signed in
    Authenticated(User),
    /// No session, no error
    Unauthenticated,
    /// The provider answered with a transport error
    TransportError(SessionError),
}

impl From<SessionResponse> for SessionOutcome {
    // An error wins over any data sent alongside it.
    fn from(response: SessionResponse) -> Self {
        if let Some(error) = response.error {
            return SessionOutcome::TransportError(error);
        }
        match response.data.and_then(|data| data.user) {
            Some(user) => SessionOutcome::Authenticated(user),
            None => SessionOutcome::Unauthenticated,
        }
    }
}

/// Semantic class of a session-fetch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// The session existed but is no longer valid (401 or 403)
    Expired,
    /// Anything else
    Generic,
}

impl SessionErrorKind {
    /// Value for the sign-in redirect's `reason` query parameter.
    pub fn reason_param(self) -> &'static str {
        match self {
            SessionErrorKind::Expired => "expired",
            SessionErrorKind::Generic => "error",
        }
    }
}

impl fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionErrorKind::Expired => write!(f, "expired"),
            SessionErrorKind::Generic => write!(f, "generic"),
        }
    }
}

/// Classifies a session-fetch error.
///
/// # Examples
///
/// ```
/// use route_guard::{classify, SessionError, SessionErrorKind};
///
/// assert_eq!(classify(Some(&SessionError::new(401))), Some(SessionErrorKind::Expired));
/// assert_eq!(classify(Some(&SessionError::new(500))), Some(SessionErrorKind::Generic));
/// assert_eq!(classify(None), None);
/// ```
pub fn classify(error: Option<&SessionError>) -> Option<SessionErrorKind> {
    error.map(|error| match error.status {
        401 | 403 => SessionErrorKind::Expired,
        _ => SessionErrorKind::Generic,
    })
}

/// Fetches the current session from the identity provider.
///
/// Transport errors belong in [`SessionResponse::error`]. Return
/// [`ResolveError`] only for redirects raised below the resolver or for
/// failures that have no status code.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Fetches the current session.
    async fn get_session(&self) -> Result<SessionResponse, ResolveError>;
}
