use std::fmt;

use thiserror::Error;

use crate::decision::Redirect;
use crate::session::SessionErrorKind;

/// Why a guard denied navigation.
///
/// Every denial carries one of these alongside its redirect so callers and
/// tests can tell the cases apart without parsing log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialCause {
    /// The auth-check rate limit for this location was exceeded
    RateLimited,
    /// The session fetch returned a transport error
    SessionTransport(SessionErrorKind),
    /// No session and no error: the visitor is simply not signed in
    Unauthenticated,
    /// The session fetch failed in a way the guard could not classify
    UnexpectedFailure,
    /// A signed-in user tried to enter a guest-only route
    AlreadyAuthenticated,
    /// The session resolver itself raised a navigation redirect
    Interrupted,
}

impl fmt::Display for DenialCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialCause::RateLimited => write!(f, "rate limited"),
            DenialCause::SessionTransport(kind) => write!(f, "session transport error ({})", kind),
            DenialCause::Unauthenticated => write!(f, "unauthenticated"),
            DenialCause::UnexpectedFailure => write!(f, "unexpected failure"),
            DenialCause::AlreadyAuthenticated => write!(f, "already authenticated"),
            DenialCause::Interrupted => write!(f, "interrupted by upstream redirect"),
        }
    }
}

/// Failure reported by a [`SessionResolver`](crate::SessionResolver).
///
/// Transport errors from the identity provider are not failures: they come
/// back inside [`SessionResponse::error`](crate::SessionResponse). This type
/// covers everything else.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A redirect raised somewhere below the resolver; guards pass it through
    #[error("navigation redirect to {}", .0.to)]
    Redirect(Redirect),
    /// Any other failure
    #[error("session resolution failed: {0}")]
    Failure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ResolveError {
    /// Wraps an arbitrary error as [`ResolveError::Failure`].
    pub fn failure(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ResolveError::Failure(error.into())
    }
}

/// The host-router signal for a denied navigation.
///
/// Produced by [`GuardDecision::into_navigation`](crate::GuardDecision::into_navigation)
/// for routers that abort loaders by returning an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("navigation interrupted: redirect to {}", .redirect.href())]
pub struct NavigationInterrupt {
    /// Where the router should navigate instead
    pub redirect: Redirect,
    /// Why the guard denied the original navigation
    pub cause: DenialCause,
}

/// Errors raised while loading or validating a [`GuardConfig`](crate::GuardConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read guard config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration text is not valid TOML for this schema
    #[error("failed to parse guard config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration parsed but breaks one or more rules
    #[error("invalid guard config: {}", .0.join(", "))]
    Validation(Vec<String>),
}
