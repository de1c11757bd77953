//! Route access guards for session-based web applications.
//!
//! Before a protected or guest-only view is entered, a route loader asks an
//! [`AuthGuard`] whether navigation may proceed. The guard combines:
//! - **Rate limiting**: [`RateLimiter`] caps repeated auth checks per location
//! - **Redirect sanitizing**: [`RedirectSanitizer`] keeps return-to targets
//!   on the application's origin and out of the sign-in section
//! - **Session classification**: [`classify`] separates expired sessions from
//!   transport errors from plain signed-out visitors
//!
//! # Core Types
//!
//! - [`AuthGuard`]: `require_auth` (fails closed) and `require_guest` (fails open)
//! - [`GuardDecision`]: `Proceed(payload)` or `Deny(redirect)`, never an error
//! - [`SessionResolver`]: the identity-provider seam
//! - [`GuardLogger`]: the log seam, backed by `tracing` by default
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use route_guard::{
//!     AuthGuard, GuardConfig, GuestOptions, RateLimiter, ResolveError, SessionResolver,
//!     SessionResponse, User,
//! };
//!
//! struct SignedIn;
//!
//! #[async_trait]
//! impl SessionResolver for SignedIn {
//!     async fn get_session(&self) -> Result<SessionResponse, ResolveError> {
//!         Ok(SessionResponse::authenticated(User {
//!             id: "user-1".to_string(),
//!             email: None,
//!             name: Some("Ada".to_string()),
//!         }))
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let config = GuardConfig::default();
//! let limiter = Arc::new(RateLimiter::new(config.rate_limit));
//! let guard = AuthGuard::new(config, SignedIn, limiter).expect("valid config");
//!
//! // Signed-in users are bounced off the sign-in page.
//! let decision = guard
//!     .require_guest(GuestOptions::default().redirect_to("/projects"))
//!     .await;
//! let interrupt = decision.into_navigation().unwrap_err();
//! assert_eq!(interrupt.redirect.to, "/projects");
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod decision;
mod error;
mod guard;
pub mod logging;
mod rate_limit;
mod redirect;
mod request;
mod session;

#[cfg(test)]
mod test_utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GuardConfig, RateLimitConfig};
pub use decision::{Denial, GuardDecision, Redirect, REASON_PARAM, REDIRECT_PARAM};
pub use error::{ConfigError, DenialCause, NavigationInterrupt, ResolveError};
pub use guard::{
    AuthGuard, FailureMode, AUTH_IDENTIFIER_PREFIX, REQUIRE_AUTH_FAILURE_MODE,
    REQUIRE_GUEST_FAILURE_MODE,
};
pub use logging::{GuardLogger, LogChannel, LogRecord, LogTrail, TracingLogger};
pub use rate_limit::{AttemptRecord, RateLimiter};
pub use redirect::{RedirectDecision, RedirectRejection, RedirectSanitizer};
pub use request::{GuestOptions, Location};
pub use session::{
    classify, SessionData, SessionError, SessionErrorKind, SessionOutcome, SessionResolver,
    SessionResponse, User,
};
