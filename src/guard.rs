use std::sync::Arc;

use tracing::Level;

use crate::config::GuardConfig;
use crate::decision::{GuardDecision, Redirect, REASON_PARAM, REDIRECT_PARAM};
use crate::error::{ConfigError, DenialCause, ResolveError};
use crate::logging::{GuardLogger, LogChannel, LogRecord, TracingLogger};
use crate::rate_limit::RateLimiter;
use crate::redirect::RedirectSanitizer;
use crate::request::{GuestOptions, Location};
use crate::session::{classify, SessionErrorKind, SessionOutcome, SessionResolver, User};

/// What a guard does when it cannot reach a clear answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Deny navigation and send the visitor to sign-in
    Closed,
    /// Let navigation continue
    Open,
}

/// Failure mode of [`AuthGuard::require_auth`]: leaking a protected view is
/// worse than an unnecessary trip to sign-in.
pub const REQUIRE_AUTH_FAILURE_MODE: FailureMode = FailureMode::Closed;

/// Failure mode of [`AuthGuard::require_guest`]: a public page must not go
/// down because the identity provider hiccuped.
pub const REQUIRE_GUEST_FAILURE_MODE: FailureMode = FailureMode::Open;

/// Prefix of the rate-limit identifier for auth checks.
pub const AUTH_IDENTIFIER_PREFIX: &str = "auth:";

/// Route-access guard for protected and guest-only views.
///
/// `AuthGuard` checks the shared [`RateLimiter`], asks the
/// [`SessionResolver`] for the current session, and turns the answer into a
/// [`GuardDecision`]. It never returns an error: every failure is logged and
/// resolved into a decision according to the entry point's [`FailureMode`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use route_guard::{
///     AuthGuard, GuardConfig, Location, RateLimiter, ResolveError, SessionResolver,
///     SessionResponse,
/// };
///
/// struct SignedOut;
///
/// #[async_trait]
/// impl SessionResolver for SignedOut {
///     async fn get_session(&self) -> Result<SessionResponse, ResolveError> {
///         Ok(SessionResponse::anonymous())
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let config = GuardConfig::default();
/// let limiter = Arc::new(RateLimiter::new(config.rate_limit));
/// let guard = AuthGuard::new(config, SignedOut, limiter).expect("valid config");
///
/// let decision = guard.require_auth(&Location::new("/dashboard/settings")).await;
/// let redirect = decision.redirect().expect("signed-out visitors are redirected");
///
/// assert_eq!(redirect.to, "/auth/sign-in");
/// assert_eq!(redirect.search_param("redirect"), Some("/dashboard/settings"));
/// assert_eq!(redirect.search_param("reason"), None);
/// # });
/// ```
pub struct AuthGuard<R> {
    config: GuardConfig,
    resolver: R,
    limiter: Arc<RateLimiter>,
    sanitizer: RedirectSanitizer,
    logger: Arc<dyn GuardLogger>,
}

impl<R: SessionResolver> AuthGuard<R> {
    /// Creates a guard that logs through [`TracingLogger`].
    ///
    /// `limiter` is shared: every guard holding the same `Arc` counts
    /// against the same attempt table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `config` fails
    /// [`GuardConfig::validate`].
    pub fn new(
        config: GuardConfig,
        resolver: R,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let sanitizer = config.sanitizer()?;

        Ok(Self {
            config,
            resolver,
            limiter,
            sanitizer,
            logger: Arc::new(TracingLogger),
        })
    }

    /// Replaces the log sink.
    pub fn with_logger(mut self, logger: Arc<dyn GuardLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Returns the guard's configuration.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Returns the shared rate limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Returns the redirect sanitizer.
    pub fn sanitizer(&self) -> &RedirectSanitizer {
        &self.sanitizer
    }

    /// Guards a protected route.
    ///
    /// Proceeds with the signed-in [`User`], or denies with a redirect to the
    /// sign-in page. Fails closed.
    pub async fn require_auth(&self, location: &Location) -> GuardDecision<User> {
        let identifier = format!("{}{}", AUTH_IDENTIFIER_PREFIX, location.href);
        if !self.limiter.track_attempt(&identifier) {
            self.log(
                LogRecord::new(
                    LogChannel::Security,
                    Level::ERROR,
                    "Rate limit exceeded for auth check",
                )
                .field("identifier", &identifier),
            );
            // No redirect target: a blocked caller learns nothing about the page.
            return GuardDecision::deny(self.sign_in(), DenialCause::RateLimited);
        }

        let response = match self.resolver.get_session().await {
            Ok(response) => response,
            Err(ResolveError::Redirect(redirect)) => {
                return GuardDecision::deny(redirect, DenialCause::Interrupted);
            }
            Err(ResolveError::Failure(error)) => {
                self.log(
                    LogRecord::new(LogChannel::Auth, Level::ERROR, "Unexpected error in auth guard")
                        .field("location", &location.href)
                        .field("error", &error),
                );
                return self.on_failure(REQUIRE_AUTH_FAILURE_MODE, || None);
            }
        };

        match SessionOutcome::from(response) {
            SessionOutcome::Authenticated(user) => {
                self.log(
                    LogRecord::new(LogChannel::Auth, Level::DEBUG, "Auth check passed")
                        .field("user_id", &user.id)
                        .field("location", &location.href),
                );
                GuardDecision::Proceed(user)
            }
            SessionOutcome::TransportError(error) => {
                let kind = classify(Some(&error)).unwrap_or(SessionErrorKind::Generic);
                self.log(
                    LogRecord::new(LogChannel::Auth, Level::WARN, "Session check failed")
                        .field("location", &location.href)
                        .field("expired", kind == SessionErrorKind::Expired)
                        .field("status", error.status),
                );
                let redirect = self
                    .sign_in()
                    .with_search(REDIRECT_PARAM, self.return_path(&location.href))
                    .with_search(REASON_PARAM, kind.reason_param());
                GuardDecision::deny(redirect, DenialCause::SessionTransport(kind))
            }
            SessionOutcome::Unauthenticated => {
                self.log(
                    LogRecord::new(LogChannel::Auth, Level::INFO, "Unauthenticated access attempt")
                        .field("location", &location.href),
                );
                let redirect = self
                    .sign_in()
                    .with_search(REDIRECT_PARAM, self.return_path(&location.href));
                GuardDecision::deny(redirect, DenialCause::Unauthenticated)
            }
        }
    }

    /// Guards a guest-only route such as sign-in or sign-up.
    ///
    /// Proceeds for visitors without a session, and redirects signed-in users
    /// to `options.default_redirect`. Fails open.
    pub async fn require_guest(&self, options: GuestOptions) -> GuardDecision<()> {
        let location = options.location.as_ref().map(|location| location.href.as_str());

        let response = match self.resolver.get_session().await {
            Ok(response) => response,
            Err(ResolveError::Redirect(redirect)) => {
                return GuardDecision::deny(redirect, DenialCause::Interrupted);
            }
            Err(ResolveError::Failure(error)) => {
                self.log(
                    LogRecord::new(
                        LogChannel::Auth,
                        Level::WARN,
                        "Guest guard failed, allowing access",
                    )
                    .field_opt("location", location)
                    .field("error", &error),
                );
                return self.on_failure(REQUIRE_GUEST_FAILURE_MODE, || Some(()));
            }
        };

        match SessionOutcome::from(response) {
            SessionOutcome::Unauthenticated => GuardDecision::Proceed(()),
            // Rapid reloads on guest pages trip the provider's own limiter;
            // that is expected noise.
            SessionOutcome::TransportError(error) if error.is_too_many_requests() => {
                self.on_failure(REQUIRE_GUEST_FAILURE_MODE, || Some(()))
            }
            SessionOutcome::TransportError(error) => {
                self.log(
                    LogRecord::new(
                        LogChannel::Auth,
                        Level::DEBUG,
                        "Session check failed on guest route",
                    )
                    .field_opt("location", location)
                    .field("status", error.status),
                );
                self.on_failure(REQUIRE_GUEST_FAILURE_MODE, || Some(()))
            }
            SessionOutcome::Authenticated(user) => {
                let requested = options
                    .default_redirect
                    .as_deref()
                    .unwrap_or(self.config.default_redirect.as_str());
                let target = self.guest_redirect_target(requested);
                self.log(
                    LogRecord::new(
                        LogChannel::Auth,
                        Level::INFO,
                        "Authenticated user redirected from guest route",
                    )
                    .field("user_id", &user.id)
                    .field_opt("location", location)
                    .field("to", &target),
                );
                GuardDecision::deny(Redirect::to(target), DenialCause::AlreadyAuthenticated)
            }
        }
    }

    // Applies a failure mode. `admit` supplies the payload for an open
    // failure; returning `None` falls back to a closed denial.
    fn on_failure<T>(
        &self,
        mode: FailureMode,
        admit: impl FnOnce() -> Option<T>,
    ) -> GuardDecision<T> {
        match mode {
            FailureMode::Open => match admit() {
                Some(value) => GuardDecision::Proceed(value),
                None => GuardDecision::deny(self.sign_in(), DenialCause::UnexpectedFailure),
            },
            FailureMode::Closed => {
                GuardDecision::deny(self.sign_in(), DenialCause::UnexpectedFailure)
            }
        }
    }

    fn sign_in(&self) -> Redirect {
        Redirect::to(self.config.sign_in_path.as_str())
    }

    /// Where to return after sign-in: the requested page if safe, else the
    /// configured default.
    fn return_path(&self, requested: &str) -> String {
        self.sanitize(requested, &self.config.default_redirect)
    }

    /// `requested` doubles as its own fallback. If it fails the rules the
    /// fallback is unusable too, so the configured default is used instead.
    fn guest_redirect_target(&self, requested: &str) -> String {
        let target = self.sanitize(requested, requested);
        if self.sanitizer.is_safe(&target) {
            target
        } else {
            self.config.default_redirect.clone()
        }
    }

    fn sanitize(&self, requested: &str, fallback: &str) -> String {
        let decision = self.sanitizer.sanitize(requested, fallback);
        if let Some(rejection) = decision.rejection {
            self.log(
                LogRecord::new(LogChannel::Security, Level::WARN, "Rejected unsafe redirect target")
                    .field("requested", requested)
                    .field("fallback", fallback)
                    .field("rejection", rejection),
            );
        }
        decision.target_path
    }

    fn log(&self, record: LogRecord) {
        self.logger.log(record);
    }
}

impl<R> std::fmt::Debug for AuthGuard<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("sanitizer", &self.sanitizer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{guard_with, signed_in, user, ScriptedResolver};
    use crate::SessionResponse;

    #[test]
    fn failure_modes_are_asymmetric() {
        assert_eq!(REQUIRE_AUTH_FAILURE_MODE, FailureMode::Closed);
        assert_eq!(REQUIRE_GUEST_FAILURE_MODE, FailureMode::Open);
    }

    #[tokio::test]
    async fn require_auth_returns_signed_in_user() {
        let (guard, trail) = guard_with(ScriptedResolver::responding(signed_in("user-1")));

        let decision = guard.require_auth(&Location::new("/dashboard")).await;

        assert_eq!(decision, GuardDecision::Proceed(user("user-1")));
        assert_eq!(trail.count(LogChannel::Auth, Level::DEBUG), 1);
    }

    #[tokio::test]
    async fn require_auth_annotates_expired_sessions() {
        let (guard, trail) =
            guard_with(ScriptedResolver::responding(SessionResponse::transport_error(401)));

        let decision = guard.require_auth(&Location::new("/billing")).await;

        let denial = decision.denial().expect("denied");
        assert_eq!(denial.cause, DenialCause::SessionTransport(SessionErrorKind::Expired));
        assert_eq!(denial.redirect.to, "/auth/sign-in");
        assert_eq!(denial.redirect.search_param("redirect"), Some("/billing"));
        assert_eq!(denial.redirect.search_param("reason"), Some("expired"));

        let warnings = trail.matching(LogChannel::Auth, Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].get("expired"), Some("true"));
        assert_eq!(warnings[0].get("status"), Some("401"));
        assert_eq!(warnings[0].get("location"), Some("/billing"));
    }

    #[tokio::test]
    async fn require_auth_annotates_generic_errors() {
        let (guard, _trail) =
            guard_with(ScriptedResolver::responding(SessionResponse::transport_error(503)));

        let decision = guard.require_auth(&Location::new("/billing")).await;

        let redirect = decision.redirect().expect("denied");
        assert_eq!(redirect.search_param("reason"), Some("error"));
    }

    #[tokio::test]
    async fn require_auth_unexpected_failure_fails_closed() {
        let (guard, trail) =
            guard_with(ScriptedResolver::failing("boom"));

        let decision = guard.require_auth(&Location::new("/billing")).await;

        let denial = decision.denial().expect("denied");
        assert_eq!(denial.cause, DenialCause::UnexpectedFailure);
        assert_eq!(denial.redirect, Redirect::to("/auth/sign-in"));
        assert_eq!(trail.count(LogChannel::Auth, Level::ERROR), 1);
    }

    #[test]
    fn open_failure_without_payload_denies() {
        let (guard, _trail) = guard_with(ScriptedResolver::responding(SessionResponse::anonymous()));

        let decision: GuardDecision<User> = guard.on_failure(FailureMode::Open, || None);

        assert_eq!(
            decision.denial().map(|d| d.cause),
            Some(DenialCause::UnexpectedFailure)
        );
    }

    #[tokio::test]
    async fn guest_redirect_ignores_unsafe_default() {
        let (guard, trail) = guard_with(ScriptedResolver::responding(signed_in("user-1")));

        let decision = guard
            .require_guest(GuestOptions::default().redirect_to("/auth/sign-up"))
            .await;

        assert_eq!(decision.redirect().map(|r| r.to.as_str()), Some("/dashboard"));
        assert_eq!(trail.count(LogChannel::Security, Level::WARN), 1);
    }

    #[tokio::test]
    async fn upstream_redirects_pass_through_both_guards() {
        let upstream = Redirect::to("/maintenance").with_search("from", "identity");
        let (guard, trail) = guard_with(ScriptedResolver::redirecting(upstream.clone()));

        let auth = guard.require_auth(&Location::new("/dashboard")).await;
        let guest = guard.require_guest(GuestOptions::default()).await;

        for decision in [auth.denial().cloned(), guest.denial().cloned()] {
            let denial = decision.expect("denied");
            assert_eq!(denial.redirect, upstream);
            assert_eq!(denial.cause, DenialCause::Interrupted);
        }
        assert!(trail.is_empty());
    }

    #[tokio::test]
    async fn rate_limited_check_skips_session_fetch() {
        let resolver = ScriptedResolver::responding(signed_in("user-1"));
        let calls = resolver.call_counter();
        let (guard, trail) = guard_with(resolver);
        let location = Location::new("/dashboard");

        for _ in 0..guard.config().rate_limit.max_attempts {
            assert!(guard.require_auth(&location).await.is_proceed());
        }
        let blocked = guard.require_auth(&location).await;

        let denial = blocked.denial().expect("denied");
        assert_eq!(denial.cause, DenialCause::RateLimited);
        assert!(denial.redirect.search.is_empty());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 10);

        let errors = trail.matching(LogChannel::Security, Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].get("identifier"), Some("auth:/dashboard"));
    }

    #[tokio::test]
    async fn unsafe_return_path_falls_back_and_warns() {
        let (guard, trail) = guard_with(ScriptedResolver::responding(SessionResponse::anonymous()));

        let decision = guard
            .require_auth(&Location::new("//evil.example/steal"))
            .await;

        let redirect = decision.redirect().expect("denied");
        assert_eq!(redirect.search_param("redirect"), Some("/dashboard"));

        let warnings = trail.matching(LogChannel::Security, Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].get("requested"), Some("//evil.example/steal"));
        assert_eq!(warnings[0].get("fallback"), Some("/dashboard"));
    }

    #[tokio::test]
    async fn guest_logs_omit_location_when_unknown() {
        let (guard, trail) = guard_with(ScriptedResolver::responding(signed_in("user-1")));

        guard.require_guest(GuestOptions::default()).await;
        guard
            .require_guest(GuestOptions::default().at(Location::new("/auth/sign-in")))
            .await;

        let info = trail.matching(LogChannel::Auth, Level::INFO);
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].get("location"), None);
        assert_eq!(info[0].get("to"), Some("/dashboard"));
        assert_eq!(info[1].get("location"), Some("/auth/sign-in"));
    }

    #[tokio::test]
    async fn guest_failure_log_omits_location_when_unknown() {
        let (guard, trail) = guard_with(ScriptedResolver::failing("timeout"));

        let decision = guard.require_guest(GuestOptions::default()).await;

        assert!(decision.is_proceed());
        let warnings = trail.matching(LogChannel::Auth, Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].get("location"), None);
        assert_eq!(warnings[0].get("error"), Some("timeout"));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = GuardConfig {
            default_redirect: "https://evil.example".to_string(),
            ..GuardConfig::default()
        };
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));

        let result = AuthGuard::new(
            config,
            ScriptedResolver::responding(SessionResponse::anonymous()),
            limiter,
        );

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
