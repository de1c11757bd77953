//! Shared fixtures and proptest strategies for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use crate::logging::LogTrail;
use crate::{
    AuthGuard, GuardConfig, ManualClock, RateLimiter, Redirect, ResolveError, SessionResolver,
    SessionResponse, User,
};

enum Script {
    Respond(SessionResponse),
    Redirect(Redirect),
    Fail(&'static str),
}

/// Resolver that gives the same scripted answer every time and counts calls.
pub(crate) struct ScriptedResolver {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub(crate) fn responding(response: SessionResponse) -> Self {
        Self::new(Script::Respond(response))
    }

    pub(crate) fn redirecting(redirect: Redirect) -> Self {
        Self::new(Script::Redirect(redirect))
    }

    pub(crate) fn failing(message: &'static str) -> Self {
        Self::new(Script::Fail(message))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl SessionResolver for ScriptedResolver {
    async fn get_session(&self) -> Result<SessionResponse, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Respond(response) => Ok(response.clone()),
            Script::Redirect(redirect) => Err(ResolveError::Redirect(redirect.clone())),
            Script::Fail(message) => Err(ResolveError::failure(*message)),
        }
    }
}

pub(crate) fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        name: None,
    }
}

pub(crate) fn signed_in(id: &str) -> SessionResponse {
    SessionResponse::authenticated(user(id))
}

/// Builds a guard with default config, a frozen clock and a recording logger.
pub(crate) fn guard_with(
    resolver: ScriptedResolver,
) -> (AuthGuard<ScriptedResolver>, Arc<LogTrail>) {
    let config = GuardConfig::default();
    let limiter = Arc::new(RateLimiter::with_clock(
        config.rate_limit,
        Arc::new(ManualClock::new()),
    ));
    let trail = Arc::new(LogTrail::new());
    let guard = AuthGuard::new(config, resolver, limiter)
        .expect("default config is valid")
        .with_logger(trail.clone());
    (guard, trail)
}

/// Path segments that never collide with the auth section.
pub(crate) fn arb_safe_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9-]{1,12}", 1..4).prop_filter_map(
        "avoid the auth section",
        |segments| {
            if segments[0].eq_ignore_ascii_case("auth") {
                None
            } else {
                Some(format!("/{}", segments.join("/")))
            }
        },
    )
}
