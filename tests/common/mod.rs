//! Test fixtures shared by the integration suites.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use route_guard::{
    AuthGuard, GuardConfig, LogTrail, ManualClock, RateLimiter, Redirect, ResolveError,
    SessionResolver, SessionResponse, User,
};

/// One scripted answer from the identity provider.
#[derive(Clone)]
pub enum Answer {
    Session(SessionResponse),
    Redirect(Redirect),
    Failure(&'static str),
}

/// Identity provider double: plays answers in order, repeating the last.
pub struct FakeProvider {
    answers: Mutex<VecDeque<Answer>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(answer: Answer) -> Arc<Self> {
        Self::new([answer])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionResolver for FakeProvider {
    async fn get_session(&self) -> Result<SessionResponse, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = {
            let mut answers = self.answers.lock().unwrap();
            if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().cloned().expect("at least one answer scripted")
            }
        };
        match answer {
            Answer::Session(response) => Ok(response),
            Answer::Redirect(redirect) => Err(ResolveError::Redirect(redirect)),
            Answer::Failure(message) => Err(ResolveError::failure(message)),
        }
    }
}

/// Lets tests keep a handle on the provider while the guard owns one too.
pub struct SharedProvider(pub Arc<FakeProvider>);

#[async_trait]
impl SessionResolver for SharedProvider {
    async fn get_session(&self) -> Result<SessionResponse, ResolveError> {
        self.0.get_session().await
    }
}

pub struct Harness {
    pub guard: AuthGuard<SharedProvider>,
    pub provider: Arc<FakeProvider>,
    pub trail: Arc<LogTrail>,
    pub clock: Arc<ManualClock>,
    pub limiter: Arc<RateLimiter>,
}

pub fn harness(provider: Arc<FakeProvider>) -> Harness {
    harness_with(GuardConfig::default(), provider)
}

pub fn harness_with(config: GuardConfig, provider: Arc<FakeProvider>) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let limiter = Arc::new(RateLimiter::with_clock(config.rate_limit, clock.clone()));
    let trail = Arc::new(LogTrail::new());
    let guard = AuthGuard::new(config, SharedProvider(provider.clone()), limiter.clone())
        .expect("valid config")
        .with_logger(trail.clone());

    Harness {
        guard,
        provider,
        trail,
        clock,
        limiter,
    }
}

pub fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        name: Some("Test User".to_string()),
    }
}

pub fn signed_in(id: &str) -> Answer {
    Answer::Session(SessionResponse::authenticated(user(id)))
}

pub fn signed_out() -> Answer {
    Answer::Session(SessionResponse::anonymous())
}

pub fn transport_error(status: u16) -> Answer {
    Answer::Session(SessionResponse::transport_error(status))
}
