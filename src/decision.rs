//! Guard results and the redirects they carry.
//!
//! Guards never throw to redirect. They return a [`GuardDecision`], and the
//! thin integration layer at [`GuardDecision::into_navigation`] turns a denial
//! into whatever interrupt the host router expects.

use std::collections::BTreeMap;

use crate::error::{DenialCause, NavigationInterrupt};

/// Query key carrying the path to return to after sign-in.
pub const REDIRECT_PARAM: &str = "redirect";

/// Query key carrying why a session check failed.
pub const REASON_PARAM: &str = "reason";

/// A navigation target: a path plus optional search parameters.
///
/// # Examples
///
/// ```
/// use route_guard::Redirect;
///
/// let redirect = Redirect::to("/auth/sign-in")
///     .with_search("redirect", "/dashboard/settings")
///     .with_search("reason", "expired");
///
/// assert_eq!(redirect.search_param("reason"), Some("expired"));
/// assert_eq!(
///     redirect.href(),
///     "/auth/sign-in?reason=expired&redirect=%2Fdashboard%2Fsettings"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Destination path
    pub to: String,
    /// Search parameters, ordered by key
    pub search: BTreeMap<String, String>,
}

impl Redirect {
    /// Creates a redirect to `path` with no search parameters.
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            to: path.into(),
            search: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a search parameter.
    pub fn with_search(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.search.insert(key.into(), value.into());
        self
    }

    /// Returns the value of search parameter `key`, if set.
    pub fn search_param(&self, key: &str) -> Option<&str> {
        self.search.get(key).map(String::as_str)
    }

    /// Renders the redirect as a path with a form-urlencoded query string.
    pub fn href(&self) -> String {
        if self.search.is_empty() {
            return self.to.clone();
        }

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.search.iter())
            .finish();
        format!("{}?{}", self.to, query)
    }
}

/// A denied navigation: where to go instead, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Where the router should navigate instead
    pub redirect: Redirect,
    /// What led to the denial
    pub cause: DenialCause,
}

/// The outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision<T> {
    /// Navigation may continue, carrying the guard's payload
    Proceed(T),
    /// Navigation is denied and must be redirected
    Deny(Denial),
}

impl<T> GuardDecision<T> {
    pub(crate) fn deny(redirect: Redirect, cause: DenialCause) -> Self {
        GuardDecision::Deny(Denial { redirect, cause })
    }

    /// Returns true for [`GuardDecision::Proceed`].
    pub fn is_proceed(&self) -> bool {
        matches!(self, GuardDecision::Proceed(_))
    }

    /// Returns the denial, if navigation was denied.
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            GuardDecision::Proceed(_) => None,
            GuardDecision::Deny(denial) => Some(denial),
        }
    }

    /// Returns the redirect, if navigation was denied.
    pub fn redirect(&self) -> Option<&Redirect> {
        self.denial().map(|denial| &denial.redirect)
    }

    /// Converts the decision into the router-facing form.
    ///
    /// `Proceed` becomes `Ok`; `Deny` becomes a [`NavigationInterrupt`] that a
    /// route loader can return with `?`.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationInterrupt)` when navigation was denied.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_guard::{GuardDecision, NavigationInterrupt};
    ///
    /// fn loader(decision: GuardDecision<String>) -> Result<String, NavigationInterrupt> {
    ///     let user = decision.into_navigation()?;
    ///     Ok(format!("welcome {user}"))
    /// }
    ///
    /// assert_eq!(loader(GuardDecision::Proceed("ada".into())).unwrap(), "welcome ada");
    /// ```
    pub fn into_navigation(self) -> Result<T, NavigationInterrupt> {
        match self {
            GuardDecision::Proceed(value) => Ok(value),
            GuardDecision::Deny(Denial { redirect, cause }) => {
                Err(NavigationInterrupt { redirect, cause })
            }
        }
    }
}
