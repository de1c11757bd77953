use std::fmt;

use url::Url;

/// Why a requested redirect target was refused.
///
/// Rejections never carry the rejected input; callers that need it already
/// hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectRejection {
    /// The target is empty.
    Empty,
    /// The target does not resolve as a URL against the base.
    Malformed,
    /// The target resolves to a different origin.
    CrossOrigin,
    /// The resolved path is not rooted at `/`.
    NotRooted,
    /// The resolved path points into the authentication section.
    AuthSection,
}

impl fmt::Display for RedirectRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty target"),
            Self::Malformed => write!(f, "malformed target"),
            Self::CrossOrigin => write!(f, "cross-origin target"),
            Self::NotRooted => write!(f, "target not rooted at /"),
            Self::AuthSection => write!(f, "target inside the auth section"),
        }
    }
}

/// The result of sanitizing a redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    /// The path to redirect to
    pub target_path: String,
    /// True when the requested path was replaced by the fallback
    pub was_sanitized: bool,
    /// Why the requested path was refused, when it was
    pub rejection: Option<RedirectRejection>,
}

/// Validates caller-supplied redirect targets.
///
/// A target is safe when it:
/// - is not empty
/// - resolves as a URL against the neutral base
/// - has the base's origin
/// - has a path rooted at `/`
/// - does not point into the authentication section (which would loop
///   back to sign-in)
///
/// # Examples
///
/// ```
/// use route_guard::RedirectSanitizer;
///
/// let sanitizer = RedirectSanitizer::with_defaults();
///
/// let ok = sanitizer.sanitize("/dashboard/settings", "/dashboard");
/// assert_eq!(ok.target_path, "/dashboard/settings");
/// assert!(!ok.was_sanitized);
///
/// let evil = sanitizer.sanitize("https://evil.example/phish", "/dashboard");
/// assert_eq!(evil.target_path, "/dashboard");
/// assert!(evil.was_sanitized);
///
/// let looping = sanitizer.sanitize("/auth/sign-in", "/dashboard");
/// assert_eq!(looping.target_path, "/dashboard");
/// ```
#[derive(Debug, Clone)]
pub struct RedirectSanitizer {
    base: Url,
    auth_prefix: String,
}

impl RedirectSanitizer {
    /// Neutral base that relative targets are resolved against.
    pub const DEFAULT_BASE: &'static str = "http://localhost";

    /// Path prefix of the authentication section.
    pub const DEFAULT_AUTH_PREFIX: &'static str = "/auth";

    /// Creates a sanitizer resolving against `base` and refusing targets
    /// under `auth_prefix`.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `base` is not an absolute URL.
    pub fn new(base: &str, auth_prefix: impl Into<String>) -> Result<Self, url::ParseError> {
        let auth_prefix = auth_prefix.into();
        Ok(Self {
            base: Url::parse(base)?,
            auth_prefix: auth_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a sanitizer with [`Self::DEFAULT_BASE`] and
    /// [`Self::DEFAULT_AUTH_PREFIX`].
    pub fn with_defaults() -> Self {
        // DEFAULT_BASE is a fixed absolute http URL; parsing it cannot fail.
        Self {
            base: Url::parse(Self::DEFAULT_BASE).expect("default base is an absolute URL"),
            auth_prefix: Self::DEFAULT_AUTH_PREFIX.to_string(),
        }
    }

    /// Returns `requested` if it is a safe redirect target, else `fallback`.
    ///
    /// A safe `requested` is returned exactly as given, not in its resolved
    /// form. The fallback is returned as-is; callers that cannot vouch for it
    /// should check it with [`Self::is_safe`].
    pub fn sanitize(&self, requested: &str, fallback: &str) -> RedirectDecision {
        match self.check(requested) {
            Ok(()) => RedirectDecision {
                target_path: requested.to_string(),
                was_sanitized: false,
                rejection: None,
            },
            Err(rejection) => RedirectDecision {
                target_path: fallback.to_string(),
                was_sanitized: true,
                rejection: Some(rejection),
            },
        }
    }

    /// Returns true if `path` passes every redirect rule.
    pub fn is_safe(&self, path: &str) -> bool {
        self.check(path).is_ok()
    }

    /// Runs the redirect rules in order and reports the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`RedirectRejection`] for the first rule `path` breaks.
    pub fn check(&self, path: &str) -> Result<(), RedirectRejection> {
        if path.trim().is_empty() {
            return Err(RedirectRejection::Empty);
        }

        let resolved = self
            .base
            .join(path)
            .map_err(|_| RedirectRejection::Malformed)?;

        if resolved.origin() != self.base.origin() {
            return Err(RedirectRejection::CrossOrigin);
        }

        let resolved_path = resolved.path();
        if !resolved_path.starts_with('/') {
            return Err(RedirectRejection::NotRooted);
        }

        if self.is_auth_path(resolved_path) {
            return Err(RedirectRejection::AuthSection);
        }

        Ok(())
    }

    // Matches the prefix itself and anything below it, ignoring ASCII case.
    fn is_auth_path(&self, path: &str) -> bool {
        let prefix = self.auth_prefix.as_bytes();
        let path = path.as_bytes();

        if prefix.is_empty() || path.len() < prefix.len() {
            return false;
        }
        if !path[..prefix.len()].eq_ignore_ascii_case(prefix) {
            return false;
        }
        matches!(path.get(prefix.len()), None | Some(b'/'))
    }
}

impl Default for RedirectSanitizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}
