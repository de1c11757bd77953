/// The location a navigation is heading to.
///
/// `href` is the path plus query the router resolved, e.g.
/// `/dashboard/settings?tab=billing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Requested path and query
    pub href: String,
}

impl Location {
    /// Creates a location for `href`.
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

/// Options for [`AuthGuard::require_guest`](crate::AuthGuard::require_guest).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestOptions {
    /// Where to send a visitor who is already signed in; the configured
    /// default redirect when unset
    pub default_redirect: Option<String>,
    /// The guest route being entered, used only for log context
    pub location: Option<Location>,
}

impl GuestOptions {
    /// Sets the redirect for signed-in visitors.
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.default_redirect = Some(path.into());
        self
    }

    /// Sets the guest route being entered.
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}
