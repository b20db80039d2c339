//! Admin session and route gate.
//!
//! The session is an explicit value owned by the front-end rather than
//! ambient storage. It lives as long as the front-end keeps it; there is no
//! token, expiry or refresh.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ticketdesk_api::types::AdminCredentials;
use ticketdesk_api::{ApiError, BookingApi};

/// Staff roles returned by `POST /api/admin/login`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Full admin console
    AdminJump,
    /// Cash register only
    Cashier,
}

impl Role {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminJump => "adminJump",
            Self::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adminJump" => Ok(Self::AdminJump),
            "cashier" => Ok(Self::Cashier),
            _ => Err(SessionError::Unauthorized),
        }
    }
}

/// Browser-facing routes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/` and `/ticket-booking`
    Storefront,
    /// `/ticket-booking/:sessionId`
    StorefrontReturn(String),
    /// `/admin/login`
    AdminLogin,
    /// `/admin/dashboard`
    AdminDashboard,
    /// `/payment-success`
    PaymentSuccess,
    /// `/walkinTickets`
    WalkIn,
    /// `/walkinTickets/:sessionId`
    WalkInReturn(String),
    /// `/megajumpcashpayment`
    CashRegister,
}

impl Route {
    /// Login page
    pub const LOGIN_PATH: &'static str = "/admin/login";
    /// Admin dashboard
    pub const DASHBOARD_PATH: &'static str = "/admin/dashboard";
    /// Cash register
    pub const CASH_REGISTER_PATH: &'static str = "/megajumpcashpayment";

    /// Match a path, ignoring any query string
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or(path);
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        match path {
            "/" | "/ticket-booking" => Some(Self::Storefront),
            Self::LOGIN_PATH => Some(Self::AdminLogin),
            Self::DASHBOARD_PATH => Some(Self::AdminDashboard),
            "/payment-success" => Some(Self::PaymentSuccess),
            "/walkinTickets" => Some(Self::WalkIn),
            Self::CASH_REGISTER_PATH => Some(Self::CashRegister),
            _ => {
                if let Some(id) = path.strip_prefix("/ticket-booking/") {
                    Some(Self::StorefrontReturn(id.to_string()))
                } else {
                    path.strip_prefix("/walkinTickets/")
                        .map(|id| Self::WalkInReturn(id.to_string()))
                }
            },
        }
    }

    /// Path of this route
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Storefront => "/".to_string(),
            Self::StorefrontReturn(id) => format!("/ticket-booking/{id}"),
            Self::AdminLogin => Self::LOGIN_PATH.to_string(),
            Self::AdminDashboard => Self::DASHBOARD_PATH.to_string(),
            Self::PaymentSuccess => "/payment-success".to_string(),
            Self::WalkIn => "/walkinTickets".to_string(),
            Self::WalkInReturn(id) => format!("/walkinTickets/{id}"),
            Self::CashRegister => Self::CASH_REGISTER_PATH.to_string(),
        }
    }

    /// Role needed to open this route
    #[must_use]
    pub const fn required_role(&self) -> Option<Role> {
        match self {
            Self::AdminDashboard => Some(Role::AdminJump),
            Self::CashRegister => Some(Role::Cashier),
            _ => None,
        }
    }
}

/// Login state of the staff user
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminSession {
    role: Option<Role>,
    username: Option<String>,
}

impl AdminSession {
    /// Record a successful login
    pub fn login(&mut self, role: Role, username: impl Into<String>) {
        let username = username.into();
        tracing::info!(%role, %username, "Admin session started");
        self.role = Some(role);
        self.username = Some(username);
    }

    /// Forget the user
    pub fn logout(&mut self) {
        if let Some(username) = self.username.take() {
            tracing::info!(%username, "Admin session ended");
        }
        self.role = None;
    }

    /// Current role
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    /// Current username
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Both role and a non-empty username are present
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.role.is_some() && self.username.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Outcome of [`guard`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the route
    Allow,
    /// Go to the login page, then back to `redirect`
    RedirectToLogin {
        /// Path to return to after login
        redirect: String,
    },
}

impl GuardDecision {
    /// Login URL carrying the redirect parameter
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { redirect } => Some(format!(
                "{}?redirect={}",
                Route::LOGIN_PATH,
                urlencoding::encode(redirect)
            )),
        }
    }
}

/// Check `route` against the session; a mismatch also ends the session
pub fn guard(session: &mut AdminSession, route: &Route) -> GuardDecision {
    let Some(required) = route.required_role() else {
        return GuardDecision::Allow;
    };

    if session.is_authenticated() && session.role() == Some(required) {
        return GuardDecision::Allow;
    }

    tracing::warn!(
        route = %route.path(),
        required = %required,
        role = ?session.role(),
        "Route requires another role, redirecting to login"
    );
    session.logout();
    GuardDecision::RedirectToLogin {
        redirect: route.path(),
    }
}

/// Where to go after logging in as `role`
///
/// Admins always land on the dashboard. Cashiers follow the redirect only
/// when it is a local path to a known route they may open, and land on the
/// cash register otherwise.
#[must_use]
pub fn resolve_login_redirect(role: Role, redirect: Option<&str>) -> String {
    match role {
        Role::AdminJump => Route::DASHBOARD_PATH.to_string(),
        Role::Cashier => redirect
            .filter(|target| target.starts_with('/'))
            .filter(|target| {
                Route::parse(target)
                    .is_some_and(|route| route.required_role().is_none_or(|role| role == Role::Cashier))
            })
            .map_or_else(|| Route::CASH_REGISTER_PATH.to_string(), str::to_string),
    }
}

/// Login failures as shown to the user
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A field is empty
    #[error("Please enter both username and password")]
    MissingCredentials,

    /// 401
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// 403
    #[error("Access denied - Unauthorized role")]
    AccessDenied,

    /// `success: false` or a role this client does not know
    #[error("Unauthorized access")]
    Unauthorized,

    /// Any other server message
    #[error("{0}")]
    Server(String),

    /// The request timed out
    #[error("Connection timeout - Please try again")]
    ConnectionTimeout,

    /// Anything else
    #[error("Login failed - Please check your credentials")]
    Failed,
}

impl From<ApiError> for SessionError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized { .. } => Self::InvalidCredentials,
            ApiError::Forbidden { .. } => Self::AccessDenied,
            ApiError::Timeout => Self::ConnectionTimeout,
            other => other
                .server_message()
                .map_or(Self::Failed, |message| Self::Server(message.to_string())),
        }
    }
}

/// Authenticate, start the session and return the landing path
///
/// # Errors
///
/// Returns [`SessionError::MissingCredentials`] without a request when a
/// field is empty, otherwise the mapped server verdict.
pub async fn login(
    api: &dyn BookingApi,
    session: &mut AdminSession,
    credentials: &AdminCredentials,
    redirect: Option<&str>,
) -> Result<String, SessionError> {
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(SessionError::MissingCredentials);
    }

    let response = api.admin_login(credentials).await.map_err(|error| {
        tracing::error!(username = %credentials.username, %error, "Login error");
        SessionError::from(error)
    })?;

    let role = match response.role.as_deref() {
        Some(role) if response.success => role.parse::<Role>()?,
        _ => {
            tracing::warn!(username = %credentials.username, "Invalid credentials or unauthorized role");
            return Err(SessionError::Unauthorized);
        },
    };

    session.login(role, credentials.username.clone());
    Ok(resolve_login_redirect(role, redirect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cashier_cannot_open_dashboard() {
        let mut session = AdminSession::default();
        session.login(Role::Cashier, "till-1");
        let decision = guard(&mut session, &Route::AdminDashboard);
        assert_eq!(
            decision.location().as_deref(),
            Some("/admin/login?redirect=%2Fadmin%2Fdashboard")
        );
        assert!(!session.is_authenticated());
    }

    #[test]
    fn matching_role_is_allowed() {
        let mut session = AdminSession::default();
        session.login(Role::Cashier, "till-1");
        assert_eq!(guard(&mut session, &Route::CashRegister), GuardDecision::Allow);
        assert_eq!(guard(&mut session, &Route::Storefront), GuardDecision::Allow);
        assert_eq!(session.username(), Some("till-1"));
    }

    #[test]
    fn empty_username_is_not_a_session() {
        let mut session = AdminSession::default();
        session.login(Role::AdminJump, "");
        assert!(matches!(
            guard(&mut session, &Route::AdminDashboard),
            GuardDecision::RedirectToLogin { .. }
        ));
    }

    #[test]
    fn login_redirects() {
        assert_eq!(resolve_login_redirect(Role::AdminJump, Some("/megajumpcashpayment")), "/admin/dashboard");
        assert_eq!(resolve_login_redirect(Role::Cashier, Some("/admin/dashboard")), "/megajumpcashpayment");
        assert_eq!(resolve_login_redirect(Role::Cashier, None), "/megajumpcashpayment");
        assert_eq!(resolve_login_redirect(Role::Cashier, Some("/walkinTickets")), "/walkinTickets");
    }

    #[test]
    fn cashier_redirect_stays_on_known_routes() {
        for target in [
            "https://evil.example/megajumpcashpayment",
            "//evil.example/walkinTickets",
            "javascript:alert(1)",
            "/test-i18n",
            "",
            "/admin/dashboard/",
            "/admin/dashboard?tab=vouchers",
        ] {
            assert_eq!(
                resolve_login_redirect(Role::Cashier, Some(target)),
                "/megajumpcashpayment",
                "{target}"
            );
        }
        assert_eq!(
            resolve_login_redirect(Role::Cashier, Some("/walkinTickets/cs_1")),
            "/walkinTickets/cs_1"
        );
        assert_eq!(
            resolve_login_redirect(Role::Cashier, Some("/megajumpcashpayment?till=2")),
            "/megajumpcashpayment?till=2"
        );
    }

    #[test]
    fn routes_round_trip_paths() {
        assert_eq!(Route::parse("/walkinTickets/cs_1"), Some(Route::WalkInReturn("cs_1".to_string())));
        assert_eq!(Route::parse("/ticket-booking?cancel=true"), Some(Route::Storefront));
        assert_eq!(Route::parse("/test-i18n"), None);
    }

    #[test]
    fn login_errors_map_to_messages() {
        assert_eq!(
            SessionError::from(ApiError::Unauthorized { message: Some("nope".to_string()) }),
            SessionError::InvalidCredentials
        );
        assert_eq!(
            SessionError::from(ApiError::Rejected { status: 429, message: Some("Too many attempts".to_string()) })
                .to_string(),
            "Too many attempts"
        );
        assert_eq!(SessionError::from(ApiError::RequestFailed("dns".to_string())), SessionError::Failed);
        assert_eq!("manager".parse::<Role>(), Err(SessionError::Unauthorized));
    }
}
