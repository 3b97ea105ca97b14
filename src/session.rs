//! Session context, role claims and route gating
//!
//! Neither the gate nor the login guard is a security boundary. The remote
//! API enforces authorization; these only keep users on pages they can use.

use axum::http::{HeaderMap, HeaderValue, header};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::config::AuthConfig;

/// Delay before the login guard acts, so a session restored during page
/// hydration is not bounced to the login page
pub const DEFAULT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    fn from_claim(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "admin" | "super_admin" => Some(Role::Admin),
            "staff" | "user" => Some(Role::Staff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Extracts the role claim from a bearer token
#[derive(Clone)]
pub struct RoleDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for RoleDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl RoleDecoder {
    /// Verify HS256 signatures with `secret`, or only decode the payload when
    /// no secret is configured
    pub fn new(secret: Option<&str>) -> Self {
        match secret {
            Some(secret) => Self {
                key: DecodingKey::from_secret(secret.as_bytes()),
                validation: Validation::new(Algorithm::HS256),
            },
            None => {
                let mut validation = Validation::default();
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.required_spec_claims.clear();
                Self {
                    key: DecodingKey::from_secret(&[]),
                    validation,
                }
            }
        }
    }

    pub fn role(&self, token: &str) -> Option<Role> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Role::from_claim(&data.claims.role),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}

/// Outcome of the request-level gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Keeps staff out of admin pages, admins out of staff pages and anonymous
/// users out of both
#[derive(Debug, Clone)]
pub struct RouteGate {
    cookie_name: String,
    login_path: String,
    admin_prefix: String,
    staff_prefix: String,
    decoder: RoleDecoder,
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl RouteGate {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            login_path: config.login_path.clone(),
            admin_prefix: config.admin_prefix.clone(),
            staff_prefix: config.staff_prefix.clone(),
            decoder: RoleDecoder::new(config.jwt_secret.as_deref()),
        }
    }

    /// Pull the session token out of a `Cookie` header
    pub fn token_from_headers<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }

    pub fn check(&self, path: &str, token: Option<&str>) -> GateDecision {
        let wants_admin = under(path, &self.admin_prefix);
        let wants_staff = under(path, &self.staff_prefix);
        if !wants_admin && !wants_staff {
            return GateDecision::Allow;
        }

        let Some(role) = token.and_then(|t| self.decoder.role(t)) else {
            return GateDecision::Redirect(self.login_path.clone());
        };

        match role {
            Role::Staff if wants_admin => GateDecision::Redirect(self.staff_prefix.clone()),
            Role::Admin if wants_staff => GateDecision::Redirect(self.admin_prefix.clone()),
            _ => GateDecision::Allow,
        }
    }
}

/// Per-session login state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
    pub token: Option<String>,
    pub role: Option<Role>,
}

impl Session {
    pub fn authenticated(token: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            logged_in: true,
            token: Some(token.into()),
            role,
        }
    }
}

/// Supplies headers for every outgoing remote API request
pub trait HeaderProvider: Send + Sync {
    fn headers(&self) -> HeaderMap;
}

/// Session shared between the login guard and the API client.
///
/// Passed explicitly to whoever needs it; there is no global instance.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Session>>,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn login(&self, token: impl Into<String>, role: Option<Role>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) =
            Session::authenticated(token, role);
    }

    pub fn logout(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Session::default();
    }
}

impl HeaderProvider for SessionContext {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.snapshot().token
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token))
        {
            headers.insert(header::AUTHORIZATION, value);
        }
        headers
    }
}

/// Wait out the grace delay, then return the login path if the session is
/// still not logged in
pub async fn require_login(
    session: &SessionContext,
    grace: Duration,
    login_path: &str,
) -> Option<String> {
    tokio::time::sleep(grace).await;
    if session.snapshot().logged_in {
        None
    } else {
        Some(login_path.to_string())
    }
}
