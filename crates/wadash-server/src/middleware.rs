use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;
use wadash_core::Role;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "WADASH_API_KEYS";
const DEV_USER_VAR: &str = "WADASH_DEV_USER_ID";
const DEFAULT_DEV_USER_ID: i64 = 1;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The authenticated caller, stored as a request extension by
/// [`require_bearer_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn is_admin(self) -> bool {
        self.role.is_admin()
    }

    /// Admins may act on anything; users only on what they own.
    #[must_use]
    pub fn may_act_on(self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

#[derive(Debug, Clone)]
struct ApiKey {
    digest: [u8; 32],
    principal: Principal,
}

/// Bearer-token auth settings used by middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<Vec<ApiKey>>,
    dev_principal: Principal,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `WADASH_API_KEYS`, a comma-separated list of
    /// `role:user_id:token` entries.
    ///
    /// In development, empty/missing keys disable auth and every request acts
    /// as the admin named by `WADASH_DEV_USER_ID` (default 1).
    /// In non-development envs, empty/missing keys fail startup.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed entry, or for missing keys outside
    /// development.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        let dev_user = std::env::var(DEV_USER_VAR).ok();
        Self::parse(&raw, dev_user.as_deref(), is_development)
    }

    /// Same as [`AuthState::from_env`] over explicit values.
    ///
    /// # Errors
    ///
    /// See [`AuthState::from_env`].
    pub fn parse(raw: &str, dev_user: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        let dev_user_id = match dev_user.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("{DEV_USER_VAR} must be a numeric user id"))?,
            None => DEFAULT_DEV_USER_ID,
        };
        let dev_principal = Principal {
            user_id: dev_user_id,
            role: Role::Admin,
        };

        let keys = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_key)
            .collect::<anyhow::Result<Vec<_>>>()?;

        if keys.is_empty() {
            if is_development {
                tracing::warn!(
                    user_id = dev_user_id,
                    "{API_KEYS_VAR} not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    keys: Arc::new(Vec::new()),
                    dev_principal,
                    enabled: false,
                });
            }

            anyhow::bail!(
                "{API_KEYS_VAR} is required outside development; provide comma-separated role:user_id:token entries"
            );
        }

        Ok(Self {
            keys: Arc::new(keys),
            dev_principal,
            enabled: true,
        })
    }

    /// Checks every key so the comparison time does not depend on which one matches.
    fn principal_for(&self, token: &str) -> Option<Principal> {
        let digest = token_digest(token);
        let mut found = None;
        for key in self.keys.iter() {
            if bool::from(key.digest.ct_eq(&digest)) {
                found = Some(key.principal);
            }
        }
        found
    }
}

fn parse_key(entry: &str) -> anyhow::Result<ApiKey> {
    let mut parts = entry.splitn(3, ':');
    let (Some(role), Some(user_id), Some(token)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("{API_KEYS_VAR} entries must look like role:user_id:token");
    };
    let role = role
        .trim()
        .parse::<Role>()
        .map_err(|e| anyhow::anyhow!("{API_KEYS_VAR}: {e}"))?;
    let user_id = user_id
        .trim()
        .parse::<i64>()
        .map_err(|_| anyhow::anyhow!("{API_KEYS_VAR}: user id must be numeric"))?;
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("{API_KEYS_VAR}: token must not be empty");
    }
    Ok(ApiKey {
        digest: token_digest(token),
        principal: Principal { user_id, role },
    })
}

fn token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every protected route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }

    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(
            usize::try_from(max_requests).unwrap_or(usize::MAX),
            Duration::from_secs(60),
        )
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the bearer token to a [`Principal`].
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let principal = if auth.enabled {
        extract_bearer_token(req.headers().get(AUTHORIZATION))
            .and_then(|token| auth.principal_for(token))
    } else {
        Some(auth.dev_principal)
    };

    match principal {
        Some(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        None => ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response(),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        drop(window);
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
