//! Per-client request rate limiting
//!
//! Clients are identified as `user:<name>` once authenticated, otherwise by
//! peer address (`ip:<addr>`, or `ip:unknown` without connection info).

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use tracing::warn;

use super::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::AppState;

/// Keyed limiter allowing `per_minute` requests per client
pub struct RateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl RateLimiter {
    /// `None` when `per_minute` is zero
    pub fn per_minute(per_minute: u32) -> Option<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute)?);
        Some(Self {
            limiter: DefaultKeyedRateLimiter::keyed(quota),
        })
    }

    /// True when the request may proceed
    pub fn check(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Drop state for clients whose quota has fully replenished
    pub fn purge(&self) {
        self.limiter.retain_recent();
    }
}

/// Identifier used for quota accounting
pub fn client_key(request: &Request) -> String {
    if let Some(user) = request.extensions().get::<AuthenticatedUser>() {
        return format!("user:{}", user.username);
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.rate_limiter {
        let key = client_key(&request);
        if !limiter.check(&key) {
            warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            return Err(ApiError::RateLimited);
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_quota_is_per_client() {
        let limiter = RateLimiter::per_minute(2).unwrap();
        assert!(limiter.check("user:alice"));
        assert!(limiter.check("user:alice"));
        assert!(!limiter.check("user:alice"));
        assert!(limiter.check("user:bob"));
    }

    #[test]
    fn test_zero_quota_disables() {
        assert!(RateLimiter::per_minute(0).is_none());
    }

    #[test]
    fn test_client_key_prefers_user() {
        let mut request = Request::new(Body::empty());
        assert_eq!(client_key(&request), "ip:unknown");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));
        assert_eq!(client_key(&request), "ip:10.0.0.7");

        request.extensions_mut().insert(AuthenticatedUser {
            username: "alice".into(),
        });
        assert_eq!(client_key(&request), "user:alice");
    }
}
