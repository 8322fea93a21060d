//! Outbound request preparation

use std::sync::Arc;
use std::time::Instant;

use lugn_domain::constants::BEARER_PREFIX;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use tracing::warn;

use super::context::RequestContext;
use super::csrf::CsrfTokenCache;
use super::errors::ApiError;
use super::traits::SessionStore;

/// Attaches credentials and stamps the send time on every transmission
///
/// Headers already present on the context are left alone, so a reissued
/// context keeps the token the refresh coordinator set.
pub struct RequestInterceptor {
    session: Arc<dyn SessionStore>,
    csrf: Arc<CsrfTokenCache>,
    csrf_header: HeaderName,
}

impl RequestInterceptor {
    /// # Errors
    /// Returns `ApiError::Config` if `csrf_header` is not a valid header name.
    pub fn new(
        session: Arc<dyn SessionStore>,
        csrf: Arc<CsrfTokenCache>,
        csrf_header: &str,
    ) -> Result<Self, ApiError> {
        let csrf_header = HeaderName::from_bytes(csrf_header.as_bytes())
            .map_err(|e| ApiError::Config(format!("invalid CSRF header name '{csrf_header}': {e}")))?;
        Ok(Self { session, csrf, csrf_header })
    }

    /// Prepare `ctx` for transmission in place
    ///
    /// # Errors
    /// Returns `ApiError::Setup` if the stored access token cannot be used
    /// as a header value. Session-store and CSRF failures are logged only.
    pub async fn intercept(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        if !ctx.headers.contains_key(AUTHORIZATION) {
            match self.session.access_token().await {
                Ok(Some(token)) => {
                    let value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}"))
                        .map_err(|e| ApiError::Setup(format!("invalid access token: {e}")))?;
                    ctx.headers.insert(AUTHORIZATION, value);
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "session store unavailable, sending without token"),
            }
        }

        if ctx.is_state_changing() && !ctx.headers.contains_key(&self.csrf_header) {
            match self.csrf.get_token().await {
                Ok(token) => match HeaderValue::from_str(&token) {
                    Ok(value) => {
                        ctx.headers.insert(self.csrf_header.clone(), value);
                    }
                    Err(_) => warn!("CSRF token is not a valid header value, sending without it"),
                },
                Err(err) => {
                    warn!(error = %err, url = %ctx.url, "CSRF token unavailable, sending without it");
                }
            }
        }

        ctx.start_time = Some(Instant::now());
        Ok(())
    }
}
