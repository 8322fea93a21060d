//! Single-flight credential refresh
//!
//! At most one refresh call is in flight per client. A 401 that arrives while
//! a refresh is running fails fast with the original error instead of
//! waiting for the new token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lugn_domain::constants::BEARER_PREFIX;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::{debug, info, warn};

use super::context::RequestContext;
use super::csrf::CsrfTokenCache;
use super::traits::{CredentialRefresher, SessionStore};

/// Result of handing a 401 to the coordinator
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Credentials were rotated; reissue this context
    Reissue(RequestContext),
    /// Another refresh was already running
    InFlight,
    /// Refresh failed and the session was torn down
    LoggedOut,
}

/// Clears the in-flight flag when the refresh call resolves, whichever way
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct TokenRefreshCoordinator {
    session: Arc<dyn SessionStore>,
    refresher: Arc<dyn CredentialRefresher>,
    csrf: Arc<CsrfTokenCache>,
    in_flight: AtomicBool,
}

impl TokenRefreshCoordinator {
    pub fn new(
        session: Arc<dyn SessionStore>,
        refresher: Arc<dyn CredentialRefresher>,
        csrf: Arc<CsrfTokenCache>,
    ) -> Self {
        Self { session, refresher, csrf, in_flight: AtomicBool::new(false) }
    }

    /// Whether a refresh call is currently running
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.in_flight))
    }

    /// Recover from a 401 by refreshing the access token once.
    pub async fn handle_unauthorized(&self, mut ctx: RequestContext) -> RefreshOutcome {
        let Some(guard) = self.try_begin() else {
            debug!(url = %ctx.url, request_id = %ctx.request_id, "refresh already in flight, failing fast");
            return RefreshOutcome::InFlight;
        };
        ctx.retried_for_auth = true;

        info!(url = %ctx.url, request_id = %ctx.request_id, "access token rejected, refreshing");
        let token = match self.refresher.refresh_access_token().await {
            Ok(token) => token,
            Err(err) => {
                drop(guard);
                warn!(error = %err, "credential refresh failed, logging out");
                self.logout().await;
                return RefreshOutcome::LoggedOut;
            }
        };

        if let Err(err) = self.session.set_access_token(&token).await {
            warn!(error = %err, "failed to persist refreshed access token");
        }
        drop(guard);

        match HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}")) {
            Ok(value) => {
                ctx.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                warn!("refreshed access token is not a valid header value");
                ctx.headers.remove(AUTHORIZATION);
            }
        }
        info!(url = %ctx.url, request_id = %ctx.request_id, "access token refreshed, reissuing request");
        RefreshOutcome::Reissue(ctx)
    }

    /// Tear down the session: CSRF cache, stored tokens, server-side logout.
    ///
    /// Collaborator failures are logged and otherwise ignored.
    pub async fn logout(&self) {
        self.csrf.clear().await;
        if let Err(err) = self.session.clear_tokens().await {
            warn!(error = %err, "failed to clear stored tokens");
        }
        if let Err(err) = self.refresher.logout_user().await {
            warn!(error = %err, "logout request failed");
        }
    }
}
