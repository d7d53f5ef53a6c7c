//! Recovery from expired access tokens: on a 401, renew the access token once
//! and replay the original request; if renewal fails, end the session.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::token_fingerprint;
use crate::error::{ClientError, ClientResult};
use crate::models::{RefreshRequest, RefreshResponse};
use crate::navigator::Navigator;
use crate::session::SessionHandle;
use crate::transport::{ApiResponse, RequestSpec, Transport};

pub const REFRESH_PATH: &str = "/auth/refresh/";

/// One caller's request plus the single-retry flag.
#[derive(Debug, Clone)]
pub struct Attempt {
    original: RequestSpec,
    retried: bool,
}

impl Attempt {
    pub fn new(original: RequestSpec) -> Self {
        Self {
            original,
            retried: false,
        }
    }

    pub fn request(&self) -> &RequestSpec {
        &self.original
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Flip the flag. Returns `true` only for the call that flipped it.
    pub fn mark_retried(&mut self) -> bool {
        !std::mem::replace(&mut self.retried, true)
    }
}

enum Recovery {
    /// We refreshed; replay with the new token.
    Refreshed,
    /// Another request refreshed while we waited; replay with its token.
    AlreadyRefreshed,
    /// Nothing to refresh with; hand the 401 back.
    Unavailable,
}

/// Refresh-on-401 layer.
///
/// `inner` is the authenticated stack (it re-reads the access token on every
/// send, so a replay picks up the refreshed one); `raw` carries the refresh
/// call itself.
///
/// Concurrent 401s are coalesced: recovery runs under `refresh_gate`, and a
/// caller that finds the access token already changed from the one it sent
/// replays without a second refresh call.
pub struct WithAuthRefresh<T, R> {
    inner: T,
    raw: R,
    session: SessionHandle,
    navigator: Arc<dyn Navigator>,
    refresh_gate: Arc<Mutex<()>>,
}

impl<T, R> WithAuthRefresh<T, R> {
    pub fn new(inner: T, raw: R, session: SessionHandle, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            inner,
            raw,
            session,
            navigator,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }
}

impl<T: Transport, R: Transport> WithAuthRefresh<T, R> {
    async fn drive(&self, request: RequestSpec) -> ClientResult<ApiResponse> {
        let observed = self.session.access_token().await?;
        let mut attempt = Attempt::new(request);

        loop {
            let response = self.inner.send(attempt.request().clone()).await?;
            tracing::debug!(
                status = %response.status,
                retried = attempt.is_retried(),
                "API response"
            );

            if response.status != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }
            if !attempt.mark_retried() {
                tracing::debug!("Still unauthorized after replay, giving up");
                return Ok(response);
            }

            match self.recover(observed.as_deref()).await? {
                Recovery::Refreshed | Recovery::AlreadyRefreshed => continue,
                Recovery::Unavailable => return Ok(response),
            }
        }
    }

    async fn recover(&self, observed: Option<&str>) -> ClientResult<Recovery> {
        let _gate = self.refresh_gate.lock().await;

        let Some(session) = self.session.current().await? else {
            tracing::debug!("Unauthorized and no refresh token, not refreshing");
            return Ok(Recovery::Unavailable);
        };
        if session.refresh_token.is_empty() {
            tracing::debug!("Unauthorized and refresh token is empty, not refreshing");
            return Ok(Recovery::Unavailable);
        }
        if observed != Some(session.access_token.as_str()) {
            tracing::debug!("Access token changed while waiting, replaying");
            return Ok(Recovery::AlreadyRefreshed);
        }

        match self.refresh(&session.refresh_token).await {
            Ok(renewed) => {
                tracing::info!(
                    access = %token_fingerprint(&renewed.access),
                    rotated = renewed.refresh.is_some(),
                    "Access token refreshed"
                );
                if self
                    .session
                    .replace_tokens(renewed.access, renewed.refresh)
                    .await?
                {
                    Ok(Recovery::Refreshed)
                } else {
                    // Logged out while the refresh was in flight.
                    Ok(Recovery::Unavailable)
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh failed, ending session");
                let cleared = self.session.clear().await;
                // Tokens are dead whether or not the clear worked.
                self.navigator.redirect_to_login();
                match cleared {
                    Ok(()) => Err(ClientError::RefreshFailed(Box::new(err))),
                    Err(store) => {
                        tracing::error!(error = %store, "Failed to clear session store");
                        Err(ClientError::TeardownFailed {
                            refresh: Box::new(err),
                            store,
                        })
                    }
                }
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshResponse> {
        let request = RequestSpec::post(REFRESH_PATH).json(&RefreshRequest {
            refresh: refresh_token.to_string(),
        })?;
        let response = self.raw.send(request).await?.error_for_status()?;
        response.json()
    }
}

#[async_trait]
impl<T: Transport, R: Transport> Transport for WithAuthRefresh<T, R> {
    async fn send(&self, request: RequestSpec) -> ClientResult<ApiResponse> {
        let span = tracing::debug_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );
        self.drive(request).instrument(span).await
    }
}
