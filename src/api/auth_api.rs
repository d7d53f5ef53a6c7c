use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::{peek_claims, token_fingerprint};
use crate::client::DcmsClient;
use crate::error::{ClientError, ClientResult};
use crate::models::{LoginRequest, LoginResponse, UserProfile};
use crate::session::SessionStoreError;
use crate::transport::RequestSpec;

pub const LOGIN_PATH: &str = "/auth/login/";
pub const ME_PATH: &str = "/auth/me/";

/// What the client knows about the stored session, without calling the server.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub signed_in: bool,
    pub user: Option<UserProfile>,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

pub struct AuthApi<'a> {
    client: &'a DcmsClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a DcmsClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token pair, then load and cache the profile.
    ///
    /// The credential exchange skips the refresh layer: a 401 here means bad
    /// credentials, not an expired token.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<UserProfile> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::InvalidRequest(
                "username and password are required".into(),
            ));
        }

        let spec = RequestSpec::post(LOGIN_PATH).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let tokens: LoginResponse = self
            .client
            .send_unauthenticated(spec)
            .await?
            .error_for_status()?
            .json()?;

        let access = token_fingerprint(&tokens.access);
        self.client
            .session()
            .begin(tokens.access, tokens.refresh)
            .await?;

        match self.me().await {
            Ok(user) => {
                tracing::info!(username, %access, "Logged in");
                Ok(user)
            }
            Err(err) => {
                // Half a login is no login.
                self.client.session().clear().await?;
                Err(err)
            }
        }
    }

    /// Fetch the current user and cache it alongside the session.
    pub async fn me(&self) -> ClientResult<UserProfile> {
        let user: UserProfile = self.client.fetch(RequestSpec::get(ME_PATH)).await?;
        if !self.client.session().cache_profile(user.clone()).await? {
            return Err(ClientError::InvalidRequest(
                "session ended during profile fetch".into(),
            ));
        }
        Ok(user)
    }

    /// Re-read the profile; if that fails for any reason the user is logged out.
    pub async fn refresh_user(&self) -> ClientResult<Option<UserProfile>> {
        match self.me().await {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                tracing::warn!(error = %err, "Could not reload profile, logging out");
                self.logout().await?;
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.client.session().clear().await?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Cached profile from a previous run, if the stored session is usable.
    /// An unreadable store is wiped rather than reported.
    pub async fn restore(&self) -> ClientResult<Option<UserProfile>> {
        match self.client.session().current().await {
            Ok(Some(session)) if !session.access_token.is_empty() => Ok(session.user),
            Ok(_) => Ok(None),
            Err(SessionStoreError::Corrupt(err)) => {
                tracing::warn!(error = %err, "Stored session is unreadable, discarding it");
                self.client.session().clear().await?;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn status(&self) -> ClientResult<SessionStatus> {
        let session = self.client.session().current().await?;
        Ok(match session {
            Some(session) => SessionStatus {
                signed_in: session.user.is_some(),
                access_expires_at: peek_claims(&session.access_token)
                    .and_then(|c| c.expires_at()),
                refresh_expires_at: peek_claims(&session.refresh_token)
                    .and_then(|c| c.expires_at()),
                user: session.user,
            },
            None => SessionStatus {
                signed_in: false,
                user: None,
                access_expires_at: None,
                refresh_expires_at: None,
            },
        })
    }
}
