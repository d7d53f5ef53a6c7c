use async_trait::async_trait;
use headers::{Authorization, HeaderMapExt};
use reqwest::header::HeaderMap;

use crate::error::{ClientError, ClientResult};
use crate::session::SessionHandle;
use crate::transport::{ApiResponse, RequestSpec, Transport};

/// Attaches `Authorization: Bearer <access_token>` from the session, if any.
#[derive(Clone, Debug)]
pub struct WithAuthHeader<T> {
    inner: T,
    session: SessionHandle,
}

impl<T> WithAuthHeader<T> {
    pub fn new(inner: T, session: SessionHandle) -> Self {
        Self { inner, session }
    }
}

/// Set (or overwrite) the bearer credential on `headers`.
pub fn attach_bearer(headers: &mut HeaderMap, token: &str) -> ClientResult<()> {
    let authz = Authorization::bearer(token).map_err(|_| {
        ClientError::InvalidRequest("access token is not a valid header value".into())
    })?;
    headers.typed_insert(authz);
    Ok(())
}

#[async_trait]
impl<T: Transport> Transport for WithAuthHeader<T> {
    async fn send(&self, mut request: RequestSpec) -> ClientResult<ApiResponse> {
        match self.session.access_token().await? {
            Some(token) => attach_bearer(&mut request.headers, &token)?,
            // The server decides whether this path needs credentials.
            None => tracing::debug!(
                path = %request.path,
                "No access token, sending unauthenticated"
            ),
        }
        self.inner.send(request).await
    }
}
