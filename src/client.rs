use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::{AppointmentApi, AuthApi, DoctorApi, PatientApi, ReportApi};
use crate::config::Config;
use crate::error::ClientResult;
use crate::middleware;
use crate::models::UserProfile;
use crate::navigator::{LogNavigator, Navigator};
use crate::session::{FileSessionStore, MemorySessionStore, SessionHandle, SessionStore};
use crate::transport::{ApiResponse, HttpTransport, RequestSpec, Transport};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the clinic registry API.
///
/// Every call made through it carries the current access token and survives
/// one access-token expiry transparently.
#[derive(Clone)]
pub struct DcmsClient {
    raw: Arc<dyn Transport>,
    stack: Arc<dyn Transport>,
    session: SessionHandle,
}

impl DcmsClient {
    pub fn builder(base_url: Url) -> DcmsClientBuilder {
        DcmsClientBuilder::new(base_url)
    }

    pub fn from_config(config: &Config) -> ClientResult<Self> {
        Self::builder(config.api_base_url.clone())
            .timeout(config.request_timeout)
            .store(Arc::new(FileSessionStore::new(&config.session_file)))
            .build()
    }

    /// Assemble a client over an arbitrary raw transport.
    pub fn with_transport(
        raw: Arc<dyn Transport>,
        session: SessionHandle,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let stack = middleware::authenticated(raw.clone(), session.clone(), navigator);
        Self {
            raw,
            stack: Arc::new(stack),
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Issue a request through the authenticated stack. Any status comes back
    /// as a response; only transport and refresh failures are errors.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> ClientResult<ApiResponse> {
        let mut spec = RequestSpec::new(method, path);
        spec.body = body;
        if let Some(headers) = headers {
            spec = spec.with_headers(headers);
        }
        self.send(spec).await
    }

    pub async fn send(&self, spec: RequestSpec) -> ClientResult<ApiResponse> {
        self.stack.send(spec).await
    }

    /// Bypass token handling entirely (login).
    pub(crate) async fn send_unauthenticated(
        &self,
        spec: RequestSpec,
    ) -> ClientResult<ApiResponse> {
        tracing::debug!(method = %spec.method, path = %spec.path, "API request (unauthenticated)");
        self.raw.send(spec).await
    }

    pub(crate) async fn fetch<T: DeserializeOwned>(&self, spec: RequestSpec) -> ClientResult<T> {
        self.send(spec).await?.error_for_status()?.json()
    }

    pub(crate) async fn execute(&self, spec: RequestSpec) -> ClientResult<()> {
        self.send(spec).await?.error_for_status()?;
        Ok(())
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn patients(&self) -> PatientApi<'_> {
        PatientApi::new(self)
    }

    pub fn doctors(&self) -> DoctorApi<'_> {
        DoctorApi::new(self)
    }

    pub fn appointments(&self) -> AppointmentApi<'_> {
        AppointmentApi::new(self)
    }

    pub fn reports(&self) -> ReportApi<'_> {
        ReportApi::new(self)
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<UserProfile> {
        self.auth().login(username, password).await
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.auth().logout().await
    }

    pub async fn is_authenticated(&self) -> ClientResult<bool> {
        Ok(self.session.profile().await?.is_some())
    }
}

pub struct DcmsClientBuilder {
    base_url: Url,
    timeout: Duration,
    store: Option<Arc<dyn SessionStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl DcmsClientBuilder {
    fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            store: None,
            navigator: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Where the session persists. Defaults to memory.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Who gets told when the session ends. Defaults to a log line.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> ClientResult<DcmsClient> {
        let raw = HttpTransport::new(self.base_url, self.timeout)?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::default()));
        let navigator = self.navigator.unwrap_or_else(|| Arc::new(LogNavigator));
        Ok(DcmsClient::with_transport(
            Arc::new(raw),
            SessionHandle::new(store),
            navigator,
        ))
    }
}
