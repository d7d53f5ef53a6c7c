//! In-memory stand-in for the clinic API used by unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use headers::authorization::Bearer;
use headers::{Authorization, HeaderMapExt};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::Barrier;

use crate::error::{ClientError, ClientResult};
use crate::models::UserProfile;
use crate::navigator::Navigator;
use crate::transport::{ApiResponse, RequestSpec, Transport};

pub(crate) const USERNAME: &str = "reception";
pub(crate) const PASSWORD: &str = "secret";

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
}

#[derive(Default)]
struct State {
    valid_access: HashSet<String>,
    valid_refresh: HashSet<String>,
    calls: Vec<Call>,
    issued: usize,
    rotate: bool,
    refresh_offline: bool,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<State>,
    hold: Mutex<Option<(Arc<Barrier>, usize)>>,
}

pub(crate) fn profile(roles: &[&str]) -> UserProfile {
    UserProfile {
        id: 1,
        username: USERNAME.into(),
        first_name: "Olena".into(),
        last_name: "Koval".into(),
        email: Some("olena@clinic.test".into()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

fn unauthorized() -> ApiResponse {
    ApiResponse::json_body(
        StatusCode::UNAUTHORIZED,
        &json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"}),
    )
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.lock().valid_refresh.insert("refresh-ok".into());
        api
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Mint an access token the API will accept.
    pub fn issue_access(&self) -> String {
        let mut state = self.lock();
        state.issued += 1;
        let token = format!("access-{}", state.issued);
        state.valid_access.insert(token.clone());
        token
    }

    fn issue_refresh(state: &mut State) -> String {
        state.issued += 1;
        let token = format!("refresh-{}", state.issued);
        state.valid_refresh.insert(token.clone());
        token
    }

    pub fn rotate_refresh_tokens(&self) {
        self.lock().rotate = true;
    }

    pub fn fail_refresh_with_network_error(&self) {
        self.lock().refresh_offline = true;
    }

    /// The first `n` unauthorized answers wait until all `n` are pending.
    pub fn hold_unauthorized_until(&self, n: usize) {
        *self.hold.lock().unwrap() = Some((Arc::new(Barrier::new(n)), n));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    pub fn refresh_calls(&self) -> usize {
        self.calls_to("/auth/refresh/").len()
    }

    fn login(&self, body: &Value) -> ApiResponse {
        if body["username"] != USERNAME || body["password"] != PASSWORD {
            return ApiResponse::json_body(
                StatusCode::UNAUTHORIZED,
                &json!({"detail": "No active account found with the given credentials"}),
            );
        }
        let access = self.issue_access();
        let refresh = Self::issue_refresh(&mut self.lock());
        ApiResponse::json_body(StatusCode::OK, &json!({"access": access, "refresh": refresh}))
    }

    fn refresh(&self, body: &Value) -> ClientResult<ApiResponse> {
        let presented = body["refresh"].as_str().unwrap_or_default().to_string();
        let mut state = self.lock();
        if state.refresh_offline {
            return Err(ClientError::network("connection reset by peer"));
        }
        if !state.valid_refresh.contains(&presented) {
            return Ok(ApiResponse::json_body(
                StatusCode::UNAUTHORIZED,
                &json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}),
            ));
        }

        state.issued += 1;
        let access = format!("access-{}", state.issued);
        state.valid_access.insert(access.clone());

        let mut payload = json!({"access": access});
        if state.rotate {
            state.valid_refresh.remove(&presented);
            payload["refresh"] = Value::String(Self::issue_refresh(&mut state));
        }
        Ok(ApiResponse::json_body(StatusCode::OK, &payload))
    }

    async fn maybe_hold(&self) {
        let barrier = {
            let mut hold = self.hold.lock().unwrap();
            match hold.as_mut() {
                Some((barrier, remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(barrier.clone())
                }
                _ => None,
            }
        };
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(&self, request: RequestSpec) -> ClientResult<ApiResponse> {
        let bearer = request
            .headers
            .typed_get::<Authorization<Bearer>>()
            .map(|a| a.token().to_string());
        let authorized = bearer
            .as_ref()
            .is_some_and(|t| self.lock().valid_access.contains(t));
        self.lock().calls.push(Call {
            method: request.method.clone(),
            path: request.path.clone(),
            bearer,
        });

        let body = request.body.clone().unwrap_or(Value::Null);
        let is_post = request.method == Method::POST;
        match request.path.as_str() {
            "/auth/login/" if is_post => return Ok(self.login(&body)),
            "/auth/refresh/" if is_post => return self.refresh(&body),
            "/offline/" => return Err(ClientError::network("connection refused")),
            _ => {}
        }

        if !authorized {
            self.maybe_hold().await;
            return Ok(unauthorized());
        }

        Ok(match request.path.as_str() {
            "/always-401/" => unauthorized(),
            "/auth/me/" => ApiResponse::json_body(
                StatusCode::OK,
                &serde_json::to_value(profile(&["registrar"]))?,
            ),
            path if path.ends_with("/999/") => {
                ApiResponse::json_body(StatusCode::NOT_FOUND, &json!({"detail": "Not found."}))
            }
            _ => ApiResponse::json_body(StatusCode::OK, &json!({"ok": true})),
        })
    }
}

/// Navigator that counts redirects.
#[derive(Clone, Default)]
pub(crate) struct RedirectCounter(Arc<AtomicUsize>);

impl RedirectCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Navigator for RedirectCounter {
    fn redirect_to_login(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
