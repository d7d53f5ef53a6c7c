//! In-process mock of the clinic API, served over real HTTP.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use url::Url;

use dcms_client::models::{Appointment, Doctor, Patient, clock};
use dcms_client::schedule::overlaps;

pub const USERNAME: &str = "registrar";
pub const PASSWORD: &str = "correct-horse";
pub const PAGE_SIZE: usize = 2;

#[derive(Default)]
struct Data {
    access: HashSet<String>,
    refresh: HashSet<String>,
    patients: Vec<Patient>,
    doctors: Vec<Doctor>,
    appointments: Vec<Appointment>,
    hits: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockState {
    data: Arc<Mutex<Data>>,
    seq: Arc<AtomicI64>,
    login_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
}

impl MockState {
    fn data(&self) -> std::sync::MutexGuard<'_, Data> {
        self.data.lock().unwrap()
    }

    fn next_id(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn mint(&self, kind: &str) -> String {
        format!("{kind}-{}", self.next_id())
    }
}

pub struct MockServer {
    pub base_url: Url,
    pub state: MockState,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = MockState::default();
        {
            let mut data = state.data();
            data.doctors = vec![
                doctor(1, "Petro", "Ivanenko", "Therapist"),
                doctor(2, "Iryna", "Melnyk", "Orthodontist"),
            ];
        }
        state.seq.store(100, Ordering::SeqCst);

        let app = router(state.clone()).layer(TraceLayer::new_for_http());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}/api")).unwrap(),
            state,
        }
    }

    pub fn login_calls(&self) -> usize {
        self.state.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    /// Authenticated-route hits for `path` (without the `/api` prefix).
    pub fn hits(&self, path: &str) -> usize {
        let full = format!("/api{path}");
        self.state.data().hits.iter().filter(|h| **h == full).count()
    }

    /// Simulate access-token expiry.
    pub fn expire_access_tokens(&self) {
        self.state.data().access.clear();
    }

    /// Simulate the refresh token being blacklisted or expired too.
    pub fn revoke_refresh_tokens(&self) {
        self.state.data().refresh.clear();
    }

    pub fn seed_appointment(&self, appointment: Appointment) {
        self.state.data().appointments.push(appointment);
    }
}

fn doctor(id: i64, first: &str, last: &str, specialization: &str) -> Doctor {
    Doctor {
        id,
        first_name: first.into(),
        last_name: last.into(),
        middle_name: None,
        specialization: specialization.into(),
        phone: None,
        created_at: None,
        updated_at: None,
    }
}

/* -------------------------
   Errors
--------------------------*/

pub enum MockError {
    Unauthorized(&'static str, &'static str),
    NotFound,
    BadRequest(Value),
}

impl MockError {
    fn not_authenticated() -> Self {
        MockError::Unauthorized(
            "not_authenticated",
            "Authentication credentials were not provided.",
        )
    }

    fn token_not_valid() -> Self {
        MockError::Unauthorized("token_not_valid", "Given token not valid for any token type")
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        match self {
            MockError::Unauthorized(code, detail) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": detail, "code": code})),
            )
                .into_response(),
            MockError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
            }
            MockError::BadRequest(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
        }
    }
}

/* -------------------------
   Bearer extraction
--------------------------*/

pub struct AuthContext;

impl FromRequestParts<MockState> for AuthContext {
    type Rejection = MockError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &MockState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            state.data().hits.push(parts.uri.path().to_string());

            // Extract Authorization: Bearer <token>
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| MockError::not_authenticated())?;

            if state.data().access.contains(authz.token()) {
                Ok(AuthContext)
            } else {
                Err(MockError::token_not_valid())
            }
        }
    }
}

/* -------------------------
   Routes
--------------------------*/

fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/refresh/", post(refresh))
        .route("/api/auth/me/", get(me))
        .route("/api/patients/", get(list_patients).post(create_patient))
        .route(
            "/api/patients/{id}/",
            get(get_patient).patch(update_patient).delete(delete_patient),
        )
        .route("/api/doctors/", get(list_doctors).post(create_doctor))
        .route(
            "/api/doctors/{id}/",
            get(get_doctor).patch(update_doctor).delete(delete_doctor),
        )
        .route(
            "/api/appointments/",
            get(list_appointments).post(create_appointment),
        )
        .route("/api/appointments/{id}/", get(get_appointment).patch(update_appointment))
        .route("/api/schedule/", get(schedule))
        .route("/api/reports/daily/", get(daily_report))
        .route("/api/reports/doctor-daily/", get(doctor_daily_report))
        .route("/api/reports/cancelled/", get(cancelled_report))
        .with_state(state)
}

async fn login(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["username"] != USERNAME || body["password"] != PASSWORD {
        return MockError::Unauthorized(
            "no_active_account",
            "No active account found with the given credentials",
        )
        .into_response();
    }
    let access = state.mint("access");
    let refresh = state.mint("refresh");
    {
        let mut data = state.data();
        data.access.insert(access.clone());
        data.refresh.insert(refresh.clone());
    }
    Json(json!({"access": access, "refresh": refresh})).into_response()
}

async fn refresh(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let presented = body["refresh"].as_str().unwrap_or_default();
    if !state.data().refresh.contains(presented) {
        return MockError::Unauthorized("token_not_valid", "Token is invalid or expired")
            .into_response();
    }
    let access = state.mint("access");
    state.data().access.insert(access.clone());
    Json(json!({"access": access})).into_response()
}

async fn me(_auth: AuthContext) -> Json<Value> {
    Json(json!({
        "id": 3,
        "username": USERNAME,
        "first_name": "Olena",
        "last_name": "Koval",
        "email": "olena@clinic.test",
        "roles": ["registrar"]
    }))
}

#[derive(Deserialize)]
struct ListQuery {
    search: Option<String>,
    date: Option<NaiveDate>,
    page: Option<usize>,
}

fn paginate<T: serde::Serialize + Clone>(items: Vec<T>, path: &str, page: Option<usize>) -> Value {
    let page = page.unwrap_or(1).max(1);
    let count = items.len();
    let start = (page - 1) * PAGE_SIZE;
    let results: Vec<T> = items.into_iter().skip(start).take(PAGE_SIZE).collect();
    let next = (start + PAGE_SIZE < count)
        .then(|| format!("http://testserver/api{path}?page={}", page + 1));
    let previous = (page > 1).then(|| format!("http://testserver/api{path}?page={}", page - 1));
    json!({"count": count, "next": next, "previous": previous, "results": results})
}

async fn list_patients(
    State(state): State<MockState>,
    _auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> Json<Value> {
    let needle = q.search.unwrap_or_default().to_lowercase();
    let matches: Vec<Patient> = state
        .data()
        .patients
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.last_name.to_lowercase().contains(&needle)
                || p.first_name.to_lowercase().contains(&needle)
                || p.phone.contains(&needle)
        })
        .cloned()
        .collect();
    Json(paginate(matches, "/patients/", q.page))
}

async fn create_patient(
    State(state): State<MockState>,
    _auth: AuthContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Patient>), MockError> {
    let phone = body["phone"].as_str().unwrap_or_default().to_string();
    if phone.is_empty() {
        return Err(MockError::BadRequest(
            json!({"phone": ["This field is required."]}),
        ));
    }
    if state.data().patients.iter().any(|p| p.phone == phone) {
        return Err(MockError::BadRequest(
            json!({"phone": ["patient with this phone already exists."]}),
        ));
    }
    let patient = Patient {
        id: state.next_id(),
        first_name: body["first_name"].as_str().unwrap_or_default().into(),
        last_name: body["last_name"].as_str().unwrap_or_default().into(),
        middle_name: body["middle_name"].as_str().map(str::to_string),
        phone,
        email: body["email"].as_str().map(str::to_string),
        birth_date: body["birth_date"].as_str().and_then(|d| d.parse().ok()),
        created_at: Some(chrono::Utc::now()),
        updated_at: Some(chrono::Utc::now()),
    };
    state.data().patients.push(patient.clone());
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn get_patient(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<Patient>, MockError> {
    state
        .data()
        .patients
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .map(Json)
        .ok_or(MockError::NotFound)
}

async fn update_patient(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Patient>, MockError> {
    let mut data = state.data();
    let patient = data
        .patients
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(MockError::NotFound)?;
    if let Some(phone) = body["phone"].as_str() {
        patient.phone = phone.to_string();
    }
    if body.get("email").is_some() {
        patient.email = body["email"].as_str().map(str::to_string);
    }
    Ok(Json(patient.clone()))
}

async fn delete_patient(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, MockError> {
    let mut data = state.data();
    let before = data.patients.len();
    data.patients.retain(|p| p.id != id);
    if data.patients.len() == before {
        return Err(MockError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_doctors(State(state): State<MockState>, _auth: AuthContext) -> Json<Value> {
    let doctors = state.data().doctors.clone();
    Json(paginate(doctors, "/doctors/", None))
}

async fn get_doctor(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<Doctor>, MockError> {
    state
        .data()
        .doctors
        .iter()
        .find(|d| d.id == id)
        .cloned()
        .map(Json)
        .ok_or(MockError::NotFound)
}

async fn create_doctor(
    State(state): State<MockState>,
    _auth: AuthContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Doctor>), MockError> {
    let specialization = body["specialization"].as_str().unwrap_or_default();
    if specialization.is_empty() {
        return Err(MockError::BadRequest(
            json!({"specialization": ["This field is required."]}),
        ));
    }
    let mut created = doctor(
        state.next_id(),
        body["first_name"].as_str().unwrap_or_default(),
        body["last_name"].as_str().unwrap_or_default(),
        specialization,
    );
    created.phone = body["phone"].as_str().map(str::to_string);
    state.data().doctors.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_doctor(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Doctor>, MockError> {
    let mut data = state.data();
    let doctor = data
        .doctors
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or(MockError::NotFound)?;
    if let Some(specialization) = body["specialization"].as_str() {
        doctor.specialization = specialization.to_string();
    }
    if body.get("phone").is_some() {
        doctor.phone = body["phone"].as_str().map(str::to_string);
    }
    Ok(Json(doctor.clone()))
}

async fn delete_doctor(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, MockError> {
    let mut data = state.data();
    let before = data.doctors.len();
    data.doctors.retain(|d| d.id != id);
    if data.doctors.len() == before {
        return Err(MockError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_appointments(
    State(state): State<MockState>,
    _auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> Json<Value> {
    let items: Vec<Appointment> = state
        .data()
        .appointments
        .iter()
        .filter(|a| q.date.is_none_or(|d| a.date == d))
        .cloned()
        .collect();
    Json(paginate(items, "/appointments/", q.page))
}

async fn create_appointment(
    State(state): State<MockState>,
    _auth: AuthContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Appointment>), MockError> {
    let field = |name: &str| body[name].as_str().unwrap_or_default().to_string();
    let invalid = |name: &str| MockError::BadRequest(json!({ name: ["Invalid value."] }));

    let date: NaiveDate = field("date").parse().map_err(|_| invalid("date"))?;
    let time_start = clock::parse(&field("time_start")).ok_or_else(|| invalid("time_start"))?;
    let time_end = clock::parse(&field("time_end")).ok_or_else(|| invalid("time_end"))?;
    let doctor = body["doctor"].as_i64().ok_or_else(|| invalid("doctor"))?;
    let patient = body["patient"].as_i64().ok_or_else(|| invalid("patient"))?;

    let mut data = state.data();
    let clash = data.appointments.iter().any(|a| {
        a.status != 3
            && a.doctor == doctor
            && a.date == date
            && overlaps((a.time_start, a.time_end), (time_start, time_end))
    });
    if clash {
        return Err(MockError::BadRequest(json!({
            "non_field_errors": ["Doctor already has an overlapping appointment in this slot"]
        })));
    }

    let status = body["status"].as_i64().unwrap_or(1);
    let appointment = Appointment {
        id: state.next_id(),
        patient,
        patient_name: None,
        doctor,
        doctor_name: None,
        date,
        time_start,
        time_end,
        status,
        status_code: Some(status_code(status).into()),
        status_name: None,
        note: body["note"].as_str().map(str::to_string),
        created_at: Some(chrono::Utc::now()),
    };
    data.appointments.push(appointment.clone());
    Ok((StatusCode::CREATED, Json(appointment)))
}

fn status_code(status: i64) -> &'static str {
    match status {
        2 => "completed",
        3 => "cancelled",
        _ => "planned",
    }
}

async fn get_appointment(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<Appointment>, MockError> {
    state
        .data()
        .appointments
        .iter()
        .find(|a| a.id == id)
        .cloned()
        .map(Json)
        .ok_or(MockError::NotFound)
}

async fn update_appointment(
    State(state): State<MockState>,
    _auth: AuthContext,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Appointment>, MockError> {
    let mut data = state.data();
    let appointment = data
        .appointments
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or(MockError::NotFound)?;
    if let Some(status) = body["status"].as_i64() {
        appointment.status = status;
        appointment.status_code = Some(status_code(status).into());
    }
    Ok(Json(appointment.clone()))
}

#[derive(Deserialize)]
struct DayQuery {
    date: Option<String>,
    doctor_id: Option<i64>,
}

fn require_date(q: &DayQuery) -> Result<NaiveDate, MockError> {
    let raw = q
        .date
        .as_deref()
        .ok_or_else(|| MockError::BadRequest(json!({"date": "date is required"})))?;
    raw.parse()
        .map_err(|_| MockError::BadRequest(json!({"date": "invalid date"})))
}

fn day_items(state: &MockState, date: NaiveDate, doctor_id: Option<i64>) -> Vec<Appointment> {
    state
        .data()
        .appointments
        .iter()
        .filter(|a| a.date == date && doctor_id.is_none_or(|d| a.doctor == d))
        .cloned()
        .collect()
}

async fn schedule(
    State(state): State<MockState>,
    _auth: AuthContext,
    Query(q): Query<DayQuery>,
) -> Result<Json<Vec<Appointment>>, MockError> {
    let date = require_date(&q)?;
    Ok(Json(day_items(&state, date, q.doctor_id)))
}

async fn daily_report(
    State(state): State<MockState>,
    _auth: AuthContext,
    Query(q): Query<DayQuery>,
) -> Result<Json<Value>, MockError> {
    let date = require_date(&q)?;
    Ok(Json(report_body(day_items(&state, date, None))))
}

async fn doctor_daily_report(
    State(state): State<MockState>,
    _auth: AuthContext,
    Query(q): Query<DayQuery>,
) -> Result<Json<Value>, MockError> {
    let date = require_date(&q)?;
    let doctor_id = q
        .doctor_id
        .ok_or_else(|| MockError::BadRequest(json!({"doctor_id": "doctor_id is required"})))?;
    Ok(Json(report_body(day_items(&state, date, Some(doctor_id)))))
}

fn report_body(items: Vec<Appointment>) -> Value {
    let mut totals: Vec<Value> = Vec::new();
    for code in ["planned", "completed", "cancelled"] {
        let count = items
            .iter()
            .filter(|a| a.status_code.as_deref() == Some(code))
            .count();
        if count > 0 {
            totals.push(json!({"status__code": code, "count": count}));
        }
    }
    json!({"items": items, "totals": totals})
}

async fn cancelled_report(
    State(state): State<MockState>,
    _auth: AuthContext,
    Query(q): Query<DayQuery>,
) -> Result<Json<Value>, MockError> {
    let date = require_date(&q)?;
    let items: Vec<Appointment> = day_items(&state, date, None)
        .into_iter()
        .filter(|a| a.status == 3)
        .collect();
    let count = items.len();
    Ok(Json(json!({"items": items, "count": count})))
}
