use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/* -------------------------
   Auth DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    /// Present only when the server rotates refresh tokens.
    #[serde(default)]
    pub refresh: Option<String>,
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_REGISTRAR: &str = "registrar";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Group names on the server side.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.last_name, self.first_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Create, edit and delete appointments.
    pub fn can_manage_appointments(&self) -> bool {
        self.is_admin() || self.has_role(ROLE_REGISTRAR)
    }

    /// The doctor roster is admin-only beyond read access.
    pub fn can_manage_doctors(&self) -> bool {
        self.is_admin()
    }
}

/* -------------------------
   Pagination
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/* -------------------------
   Patients
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

/// PATCH body. Outer `None` leaves a field alone; `Some(None)` sends `null`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,
}

/* -------------------------
   Doctors
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub specialization: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDoctor {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub specialization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
}

/* -------------------------
   Appointments
--------------------------*/

/// Status rows seeded on the server; ids are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Planned,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn id(self) -> i64 {
        match self {
            AppointmentStatus::Planned => 1,
            AppointmentStatus::Completed => 2,
            AppointmentStatus::Cancelled => 3,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            AppointmentStatus::Planned => "planned",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "planned" => Some(AppointmentStatus::Planned),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(AppointmentStatus::Planned),
            2 => Some(AppointmentStatus::Completed),
            3 => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient: i64,
    #[serde(default)]
    pub patient_name: Option<String>,
    pub doctor: i64,
    #[serde(default)]
    pub doctor_name: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "clock")]
    pub time_start: NaiveTime,
    #[serde(with = "clock")]
    pub time_end: NaiveTime,
    pub status: i64,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn status(&self) -> Option<AppointmentStatus> {
        self.status_code
            .as_deref()
            .and_then(AppointmentStatus::from_code)
            .or_else(|| AppointmentStatus::from_id(self.status))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient: i64,
    pub doctor: i64,
    pub date: NaiveDate,
    #[serde(with = "clock")]
    pub time_start: NaiveTime,
    #[serde(with = "clock")]
    pub time_end: NaiveTime,
    /// Server defaults to "planned" when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", with = "clock::option")]
    pub time_start: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none", with = "clock::option")]
    pub time_end: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status.id()),
            ..Self::default()
        }
    }
}

/* -------------------------
   Reports
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTotal {
    #[serde(rename = "status__code")]
    pub status_code: String,
    pub count: u64,
}

/// `/reports/daily/` and `/reports/doctor-daily/` share this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub items: Vec<Appointment>,
    pub totals: Vec<StatusTotal>,
}

impl DailyReport {
    pub fn total_for(&self, status: AppointmentStatus) -> u64 {
        self.totals
            .iter()
            .filter(|t| t.status_code == status.code())
            .map(|t| t.count)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledReport {
    pub items: Vec<Appointment>,
    pub count: u64,
}

/// Wall-clock times on the wire: read `HH:MM` or `HH:MM:SS`, write `HH:MM`.
pub mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, FORMAT))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time: {raw}")))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => super::serialize(t, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
