//! Typed wrappers over the clinic API resources.

mod appointment_api;
mod auth_api;
mod doctor_api;
mod patient_api;
mod report_api;

pub use appointment_api::AppointmentApi;
pub use auth_api::{AuthApi, SessionStatus};
pub use doctor_api::DoctorApi;
pub use patient_api::PatientApi;
pub use report_api::ReportApi;

/// Detail path for a resource: `/patients/` + 5 -> `/patients/5/`.
pub(crate) fn item_path(collection: &str, id: i64) -> String {
    format!("{collection}{id}/")
}
