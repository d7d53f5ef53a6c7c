use chrono::NaiveDate;

use crate::api::item_path;
use crate::client::DcmsClient;
use crate::error::ClientResult;
use crate::models::{Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, Page};
use crate::schedule::validate_slot;
use crate::transport::RequestSpec;

pub const APPOINTMENTS_PATH: &str = "/appointments/";
pub const SCHEDULE_PATH: &str = "/schedule/";

pub struct AppointmentApi<'a> {
    client: &'a DcmsClient,
}

impl<'a> AppointmentApi<'a> {
    pub(crate) fn new(client: &'a DcmsClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        date: Option<NaiveDate>,
        page: Option<u32>,
    ) -> ClientResult<Page<Appointment>> {
        let spec = RequestSpec::get(APPOINTMENTS_PATH)
            .query_opt("date", date)
            .query_opt("page", page);
        self.client.fetch(spec).await
    }

    pub async fn get(&self, id: i64) -> ClientResult<Appointment> {
        self.client
            .fetch(RequestSpec::get(item_path(APPOINTMENTS_PATH, id)))
            .await
    }

    /// Slots that end before they start are refused locally; overlap with
    /// other bookings is the server's call.
    pub async fn create(&self, appointment: &NewAppointment) -> ClientResult<Appointment> {
        validate_slot(appointment.time_start, appointment.time_end)?;
        let spec = RequestSpec::post(APPOINTMENTS_PATH).json(appointment)?;
        let created: Appointment = self.client.fetch(spec).await?;
        tracing::info!(
            appointment_id = created.id,
            doctor = created.doctor,
            date = %created.date,
            "Appointment booked"
        );
        Ok(created)
    }

    pub async fn update(&self, id: i64, patch: &AppointmentPatch) -> ClientResult<Appointment> {
        if let (Some(start), Some(end)) = (patch.time_start, patch.time_end) {
            validate_slot(start, end)?;
        }
        let spec = RequestSpec::patch(item_path(APPOINTMENTS_PATH, id)).json(patch)?;
        self.client.fetch(spec).await
    }

    pub async fn set_status(
        &self,
        id: i64,
        status: AppointmentStatus,
    ) -> ClientResult<Appointment> {
        self.update(id, &AppointmentPatch::status(status)).await
    }

    pub async fn cancel(&self, id: i64) -> ClientResult<Appointment> {
        self.set_status(id, AppointmentStatus::Cancelled).await
    }

    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        self.client
            .execute(RequestSpec::delete(item_path(APPOINTMENTS_PATH, id)))
            .await
    }

    /// Flat (unpaginated) list of a day's appointments, optionally for one doctor.
    pub async fn schedule(
        &self,
        date: Option<NaiveDate>,
        doctor_id: Option<i64>,
    ) -> ClientResult<Vec<Appointment>> {
        let spec = RequestSpec::get(SCHEDULE_PATH)
            .query_opt("date", date)
            .query_opt("doctor_id", doctor_id);
        self.client.fetch(spec).await
    }
}
