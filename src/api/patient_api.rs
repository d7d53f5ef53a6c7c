use crate::api::item_path;
use crate::client::DcmsClient;
use crate::error::ClientResult;
use crate::models::{NewPatient, Page, Patient, PatientPatch};
use crate::transport::RequestSpec;

pub const PATIENTS_PATH: &str = "/patients/";

pub struct PatientApi<'a> {
    client: &'a DcmsClient,
}

impl<'a> PatientApi<'a> {
    pub(crate) fn new(client: &'a DcmsClient) -> Self {
        Self { client }
    }

    /// Search matches last/first/middle name and phone on the server.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: Option<u32>,
    ) -> ClientResult<Page<Patient>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let spec = RequestSpec::get(PATIENTS_PATH)
            .query_opt("search", search)
            .query_opt("page", page);
        self.client.fetch(spec).await
    }

    pub async fn get(&self, id: i64) -> ClientResult<Patient> {
        self.client
            .fetch(RequestSpec::get(item_path(PATIENTS_PATH, id)))
            .await
    }

    pub async fn create(&self, patient: &NewPatient) -> ClientResult<Patient> {
        let spec = RequestSpec::post(PATIENTS_PATH).json(patient)?;
        let created: Patient = self.client.fetch(spec).await?;
        tracing::info!(patient_id = created.id, "Patient created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, patch: &PatientPatch) -> ClientResult<Patient> {
        let spec = RequestSpec::patch(item_path(PATIENTS_PATH, id)).json(patch)?;
        self.client.fetch(spec).await
    }

    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        self.client
            .execute(RequestSpec::delete(item_path(PATIENTS_PATH, id)))
            .await?;
        tracing::info!(patient_id = id, "Patient deleted");
        Ok(())
    }
}
