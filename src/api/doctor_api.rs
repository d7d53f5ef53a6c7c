use crate::api::item_path;
use crate::client::DcmsClient;
use crate::error::ClientResult;
use crate::models::{Doctor, DoctorPatch, NewDoctor, Page};
use crate::transport::RequestSpec;

pub const DOCTORS_PATH: &str = "/doctors/";

/// Doctor roster. Reads are open to any signed-in user; writes need admin.
pub struct DoctorApi<'a> {
    client: &'a DcmsClient,
}

impl<'a> DoctorApi<'a> {
    pub(crate) fn new(client: &'a DcmsClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> ClientResult<Page<Doctor>> {
        self.client.fetch(RequestSpec::get(DOCTORS_PATH)).await
    }

    pub async fn get(&self, id: i64) -> ClientResult<Doctor> {
        self.client
            .fetch(RequestSpec::get(item_path(DOCTORS_PATH, id)))
            .await
    }

    pub async fn create(&self, doctor: &NewDoctor) -> ClientResult<Doctor> {
        let spec = RequestSpec::post(DOCTORS_PATH).json(doctor)?;
        self.client.fetch(spec).await
    }

    pub async fn update(&self, id: i64, patch: &DoctorPatch) -> ClientResult<Doctor> {
        let spec = RequestSpec::patch(item_path(DOCTORS_PATH, id)).json(patch)?;
        self.client.fetch(spec).await
    }

    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        self.client
            .execute(RequestSpec::delete(item_path(DOCTORS_PATH, id)))
            .await
    }
}
