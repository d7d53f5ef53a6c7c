use chrono::NaiveDate;

use crate::client::DcmsClient;
use crate::error::ClientResult;
use crate::models::{CancelledReport, DailyReport};
use crate::transport::RequestSpec;

pub const DAILY_PATH: &str = "/reports/daily/";
pub const DOCTOR_DAILY_PATH: &str = "/reports/doctor-daily/";
pub const CANCELLED_PATH: &str = "/reports/cancelled/";

pub struct ReportApi<'a> {
    client: &'a DcmsClient,
}

impl<'a> ReportApi<'a> {
    pub(crate) fn new(client: &'a DcmsClient) -> Self {
        Self { client }
    }

    pub async fn daily(&self, date: NaiveDate) -> ClientResult<DailyReport> {
        self.client
            .fetch(RequestSpec::get(DAILY_PATH).query("date", date))
            .await
    }

    pub async fn doctor_daily(&self, date: NaiveDate, doctor_id: i64) -> ClientResult<DailyReport> {
        let spec = RequestSpec::get(DOCTOR_DAILY_PATH)
            .query("date", date)
            .query("doctor_id", doctor_id);
        self.client.fetch(spec).await
    }

    pub async fn cancelled(&self, date: NaiveDate) -> ClientResult<CancelledReport> {
        self.client
            .fetch(RequestSpec::get(CANCELLED_PATH).query("date", date))
            .await
    }
}
