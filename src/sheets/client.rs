use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::{json, Value};

use super::{ReportSink, ServiceAccount, SheetsError};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// One tab of a Google spreadsheet, written through the Sheets v4 values API.
#[derive(Clone)]
pub struct GoogleSheet {
    http: Client,
    auth: Arc<ServiceAccount>,
    spreadsheet_id: String,
    tab: String,
}

impl GoogleSheet {
    pub fn new(
        http: Client,
        auth: Arc<ServiceAccount>,
        spreadsheet_id: impl Into<String>,
        tab: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            tab: tab.into(),
        }
    }

    /// `.../v4/spreadsheets/{id}/values/{range}{suffix}` with each segment
    /// percent-encoded.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SheetsError> {
        let target = format!("{range}{suffix}");
        let mut url = Url::parse(SHEETS_API_BASE)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                target.as_str(),
            ]);
        Ok(url)
    }
}

#[async_trait]
impl ReportSink for GoogleSheet {
    async fn clear(&self) -> Result<(), SheetsError> {
        let url = self.values_url(&a1_range(&self.tab, None), ":clear")?;
        let token = self.auth.access_token().await?;

        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        check_status(resp).await?;

        tracing::debug!(tab = %self.tab, "Cleared sheet");
        Ok(())
    }

    async fn write_rows(&self, start_cell: &str, rows: &[Vec<Value>]) -> Result<(), SheetsError> {
        let range = a1_range(&self.tab, Some(start_cell));
        let mut url = self.values_url(&range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let token = self.auth.access_token().await?;

        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });

        let resp = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(resp).await?;

        tracing::debug!(tab = %self.tab, start_cell, rows = rows.len(), "Wrote rows to sheet");
        Ok(())
    }
}

async fn check_status(resp: Response) -> Result<Response, SheetsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SheetsError::Api {
        status: status.as_u16(),
        body,
    })
}

/// A1 range for a tab, quoting the tab name so spaces and punctuation
/// survive: `'My Tab'!A2`.
pub fn a1_range(tab: &str, cell: Option<&str>) -> String {
    let quoted = format!("'{}'", tab.replace('\'', "''"));
    match cell {
        Some(cell) => format!("{quoted}!{cell}"),
        None => quoted,
    }
}
