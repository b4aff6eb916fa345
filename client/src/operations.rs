//! Administrative and maintenance channels.
//!
//! `ServerOperations` works at server scope (provisioning databases);
//! `MaintenanceOperations` is bound to a single database and exposes the
//! statistics and index-error queries the test driver polls.

use errors::ClientError;

use crate::Result;
use crate::models::{DatabaseRecord, DatabaseStatistics, IndexErrors};
use crate::session::check_status;

/// Server-scoped administrative operations.
#[derive(Clone)]
pub struct ServerOperations {
    http: reqwest::Client,
    base_url: String,
}

impl ServerOperations {
    pub(crate) fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    pub async fn create_database(&self, record: &DatabaseRecord) -> Result<()> {
        let url = format!("{}/admin/databases", self.base_url);
        let resp = self.http.put(&url).json(record).send().await?;
        check_status(resp).await?;
        tracing::debug!("Created database {}", record.database_name);
        Ok(())
    }

    /// Drop a database. A missing database maps to
    /// [`ClientError::DatabaseDoesNotExist`]; everything else non-2xx is a
    /// server error.
    pub async fn delete_database(&self, database: &str, hard_delete: bool) -> Result<()> {
        let url = format!("{}/admin/databases", self.base_url);
        let body = serde_json::json!({
            "DatabaseNames": [database],
            "HardDelete": hard_delete,
        });
        let resp = self.http.delete(&url).json(&body).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::DatabaseDoesNotExist {
                database: database.to_string(),
            });
        }
        check_status(resp).await?;
        tracing::debug!("Deleted database {database}");
        Ok(())
    }
}

/// Maintenance operations scoped to one database.
#[derive(Clone)]
pub struct MaintenanceOperations {
    http: reqwest::Client,
    base_url: String,
    database: String,
}

#[derive(Debug, serde::Deserialize)]
struct IndexErrorsResponse {
    #[serde(rename = "Results", default)]
    results: Vec<IndexErrors>,
}

impl MaintenanceOperations {
    pub(crate) fn new(http: reqwest::Client, base_url: String, database: String) -> Self {
        Self {
            http,
            base_url,
            database,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub async fn get_statistics(&self) -> Result<DatabaseStatistics> {
        let url = format!("{}/databases/{}/stats", self.base_url, self.database);
        let resp = self.http.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::DatabaseDoesNotExist {
                database: self.database.clone(),
            });
        }
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn get_index_errors(&self) -> Result<Vec<IndexErrors>> {
        let url = format!(
            "{}/databases/{}/indexes/errors",
            self.base_url, self.database
        );
        let resp = self.http.get(&url).send().await?;
        let resp = check_status(resp).await?;
        let body: IndexErrorsResponse = resp.json().await?;
        Ok(body.results)
    }
}
