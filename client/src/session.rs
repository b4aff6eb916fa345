//! Sessions: unit-of-work over one database.
//!
//! `load` goes to the server immediately; `store` and `delete` queue
//! commands that `save_changes` flushes as a single `bulk_docs` batch.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use errors::ClientError;

use crate::Result;

#[derive(Debug, Clone)]
enum SessionCommand {
    Put { id: String, document: Value },
    Delete { id: String },
}

pub struct DocumentSession {
    http: reqwest::Client,
    base_url: String,
    database: String,
    pending: Vec<SessionCommand>,
}

#[derive(Debug, serde::Deserialize)]
struct GetDocumentsResponse {
    #[serde(rename = "Results", default)]
    results: Vec<Value>,
}

impl DocumentSession {
    pub(crate) fn new(http: reqwest::Client, base_url: String, database: String) -> Self {
        Self {
            http,
            base_url,
            database,
            pending: Vec::new(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Fetch a document by id. Returns `Ok(None)` when the document does not
    /// exist.
    pub async fn load<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        let url = format!(
            "{}/databases/{}/docs?id={}",
            self.base_url,
            self.database,
            urlencoding::encode(id)
        );
        let resp = self.http.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        let body: GetDocumentsResponse = resp.json().await?;
        match body.results.into_iter().next() {
            None | Some(Value::Null) => Ok(None),
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
        }
    }

    /// Queue a document write under `id`. Sent on `save_changes`.
    pub fn store<T: Serialize>(&mut self, entity: &T, id: &str) -> Result<()> {
        let document = serde_json::to_value(entity)?;
        self.pending.push(SessionCommand::Put {
            id: id.to_string(),
            document,
        });
        Ok(())
    }

    /// Queue a document deletion. Sent on `save_changes`.
    pub fn delete(&mut self, id: &str) {
        self.pending.push(SessionCommand::Delete { id: id.to_string() });
    }

    /// Flush queued commands as one batch. A session with nothing pending is
    /// a no-op.
    pub async fn save_changes(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let commands: Vec<Value> = self
            .pending
            .iter()
            .map(|command| match command {
                SessionCommand::Put { id, document } => serde_json::json!({
                    "Id": id,
                    "Type": "PUT",
                    "Document": document,
                }),
                SessionCommand::Delete { id } => serde_json::json!({
                    "Id": id,
                    "Type": "DELETE",
                }),
            })
            .collect();

        let url = format!("{}/databases/{}/bulk_docs", self.base_url, self.database);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "Commands": commands }))
            .send()
            .await?;
        check_status(resp).await?;
        self.pending.clear();
        Ok(())
    }
}

pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let details = resp.text().await.unwrap_or_default();
    Err(ClientError::ServerError {
        status: status.as_u16(),
        details,
    })
}
