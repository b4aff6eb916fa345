//! Interactive debug wait: park the test while a human pokes at the studio.

use std::time::Duration;

use client::DocumentStore;
use errors::ClientError;

use crate::Result;
use crate::driver::TestDriver;

/// Document the human stores (through the studio) to resume the test.
const SENTINEL_DOCUMENT_ID: &str = "Debug/Done";

const POLL_INTERVAL: Duration = Duration::from_millis(500);

impl TestDriver {
    /// Open the studio on the store's database and block until a
    /// `Debug/Done` document shows up there. Manual-debugging aid only; has
    /// no timeout by design.
    pub async fn wait_for_user_to_continue_the_test(store: &DocumentStore) -> Result<()> {
        let database = store.database().ok_or_else(|| ClientError::InvalidState {
            reason: "store has no database to open the studio on".to_string(),
        })?;
        let documents_page = format!(
            "{}/studio/index.html#databases/documents?&database={}&withStop=true",
            store.urls()[0],
            urlencoding::encode(database)
        );
        open_browser(&documents_page);

        wait_for_sentinel(store).await
    }
}

async fn wait_for_sentinel(store: &DocumentStore) -> Result<()> {
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let session = store.open_session()?;
        if session
            .load::<serde_json::Value>(SENTINEL_DOCUMENT_ID)
            .await?
            .is_some()
        {
            return Ok(());
        }
    }
}

fn open_browser(url: &str) {
    tracing::info!("Waiting for user to continue the test: {url}");

    #[cfg(target_os = "macos")]
    let command = ("open", vec![url]);
    #[cfg(target_os = "windows")]
    let command = ("cmd", vec!["/C", "start", url]);
    #[cfg(all(unix, not(target_os = "macos")))]
    let command = ("xdg-open", vec![url]);

    let result = std::process::Command::new(command.0)
        .args(&command.1)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn();
    if let Err(e) = result {
        tracing::warn!("Failed to open browser for {url}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sentinel_polling_resumes_once_the_document_exists() {
        let mock = MockServer::start().await;
        // Missing twice, then present.
        Mock::given(method("GET"))
            .and(path("/databases/db1/docs"))
            .and(query_param("id", SENTINEL_DOCUMENT_ID))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(2)
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/databases/db1/docs"))
            .and(query_param("id", SENTINEL_DOCUMENT_ID))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "Results": [ {} ] })),
            )
            .mount(&mock)
            .await;

        let mut store = DocumentStore::single_node(mock.uri(), Some("db1".to_string()));
        store.initialize().unwrap();

        tokio::time::timeout(Duration::from_secs(10), wait_for_sentinel(&store))
            .await
            .expect("sentinel wait should finish")
            .unwrap();
    }
}
