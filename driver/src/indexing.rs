//! Indexing-readiness waiter.

use std::time::{Duration, Instant};

use client::{DocumentStore, IndexErrors, IndexState, SIDE_BY_SIDE_INDEX_PREFIX};
use errors::DriverError;

use crate::Result;
use crate::driver::TestDriver;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

impl TestDriver {
    /// Poll database statistics until every eligible index is non-stale.
    ///
    /// Eligible means not disabled and not a side-by-side replacement.
    /// An index in the error state breaks the wait immediately; on break or
    /// timeout the raised error enumerates each failing index with its
    /// recorded errors (a plain timeout lists none).
    pub async fn wait_for_indexing(
        store: &DocumentStore,
        database: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let admin = match database {
            Some(database) => store.maintenance_for(database)?,
            None => store.maintenance()?,
        };

        let start = Instant::now();
        while start.elapsed() < timeout {
            let stats = admin.get_statistics().await?;

            let ready = stats
                .indexes
                .iter()
                .filter(|index| {
                    index.state != IndexState::Disabled
                        && !index.name.starts_with(SIDE_BY_SIDE_INDEX_PREFIX)
                })
                .all(|index| !index.is_stale);
            if ready {
                return Ok(());
            }

            if stats
                .indexes
                .iter()
                .any(|index| index.state == IndexState::Error)
            {
                break;
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let errors = admin.get_index_errors().await?;
        Err(DriverError::IndexesStaleTimeout {
            seconds: timeout.as_secs(),
            details: format_index_errors(&errors),
        })
    }
}

fn format_index_errors(errors: &[IndexErrors]) -> String {
    errors
        .iter()
        .map(|index_errors| {
            let mut text = format!(
                "Index {} ({} errors):\n",
                index_errors.name,
                index_errors.errors.len()
            );
            for error in &index_errors.errors {
                text.push_str(&format!("-{error}\n"));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n")
}
