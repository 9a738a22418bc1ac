//! Bulk operation resolver
//!
//! An egress cell created through ERS materializes asynchronously: the
//! notification only carries a bulk operation id, and the concrete cell id
//! appears once the bulk operation reports SUCCESS. The poller queries the
//! bulk status on a fixed interval until then.

use crate::error::{Result, SgaclSyncError};
use crate::ers::{ErsApi, BULK_STATUS_SUCCESS};
use crate::types::{BulkOperationId, ResourceId};
use std::time::Duration;
use tracing::debug;

/// Fixed-interval poller for ERS bulk operations.
///
/// `max_attempts: None` polls forever, which matches the historical
/// behavior of waiting out the ERS API indefinitely. Deployments that
/// prefer a bound get [`SgaclSyncError::PollExhausted`] on expiry.
#[derive(Debug, Clone)]
pub struct BulkPoller {
    poll_interval: Duration,
    max_attempts: Option<u32>,
}

impl BulkPoller {
    pub fn new(poll_interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    /// Polls the bulk operation until its first resource entry reports
    /// SUCCESS, then returns that entry's resource id.
    ///
    /// Transport failures and malformed envelopes propagate immediately;
    /// only a non-SUCCESS status is worth waiting on.
    pub async fn resolve(&self, api: &dyn ErsApi, bulk_id: &BulkOperationId) -> Result<ResourceId> {
        let mut attempts: u32 = 0;

        loop {
            let status = api.bulk_status(bulk_id).await?;
            let entry = status
                .resources_status
                .first()
                .ok_or(SgaclSyncError::Envelope {
                    resource: "BulkStatus",
                    detail: "empty resourcesStatus list".to_string(),
                })?;

            if entry.status == BULK_STATUS_SUCCESS {
                return Ok(ResourceId::new(entry.id.clone()));
            }

            attempts = attempts.saturating_add(1);
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(SgaclSyncError::PollExhausted { attempts });
                }
            }

            debug!(
                bulk_id = %bulk_id,
                status = %entry.status,
                attempts,
                "Bulk operation not complete, polling again"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
