//! SgaclSync - Core policy sync pipeline
//!
//! Drives one notification through classify → bulk resolve → expand →
//! synthesize → trigger. Every failure is event-scoped: the listener loop
//! logs it and keeps serving.

use crate::classifier;
use crate::config::Config;
use crate::error::Result;
use crate::ers::{ErsApi, ErsClient};
use crate::expander;
use crate::resolver::BulkPoller;
use crate::synthesizer;
use crate::trigger::AutomationTrigger;
use crate::types::{BulkOperationId, RunOutcome};
use std::net::IpAddr;
use tracing::{info, instrument, warn};

/// Policy sync pipeline, shared across all in-flight events.
///
/// The trigger serializes extravars access internally; everything else in
/// the pipeline is per-event and can overlap freely.
pub struct SgaclSync {
    config: Config,
    poller: BulkPoller,
    trigger: AutomationTrigger,
}

impl SgaclSync {
    pub fn new(config: Config) -> Self {
        let poller = BulkPoller::new(config.poll_interval(), config.ers.max_poll_attempts);
        let trigger = AutomationTrigger::new(&config.automation);
        Self {
            config,
            poller,
            trigger,
        }
    }

    /// Test constructor with an injected trigger.
    pub fn with_trigger(config: Config, trigger: AutomationTrigger) -> Self {
        let poller = BulkPoller::new(config.poll_interval(), config.ers.max_poll_attempts);
        Self {
            config,
            poller,
            trigger,
        }
    }

    /// Handles one inbound syslog payload.
    ///
    /// Returns `Ok(None)` for the expected high volume of non-matching
    /// traffic (and for senders outside the allowlist), `Ok(Some(outcome))`
    /// once a matched event has run the playbook.
    #[instrument(skip(self, payload), fields(instance = %peer))]
    pub async fn handle_notification(
        &self,
        payload: &str,
        peer: IpAddr,
    ) -> Result<Option<RunOutcome>> {
        let Some(bulk_id) = classifier::classify(payload) else {
            return Ok(None);
        };

        if !self.config.instance_allowed(peer) {
            warn!(%bulk_id, "Dropping egress cell notification from disallowed sender");
            return Ok(None);
        }

        info!(%bulk_id, "Egress matrix cell change notification received");

        let api = ErsClient::new(peer, &self.config)?;
        let outcome = self.run_pipeline(&api, &bulk_id).await?;
        Ok(Some(outcome))
    }

    /// Resolution half of the pipeline, driven by any [`ErsApi`].
    pub async fn run_pipeline(
        &self,
        api: &dyn ErsApi,
        bulk_id: &BulkOperationId,
    ) -> Result<RunOutcome> {
        let cell_id = self.poller.resolve(api, bulk_id).await?;
        let policy = expander::expand(api, &cell_id).await?;
        let acl = synthesizer::synthesize(&policy);

        info!(
            acl = %acl.name,
            entries = acl.entries.len(),
            "Synthesized ASA access list"
        );

        self.trigger.trigger(&acl).await
    }
}
