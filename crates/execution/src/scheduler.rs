//! Cross-tenant due-campaign sweep. Each tick iterates kept
//! organizations, applies the due predicate within the tenant, prepares
//! every due campaign, and carries recurring campaigns forward.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crm_core::types::Campaign;
use crm_store::CrmStore;

use crate::delivery::DeliverySink;
use crate::orchestrator::CampaignExecutor;
use crate::recurrence::ScheduleEngine;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub organizations: usize,
    pub due: usize,
    pub prepared: usize,
    pub failed: usize,
    pub cloned: usize,
}

pub struct CampaignScheduler {
    store: Arc<CrmStore>,
    executor: CampaignExecutor,
}

impl CampaignScheduler {
    pub fn new(store: Arc<CrmStore>, delivery: Arc<dyn DeliverySink>) -> Self {
        let executor = CampaignExecutor::new(Arc::clone(&store), delivery);
        Self { store, executor }
    }

    /// One sweep across all tenants. Failures are logged and counted;
    /// one campaign's failure never stops the rest of the sweep.
    pub fn run_tick(&self, now: DateTime<Utc>) -> SweepSummary {
        info!("campaign scheduler: checking for due campaigns");
        let mut summary = SweepSummary::default();

        for organization in self.store.organizations() {
            summary.organizations += 1;
            let due = ScheduleEngine::due_for_execution(&self.store, organization.id, now);
            summary.due += due.len();

            for campaign in due {
                info!(
                    organization_id = %organization.id,
                    campaign_id = %campaign.id,
                    name = %campaign.name,
                    "campaign scheduler: preparing campaign"
                );
                match self.executor.prepare(organization.id, campaign.id) {
                    Ok(_) => {
                        summary.prepared += 1;
                        if campaign.is_recurring() && self.schedule_next(&campaign, now) {
                            summary.cloned += 1;
                        }
                    }
                    Err(err) => {
                        summary.failed += 1;
                        error!(
                            campaign_id = %campaign.id,
                            cause = %err,
                            "campaign scheduler: failed to prepare campaign"
                        );
                    }
                }
            }
        }

        info!(
            organizations = summary.organizations,
            due = summary.due,
            prepared = summary.prepared,
            failed = summary.failed,
            cloned = summary.cloned,
            "campaign scheduler: sweep completed"
        );
        summary
    }

    /// Persists the next occurrence of a recurring campaign that just
    /// prepared successfully, re-attaching the same audience set.
    fn schedule_next(&self, campaign: &Campaign, now: DateTime<Utc>) -> bool {
        let Some(draft) = ScheduleEngine::next_occurrence(campaign, now) else {
            info!(campaign_id = %campaign.id, "recurrence complete, no further occurrences");
            return false;
        };
        match self.store.insert_next_occurrence(campaign.id, draft) {
            Ok(_) => true,
            Err(err) => {
                error!(
                    campaign_id = %campaign.id,
                    cause = %err,
                    "failed to schedule next occurrence"
                );
                false
            }
        }
    }

    /// In-process periodic sweep for deployments without an external
    /// trigger.
    pub async fn run(&self, tick: std::time::Duration) {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            self.run_tick(Utc::now());
        }
    }
}
