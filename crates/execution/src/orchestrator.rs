//! Campaign preparation: readiness gate, transactional materialization
//! of per-contact email records, and handoff to the delivery stage.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crm_core::error::{CrmError, CrmResult};
use crm_core::types::{Campaign, CampaignEmail, CampaignStatus, EmailStatus};
use crm_store::CrmStore;
use crm_targeting::ContactAggregator;

use crate::delivery::DeliverySink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub campaign_id: Uuid,
    pub total_contacts: u64,
}

pub struct CampaignExecutor {
    store: Arc<CrmStore>,
    aggregator: ContactAggregator,
    delivery: Arc<dyn DeliverySink>,
}

impl CampaignExecutor {
    pub fn new(store: Arc<CrmStore>, delivery: Arc<dyn DeliverySink>) -> Self {
        let aggregator = ContactAggregator::new(Arc::clone(&store));
        Self {
            store,
            aggregator,
            delivery,
        }
    }

    /// Readiness gate: a campaign is executable only while still in
    /// `created` status with at least one kept audience attached and a
    /// kept template. A template that was soft-deleted after the
    /// campaign was saved fails this check.
    pub fn can_execute(&self, campaign: &Campaign) -> bool {
        if campaign.status != CampaignStatus::Created {
            return false;
        }
        if self.store.audiences_for_campaign(campaign.id).is_empty() {
            return false;
        }
        campaign
            .email_template_id
            .map(|id| self.store.get_template(campaign.organization_id, id).is_some())
            .unwrap_or(false)
    }

    /// Prepares a campaign for delivery.
    ///
    /// On a failed precondition nothing changes and the campaign stays
    /// `created`. Once past the gate, all email rows, the statistic
    /// row, and the `created → running` flip commit atomically; any
    /// failure rolls the whole commit back, downgrades the campaign to
    /// `failed` outside the transaction, and surfaces the cause. On
    /// success the campaign id is handed to the delivery sink.
    pub fn prepare(&self, organization_id: Uuid, campaign_id: Uuid) -> CrmResult<PrepareReport> {
        let campaign = self
            .store
            .get_campaign(organization_id, campaign_id)
            .ok_or_else(|| CrmError::NotFound(format!("campaign {}", campaign_id)))?;

        if !self.can_execute(&campaign) {
            return Err(CrmError::Precondition(format!(
                "campaign {} is not executable: requires created status, at least one audience, and a template",
                campaign_id
            )));
        }

        match self.stage_and_commit(&campaign) {
            Ok(report) => {
                info!(
                    campaign_id = %campaign_id,
                    total_contacts = report.total_contacts,
                    "campaign preparation succeeded"
                );
                self.delivery.enqueue(campaign_id);
                Ok(report)
            }
            Err(err) => {
                error!(campaign_id = %campaign_id, cause = %err, "campaign preparation failed");
                self.store.mark_campaign_failed(campaign_id);
                Err(match err {
                    CrmError::Transaction(_) => err,
                    other => CrmError::Transaction(other.to_string()),
                })
            }
        }
    }

    /// Pure staging (aggregate + render) followed by the store's atomic
    /// commit. Nothing is written unless the commit as a whole goes
    /// through.
    fn stage_and_commit(&self, campaign: &Campaign) -> CrmResult<PrepareReport> {
        let template_id = campaign.email_template_id.ok_or_else(|| {
            CrmError::Transaction("campaign has no email template".to_string())
        })?;
        let template = self
            .store
            .get_template(campaign.organization_id, template_id)
            .ok_or_else(|| {
                CrmError::Transaction(format!("email template {} not found", template_id))
            })?;

        let now = Utc::now();
        let emails: Vec<CampaignEmail> = self
            .aggregator
            .unique_contacts(campaign)
            .into_iter()
            .map(|(contact, audience)| {
                let rendered = template.render_for_contact(&contact, &campaign.custom_variables);
                CampaignEmail {
                    id: Uuid::new_v4(),
                    campaign_id: campaign.id,
                    contact_id: contact.id,
                    audience_id: audience.id,
                    email: contact.email,
                    subject: rendered.subject,
                    body: rendered.body,
                    status: EmailStatus::Pending,
                    error: None,
                    created_at: now,
                    sent_at: None,
                }
            })
            .collect();

        let total_contacts = self.store.commit_prepared(campaign.id, emails, now)?;
        Ok(PrepareReport {
            campaign_id: campaign.id,
            total_contacts,
        })
    }
}
