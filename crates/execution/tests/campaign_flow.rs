//! End-to-end campaign flow: create tenant data, prepare campaigns,
//! sweep recurring schedules, and play the delivery stage back into the
//! store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crm_core::error::CrmError;
use crm_core::types::{
    CampaignStatus, EmailStatus, RecurrenceInterval, ScheduledType, UserRole,
};
use crm_execution::{CampaignExecutor, CampaignScheduler, InMemoryDeliveryQueue};
use crm_store::{CrmStore, NewAudience, NewCampaign, NewContact, NewEmailTemplate};

struct Fixture {
    store: Arc<CrmStore>,
    org: Uuid,
    user: Uuid,
    template: Uuid,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(CrmStore::new());
        let org = store.create_organization("Acme Realty").unwrap();
        let user = store
            .create_user(org.id, "agent@acme.com", UserRole::Agent)
            .unwrap();
        let template = store
            .create_template(
                org.id,
                NewEmailTemplate {
                    created_by: user.id,
                    name: "launch".to_string(),
                    subject: "Hello {{contact_name}}".to_string(),
                    body: "New homes in {{area}} for {{first_name}}".to_string(),
                },
            )
            .unwrap();
        Self {
            store,
            org: org.id,
            user: user.id,
            template: template.id,
        }
    }

    fn contact(&self, email: &str, first_name: &str, locations: &[&str]) -> Uuid {
        self.store
            .create_contact(
                self.org,
                NewContact {
                    created_by: self.user,
                    first_name: Some(first_name.to_string()),
                    last_name: Some("Patil".to_string()),
                    email: email.to_string(),
                    phone: None,
                    preferences: json!({
                        "contact_type": "buyer",
                        "property_locations": locations,
                        "property_types": ["flat"],
                        "timeline": "immediate",
                        "min_budget": 500_000,
                        "max_budget": 900_000,
                    }),
                },
            )
            .unwrap()
            .id
    }

    fn audience(&self, name: &str, locations: &[&str]) -> Uuid {
        self.store
            .create_audience(
                self.org,
                NewAudience {
                    created_by: self.user,
                    name: name.to_string(),
                    description: None,
                    filters: json!({ "property_locations": locations }),
                },
            )
            .unwrap()
            .id
    }

    fn immediate_campaign(&self, name: &str, audience_ids: Vec<Uuid>) -> Uuid {
        self.store
            .create_campaign(
                self.org,
                NewCampaign {
                    created_by: self.user,
                    name: name.to_string(),
                    description: None,
                    email_template_id: Some(self.template),
                    audience_ids,
                    scheduled_type: ScheduledType::Immediate,
                    scheduled_at: None,
                    recurrence_interval: None,
                    recurrence_end_date: None,
                    max_occurrences: None,
                    custom_variables: HashMap::from([("area".to_string(), json!("West Pune"))]),
                },
            )
            .unwrap()
            .id
    }
}

#[test]
fn prepare_deduplicates_across_overlapping_audiences() {
    let fx = Fixture::new();
    let c1 = fx.contact("one@x.com", "Asha", &["baner"]);
    let c2 = fx.contact("two@x.com", "Ravi", &["baner", "wakad"]);
    let c3 = fx.contact("three@x.com", "Meera", &["wakad"]);

    let a1 = fx.audience("Baner", &["baner"]); // matches {c1, c2}
    let a2 = fx.audience("Wakad", &["wakad"]); // matches {c2, c3}
    let campaign = fx.immediate_campaign("Spring push", vec![a1, a2]);

    let queue = Arc::new(InMemoryDeliveryQueue::new());
    let executor = CampaignExecutor::new(Arc::clone(&fx.store), queue.clone());
    let report = executor.prepare(fx.org, campaign).unwrap();
    assert_eq!(report.total_contacts, 3);

    let emails = fx.store.emails_for_campaign(campaign);
    assert_eq!(emails.len(), 3);
    let targeted: Vec<Uuid> = emails.iter().map(|e| e.contact_id).collect();
    assert!(targeted.contains(&c1) && targeted.contains(&c2) && targeted.contains(&c3));

    // The overlapping contact is attributed to the first attachment.
    let overlap = emails.iter().find(|e| e.contact_id == c2).unwrap();
    assert_eq!(overlap.audience_id, a1);

    // Rendered with contact attributes and campaign custom variables.
    assert_eq!(overlap.subject, "Hello Ravi Patil");
    assert_eq!(overlap.body, "New homes in West Pune for Ravi");
    assert!(emails.iter().all(|e| e.status == EmailStatus::Pending));

    let stat = fx.store.statistic_for_campaign(campaign).unwrap();
    assert_eq!(stat.total_contacts, 3);
    assert_eq!(stat.success_rate(), 0.0);

    assert_eq!(
        fx.store.get_campaign(fx.org, campaign).unwrap().status,
        CampaignStatus::Running
    );
    assert_eq!(queue.drain(), vec![campaign]);
}

#[test]
fn prepare_without_audiences_fails_fast_and_leaves_status() {
    let fx = Fixture::new();
    let campaign = fx.immediate_campaign("Empty push", Vec::new());

    let queue = Arc::new(InMemoryDeliveryQueue::new());
    let executor = CampaignExecutor::new(Arc::clone(&fx.store), queue.clone());
    let err = executor.prepare(fx.org, campaign).unwrap_err();
    assert!(matches!(err, CrmError::Precondition(_)));

    assert_eq!(
        fx.store.get_campaign(fx.org, campaign).unwrap().status,
        CampaignStatus::Created
    );
    assert!(fx.store.emails_for_campaign(campaign).is_empty());
    assert!(fx.store.statistic_for_campaign(campaign).is_none());
    assert!(queue.is_empty());
}

#[test]
fn prepare_refuses_campaign_whose_template_was_discarded() {
    let fx = Fixture::new();
    fx.contact("one@x.com", "Asha", &["baner"]);
    let a1 = fx.audience("Baner", &["baner"]);
    let campaign = fx.immediate_campaign("Stale template", vec![a1]);

    fx.store.discard_template(fx.org, fx.template).unwrap();

    let executor = CampaignExecutor::new(
        Arc::clone(&fx.store),
        Arc::new(InMemoryDeliveryQueue::new()),
    );
    let err = executor.prepare(fx.org, campaign).unwrap_err();
    assert!(matches!(err, CrmError::Precondition(_)));
    assert_eq!(
        fx.store.get_campaign(fx.org, campaign).unwrap().status,
        CampaignStatus::Created
    );
}

#[test]
fn second_prepare_hits_the_single_writer_gate() {
    let fx = Fixture::new();
    fx.contact("one@x.com", "Asha", &["baner"]);
    let a1 = fx.audience("Baner", &["baner"]);
    let campaign = fx.immediate_campaign("Once only", vec![a1]);

    let executor = CampaignExecutor::new(
        Arc::clone(&fx.store),
        Arc::new(InMemoryDeliveryQueue::new()),
    );
    executor.prepare(fx.org, campaign).unwrap();

    let err = executor.prepare(fx.org, campaign).unwrap_err();
    assert!(matches!(err, CrmError::Precondition(_)));
    // Still running, with exactly one set of email rows.
    assert_eq!(
        fx.store.get_campaign(fx.org, campaign).unwrap().status,
        CampaignStatus::Running
    );
    assert_eq!(fx.store.emails_for_campaign(campaign).len(), 1);
}

#[test]
fn scheduler_prepares_due_recurring_campaign_and_clones_forward() {
    let fx = Fixture::new();
    fx.contact("one@x.com", "Asha", &["baner"]);
    let a1 = fx.audience("Baner", &["baner"]);

    let scheduled_at = Utc::now() + Duration::seconds(5);
    let campaign = fx
        .store
        .create_campaign(
            fx.org,
            NewCampaign {
                created_by: fx.user,
                name: "Weekly digest".to_string(),
                description: None,
                email_template_id: Some(fx.template),
                audience_ids: vec![a1],
                scheduled_type: ScheduledType::Recurring,
                scheduled_at: Some(scheduled_at),
                recurrence_interval: Some(RecurrenceInterval::Weekly),
                recurrence_end_date: None,
                max_occurrences: Some(4),
                custom_variables: HashMap::new(),
            },
        )
        .unwrap();

    let queue = Arc::new(InMemoryDeliveryQueue::new());
    let scheduler = CampaignScheduler::new(Arc::clone(&fx.store), queue.clone());

    let tick = scheduled_at + Duration::minutes(1);
    let summary = scheduler.run_tick(tick);
    assert_eq!(summary.prepared, 1);
    assert_eq!(summary.cloned, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(
        fx.store.get_campaign(fx.org, campaign.id).unwrap().status,
        CampaignStatus::Running
    );
    assert_eq!(queue.drain(), vec![campaign.id]);

    // The clone is a fresh created campaign one interval out, with the
    // same audience set.
    let campaigns = fx.store.campaigns_for_organization(fx.org);
    let clone = campaigns
        .iter()
        .find(|c| c.id != campaign.id)
        .expect("clone persisted");
    assert_eq!(clone.status, CampaignStatus::Created);
    assert_eq!(clone.occurrence_count, 2);
    assert_eq!(clone.scheduled_at.unwrap(), scheduled_at + Duration::days(7));
    let attached: Vec<Uuid> = fx
        .store
        .audiences_for_campaign(clone.id)
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(attached, vec![a1]);

    // Not due yet, so a second tick at the same instant does nothing.
    let summary = scheduler.run_tick(tick);
    assert_eq!(summary.due, 0);
}

#[test]
fn scheduler_stops_cloning_at_max_occurrences() {
    let fx = Fixture::new();
    fx.contact("one@x.com", "Asha", &["baner"]);
    let a1 = fx.audience("Baner", &["baner"]);

    let scheduled_at = Utc::now() + Duration::seconds(5);
    fx.store
        .create_campaign(
            fx.org,
            NewCampaign {
                created_by: fx.user,
                name: "Final run".to_string(),
                description: None,
                email_template_id: Some(fx.template),
                audience_ids: vec![a1],
                scheduled_type: ScheduledType::Recurring,
                scheduled_at: Some(scheduled_at),
                recurrence_interval: Some(RecurrenceInterval::Daily),
                recurrence_end_date: None,
                max_occurrences: Some(1),
                custom_variables: HashMap::new(),
            },
        )
        .unwrap();

    let scheduler = CampaignScheduler::new(
        Arc::clone(&fx.store),
        Arc::new(InMemoryDeliveryQueue::new()),
    );
    let summary = scheduler.run_tick(scheduled_at + Duration::minutes(1));
    assert_eq!(summary.prepared, 1);
    assert_eq!(summary.cloned, 0);
    assert_eq!(fx.store.campaigns_for_organization(fx.org).len(), 1);
}

#[test]
fn delivery_outcomes_finalize_the_campaign() {
    let fx = Fixture::new();
    fx.contact("one@x.com", "Asha", &["baner"]);
    fx.contact("two@x.com", "Ravi", &["baner"]);
    let a1 = fx.audience("Baner", &["baner"]);
    let campaign = fx.immediate_campaign("Deliver me", vec![a1]);

    let executor = CampaignExecutor::new(
        Arc::clone(&fx.store),
        Arc::new(InMemoryDeliveryQueue::new()),
    );
    executor.prepare(fx.org, campaign).unwrap();

    let now = Utc::now();
    for email in fx.store.pending_emails(campaign) {
        fx.store.mark_email_sent(email.id, now).unwrap();
    }
    let status = fx.store.finalize_campaign(campaign).unwrap();
    assert_eq!(status, CampaignStatus::Completed);

    let stat = fx.store.statistic_for_campaign(campaign).unwrap();
    assert_eq!(stat.emails_sent, 2);
    assert_eq!(stat.success_rate(), 1.0);
    assert_eq!(stat.last_sent_at, Some(now));
}
