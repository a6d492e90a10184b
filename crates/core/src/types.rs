//! Domain entities. Every tenant-owned entity carries its
//! `organization_id` explicitly and a `deleted_at` soft-delete marker
//! that read paths must filter — there is no ambient tenant context and
//! no implicit default scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::filters::{FilterSet, Preferences};

/// Tenant boundary. Every other entity belongs to exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Agent,
}

/// Data supplier only; authentication and session mechanics live
/// outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Stored lowercased; unique per tenant among kept contacts.
    pub email: String,
    pub phone: Option<String>,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Full name for rendering; falls back to the email address when no
    /// name parts are recorded.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// A saved, reusable contact-filtering rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audience {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub filters: FilterSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Audience {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Created,
    Running,
    Completed,
    Failed,
    Partial,
}

impl CampaignStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Completed | CampaignStatus::Failed | CampaignStatus::Partial
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledType {
    Immediate,
    Scheduled,
    Recurring,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceInterval {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub email_template_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: CampaignStatus,
    pub scheduled_type: ScheduledType,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub recurrence_interval: Option<RecurrenceInterval>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub max_occurrences: Option<u32>,
    /// 1 for the first occurrence; each recurrence clone increments.
    pub occurrence_count: u32,
    pub custom_variables: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Campaign {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_recurring(&self) -> bool {
        self.scheduled_type == ScheduledType::Recurring
    }
}

/// Ordered campaign-audience attachment; unique per (campaign, audience).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignAudience {
    pub campaign_id: Uuid,
    pub audience_id: Uuid,
    pub position: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

/// One rendered email per (campaign, contact), produced at preparation
/// time. The delivery stage consumes pending rows and records outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignEmail {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    /// The audience that first matched this contact.
    pub audience_id: Uuid,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Aggregate counters, one per campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStatistic {
    pub campaign_id: Uuid,
    pub total_contacts: u64,
    pub emails_sent: u64,
    pub emails_failed: u64,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignStatistic {
    pub fn success_rate(&self) -> f64 {
        if self.total_contacts == 0 {
            0.0
        } else {
            self.emails_sent as f64 / self.total_contacts as f64
        }
    }
}
