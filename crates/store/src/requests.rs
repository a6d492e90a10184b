//! Create-request payloads. Preference and filter maps arrive as raw
//! JSON and are parsed into typed values during validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crm_core::types::{RecurrenceInterval, ScheduledType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContact {
    pub created_by: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub preferences: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAudience {
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub filters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmailTemplate {
    pub created_by: Uuid,
    pub name: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub email_template_id: Option<Uuid>,
    /// Attachment order is preserved; it is the aggregator's stable
    /// iteration order.
    pub audience_ids: Vec<Uuid>,
    pub scheduled_type: ScheduledType,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub recurrence_interval: Option<RecurrenceInterval>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub max_occurrences: Option<u32>,
    #[serde(default)]
    pub custom_variables: HashMap<String, serde_json::Value>,
}
