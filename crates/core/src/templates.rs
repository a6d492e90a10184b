//! Email template rendering: `{{variable}}` substitution from contact
//! attributes and campaign-level custom variables. Unmatched
//! placeholders are left verbatim by design, never treated as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::Contact;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

impl EmailTemplate {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Renders subject and body for one contact. Pure: no side effects,
    /// same inputs always produce the same output.
    ///
    /// Contact attributes win over custom variables on name collision.
    pub fn render_for_contact(
        &self,
        contact: &Contact,
        custom_variables: &HashMap<String, serde_json::Value>,
    ) -> RenderedEmail {
        let mut vars: HashMap<String, String> = custom_variables
            .iter()
            .map(|(k, v)| (k.clone(), display_value(v)))
            .collect();
        vars.extend(contact_variables(contact));

        RenderedEmail {
            subject: substitute(&self.subject, &vars),
            body: substitute(&self.body, &vars),
        }
    }
}

fn contact_variables(contact: &Contact) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("contact_name".to_string(), contact.display_name());
    vars.insert("contact_email".to_string(), contact.email.clone());
    vars.insert(
        "first_name".to_string(),
        contact.first_name.clone().unwrap_or_default(),
    );
    vars.insert(
        "last_name".to_string(),
        contact.last_name.clone().unwrap_or_default(),
    );
    vars.insert(
        "contact_phone".to_string(),
        contact.phone.clone().unwrap_or_default(),
    );
    vars
}

fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
