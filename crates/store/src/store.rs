//! In-memory CRM store backed by DashMap.
//!
//! Every query takes an explicit `organization_id` and filters
//! soft-deleted rows — tenant isolation and the kept-filter are part of
//! each method's contract, never ambient state. Lock order across maps
//! is campaigns → campaign_emails → statistics.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crm_core::error::{CrmError, CrmResult, ValidationErrors};
use crm_core::filters::{FilterSet, Preferences};
use crm_core::templates::EmailTemplate;
use crm_core::types::{
    Audience, Campaign, CampaignAudience, CampaignEmail, CampaignStatistic, CampaignStatus,
    Contact, EmailStatus, Organization, ScheduledType, User, UserRole,
};
use crm_core::validate::{check_length, is_valid_email, is_valid_mobile};

use crate::requests::{NewAudience, NewCampaign, NewContact, NewEmailTemplate};

/// Thread-safe in-memory store for all CRM entities.
pub struct CrmStore {
    organizations: DashMap<Uuid, Organization>,
    users: DashMap<Uuid, User>,
    contacts: DashMap<Uuid, Contact>,
    audiences: DashMap<Uuid, Audience>,
    templates: DashMap<Uuid, EmailTemplate>,
    campaigns: DashMap<Uuid, Campaign>,
    campaign_audiences: DashMap<Uuid, Vec<CampaignAudience>>,
    campaign_emails: DashMap<Uuid, CampaignEmail>,
    statistics: DashMap<Uuid, CampaignStatistic>,
}

impl CrmStore {
    pub fn new() -> Self {
        info!("CRM store initialized (in-memory, development mode)");
        Self {
            organizations: DashMap::new(),
            users: DashMap::new(),
            contacts: DashMap::new(),
            audiences: DashMap::new(),
            templates: DashMap::new(),
            campaigns: DashMap::new(),
            campaign_audiences: DashMap::new(),
            campaign_emails: DashMap::new(),
            statistics: DashMap::new(),
        }
    }

    fn require_organization(&self, organization_id: Uuid) -> CrmResult<Organization> {
        self.get_organization(organization_id)
            .ok_or_else(|| CrmError::NotFound(format!("organization {}", organization_id)))
    }

    // ─── Organizations ─────────────────────────────────────────────────────

    pub fn create_organization(&self, name: &str) -> CrmResult<Organization> {
        let mut errors = ValidationErrors::new();
        let name = name.trim();
        if name.is_empty() {
            errors.add("name", "can't be blank");
        } else if self
            .organizations
            .iter()
            .any(|o| o.deleted_at.is_none() && o.name == name)
        {
            errors.add("name", "has already been taken");
        }
        errors.into_result()?;

        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.organizations.insert(org.id, org.clone());
        info!(organization_id = %org.id, name = %org.name, "organization created");
        Ok(org)
    }

    /// All kept organizations, oldest first. The scheduler sweep
    /// iterates this to apply the due predicate tenant by tenant.
    pub fn organizations(&self) -> Vec<Organization> {
        let mut orgs: Vec<Organization> = self
            .organizations
            .iter()
            .filter(|o| o.deleted_at.is_none())
            .map(|o| o.value().clone())
            .collect();
        orgs.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        orgs
    }

    pub fn get_organization(&self, id: Uuid) -> Option<Organization> {
        self.organizations
            .get(&id)
            .filter(|o| o.deleted_at.is_none())
            .map(|o| o.value().clone())
    }

    pub fn discard_organization(&self, id: Uuid) -> CrmResult<()> {
        let mut org = self
            .organizations
            .get_mut(&id)
            .ok_or_else(|| CrmError::NotFound(format!("organization {}", id)))?;
        let now = Utc::now();
        org.deleted_at = Some(now);
        org.updated_at = now;
        Ok(())
    }

    // ─── Users ─────────────────────────────────────────────────────────────

    pub fn create_user(
        &self,
        organization_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> CrmResult<User> {
        self.require_organization(organization_id)?;
        let mut errors = ValidationErrors::new();
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            errors.add("email", "can't be blank");
        } else if !is_valid_email(&email) {
            errors.add("email", "is invalid");
        } else if self
            .users
            .iter()
            .any(|u| u.deleted_at.is_none() && u.email == email)
        {
            errors.add("email", "has already been taken");
        }
        errors.into_result()?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            organization_id,
            email,
            role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn get_user(&self, organization_id: Uuid, id: Uuid) -> Option<User> {
        self.users
            .get(&id)
            .filter(|u| u.deleted_at.is_none() && u.organization_id == organization_id)
            .map(|u| u.value().clone())
    }

    // ─── Contacts ──────────────────────────────────────────────────────────

    pub fn create_contact(&self, organization_id: Uuid, req: NewContact) -> CrmResult<Contact> {
        self.require_organization(organization_id)?;
        let mut errors = ValidationErrors::new();

        if self.get_user(organization_id, req.created_by).is_none() {
            errors.add("created_by", "must belong to the organization");
        }

        let email = req.email.trim().to_lowercase();
        if email.is_empty() {
            errors.add("email", "can't be blank");
        } else if !is_valid_email(&email) {
            errors.add("email", "is invalid");
        } else if self.contacts.iter().any(|c| {
            c.organization_id == organization_id && c.deleted_at.is_none() && c.email == email
        }) {
            errors.add("email", "has already been taken");
        }

        let phone = req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        if let Some(phone) = phone {
            if !is_valid_mobile(phone) {
                errors.add("phone", "is not a valid mobile number");
            } else if self.contacts.iter().any(|c| {
                c.organization_id == organization_id
                    && c.deleted_at.is_none()
                    && c.phone.as_deref() == Some(phone)
            }) {
                errors.add("phone", "has already been taken");
            }
        }

        let first_name = req.first_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if let Some(name) = first_name {
            check_length("first_name", name, 3, 50, &mut errors);
        }
        let last_name = req.last_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if let Some(name) = last_name {
            check_length("last_name", name, 3, 50, &mut errors);
        }

        let preferences = match Preferences::parse(&req.preferences) {
            Ok(preferences) => Some(preferences),
            Err(parse_errors) => {
                errors.merge(parse_errors);
                None
            }
        };

        errors.into_result()?;
        let preferences = preferences.ok_or_else(|| {
            CrmError::Transaction("preferences missing after validation".to_string())
        })?;

        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            organization_id,
            created_by: req.created_by,
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            email,
            phone: phone.map(str::to_string),
            preferences,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    pub fn get_contact(&self, organization_id: Uuid, id: Uuid) -> Option<Contact> {
        self.contacts
            .get(&id)
            .filter(|c| c.deleted_at.is_none() && c.organization_id == organization_id)
            .map(|c| c.value().clone())
    }

    /// Kept contacts of one tenant in deterministic (created_at, id)
    /// order — the resolver's snapshot source.
    pub fn contacts_for_organization(&self, organization_id: Uuid) -> Vec<Contact> {
        let mut contacts: Vec<Contact> = self
            .contacts
            .iter()
            .filter(|c| c.organization_id == organization_id && c.deleted_at.is_none())
            .map(|c| c.value().clone())
            .collect();
        contacts.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        contacts
    }

    pub fn discard_contact(&self, organization_id: Uuid, id: Uuid) -> CrmResult<()> {
        let mut contact = self
            .contacts
            .get_mut(&id)
            .filter(|c| c.organization_id == organization_id)
            .ok_or_else(|| CrmError::NotFound(format!("contact {}", id)))?;
        let now = Utc::now();
        contact.deleted_at = Some(now);
        contact.updated_at = now;
        Ok(())
    }

    // ─── Audiences ─────────────────────────────────────────────────────────

    pub fn create_audience(&self, organization_id: Uuid, req: NewAudience) -> CrmResult<Audience> {
        self.require_organization(organization_id)?;
        let mut errors = ValidationErrors::new();

        if self.get_user(organization_id, req.created_by).is_none() {
            errors.add("created_by", "must belong to the organization");
        }

        let name = req.name.trim();
        check_length("name", name, 3, 100, &mut errors);
        if self.audiences.iter().any(|a| {
            a.organization_id == organization_id && a.deleted_at.is_none() && a.name == name
        }) {
            errors.add("name", "has already been taken");
        }

        let description = req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(description) = description {
            check_length("description", description, 10, 255, &mut errors);
        }

        let filters = match FilterSet::parse(&req.filters) {
            Ok(filters) => Some(filters),
            Err(parse_errors) => {
                errors.merge(parse_errors);
                None
            }
        };

        errors.into_result()?;
        let filters = filters.ok_or_else(|| {
            CrmError::Transaction("filters missing after validation".to_string())
        })?;

        let now = Utc::now();
        let audience = Audience {
            id: Uuid::new_v4(),
            organization_id,
            created_by: req.created_by,
            name: name.to_string(),
            description: description.map(str::to_string),
            filters,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.audiences.insert(audience.id, audience.clone());
        info!(audience_id = %audience.id, name = %audience.name, "audience created");
        Ok(audience)
    }

    pub fn get_audience(&self, organization_id: Uuid, id: Uuid) -> Option<Audience> {
        self.audiences
            .get(&id)
            .filter(|a| a.deleted_at.is_none() && a.organization_id == organization_id)
            .map(|a| a.value().clone())
    }

    pub fn audiences_for_organization(&self, organization_id: Uuid) -> Vec<Audience> {
        let mut audiences: Vec<Audience> = self
            .audiences
            .iter()
            .filter(|a| a.organization_id == organization_id && a.deleted_at.is_none())
            .map(|a| a.value().clone())
            .collect();
        audiences.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        audiences
    }

    pub fn discard_audience(&self, organization_id: Uuid, id: Uuid) -> CrmResult<()> {
        let mut audience = self
            .audiences
            .get_mut(&id)
            .filter(|a| a.organization_id == organization_id)
            .ok_or_else(|| CrmError::NotFound(format!("audience {}", id)))?;
        let now = Utc::now();
        audience.deleted_at = Some(now);
        audience.updated_at = now;
        Ok(())
    }

    // ─── Email templates ───────────────────────────────────────────────────

    pub fn create_template(
        &self,
        organization_id: Uuid,
        req: NewEmailTemplate,
    ) -> CrmResult<EmailTemplate> {
        self.require_organization(organization_id)?;
        let mut errors = ValidationErrors::new();

        if self.get_user(organization_id, req.created_by).is_none() {
            errors.add("created_by", "must belong to the organization");
        }
        let name = req.name.trim();
        if name.is_empty() {
            errors.add("name", "can't be blank");
        }
        if req.subject.trim().is_empty() {
            errors.add("subject", "can't be blank");
        }
        if req.body.trim().is_empty() {
            errors.add("body", "can't be blank");
        }
        errors.into_result()?;

        let now = Utc::now();
        let template = EmailTemplate {
            id: Uuid::new_v4(),
            organization_id,
            created_by: req.created_by,
            name: name.to_string(),
            subject: req.subject,
            body: req.body,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.templates.insert(template.id, template.clone());
        Ok(template)
    }

    pub fn get_template(&self, organization_id: Uuid, id: Uuid) -> Option<EmailTemplate> {
        self.templates
            .get(&id)
            .filter(|t| t.deleted_at.is_none() && t.organization_id == organization_id)
            .map(|t| t.value().clone())
    }

    pub fn discard_template(&self, organization_id: Uuid, id: Uuid) -> CrmResult<()> {
        let mut template = self
            .templates
            .get_mut(&id)
            .filter(|t| t.organization_id == organization_id)
            .ok_or_else(|| CrmError::NotFound(format!("template {}", id)))?;
        let now = Utc::now();
        template.deleted_at = Some(now);
        template.updated_at = now;
        Ok(())
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn create_campaign(&self, organization_id: Uuid, req: NewCampaign) -> CrmResult<Campaign> {
        self.require_organization(organization_id)?;
        let now = Utc::now();
        let mut errors = ValidationErrors::new();
        let mut ownership: Vec<String> = Vec::new();

        if self.get_user(organization_id, req.created_by).is_none() {
            errors.add("created_by", "must belong to the organization");
        }

        let name = req.name.trim();
        check_length("name", name, 3, 100, &mut errors);
        if self.campaigns.iter().any(|c| {
            c.organization_id == organization_id
                && c.created_by == req.created_by
                && c.deleted_at.is_none()
                && c.name == name
        }) {
            errors.add("name", "has already been taken");
        }

        let description = req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(description) = description {
            check_length("description", description, 10, 255, &mut errors);
        }

        let needs_schedule = matches!(
            req.scheduled_type,
            ScheduledType::Scheduled | ScheduledType::Recurring
        );
        match req.scheduled_at {
            None if needs_schedule => errors.add("scheduled_at", "can't be blank"),
            Some(at) if at < now => errors.add("scheduled_at", "must not be in the past"),
            _ => {}
        }

        if req.scheduled_type == ScheduledType::Recurring && req.recurrence_interval.is_none() {
            errors.add(
                "recurrence_interval",
                "can't be blank for recurring campaigns",
            );
        }
        if let Some(end) = req.recurrence_end_date {
            match req.scheduled_at {
                Some(at) if end > at => {}
                _ => errors.add("recurrence_end_date", "must be after scheduled_at"),
            }
        }
        if req.max_occurrences == Some(0) {
            errors.add("max_occurrences", "must be greater than 0");
        }

        let mut seen = HashSet::new();
        for audience_id in &req.audience_ids {
            if !seen.insert(*audience_id) {
                errors.add("audiences", "contains duplicate entries");
                continue;
            }
            match self.get_audience(organization_id, *audience_id) {
                None => errors.add("audiences", format!("audience {} does not exist", audience_id)),
                Some(audience) if audience.created_by != req.created_by => {
                    ownership.push(format!("audience {} does not belong to you", audience_id));
                }
                Some(_) => {}
            }
        }

        if let Some(template_id) = req.email_template_id {
            match self.get_template(organization_id, template_id) {
                None => errors.add("email_template", "does not exist"),
                Some(template) if template.created_by != req.created_by => {
                    ownership.push(format!("template {} does not belong to you", template_id));
                }
                Some(_) => {}
            }
        }

        errors.into_result()?;
        if !ownership.is_empty() {
            return Err(CrmError::Ownership(ownership.join("; ")));
        }

        let campaign = Campaign {
            id: Uuid::new_v4(),
            organization_id,
            created_by: req.created_by,
            email_template_id: req.email_template_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            status: CampaignStatus::Created,
            scheduled_type: req.scheduled_type,
            scheduled_at: req.scheduled_at,
            recurrence_interval: req.recurrence_interval,
            recurrence_end_date: req.recurrence_end_date,
            max_occurrences: req.max_occurrences,
            occurrence_count: 1,
            custom_variables: req.custom_variables,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.campaigns.insert(campaign.id, campaign.clone());
        self.attach_audiences(campaign.id, &req.audience_ids, now);
        info!(campaign_id = %campaign.id, name = %campaign.name, "campaign created");
        Ok(campaign)
    }

    fn attach_audiences(&self, campaign_id: Uuid, audience_ids: &[Uuid], now: DateTime<Utc>) {
        let rows: Vec<CampaignAudience> = audience_ids
            .iter()
            .enumerate()
            .map(|(position, audience_id)| CampaignAudience {
                campaign_id,
                audience_id: *audience_id,
                position,
                created_at: now,
            })
            .collect();
        self.campaign_audiences.insert(campaign_id, rows);
    }

    pub fn get_campaign(&self, organization_id: Uuid, id: Uuid) -> Option<Campaign> {
        self.campaigns
            .get(&id)
            .filter(|c| c.deleted_at.is_none() && c.organization_id == organization_id)
            .map(|c| c.value().clone())
    }

    pub fn campaigns_for_organization(&self, organization_id: Uuid) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|c| c.organization_id == organization_id && c.deleted_at.is_none())
            .map(|c| c.value().clone())
            .collect();
        campaigns.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        campaigns
    }

    pub fn discard_campaign(&self, organization_id: Uuid, id: Uuid) -> CrmResult<()> {
        let mut campaign = self
            .campaigns
            .get_mut(&id)
            .filter(|c| c.organization_id == organization_id)
            .ok_or_else(|| CrmError::NotFound(format!("campaign {}", id)))?;
        let now = Utc::now();
        campaign.deleted_at = Some(now);
        campaign.updated_at = now;
        drop(campaign);
        // Join rows cascade with the campaign.
        self.campaign_audiences.remove(&id);
        Ok(())
    }

    /// Kept audiences attached to a campaign, in attachment order.
    /// Soft-deleted audiences are skipped; their join rows remain.
    pub fn audiences_for_campaign(&self, campaign_id: Uuid) -> Vec<Audience> {
        let Some(rows) = self.campaign_audiences.get(&campaign_id) else {
            return Vec::new();
        };
        let mut rows = rows.value().clone();
        rows.sort_by_key(|r| r.position);
        rows.iter()
            .filter_map(|r| {
                self.audiences
                    .get(&r.audience_id)
                    .filter(|a| a.deleted_at.is_none())
                    .map(|a| a.value().clone())
            })
            .collect()
    }

    /// Due-campaign predicate, evaluated within one tenant: status is
    /// `created`, not soft-deleted, and scheduled_at is unset or has
    /// passed.
    pub fn due_campaigns(&self, organization_id: Uuid, now: DateTime<Utc>) -> Vec<Campaign> {
        let mut due: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|c| {
                c.organization_id == organization_id
                    && c.deleted_at.is_none()
                    && c.status == CampaignStatus::Created
                    && c.scheduled_at.map_or(true, |at| at <= now)
            })
            .map(|c| c.value().clone())
            .collect();
        due.sort_by(|a, b| {
            (a.scheduled_at, a.created_at, a.id).cmp(&(b.scheduled_at, b.created_at, b.id))
        });
        due
    }

    // ─── Campaign preparation (the mutating critical section) ──────────────

    /// Atomically commits a prepared campaign: all CampaignEmail rows,
    /// the CampaignStatistic, and the `created → running` flip succeed
    /// together or not at all.
    ///
    /// The campaign entry lock is held for the whole commit; the status
    /// re-check under that lock is the single-writer gate that stops a
    /// campaign from being prepared twice concurrently.
    pub fn commit_prepared(
        &self,
        campaign_id: Uuid,
        emails: Vec<CampaignEmail>,
        now: DateTime<Utc>,
    ) -> CrmResult<u64> {
        let mut entry = self
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| CrmError::NotFound(format!("campaign {}", campaign_id)))?;
        let campaign = entry.value_mut();
        if campaign.status != CampaignStatus::Created {
            return Err(CrmError::Transaction(format!(
                "campaign {} is no longer in created status",
                campaign_id
            )));
        }

        let mut staged = HashSet::new();
        for email in &emails {
            if email.campaign_id != campaign_id {
                return Err(CrmError::Transaction(
                    "staged email belongs to a different campaign".to_string(),
                ));
            }
            if !staged.insert(email.contact_id) {
                return Err(CrmError::Transaction(format!(
                    "duplicate contact {} in staged emails",
                    email.contact_id
                )));
            }
        }
        if self
            .campaign_emails
            .iter()
            .any(|e| e.campaign_id == campaign_id)
        {
            return Err(CrmError::Transaction(format!(
                "campaign {} already has email rows",
                campaign_id
            )));
        }

        let total = emails.len() as u64;
        for email in emails {
            self.campaign_emails.insert(email.id, email);
        }
        self.statistics.insert(
            campaign_id,
            CampaignStatistic {
                campaign_id,
                total_contacts: total,
                emails_sent: 0,
                emails_failed: 0,
                last_sent_at: None,
                created_at: now,
                updated_at: now,
            },
        );
        campaign.status = CampaignStatus::Running;
        campaign.updated_at = now;
        info!(campaign_id = %campaign_id, total_contacts = total, "campaign prepared");
        Ok(total)
    }

    /// Best-effort failure downgrade, applied outside the commit. Only
    /// a `created` campaign is downgraded — a losing concurrent prepare
    /// must never clobber a running one.
    pub fn mark_campaign_failed(&self, campaign_id: Uuid) {
        match self.campaigns.get_mut(&campaign_id) {
            Some(mut campaign) if campaign.status == CampaignStatus::Created => {
                campaign.status = CampaignStatus::Failed;
                campaign.updated_at = Utc::now();
            }
            Some(campaign) => {
                warn!(
                    campaign_id = %campaign_id,
                    status = ?campaign.status,
                    "skipping failure downgrade, campaign not in created status"
                );
            }
            None => {
                warn!(campaign_id = %campaign_id, "cannot mark unknown campaign failed");
            }
        }
    }

    /// Persists a recurrence clone and copies the source campaign's
    /// audience attachments. System path: the user-facing name
    /// uniqueness rule deliberately does not apply here.
    pub fn insert_next_occurrence(
        &self,
        source_campaign_id: Uuid,
        draft: Campaign,
    ) -> CrmResult<Campaign> {
        if self.campaigns.contains_key(&draft.id) {
            return Err(CrmError::Transaction(format!(
                "campaign {} already exists",
                draft.id
            )));
        }
        let audience_ids: Vec<Uuid> = self
            .campaign_audiences
            .get(&source_campaign_id)
            .map(|rows| {
                let mut rows = rows.value().clone();
                rows.sort_by_key(|r| r.position);
                rows.iter().map(|r| r.audience_id).collect()
            })
            .unwrap_or_default();

        let id = draft.id;
        self.campaigns.insert(id, draft.clone());
        self.attach_audiences(id, &audience_ids, draft.created_at);
        info!(
            campaign_id = %id,
            source_campaign_id = %source_campaign_id,
            scheduled_at = ?draft.scheduled_at,
            occurrence = draft.occurrence_count,
            "next recurrence scheduled"
        );
        Ok(draft)
    }

    // ─── Delivery-stage contract ───────────────────────────────────────────

    pub fn emails_for_campaign(&self, campaign_id: Uuid) -> Vec<CampaignEmail> {
        let mut emails: Vec<CampaignEmail> = self
            .campaign_emails
            .iter()
            .filter(|e| e.campaign_id == campaign_id)
            .map(|e| e.value().clone())
            .collect();
        emails.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        emails
    }

    pub fn pending_emails(&self, campaign_id: Uuid) -> Vec<CampaignEmail> {
        self.emails_for_campaign(campaign_id)
            .into_iter()
            .filter(|e| e.status == EmailStatus::Pending)
            .collect()
    }

    pub fn statistic_for_campaign(&self, campaign_id: Uuid) -> Option<CampaignStatistic> {
        self.statistics
            .get(&campaign_id)
            .map(|s| s.value().clone())
    }

    pub fn mark_email_sent(&self, email_id: Uuid, now: DateTime<Utc>) -> CrmResult<()> {
        let campaign_id = {
            let mut email = self
                .campaign_emails
                .get_mut(&email_id)
                .ok_or_else(|| CrmError::NotFound(format!("campaign email {}", email_id)))?;
            if email.status != EmailStatus::Pending {
                return Err(CrmError::Precondition(format!(
                    "campaign email {} is already resolved",
                    email_id
                )));
            }
            email.status = EmailStatus::Sent;
            email.sent_at = Some(now);
            email.campaign_id
        };
        if let Some(mut stat) = self.statistics.get_mut(&campaign_id) {
            stat.emails_sent += 1;
            stat.last_sent_at = Some(now);
            stat.updated_at = now;
        }
        Ok(())
    }

    pub fn mark_email_failed(&self, email_id: Uuid, cause: &str) -> CrmResult<()> {
        let now = Utc::now();
        let campaign_id = {
            let mut email = self
                .campaign_emails
                .get_mut(&email_id)
                .ok_or_else(|| CrmError::NotFound(format!("campaign email {}", email_id)))?;
            if email.status != EmailStatus::Pending {
                return Err(CrmError::Precondition(format!(
                    "campaign email {} is already resolved",
                    email_id
                )));
            }
            email.status = EmailStatus::Failed;
            email.error = Some(cause.to_string());
            email.campaign_id
        };
        if let Some(mut stat) = self.statistics.get_mut(&campaign_id) {
            stat.emails_failed += 1;
            stat.updated_at = now;
        }
        Ok(())
    }

    /// Terminal transition for a running campaign once every email is
    /// resolved: completed (all sent), partial (mixed), failed (none
    /// sent). A campaign that targeted nobody completes trivially.
    pub fn finalize_campaign(&self, campaign_id: Uuid) -> CrmResult<CampaignStatus> {
        let mut entry = self
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| CrmError::NotFound(format!("campaign {}", campaign_id)))?;
        let campaign = entry.value_mut();
        if campaign.status != CampaignStatus::Running {
            return Err(CrmError::Precondition(format!(
                "campaign {} is not running",
                campaign_id
            )));
        }

        let mut sent = 0u64;
        let mut failed = 0u64;
        for email in self.campaign_emails.iter() {
            if email.campaign_id != campaign_id {
                continue;
            }
            match email.status {
                EmailStatus::Pending => {
                    return Err(CrmError::Precondition(format!(
                        "campaign {} still has pending emails",
                        campaign_id
                    )))
                }
                EmailStatus::Sent => sent += 1,
                EmailStatus::Failed => failed += 1,
            }
        }

        let status = if failed == 0 {
            CampaignStatus::Completed
        } else if sent > 0 {
            CampaignStatus::Partial
        } else {
            CampaignStatus::Failed
        };
        campaign.status = status;
        campaign.updated_at = Utc::now();
        info!(campaign_id = %campaign_id, sent, failed, status = ?status, "campaign finalized");
        Ok(status)
    }
}

impl Default for CrmStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
