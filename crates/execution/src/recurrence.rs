//! Recurring schedule math: next-occurrence timing, termination
//! conditions, and the pure clone draft that carries a campaign
//! forward. Persistence is the store's job, never a side effect here.

use chrono::{DateTime, Duration, Months, Utc};
use uuid::Uuid;

use crm_core::types::{Campaign, CampaignStatus, RecurrenceInterval};
use crm_store::CrmStore;

pub struct ScheduleEngine;

impl ScheduleEngine {
    /// Campaigns eligible for execution within one tenant: `created`
    /// status, kept, and scheduled_at unset or passed. The sweep calls
    /// this once per organization.
    pub fn due_for_execution(
        store: &CrmStore,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Vec<Campaign> {
        store.due_campaigns(organization_id, now)
    }

    /// scheduled_at advanced by the campaign's recurrence interval.
    /// Monthly steps by calendar month, not a fixed day count. A
    /// recurring campaign with no interval recorded falls back to one
    /// day.
    pub fn next_scheduled_time(campaign: &Campaign) -> Option<DateTime<Utc>> {
        let base = campaign.scheduled_at?;
        let next = match campaign.recurrence_interval {
            Some(RecurrenceInterval::Minutely) => base + Duration::minutes(1),
            Some(RecurrenceInterval::Hourly) => base + Duration::hours(1),
            Some(RecurrenceInterval::Daily) => base + Duration::days(1),
            Some(RecurrenceInterval::Weekly) => base + Duration::days(7),
            Some(RecurrenceInterval::Biweekly) => base + Duration::days(14),
            Some(RecurrenceInterval::Monthly) => base + Months::new(1),
            None => base + Duration::days(1),
        };
        Some(next)
    }

    /// False once the end date is reached or the occurrence budget is
    /// spent.
    pub fn should_continue_recurring(campaign: &Campaign, now: DateTime<Utc>) -> bool {
        if let Some(end) = campaign.recurrence_end_date {
            if now >= end {
                return false;
            }
        }
        if let Some(max) = campaign.max_occurrences {
            if campaign.occurrence_count >= max {
                return false;
            }
        }
        true
    }

    /// Pure clone draft for the next occurrence: fresh id, `created`
    /// status, advanced scheduled_at, incremented occurrence count, and
    /// every other setting copied. Returns None when the campaign is
    /// not recurring, has no base schedule, or should stop.
    pub fn next_occurrence(campaign: &Campaign, now: DateTime<Utc>) -> Option<Campaign> {
        if !campaign.is_recurring() || !Self::should_continue_recurring(campaign, now) {
            return None;
        }
        let scheduled_at = Self::next_scheduled_time(campaign)?;
        Some(Campaign {
            id: Uuid::new_v4(),
            status: CampaignStatus::Created,
            scheduled_at: Some(scheduled_at),
            occurrence_count: campaign.occurrence_count + 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..campaign.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crm_core::types::ScheduledType;

    fn recurring(
        scheduled_at: &str,
        interval: Option<RecurrenceInterval>,
        occurrence_count: u32,
        max_occurrences: Option<u32>,
        recurrence_end_date: Option<DateTime<Utc>>,
    ) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            email_template_id: None,
            name: "Weekly digest".to_string(),
            description: None,
            status: CampaignStatus::Created,
            scheduled_type: ScheduledType::Recurring,
            scheduled_at: Some(scheduled_at.parse().unwrap()),
            recurrence_interval: interval,
            recurrence_end_date,
            max_occurrences,
            occurrence_count,
            custom_variables: Default::default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_weekly_advances_seven_days() {
        let campaign = recurring(
            "2025-01-01T00:00:00Z",
            Some(RecurrenceInterval::Weekly),
            1,
            None,
            None,
        );
        let next = ScheduleEngine::next_scheduled_time(&campaign).unwrap();
        assert_eq!(next, "2025-01-08T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_monthly_advances_one_calendar_month() {
        let campaign = recurring(
            "2025-01-31T09:00:00Z",
            Some(RecurrenceInterval::Monthly),
            1,
            None,
            None,
        );
        let next = ScheduleEngine::next_scheduled_time(&campaign).unwrap();
        // Clamped to the last day of February.
        assert_eq!(next, "2025-02-28T09:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_missing_interval_falls_back_to_one_day() {
        let campaign = recurring("2025-06-01T12:00:00Z", None, 1, None, None);
        let next = ScheduleEngine::next_scheduled_time(&campaign).unwrap();
        assert_eq!(next, "2025-06-02T12:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_occurrence_budget_boundary() {
        let now = Utc::now();
        let one_before = recurring(
            "2025-01-01T00:00:00Z",
            Some(RecurrenceInterval::Daily),
            2,
            Some(3),
            None,
        );
        assert!(ScheduleEngine::should_continue_recurring(&one_before, now));

        let exhausted = recurring(
            "2025-01-01T00:00:00Z",
            Some(RecurrenceInterval::Daily),
            3,
            Some(3),
            None,
        );
        assert!(!ScheduleEngine::should_continue_recurring(&exhausted, now));
    }

    #[test]
    fn test_end_date_stops_recurrence() {
        let past_end = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let campaign = recurring(
            "2019-12-01T00:00:00Z",
            Some(RecurrenceInterval::Weekly),
            1,
            None,
            Some(past_end),
        );
        assert!(!ScheduleEngine::should_continue_recurring(
            &campaign,
            Utc::now()
        ));
    }

    #[test]
    fn test_next_occurrence_clones_forward() {
        let campaign = recurring(
            "2025-01-01T00:00:00Z",
            Some(RecurrenceInterval::Weekly),
            1,
            Some(10),
            None,
        );
        let now = Utc::now();
        let draft = ScheduleEngine::next_occurrence(&campaign, now).unwrap();
        assert_ne!(draft.id, campaign.id);
        assert_eq!(draft.status, CampaignStatus::Created);
        assert_eq!(draft.occurrence_count, 2);
        assert_eq!(draft.name, campaign.name);
        assert_eq!(
            draft.scheduled_at.unwrap(),
            "2025-01-08T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_non_recurring_campaign_never_clones() {
        let mut campaign = recurring(
            "2025-01-01T00:00:00Z",
            Some(RecurrenceInterval::Weekly),
            1,
            None,
            None,
        );
        campaign.scheduled_type = ScheduledType::Scheduled;
        assert!(ScheduleEngine::next_occurrence(&campaign, Utc::now()).is_none());
    }
}
