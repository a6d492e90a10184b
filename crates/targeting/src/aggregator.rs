//! Merges resolved contacts across a campaign's audiences, one entry
//! per distinct contact, attributed to the first audience that matched
//! it in attachment order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crm_core::types::{Audience, Campaign, Contact};
use crm_store::CrmStore;

use crate::resolver::AudienceResolver;

#[derive(Clone)]
pub struct ContactAggregator {
    store: Arc<CrmStore>,
    resolver: AudienceResolver,
}

impl ContactAggregator {
    pub fn new(store: Arc<CrmStore>) -> Self {
        let resolver = AudienceResolver::new(Arc::clone(&store));
        Self { store, resolver }
    }

    /// Deduplicated (contact, first-matching audience) pairs for a
    /// campaign, walking its audiences in attachment order. A contact
    /// matched by several audiences appears once, attributed to the
    /// earliest.
    pub fn unique_contacts(&self, campaign: &Campaign) -> Vec<(Contact, Audience)> {
        let audiences = self.store.audiences_for_campaign(campaign.id);
        let pairs = self.dedup_walk(&audiences);
        debug!(
            campaign_id = %campaign.id,
            audiences = audiences.len(),
            unique_contacts = pairs.len(),
            "aggregated campaign contacts"
        );
        pairs
    }

    pub fn total_count(&self, campaign: &Campaign) -> usize {
        self.unique_contacts(campaign).len()
    }

    /// Pre-save estimation over raw audience ids: identical dedup
    /// semantics, plain contacts. Ids are resolved within the given
    /// tenant only; anything unknown there is ignored.
    pub fn preview(&self, audience_ids: &[Uuid], organization_id: Uuid) -> Vec<Contact> {
        let audiences: Vec<Audience> = audience_ids
            .iter()
            .filter_map(|id| self.store.get_audience(organization_id, *id))
            .collect();
        self.dedup_walk(&audiences)
            .into_iter()
            .map(|(contact, _)| contact)
            .collect()
    }

    fn dedup_walk(&self, audiences: &[Audience]) -> Vec<(Contact, Audience)> {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut pairs = Vec::new();
        for audience in audiences {
            for contact in self.resolver.contacts(audience) {
                if seen.insert(contact.id) {
                    pairs.push((contact, audience.clone()));
                }
            }
        }
        pairs
    }
}
