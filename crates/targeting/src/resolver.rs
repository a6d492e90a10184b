//! Resolves an audience's filter set to the matching contacts of its
//! own tenant.

use std::sync::Arc;

use tracing::debug;

use crm_core::types::{Audience, Contact};
use crm_store::CrmStore;

/// Evaluates audience filters against the contact store.
///
/// The resolver is parameterized by the audience's organization — a
/// resolution can never see contacts outside that tenant. Results come
/// back in deterministic (created_at, id) order, so resolving the same
/// audience twice without data mutation yields identical sequences.
#[derive(Clone)]
pub struct AudienceResolver {
    store: Arc<CrmStore>,
}

impl AudienceResolver {
    pub fn new(store: Arc<CrmStore>) -> Self {
        Self { store }
    }

    /// Lazily filtered, restartable sequence of matching contacts. An
    /// audience with an empty filter set resolves every kept contact in
    /// the tenant.
    pub fn contacts(&self, audience: &Audience) -> impl Iterator<Item = Contact> {
        let snapshot = self.store.contacts_for_organization(audience.organization_id);
        debug!(
            audience_id = %audience.id,
            tenant_contacts = snapshot.len(),
            "resolving audience"
        );
        let filters = audience.filters.clone();
        snapshot
            .into_iter()
            .filter(move |contact| filters.matches(&contact.preferences))
    }

    pub fn count(&self, audience: &Audience) -> usize {
        self.contacts(audience).count()
    }
}
