//! Core domain model for the CRM: tenants, contacts, audiences,
//! campaigns, preference/filter vocabularies, template rendering,
//! error taxonomy, and configuration.

pub mod config;
pub mod error;
pub mod filters;
pub mod templates;
pub mod types;
pub mod validate;
pub mod vocab;

pub use error::{CrmError, CrmResult, ValidationErrors};
pub use filters::{FilterSet, Preferences};
pub use templates::{EmailTemplate, RenderedEmail};
