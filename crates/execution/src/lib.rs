//! Campaign execution: readiness checks, transactional preparation,
//! recurring schedule math, the cross-tenant due sweep, and the
//! delivery handoff seam.

pub mod delivery;
pub mod orchestrator;
pub mod recurrence;
pub mod scheduler;

pub use delivery::{DeliverySink, InMemoryDeliveryQueue};
pub use orchestrator::{CampaignExecutor, PrepareReport};
pub use recurrence::ScheduleEngine;
pub use scheduler::{CampaignScheduler, SweepSummary};
