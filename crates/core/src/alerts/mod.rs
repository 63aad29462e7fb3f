//! Alerts module - domain models, evaluator, services, and traits.

mod alerts_model;
mod alerts_service;
mod alerts_traits;
mod evaluator;
mod monitor;
mod poller;

#[cfg(test)]
pub(crate) mod test_support;

pub use alerts_model::{Alert, AlertCondition, AlertDirection, AlertKind, AlertSpec, NewAlert};
pub use alerts_service::AlertService;
pub use alerts_traits::{AlertMonitorTrait, AlertRepositoryTrait, AlertServiceTrait};
pub use evaluator::{
    condition_met, evaluate, percent_change, trigger_message, AlertTrigger, PricePoint,
};
pub use monitor::{AlertMonitor, CycleSummary, NotifyPolicy};
pub use poller::{AlertPoller, PollerConfig};
