//! Notifications module.
//!
//! Provides the notification payload and the `Notifier` trait the alert
//! engine calls after a trigger. Runtime adapters implement the trait to
//! forward notifications to users.

mod notifier;

pub use notifier::*;
