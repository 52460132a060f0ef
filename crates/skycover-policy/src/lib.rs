//! # Skycover Policy
//!
//! Policy lifecycle registry and payout schedules for the Skycover
//! settlement engine. A policy moves Pending -> Active and terminates in
//! exactly one of Paid, Expired, or Cancelled; the schedule maps an
//! attested delay to a basis-point fraction of coverage.

pub mod policy;
pub mod registry;
pub mod schedule;

pub use policy::{Policy, PolicyStatus};
pub use registry::{PolicyConfig, PolicyRegistry};
pub use schedule::{PayoutSchedule, PayoutTier};
