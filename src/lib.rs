//! Billing schedule compliance and dependency gating for a rental-property
//! back office.
//!
//! Landlords configure recurring obligations per property (bills that should
//! arrive, invoices and payables that should go out); the engine computes
//! when each is expected, whether it was met on time, and whether generation
//! work is allowed to proceed yet. The engine owns no timers and makes no
//! outbound calls: fulfillment signals are pushed in, and every status is a
//! pure function of configuration, events, and an injected evaluation date.

pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod telemetry;
