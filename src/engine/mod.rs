//! Fee resolution and calculation core.
//!
//! Pure functions only: no I/O, no logging, no shared state. Callers hand in
//! a snapshot of definitions and get values or typed errors back.

pub mod calculation;
pub mod distribution;
pub mod resolver;
pub mod validation;

pub use calculation::{compute_fee_amount, percent_of, select_tier};
pub use distribution::{distribute_sharers, SharerCalculation, RECONCILIATION_TOLERANCE};
pub use resolver::{
    find_at_level, resolve_fee, trace_resolution, CascadeKeys, CascadeLevel, Resolution,
};
pub use validation::{validate_definition, validate_range_tiers, validate_sharers};
