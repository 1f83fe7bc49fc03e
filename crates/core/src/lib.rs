//! Domain logic for the slotwatch deployment monitor.
//!
//! Everything in this crate is pure: no network, no clocks beyond the
//! timestamps callers pass in, no shared state. The collector crate owns
//! the mutable instances of these types.

pub mod alert;
pub mod error;
pub mod health;
pub mod metric_names;
pub mod ring_buffer;
pub mod sample;
pub mod thresholds;
pub mod types;
