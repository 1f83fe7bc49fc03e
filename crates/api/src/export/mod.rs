//! Renderers that turn a [`MonitorSnapshot`](slotwatch_collector::monitor::MonitorSnapshot)
//! into wire formats.

pub mod exposition;
pub mod status;
