//! `slotwatch-collector` -- metric producers and the shared state they feed.
//!
//! - [`monitor::Monitor`] owns the ring buffers, slot health and alert
//!   state, and dispatches alert notifications.
//! - [`poller`] checks each deployment slot's `/health` on a ticker.
//! - [`ingestor`] keeps a WebSocket open to the live game instance and
//!   feeds its frames into the monitor.

pub mod frames;
pub mod ingestor;
pub mod monitor;
pub mod poller;
