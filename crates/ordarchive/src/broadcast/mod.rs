//! Broadcasting of archive changes to live listing views.

pub mod order_events;

pub use order_events::{OrderEvent, OrderEventBroadcaster, OrderEventKind};
