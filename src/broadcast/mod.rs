//! Broadcast subscription layer.
//!
//! This module provides the sources of connection-change broadcasts: the
//! wired headphone jack (kernel extcon) and Bluetooth A2DP (BlueZ), plus
//! the event definitions and classification shared between them.

pub mod bluetooth;
pub mod intent;
pub mod wired;

use tokio::{sync::mpsc, task::JoinHandle};

use intent::ConnectionEvent;

/// A source of connection-change broadcasts.
///
/// `spawn` begins delivery of events into the given channel and returns
/// the running task; aborting the handle ends the subscription. A source
/// must not require any teardown beyond the abort.
pub trait BroadcastSource: Send + Sync {
   fn name(&self) -> &'static str;

   fn spawn(&self, events: mpsc::Sender<ConnectionEvent>) -> JoinHandle<()>;
}
