//! Event handling system for accessory-state updates.
//!
//! This module provides the event infrastructure for notifying the
//! application layer when the plugged-in state of an audio accessory
//! changes.

use std::sync::Arc;

/// Name of the outbound notification, exported to consumers once at
/// service startup via the `event_name` property.
pub const AUDIO_CHANGED_NOTIFICATION: &str = "AudioChanged";

/// Payload of the outbound notification.
///
/// Each update replaces the previous one; there is no identity or history
/// attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlugUpdate {
   pub is_plugged_in: bool,
}

/// Trait for implementing event emission.
pub trait EventBus: Send + Sync {
   /// Emits an update to all registered listeners.
   fn emit(&self, update: PlugUpdate);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventBus>;
