//! Connection-change event definitions and classification.
//!
//! This module contains the event shapes delivered by the broadcast
//! sources together with the pure classification of each event into a
//! plugged-in boolean. The integer state values follow the Android
//! `BluetoothProfile` / headset-plug broadcast conventions, which the
//! sources normalize their payloads to.

/// Headset-plug extra state meaning "plugged".
pub const PLUG_STATE_CONNECTED: i32 = 1;
/// Headset-plug extra state meaning "unplugged".
pub const PLUG_STATE_DISCONNECTED: i32 = 0;

// A2DP profile connection states.
pub const A2DP_STATE_DISCONNECTED: i32 = 0;
pub const A2DP_STATE_CONNECTING: i32 = 1;
pub const A2DP_STATE_CONNECTED: i32 = 2;
pub const A2DP_STATE_DISCONNECTING: i32 = 3;

/// A connection-change event observed by a broadcast source.
///
/// Transient: constructed by a source, classified, and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
   /// Audio is about to reroute to the built-in speaker (accessory going
   /// away). Carries no state.
   BecomingNoisy,
   /// Wired jack transition; `state` is 1 for plugged, 0 for unplugged.
   HeadsetPlug { state: i32 },
   /// Bluetooth A2DP profile transition; `state` is one of the
   /// `A2DP_STATE_*` values.
   A2dpStateChanged { state: i32 },
}

/// Classifies an event into the plugged-in boolean it represents.
///
/// Pure function, no side effects beyond the return value.
pub const fn is_plugged_in(event: &ConnectionEvent) -> bool {
   match event {
      ConnectionEvent::BecomingNoisy => false,
      ConnectionEvent::HeadsetPlug { state } => *state == PLUG_STATE_CONNECTED,
      ConnectionEvent::A2dpStateChanged { state } => *state == A2DP_STATE_CONNECTED,
   }
}
