//! Audio output routing inspection.
//!
//! This module answers the synchronous "is something plugged in right now"
//! question by enumerating output devices, with a coarse legacy fallback
//! when enumeration is unavailable.

pub mod extcon;
pub mod system;

use futures::future::BoxFuture;
use log::debug;
use serde::Serialize;
use smol_str::SmolStr;

use crate::error::Result;

/// Closed set of output device types relevant to accessory detection.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Serialize,
   strum::Display,
   strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputDeviceKind {
   WiredHeadset,
   WiredHeadphones,
   BluetoothSco,
   BluetoothA2dp,
   Other,
}

impl OutputDeviceKind {
   /// Whether this device type counts as a plugged-in accessory.
   pub const fn is_accessory(self) -> bool {
      !matches!(self, Self::Other)
   }
}

/// Read-only snapshot of one enumerated output device. Not retained.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDeviceDescriptor {
   pub kind: OutputDeviceKind,
   pub name: SmolStr,
}

/// Capability seam over the platform's audio routing introspection.
///
/// `output_devices` is the rich path; the two boolean accessors are the
/// coarse legacy signals used when enumeration is unsupported.
pub trait AudioRouting: Send + Sync {
   fn output_devices(&self) -> BoxFuture<'_, Result<Vec<OutputDeviceDescriptor>>>;

   fn is_wired_headset_on(&self) -> BoxFuture<'_, bool>;

   fn is_bluetooth_a2dp_on(&self) -> BoxFuture<'_, bool>;
}

/// Answers whether any audio accessory is currently routed to.
///
/// Attempts device enumeration first; on failure falls back to the legacy
/// accessors combined with logical OR. Never fails: an empty device list is
/// "nothing connected", and a dead fallback reads as `false`.
pub async fn query_current_state(routing: &dyn AudioRouting) -> bool {
   match routing.output_devices().await {
      Ok(devices) => devices.iter().any(|d| d.kind.is_accessory()),
      Err(e) => {
         debug!("Device enumeration unavailable ({e}), using legacy accessors");
         routing.is_wired_headset_on().await || routing.is_bluetooth_a2dp_on().await
      },
   }
}

#[cfg(test)]
pub(crate) mod tests {
   use futures::FutureExt;

   use super::*;
   use crate::error::AccessoryError;

   /// Routing stub with a fixed device list; `devices: None` simulates a
   /// system without enumeration support.
   pub(crate) struct FixedRouting {
      pub devices: Option<Vec<OutputDeviceDescriptor>>,
      pub wired_on: bool,
      pub a2dp_on: bool,
   }

   impl FixedRouting {
      pub fn with_kinds(kinds: &[OutputDeviceKind]) -> Self {
         Self {
            devices: Some(
               kinds
                  .iter()
                  .map(|&kind| OutputDeviceDescriptor {
                     kind,
                     name: SmolStr::new_static("test"),
                  })
                  .collect(),
            ),
            wired_on: false,
            a2dp_on: false,
         }
      }
   }

   impl AudioRouting for FixedRouting {
      fn output_devices(&self) -> BoxFuture<'_, Result<Vec<OutputDeviceDescriptor>>> {
         let result = match &self.devices {
            Some(devices) => Ok(devices.clone()),
            None => Err(AccessoryError::EnumerationUnsupported),
         };
         async move { result }.boxed()
      }

      fn is_wired_headset_on(&self) -> BoxFuture<'_, bool> {
         async move { self.wired_on }.boxed()
      }

      fn is_bluetooth_a2dp_on(&self) -> BoxFuture<'_, bool> {
         async move { self.a2dp_on }.boxed()
      }
   }

   #[tokio::test]
   async fn test_wired_headset_counts_as_plugged() {
      let routing = FixedRouting::with_kinds(&[OutputDeviceKind::WiredHeadset]);
      assert!(query_current_state(&routing).await);
   }

   #[tokio::test]
   async fn test_a2dp_counts_as_plugged() {
      let routing = FixedRouting::with_kinds(&[OutputDeviceKind::BluetoothA2dp]);
      assert!(query_current_state(&routing).await);
   }

   #[tokio::test]
   async fn test_empty_list_is_nothing_connected() {
      let routing = FixedRouting::with_kinds(&[]);
      assert!(!query_current_state(&routing).await);
   }

   #[tokio::test]
   async fn test_other_devices_do_not_count() {
      let routing = FixedRouting::with_kinds(&[OutputDeviceKind::Other, OutputDeviceKind::Other]);
      assert!(!query_current_state(&routing).await);
   }

   #[tokio::test]
   async fn test_fallback_combines_legacy_accessors() {
      let mut routing = FixedRouting {
         devices: None,
         wired_on: true,
         a2dp_on: false,
      };
      assert!(query_current_state(&routing).await);

      routing.wired_on = false;
      routing.a2dp_on = true;
      assert!(query_current_state(&routing).await);

      routing.a2dp_on = false;
      assert!(!query_current_state(&routing).await);
   }
}
