//! System-backed audio routing implementation.
//!
//! Combines the extcon wired-jack state with BlueZ connected-device
//! inspection into the `AudioRouting` capability seam.

use std::{collections::HashSet, path::PathBuf};

use bluer::{Adapter, Session};
use futures::{FutureExt, future::BoxFuture};
use log::{debug, warn};
use smol_str::SmolStr;
use uuid::Uuid;

use crate::{
   config::Config,
   error::{AccessoryError, Result},
   routing::{AudioRouting, OutputDeviceDescriptor, OutputDeviceKind, extcon},
};

/// A2DP Audio Sink service.
const UUID_AUDIO_SINK: Uuid = Uuid::from_u128(0x0000110b_0000_1000_8000_00805f9b34fb);
/// HSP Headset service.
const UUID_HSP_HEADSET: Uuid = Uuid::from_u128(0x00001108_0000_1000_8000_00805f9b34fb);
/// HFP Hands-Free service.
const UUID_HFP_HANDSFREE: Uuid = Uuid::from_u128(0x0000111e_0000_1000_8000_00805f9b34fb);

/// Classifies a device's advertised services into an output device type.
///
/// Stereo output (A2DP) takes precedence over the voice profiles.
pub(crate) fn classify_uuids(uuids: &HashSet<Uuid>) -> Option<OutputDeviceKind> {
   if uuids.contains(&UUID_AUDIO_SINK) {
      Some(OutputDeviceKind::BluetoothA2dp)
   } else if uuids.contains(&UUID_HSP_HEADSET) || uuids.contains(&UUID_HFP_HANDSFREE) {
      Some(OutputDeviceKind::BluetoothSco)
   } else {
      None
   }
}

pub struct SystemRouting {
   session: Option<Session>,
   adapter: Option<SmolStr>,
   extcon_dir: PathBuf,
}

impl SystemRouting {
   pub async fn new(config: &Config) -> Self {
      let session = match Session::new().await {
         Ok(session) => Some(session),
         Err(e) => {
            warn!("Bluetooth session unavailable, wired-only routing: {e}");
            None
         },
      };

      Self {
         session,
         adapter: config.adapter.clone(),
         extcon_dir: config.extcon_dir.clone(),
      }
   }

   async fn resolve_adapter(&self, session: &Session) -> Result<Adapter> {
      if let Some(name) = &self.adapter {
         return Ok(session.adapter(name)?);
      }
      let names = session.adapter_names().await?;
      let name = names.first().map(String::as_str).unwrap_or("hci0");
      Ok(session.adapter(name)?)
   }

   async fn bluetooth_devices(&self, session: &Session) -> Result<Vec<OutputDeviceDescriptor>> {
      let adapter = self.resolve_adapter(session).await?;
      let mut devices = Vec::new();

      for addr in adapter.device_addresses().await? {
         let Ok(device) = adapter.device(addr) else {
            continue;
         };
         if !device.is_connected().await.unwrap_or(false) {
            continue;
         }
         let Ok(Some(uuids)) = device.uuids().await else {
            continue;
         };
         let Some(kind) = classify_uuids(&uuids) else {
            continue;
         };

         let name = device
            .name()
            .await
            .ok()
            .flatten()
            .map_or_else(|| SmolStr::from(addr.to_string()), SmolStr::from);
         devices.push(OutputDeviceDescriptor { kind, name });
      }

      Ok(devices)
   }
}

impl AudioRouting for SystemRouting {
   fn output_devices(&self) -> BoxFuture<'_, Result<Vec<OutputDeviceDescriptor>>> {
      async move {
         let mut devices = Vec::new();
         let mut any_source = false;

         match extcon::read_jack_state(&self.extcon_dir) {
            Ok(state) => {
               any_source = true;
               if let Some(kind) = state.kind() {
                  devices.push(OutputDeviceDescriptor {
                     kind,
                     name: SmolStr::new_static("headphone jack"),
                  });
               }
            },
            Err(e) => debug!("extcon enumeration failed: {e}"),
         }

         if let Some(session) = &self.session {
            match self.bluetooth_devices(session).await {
               Ok(mut bluetooth) => {
                  any_source = true;
                  devices.append(&mut bluetooth);
               },
               Err(e) => debug!("Bluetooth enumeration failed: {e}"),
            }
         }

         if !any_source {
            return Err(AccessoryError::EnumerationUnsupported);
         }
         Ok(devices)
      }
      .boxed()
   }

   fn is_wired_headset_on(&self) -> BoxFuture<'_, bool> {
      async move {
         extcon::read_jack_state(&self.extcon_dir)
            .map(|state| state.kind().is_some())
            .unwrap_or(false)
      }
      .boxed()
   }

   fn is_bluetooth_a2dp_on(&self) -> BoxFuture<'_, bool> {
      async move {
         let Some(session) = &self.session else {
            return false;
         };
         self
            .bluetooth_devices(session)
            .await
            .map(|devices| {
               devices
                  .iter()
                  .any(|d| d.kind == OutputDeviceKind::BluetoothA2dp)
            })
            .unwrap_or(false)
      }
      .boxed()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_audio_sink_classifies_as_a2dp() {
      let uuids: HashSet<Uuid> = [UUID_AUDIO_SINK, UUID_HFP_HANDSFREE].into_iter().collect();
      assert_eq!(classify_uuids(&uuids), Some(OutputDeviceKind::BluetoothA2dp));
   }

   #[test]
   fn test_voice_profiles_classify_as_sco() {
      let uuids: HashSet<Uuid> = [UUID_HSP_HEADSET].into_iter().collect();
      assert_eq!(classify_uuids(&uuids), Some(OutputDeviceKind::BluetoothSco));

      let uuids: HashSet<Uuid> = [UUID_HFP_HANDSFREE].into_iter().collect();
      assert_eq!(classify_uuids(&uuids), Some(OutputDeviceKind::BluetoothSco));
   }

   #[test]
   fn test_non_audio_devices_are_unclassified() {
      let uuids: HashSet<Uuid> = [Uuid::from_u128(0x0000110a_0000_1000_8000_00805f9b34fb)]
         .into_iter()
         .collect();
      assert_eq!(classify_uuids(&uuids), None);
      assert_eq!(classify_uuids(&HashSet::new()), None);
   }
}
