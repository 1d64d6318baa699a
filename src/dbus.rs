use zbus::{interface, object_server::SignalEmitter};

use crate::{event::AUDIO_CHANGED_NOTIFICATION, monitor::AccessoryMonitor};

pub struct AccessoryService {
   monitor: AccessoryMonitor,
}

impl AccessoryService {
   pub const fn new(monitor: AccessoryMonitor) -> Self {
      Self { monitor }
   }
}

#[interface(name = "org.headsetd.Monitor")]
impl AccessoryService {
   /// One-shot query of the current plugged-in state. Resolve-only: this
   /// call never fails.
   async fn is_plugged_in(&self) -> bool {
      self.monitor.query_state().await
   }

   async fn get_output_devices(&self) -> zbus::fdo::Result<String> {
      let devices = self.monitor.output_devices().await;
      Ok(serde_json::to_string(&devices).unwrap())
   }

   async fn start_monitoring(&self) -> zbus::fdo::Result<bool> {
      self
         .monitor
         .start()
         .await
         .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
   }

   async fn stop_monitoring(&self) -> zbus::fdo::Result<bool> {
      self
         .monitor
         .stop()
         .await
         .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
   }

   // Signals
   #[zbus(signal)]
   pub async fn audio_changed(
      emitter: &SignalEmitter<'_>,
      is_plugged_in: bool,
   ) -> zbus::Result<()>;

   // Properties
   #[zbus(property)]
   async fn event_name(&self) -> String {
      AUDIO_CHANGED_NOTIFICATION.to_string()
   }

   #[zbus(property)]
   async fn monitoring(&self) -> bool {
      self.monitor.is_subscribed().await
   }
}
