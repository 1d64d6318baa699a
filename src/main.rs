//! Audio accessory state D-Bus service.
//!
//! This service tracks whether an audio output accessory (wired headset
//! jack or Bluetooth A2DP device) is currently connected, forwards each
//! connection-change broadcast as an `AudioChanged` signal, and answers
//! one-shot plugged-in queries over D-Bus.

use std::{sync::Arc, time::Duration};

use crossbeam::queue::SegQueue;
use log::{info, warn};
use tokio::{signal, sync::Notify, time};
use zbus::{Connection, connection, object_server::InterfaceRef};

use broadcast::{BroadcastSource, bluetooth::BluetoothSource, wired::WiredJackSource};
use dbus::{AccessoryService, AccessoryServiceSignals};
use event::{EventBus, PlugUpdate};
use monitor::AccessoryMonitor;
use routing::system::SystemRouting;

mod broadcast;
mod config;
mod dbus;
mod error;
mod event;
mod monitor;
mod routing;

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   info!("Starting headsetd D-Bus service...");

   // Load configuration
   let config = config::Config::load()?;

   // Create event channel
   let event_bus = EventProcessor::new();

   // Create the monitor with its broadcast sources and routing backend
   let routing = Arc::new(SystemRouting::new(&config).await);
   let sources: Vec<Arc<dyn BroadcastSource>> = vec![
      Arc::new(WiredJackSource::new(&config)),
      Arc::new(BluetoothSource::new(&config)),
   ];
   let monitor = AccessoryMonitor::new(event_bus.clone(), routing, sources);

   // Create D-Bus service
   let service = AccessoryService::new(monitor.clone());

   // Build D-Bus connection
   let connection = connection::Builder::session()?
      .name("org.headsetd")?
      .serve_at("/org/headsetd/monitor", service)?
      .build()
      .await?;

   info!("headsetd D-Bus service started at org.headsetd");

   // Start event processor
   event_bus.spawn_dispatcher(connection).await?;

   // Subscribe on initialize
   monitor.start().await?;

   // Wait for shutdown signal
   signal::ctrl_c().await?;
   info!("Shutting down headsetd service...");

   // Unsubscribe on teardown
   monitor.stop().await?;

   Ok(())
}

struct EventProcessor {
   queue: SegQueue<PlugUpdate>,
   notifier: Notify,
}

impl EventProcessor {
   fn new() -> Arc<Self> {
      Arc::new(Self {
         queue: SegQueue::new(),
         notifier: Notify::new(),
      })
   }
}

impl EventProcessor {
   async fn recv(self: &Arc<Self>) -> Option<PlugUpdate> {
      loop {
         if let Some(update) = self.queue.pop() {
            return Some(update);
         }
         let notify = self.notifier.notified();
         if let Some(update) = self.queue.pop() {
            return Some(update);
         }
         if Arc::strong_count(self) == 1 {
            return None;
         }
         let _ = time::timeout(Duration::from_secs(1), notify).await;
      }
   }

   async fn spawn_dispatcher(self: Arc<Self>, connection: Connection) -> Result<()> {
      let iface = connection
         .object_server()
         .interface::<_, AccessoryService>("/org/headsetd/monitor")
         .await?;
      tokio::spawn(async move {
         while let Some(update) = self.recv().await {
            // A failed dispatch means the connection is torn down; the
            // update is dropped rather than queued or retried.
            if let Err(e) = dispatch(&iface, update).await {
               warn!("Error dispatching event: {e}");
            }
         }
      });

      Ok(())
   }
}

async fn dispatch(iface: &InterfaceRef<AccessoryService>, update: PlugUpdate) -> Result<()> {
   iface.audio_changed(update.is_plugged_in).await?;
   Ok(())
}

impl EventBus for EventProcessor {
   fn emit(&self, update: PlugUpdate) {
      self.queue.push(update);
      self.notifier.notify_waiters();
   }
}
