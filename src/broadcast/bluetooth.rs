//! Bluetooth A2DP broadcast source.
//!
//! Watches BlueZ for audio-sink devices connecting and disconnecting and
//! emits the corresponding A2DP profile transitions. Connection changes
//! are detected through periodic scanning since BlueZ adapter events do
//! not cover per-device connection state.

use std::{collections::HashSet, time::Duration};

use bluer::{Adapter, AdapterEvent, Address, Session};
use futures::stream::StreamExt;
use log::{debug, info, warn};
use smol_str::SmolStr;
use tokio::{
   select,
   sync::mpsc,
   task::JoinHandle,
   time::{self, MissedTickBehavior},
};

use crate::{
   broadcast::{
      BroadcastSource,
      intent::{A2DP_STATE_CONNECTED, A2DP_STATE_DISCONNECTED, ConnectionEvent},
   },
   config::Config,
   error::{AccessoryError, Result},
   routing::{OutputDeviceKind, system},
};

/// Delay before re-acquiring the Bluetooth session after a failure.
const SESSION_RETRY_DELAY: Duration = Duration::from_secs(10);

pub struct BluetoothSource {
   adapter: Option<SmolStr>,
   check_interval: Duration,
}

impl BluetoothSource {
   pub fn new(config: &Config) -> Self {
      Self {
         adapter: config.adapter.clone(),
         check_interval: config.bluetooth_check_interval(),
      }
   }
}

impl BroadcastSource for BluetoothSource {
   fn name(&self) -> &'static str {
      "bluetooth-a2dp"
   }

   fn spawn(&self, events: mpsc::Sender<ConnectionEvent>) -> JoinHandle<()> {
      let adapter_name = self.adapter.clone();
      let period = self.check_interval;

      tokio::spawn(async move {
         loop {
            match Session::new().await {
               Ok(session) => {
                  if let Err(e) =
                     watch_adapter(&session, adapter_name.as_deref(), period, &events).await
                  {
                     warn!("Bluetooth watch failed: {e}");
                  }
               },
               Err(e) => {
                  warn!("Failed to create Bluetooth session: {e}");
               },
            }

            if events.is_closed() {
               return;
            }
            time::sleep(SESSION_RETRY_DELAY).await;
         }
      })
   }
}

async fn resolve_adapter(session: &Session, preferred: Option<&str>) -> Result<Adapter> {
   if let Some(name) = preferred {
      return Ok(session.adapter(name)?);
   }
   let names = session.adapter_names().await?;
   let name = names.first().map(String::as_str).unwrap_or("hci0");
   Ok(session.adapter(name)?)
}

async fn watch_adapter(
   session: &Session,
   preferred: Option<&str>,
   period: Duration,
   events: &mpsc::Sender<ConnectionEvent>,
) -> Result<()> {
   let adapter = resolve_adapter(session, preferred).await?;

   if let Ok(powered) = adapter.is_powered().await
      && !powered
   {
      adapter.set_powered(true).await?;
      info!("Powered on adapter: {}", adapter.name());
   }

   let mut stream = adapter.events().await?;

   let mut interval = time::interval(period);
   interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

   let mut connected: HashSet<Address> = HashSet::new();

   loop {
      select! {
         _ = interval.tick() => {
            scan_connected(&adapter, &mut connected, events).await?;
         }
         event = stream.next() => {
            match event {
               Some(AdapterEvent::DeviceAdded(_) | AdapterEvent::DeviceRemoved(_)) => {
                  scan_connected(&adapter, &mut connected, events).await?;
               },
               Some(_) => {},
               None => {
                  // Adapter is probably gone; the caller re-acquires.
                  warn!("Adapter event stream ended: {}", adapter.name());
                  return Ok(());
               },
            }
         }
      }
   }
}

async fn scan_connected(
   adapter: &Adapter,
   connected: &mut HashSet<Address>,
   events: &mpsc::Sender<ConnectionEvent>,
) -> Result<()> {
   let mut current = HashSet::new();

   for addr in adapter.device_addresses().await? {
      let Ok(device) = adapter.device(addr) else {
         continue;
      };
      if device.is_connected().await.unwrap_or(false)
         && let Ok(Some(uuids)) = device.uuids().await
         && system::classify_uuids(&uuids) == Some(OutputDeviceKind::BluetoothA2dp)
      {
         current.insert(addr);
      }
   }

   for addr in current.difference(connected) {
      debug!("A2DP device connected: {addr}");
      events
         .send(ConnectionEvent::A2dpStateChanged {
            state: A2DP_STATE_CONNECTED,
         })
         .await
         .map_err(|_| AccessoryError::MonitorShutdown)?;
   }

   for addr in connected.difference(&current) {
      debug!("A2DP device disconnected: {addr}");
      events
         .send(ConnectionEvent::A2dpStateChanged {
            state: A2DP_STATE_DISCONNECTED,
         })
         .await
         .map_err(|_| AccessoryError::MonitorShutdown)?;
   }

   *connected = current;
   Ok(())
}
