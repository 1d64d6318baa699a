//! Wired headphone-jack broadcast source.
//!
//! Polls the kernel extcon state for headphone-jack transitions and emits
//! plug events on each edge. The plug broadcast behaves like a sticky
//! broadcast: the state observed on subscribe is delivered first, then one
//! event per edge.

use std::{path::PathBuf, time::Duration};

use log::debug;
use tokio::{
   sync::mpsc,
   task::JoinHandle,
   time::{self, MissedTickBehavior},
};

use crate::{
   broadcast::{
      BroadcastSource,
      intent::{ConnectionEvent, PLUG_STATE_CONNECTED, PLUG_STATE_DISCONNECTED},
   },
   config::Config,
   routing::extcon,
};

pub struct WiredJackSource {
   extcon_dir: PathBuf,
   poll_interval: Duration,
}

impl WiredJackSource {
   pub fn new(config: &Config) -> Self {
      Self {
         extcon_dir: config.extcon_dir.clone(),
         poll_interval: config.wired_poll_interval(),
      }
   }

   #[cfg(test)]
   fn with_dir(extcon_dir: PathBuf, poll_interval: Duration) -> Self {
      Self {
         extcon_dir,
         poll_interval,
      }
   }
}

impl BroadcastSource for WiredJackSource {
   fn name(&self) -> &'static str {
      "wired-jack"
   }

   fn spawn(&self, events: mpsc::Sender<ConnectionEvent>) -> JoinHandle<()> {
      let dir = self.extcon_dir.clone();
      let period = self.poll_interval;

      tokio::spawn(async move {
         let mut interval = time::interval(period);
         interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

         let mut last: Option<bool> = None;
         let mut reported_unavailable = false;

         loop {
            interval.tick().await;

            let plugged = match extcon::read_jack_state(&dir) {
               Ok(state) => state.kind().is_some(),
               Err(e) => {
                  if !reported_unavailable {
                     debug!("extcon state unavailable: {e}");
                     reported_unavailable = true;
                  }
                  false
               },
            };

            if last == Some(plugged) {
               continue;
            }

            // Unplugging reroutes audio to the speaker, which delivers the
            // becoming-noisy broadcast ahead of the plug-state one.
            if last == Some(true)
               && !plugged
               && events.send(ConnectionEvent::BecomingNoisy).await.is_err()
            {
               return;
            }

            let state = if plugged {
               PLUG_STATE_CONNECTED
            } else {
               PLUG_STATE_DISCONNECTED
            };
            if events
               .send(ConnectionEvent::HeadsetPlug { state })
               .await
               .is_err()
            {
               return;
            }
            last = Some(plugged);
         }
      })
   }
}
