//! Accessory state monitor.
//!
//! This module owns the live subscription to connection-change broadcasts
//! and the classification/notification path. It is a single actor task
//! behind a cheap cloneable handle; registration and unregistration are
//! lifecycle-bound and only ever sequenced through the actor's inbox.

use std::sync::Arc;

use log::{debug, info};
use tokio::{
   select,
   sync::{mpsc, oneshot},
   task::JoinHandle,
};

use crate::{
   broadcast::{
      BroadcastSource,
      intent::{self, ConnectionEvent},
   },
   error::{AccessoryError, Result},
   event::{EventSender, PlugUpdate},
   routing::{self, AudioRouting, OutputDeviceDescriptor},
};

/// Channel buffer size for commands and broadcasts.
const CHANNEL_BUFFER_SIZE: usize = 64;

#[derive(Debug)]
enum MonitorCommand {
   Start(oneshot::Sender<bool>),
   Stop(oneshot::Sender<bool>),
   QueryState(oneshot::Sender<bool>),
   GetOutputDevices(oneshot::Sender<Vec<OutputDeviceDescriptor>>),
   IsSubscribed(oneshot::Sender<bool>),
}

/// Handle to the accessory monitor actor.
#[derive(Clone)]
pub struct AccessoryMonitor {
   inbox: mpsc::Sender<MonitorCommand>,
}

impl AccessoryMonitor {
   pub fn new(
      event_tx: EventSender,
      routing: Arc<dyn AudioRouting>,
      sources: Vec<Arc<dyn BroadcastSource>>,
   ) -> Self {
      let (command_tx, command_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
      tokio::spawn(MonitorActor::new(event_tx, routing, sources, command_rx).run());
      Self { inbox: command_tx }
   }

   /// Subscribes to connection-change broadcasts. Idempotent: returns
   /// `true` if a subscription was created, `false` if one was already
   /// active.
   pub async fn start(&self) -> Result<bool> {
      let (tx, rx) = oneshot::channel();
      self
         .inbox
         .send(MonitorCommand::Start(tx))
         .await
         .map_err(|_| AccessoryError::MonitorShutdown)?;
      rx.await.map_err(|_| AccessoryError::MonitorShutdown)
   }

   /// Releases the broadcast subscription. Idempotent: returns `true` if
   /// a subscription was released, `false` if none was active.
   pub async fn stop(&self) -> Result<bool> {
      let (tx, rx) = oneshot::channel();
      self
         .inbox
         .send(MonitorCommand::Stop(tx))
         .await
         .map_err(|_| AccessoryError::MonitorShutdown)?;
      rx.await.map_err(|_| AccessoryError::MonitorShutdown)
   }

   /// One-shot query of the current plugged-in state via audio routing.
   /// Never fails; reads as `false` once the actor is gone.
   pub async fn query_state(&self) -> bool {
      let (tx, rx) = oneshot::channel();
      if self
         .inbox
         .send(MonitorCommand::QueryState(tx))
         .await
         .is_err()
      {
         return false;
      }
      rx.await.unwrap_or(false)
   }

   /// Snapshot of the currently enumerable output devices. Empty when
   /// enumeration is unavailable.
   pub async fn output_devices(&self) -> Vec<OutputDeviceDescriptor> {
      let (tx, rx) = oneshot::channel();
      if self
         .inbox
         .send(MonitorCommand::GetOutputDevices(tx))
         .await
         .is_err()
      {
         return Vec::new();
      }
      rx.await.unwrap_or_default()
   }

   pub async fn is_subscribed(&self) -> bool {
      let (tx, rx) = oneshot::channel();
      if self
         .inbox
         .send(MonitorCommand::IsSubscribed(tx))
         .await
         .is_err()
      {
         return false;
      }
      rx.await.unwrap_or(false)
   }
}

/// The active broadcast subscription: one running task per source.
///
/// Released exactly once regardless of exit path; dropping it aborts the
/// source tasks.
struct Subscription {
   handles: Vec<JoinHandle<()>>,
}

impl Drop for Subscription {
   fn drop(&mut self) {
      for handle in self.handles.drain(..) {
         handle.abort();
      }
   }
}

struct MonitorActor {
   event_tx: EventSender,
   routing: Arc<dyn AudioRouting>,
   sources: Vec<Arc<dyn BroadcastSource>>,
   command_rx: mpsc::Receiver<MonitorCommand>,
   // The actor keeps its own sender so the broadcast channel stays open
   // across unsubscribe/resubscribe cycles.
   broadcast_tx: mpsc::Sender<ConnectionEvent>,
   broadcast_rx: mpsc::Receiver<ConnectionEvent>,
   subscription: Option<Subscription>,
}

impl MonitorActor {
   fn new(
      event_tx: EventSender,
      routing: Arc<dyn AudioRouting>,
      sources: Vec<Arc<dyn BroadcastSource>>,
      command_rx: mpsc::Receiver<MonitorCommand>,
   ) -> Self {
      let (broadcast_tx, broadcast_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
      Self {
         event_tx,
         routing,
         sources,
         command_rx,
         broadcast_tx,
         broadcast_rx,
         subscription: None,
      }
   }

   async fn run(mut self) {
      loop {
         select! {
            cmd = self.command_rx.recv() => {
               let Some(cmd) = cmd else {
                  break;
               };
               self.handle_command(cmd).await;
            }
            Some(event) = self.broadcast_rx.recv() => {
               self.handle_broadcast(event);
            }
         }
      }

      // Terminal state is unsubscribed.
      self.subscription = None;
      info!("Accessory monitor shut down");
   }

   async fn handle_command(&mut self, cmd: MonitorCommand) {
      match cmd {
         MonitorCommand::Start(reply) => {
            let _ = reply.send(self.handle_start());
         },
         MonitorCommand::Stop(reply) => {
            let _ = reply.send(self.handle_stop());
         },
         MonitorCommand::QueryState(reply) => {
            let _ = reply.send(routing::query_current_state(&*self.routing).await);
         },
         MonitorCommand::GetOutputDevices(reply) => {
            let devices = self.routing.output_devices().await.unwrap_or_default();
            let _ = reply.send(devices);
         },
         MonitorCommand::IsSubscribed(reply) => {
            let _ = reply.send(self.subscription.is_some());
         },
      }
   }

   fn handle_start(&mut self) -> bool {
      if self.subscription.is_some() {
         debug!("start: subscription already active");
         return false;
      }

      let handles = self
         .sources
         .iter()
         .map(|source| {
            info!("Subscribing broadcast source: {}", source.name());
            source.spawn(self.broadcast_tx.clone())
         })
         .collect();
      self.subscription = Some(Subscription { handles });
      true
   }

   fn handle_stop(&mut self) -> bool {
      if self.subscription.take().is_none() {
         debug!("stop: no subscription active");
         return false;
      }
      info!("Broadcast subscription released");
      true
   }

   fn handle_broadcast(&mut self, event: ConnectionEvent) {
      let is_plugged_in = intent::is_plugged_in(&event);
      debug!("Broadcast {event:?} -> plugged_in={is_plugged_in}");

      // Every broadcast is forwarded, consecutive duplicates included;
      // de-duplication is left to the consumer.
      self.event_tx.emit(PlugUpdate { is_plugged_in });
   }
}

#[cfg(test)]
mod tests {
   use std::{
      sync::{
         Mutex,
         atomic::{AtomicUsize, Ordering},
      },
      time::Duration,
   };

   use tokio::time;

   use super::*;
   use crate::{
      broadcast::intent::A2DP_STATE_CONNECTED,
      event::EventBus,
      routing::{OutputDeviceKind, tests::FixedRouting},
   };

   #[derive(Default)]
   struct RecordingBus {
      updates: Mutex<Vec<bool>>,
   }

   impl EventBus for RecordingBus {
      fn emit(&self, update: PlugUpdate) {
         self.updates.lock().unwrap().push(update.is_plugged_in);
      }
   }

   async fn wait_for_updates(bus: &RecordingBus, count: usize) -> Vec<bool> {
      for _ in 0..200 {
         {
            let updates = bus.updates.lock().unwrap();
            if updates.len() >= count {
               return updates.clone();
            }
         }
         time::sleep(Duration::from_millis(10)).await;
      }
      panic!("timed out waiting for {count} updates");
   }

   /// Source stub that records spawn calls and hands the test a sender.
   #[derive(Default)]
   struct StubSource {
      spawned: AtomicUsize,
      sender: Mutex<Option<mpsc::Sender<ConnectionEvent>>>,
   }

   impl BroadcastSource for StubSource {
      fn name(&self) -> &'static str {
         "stub"
      }

      fn spawn(&self, events: mpsc::Sender<ConnectionEvent>) -> JoinHandle<()> {
         self.spawned.fetch_add(1, Ordering::SeqCst);
         *self.sender.lock().unwrap() = Some(events);
         tokio::spawn(std::future::pending::<()>())
      }
   }

   fn test_monitor(
      bus: Arc<RecordingBus>,
      routing: FixedRouting,
   ) -> (AccessoryMonitor, Arc<StubSource>) {
      let source = Arc::new(StubSource::default());
      let sources: Vec<Arc<dyn BroadcastSource>> = vec![source.clone()];
      let monitor = AccessoryMonitor::new(bus, Arc::new(routing), sources);
      (monitor, source)
   }

   #[tokio::test]
   async fn test_start_is_idempotent() {
      let bus = Arc::new(RecordingBus::default());
      let (monitor, source) = test_monitor(bus, FixedRouting::with_kinds(&[]));

      assert!(monitor.start().await.unwrap());
      assert!(!monitor.start().await.unwrap());

      // One subscription, one spawn per source.
      assert_eq!(source.spawned.load(Ordering::SeqCst), 1);
      assert!(monitor.is_subscribed().await);
   }

   #[tokio::test]
   async fn test_stop_without_start_is_a_noop() {
      let bus = Arc::new(RecordingBus::default());
      let (monitor, _source) = test_monitor(bus, FixedRouting::with_kinds(&[]));

      assert!(!monitor.stop().await.unwrap());
      assert!(!monitor.stop().await.unwrap());
      assert!(!monitor.is_subscribed().await);
   }

   #[tokio::test]
   async fn test_start_stop_cycle() {
      let bus = Arc::new(RecordingBus::default());
      let (monitor, source) = test_monitor(bus, FixedRouting::with_kinds(&[]));

      assert!(monitor.start().await.unwrap());
      assert!(monitor.stop().await.unwrap());
      assert!(!monitor.stop().await.unwrap());
      assert!(monitor.start().await.unwrap());

      assert_eq!(source.spawned.load(Ordering::SeqCst), 2);
   }

   #[tokio::test]
   async fn test_broadcasts_are_classified_and_forwarded() {
      let bus = Arc::new(RecordingBus::default());
      let (monitor, source) = test_monitor(bus.clone(), FixedRouting::with_kinds(&[]));
      monitor.start().await.unwrap();

      let tx = source.sender.lock().unwrap().clone().unwrap();
      tx.send(ConnectionEvent::HeadsetPlug { state: 1 })
         .await
         .unwrap();
      tx.send(ConnectionEvent::A2dpStateChanged {
         state: A2DP_STATE_CONNECTED,
      })
      .await
      .unwrap();
      tx.send(ConnectionEvent::BecomingNoisy).await.unwrap();

      assert_eq!(wait_for_updates(&bus, 3).await, vec![true, true, false]);
   }

   #[tokio::test]
   async fn test_duplicate_states_are_not_suppressed() {
      let bus = Arc::new(RecordingBus::default());
      let (monitor, source) = test_monitor(bus.clone(), FixedRouting::with_kinds(&[]));
      monitor.start().await.unwrap();

      let tx = source.sender.lock().unwrap().clone().unwrap();
      for _ in 0..3 {
         tx.send(ConnectionEvent::HeadsetPlug { state: 1 })
            .await
            .unwrap();
      }

      assert_eq!(wait_for_updates(&bus, 3).await, vec![true, true, true]);
   }

   #[tokio::test]
   async fn test_query_reflects_routing() {
      let bus = Arc::new(RecordingBus::default());

      let (monitor, _source) = test_monitor(
         bus.clone(),
         FixedRouting::with_kinds(&[OutputDeviceKind::WiredHeadset]),
      );
      assert!(monitor.query_state().await);

      let (monitor, _source) = test_monitor(bus, FixedRouting::with_kinds(&[]));
      assert!(!monitor.query_state().await);
   }
}
