use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    actuator::{Actuator, NoopActuator},
    timers::Timers,
    vmc::{Tasks, Vmc},
    worker::Worker,
};
use crate::{
    alerts::{AlertRouter, NotifyChannel},
    broadcast::{Broadcaster, MemoryTransport, StatusSnapshot, Transport},
    catalog::Catalog,
    core::Config,
    events::{Bus, Event},
    gateway::Gateway,
    inventory::InventoryStore,
    machine::Machine,
    subscribers::{EventLog, Subscribe, SubscriberSet},
};

/// Builder for a running controller.
///
/// Every collaborator is optional: without a catalog the machine sells nothing,
/// without a transport snapshots go to an in-process [`MemoryTransport`], without
/// channels alerts are only logged and published as events, and without an actuator
/// dispense commands go to a [`NoopActuator`].
pub struct VmcBuilder {
    cfg: Config,
    catalog: Catalog,
    transport: Option<Arc<dyn Transport>>,
    channels: Vec<Arc<dyn NotifyChannel>>,
    actuator: Option<Arc<dyn Actuator>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl VmcBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            catalog: Catalog::default(),
            transport: None,
            channels: Vec::new(),
            actuator: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the validated bootstrap catalogue (machine identity, products, contacts).
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the status broadcast transport.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the alert notification channels.
    ///
    /// Each channel gets its own delivery worker; recipients are taken from the
    /// catalogue contacts preferring the channel's kind.
    pub fn with_channels(mut self, channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        self.channels = channels;
        self
    }

    /// Sets the dispense actuator.
    pub fn with_actuator(mut self, actuator: Arc<dyn Actuator>) -> Self {
        self.actuator = Some(actuator);
        self
    }

    /// Sets additional event subscribers.
    ///
    /// The built-in [`EventLog`] is always installed in front of them.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the runtime and starts its tasks.
    ///
    /// Spawns the event listener, the subscriber workers, one alert worker per
    /// channel, the broadcaster and the controller worker. Must be called from
    /// within a tokio runtime.
    pub fn build(self) -> Arc<Vmc> {
        let cfg = self.cfg;
        if !cfg.grace_covers_watchdog() {
            warn!(
                grace = ?cfg.grace,
                watchdog = ?cfg.dispense_watchdog,
                "shutdown grace does not cover the dispense watchdog"
            );
        }
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let runtime = CancellationToken::new();
        let listener_token = CancellationToken::new();

        let event_log = Arc::new(EventLog::new(cfg.event_log_capacity_clamped()));
        let mut subs: Vec<Arc<dyn Subscribe>> = vec![event_log.clone()];
        subs.extend(self.subscribers);
        let set = SubscriberSet::new(subs, bus.clone());
        let listener = tokio::spawn(forward_events(bus.subscribe(), set, listener_token.clone()));

        let info = self.catalog.machine.clone();
        let machine = Machine::new(InventoryStore::new(self.catalog.products.iter().cloned()));
        let initial = StatusSnapshot::capture(0, &info, &machine, Utc::now());
        let (status_tx, status_rx) = watch::channel(Arc::new(initial));
        let (committed_tx, committed_rx) = watch::channel(machine.state());

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(MemoryTransport::new()));
        let broadcaster = Broadcaster::spawn(
            transport,
            cfg.topic.clone(),
            cfg.publish_retry,
            status_rx.clone(),
            bus.clone(),
            runtime.child_token(),
        );

        let recipients: HashMap<_, _> = self
            .channels
            .iter()
            .map(|c| (c.kind(), self.catalog.recipients_for(c.kind())))
            .collect();
        for (kind, list) in &recipients {
            if list.is_empty() {
                warn!(channel = %kind, "no contact prefers this channel; its alerts will be dropped");
            }
        }
        let router = AlertRouter::new(
            self.channels,
            info.clone(),
            recipients,
            cfg.alert_retry,
            bus.clone(),
            runtime.child_token(),
        );

        let (inputs_tx, inputs_rx) = mpsc::channel(cfg.queue_capacity_clamped());
        let worker_token = runtime.child_token();
        let worker = Worker {
            machine,
            info: info.clone(),
            inputs: inputs_rx,
            timers: Timers::new(
                cfg.payment_timeout,
                cfg.dispense_watchdog,
                inputs_tx.downgrade(),
                runtime.child_token(),
            ),
            actuator: self
                .actuator
                .unwrap_or_else(|| Arc::new(NoopActuator)),
            router,
            status: status_tx,
            committed: committed_tx,
            bus: bus.clone(),
            token: worker_token.clone(),
        };
        let worker = tokio::spawn(worker.run());

        info!(
            serial = %info.serial_number,
            products = self.catalog.products.len(),
            topic = %cfg.topic,
            "controller started"
        );

        Arc::new(Vmc::new_internal(
            cfg,
            bus,
            Gateway::new(inputs_tx, status_rx.clone(), committed_rx),
            status_rx,
            event_log,
            Tokens {
                runtime,
                worker: worker_token,
                listener: listener_token,
            },
            Tasks {
                worker,
                broadcaster,
                listener,
            },
        ))
    }
}

/// Cancellation handles owned by a [`Vmc`].
pub(crate) struct Tokens {
    /// Parent of every task token except the listener's.
    pub(crate) runtime: CancellationToken,
    /// Stops the controller worker.
    pub(crate) worker: CancellationToken,
    /// Stops the bus listener.
    pub(crate) listener: CancellationToken,
}

/// Forwards bus events to the subscriber set until cancelled.
///
/// Events already on the bus at cancellation are still delivered before the
/// subscriber workers are drained.
async fn forward_events(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            ev = rx.recv() => match ev {
                Ok(ev) => set.emit_arc(Arc::new(ev)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event listener lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = token.cancelled() => break,
        }
    }
    while let Ok(ev) = rx.try_recv() {
        set.emit_arc(Arc::new(ev));
    }
    set.shutdown().await;
}
