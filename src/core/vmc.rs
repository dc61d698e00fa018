//! # Vmc: the running controller.
//!
//! A [`Vmc`] is the owned runtime context built by [`VmcBuilder`](crate::VmcBuilder).
//! It hands out [`Gateway`] handles, answers status and recent-events queries, and
//! drives graceful shutdown.
//!
//! ## Shutdown path
//! ```text
//! wait_for_shutdown_signal()              (run() only)
//!   └─► Bus.publish(ShutdownRequested)
//!   └─► Gateway::shutdown()               (ordered behind inputs already queued)
//!   └─► wait up to cfg.grace for snapshot.state == Off
//!          ├─ reached  → Bus.publish(AllStoppedWithin)
//!          └─ timeout  → Bus.publish(GraceExceeded), RuntimeError::GraceExceeded
//!   └─► stop worker (queued inputs answered Unavailable; snapshot sender dropped)
//!   └─► broadcaster makes its final attempt on the last snapshot, then exits
//!   └─► runtime token cancelled (cuts alert retry sleeps), alert workers drained
//!   └─► bus listener stopped, subscriber workers drained
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::builder::Tokens;
use super::shutdown;
use crate::alerts::AlertRouter;
use crate::broadcast::{Broadcaster, StatusSnapshot};
use crate::core::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::gateway::Gateway;
use crate::machine::MachineState;
use crate::subscribers::{EventLog, LogLine};

pub(crate) struct Tasks {
    pub(crate) worker: JoinHandle<AlertRouter>,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) listener: JoinHandle<()>,
}

/// Running vending machine controller.
pub struct Vmc {
    cfg: Config,
    bus: Bus,
    gateway: Gateway,
    status: watch::Receiver<Arc<StatusSnapshot>>,
    event_log: Arc<EventLog>,
    tokens: Tokens,
    tasks: Mutex<Option<Tasks>>,
}

impl Vmc {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        gateway: Gateway,
        status: watch::Receiver<Arc<StatusSnapshot>>,
        event_log: Arc<EventLog>,
        tokens: Tokens,
        tasks: Tasks,
    ) -> Self {
        Self {
            cfg,
            bus,
            gateway,
            status,
            event_log,
            tokens,
            tasks: Mutex::new(Some(tasks)),
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns a gateway handle for the admin and sensor layers.
    pub fn gateway(&self) -> Gateway {
        self.gateway.clone()
    }

    /// Latest committed status snapshot.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.status.borrow())
    }

    /// Current machine state, as of the latest snapshot.
    pub fn state(&self) -> MachineState {
        self.status.borrow().machine_state
    }

    /// Receiver that observes every committed snapshot (latest wins).
    pub fn watch_status(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.status.clone()
    }

    /// The last `n` lines of the recent-events log, oldest first.
    pub fn recent_events(&self, n: usize) -> Vec<LogLine> {
        self.event_log.recent(n)
    }

    /// Subscribes to runtime events directly on the bus.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Runs until an OS termination signal arrives, then shuts down gracefully.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        shutdown::wait_for_shutdown_signal().await?;
        self.shutdown().await
    }

    /// Issues `shutdown`, waits up to [`Config::grace`] for Off and stops every task.
    ///
    /// Tasks are stopped even when the grace period is exceeded; in that case
    /// [`RuntimeError::GraceExceeded`] reports the state the machine was left in.
    /// Calling it again after it returned is a no-op.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let Some(tasks) = self.take_tasks() else {
            return Ok(());
        };

        let state = self.state();
        info!(%state, grace = ?self.cfg.grace, "shutdown requested");
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_state(state));

        let verdict = self.gateway.shutdown().await;
        tracing::debug!(?verdict, "shutdown command");

        let outcome = if self.wait_for_off().await {
            info!("machine off within grace");
            self.bus.publish(
                Event::new(EventKind::AllStoppedWithin).with_state(MachineState::Off),
            );
            Ok(())
        } else {
            let state = self.state();
            error!(%state, grace = ?self.cfg.grace, "machine did not reach off within grace");
            self.bus
                .publish(Event::new(EventKind::GraceExceeded).with_state(state));
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                state,
            })
        };

        self.tokens.worker.cancel();
        let router = tasks.worker.await;
        tasks.broadcaster.join().await;

        self.tokens.runtime.cancel();
        match router {
            Ok(router) => router.shutdown().await,
            Err(e) => error!(error = %e, "controller worker did not stop cleanly"),
        }

        self.tokens.listener.cancel();
        let _ = tasks.listener.await;
        outcome
    }

    async fn wait_for_off(&self) -> bool {
        let mut status = self.status.clone();
        let off = status.wait_for(|s| s.machine_state == MachineState::Off);
        let reached = matches!(tokio::time::timeout(self.cfg.grace, off).await, Ok(Ok(_)));
        reached
    }

    fn take_tasks(&self) -> Option<Tasks> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for Vmc {
    fn drop(&mut self) {
        self.tokens.runtime.cancel();
        self.tokens.listener.cancel();
    }
}
