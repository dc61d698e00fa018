//! # Deadline timers scoped to the active transaction.
//!
//! Two timers exist: the payment window (armed on `select`) and the dispense watchdog
//! (armed on entry to Dispensing). Each is a spawned sleep owning a child
//! [`CancellationToken`]; when it elapses it feeds a timer input carrying the
//! transaction id back into the ordered queue.
//!
//! ```text
//! arm_payment(tx) ──► spawn: select { cancelled ─► exit
//!                                   , sleep(payment_timeout) ─► queue.send(PaymentTimeout{tx}) }
//! cancel_all()    ──► cancel both child tokens
//! ```
//!
//! ## Rules
//! - Timers hold only a weak sender: they never keep the input queue open.
//! - A timer that fires concurrently with its cancellation may still deliver its input;
//!   the state machine drops timer inputs whose `tx` is not the active transaction.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::worker::Request;
use crate::machine::Input;

pub(crate) struct Timers {
    payment_timeout: Duration,
    dispense_watchdog: Duration,
    inputs: mpsc::WeakSender<Request>,
    token: CancellationToken,
    payment: Option<CancellationToken>,
    watchdog: Option<CancellationToken>,
}

impl Timers {
    pub(crate) fn new(
        payment_timeout: Duration,
        dispense_watchdog: Duration,
        inputs: mpsc::WeakSender<Request>,
        token: CancellationToken,
    ) -> Self {
        Self {
            payment_timeout,
            dispense_watchdog,
            inputs,
            token,
            payment: None,
            watchdog: None,
        }
    }

    /// (Re)arms the payment window for `tx`.
    pub(crate) fn arm_payment(&mut self, tx: u64) {
        if let Some(old) = self.payment.take() {
            old.cancel();
        }
        let input = Input::PaymentTimeout { tx };
        self.payment = Some(self.spawn(self.payment_timeout, input));
    }

    /// (Re)arms the dispense watchdog for `tx`.
    pub(crate) fn arm_watchdog(&mut self, tx: u64) {
        if let Some(old) = self.watchdog.take() {
            old.cancel();
        }
        let input = Input::DispenseTimeout { tx };
        self.watchdog = Some(self.spawn(self.dispense_watchdog, input));
    }

    pub(crate) fn cancel_all(&mut self) {
        for t in [self.payment.take(), self.watchdog.take()].into_iter().flatten() {
            t.cancel();
        }
    }

    fn spawn(&self, after: Duration, input: Input) -> CancellationToken {
        let token = self.token.child_token();
        let cancelled = token.clone();
        let inputs = self.inputs.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => return,
                _ = tokio::time::sleep(after) => {}
            }
            let Some(queue) = inputs.upgrade() else {
                return;
            };
            debug!(input = input.name(), ?after, "deadline elapsed");
            let _ = queue.send(Request { input, reply: None }).await;
        });
        token
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timers(queue: &mpsc::Sender<Request>) -> Timers {
        Timers::new(
            Duration::from_secs(30),
            Duration::from_secs(15),
            queue.downgrade(),
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_payment_timer_feeds_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut t = timers(&tx);
        t.arm_payment(7);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let req = rx.recv().await.unwrap();
        assert_eq!(req.input, Input::PaymentTimeout { tx: 7 });
        assert!(req.reply.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timers_stay_silent() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut t = timers(&tx);
        t.arm_payment(1);
        t.arm_watchdog(1);
        t.cancel_all();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_deadline() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut t = timers(&tx);
        t.arm_watchdog(1);
        tokio::time::sleep(Duration::from_secs(10)).await;
        t.arm_watchdog(2);

        tokio::time::sleep(Duration::from_secs(16)).await;
        let req = rx.recv().await.unwrap();
        assert_eq!(req.input, Input::DispenseTimeout { tx: 2 });
        assert!(rx.try_recv().is_err());
    }
}
