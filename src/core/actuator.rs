//! # Physical dispense mechanism.
//!
//! The controller treats the dispense hardware as opaque: on entry to Dispensing it
//! calls [`Actuator::actuate_dispense`] once and then waits for the sensor layer to
//! report `dispense_confirmed` or `dispense_error`. An `Err` returned right away means
//! the mechanism refused the command; the worker treats it as an immediate
//! `dispense_error("actuator: ...")`.
//!
//! The call runs on the worker's serialized path, so implementations should only
//! hand the command over (write a register, send a frame) and return.

use async_trait::async_trait;

use crate::error::ActuatorError;

/// Dispense mechanism seam.
#[async_trait]
pub trait Actuator: Send + Sync + 'static {
    /// Starts dispensing one unit of `product_id`.
    async fn actuate_dispense(&self, product_id: &str) -> Result<(), ActuatorError>;
}

/// Accepts every dispense command and does nothing.
///
/// Default actuator for benches where the sensor layer is simulated.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopActuator;

#[async_trait]
impl Actuator for NoopActuator {
    async fn actuate_dispense(&self, product_id: &str) -> Result<(), ActuatorError> {
        tracing::debug!(product = product_id, "dispense actuated");
        Ok(())
    }
}
