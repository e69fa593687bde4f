//! `ActuatorSink` – the only write path to hardware.
//!
//! Drivers implement this trait; the motion loop calls
//! [`ActuatorSink::set_target`] exactly once per tick with the composed,
//! safety-clamped pose.  A returned error is fatal to the loop: the system
//! must stop emitting targets rather than keep computing against unreachable
//! hardware.

use swivel_types::{Pose, SwivelError};

/// A pose-controlled actuator stack (head platform + body rotation).
pub trait ActuatorSink: Send {
    /// Stable identifier for this sink, e.g. `"head_platform"` or `"sim"`.
    fn id(&self) -> &str;

    /// Drive the hardware toward `target`.
    ///
    /// Must return quickly; lengthy I/O belongs in the driver's own worker.
    ///
    /// # Errors
    ///
    /// Returns [`SwivelError::ActuatorFault`] when the target cannot be
    /// applied (e.g. the bus is down or the controller is in a fault state).
    fn set_target(&mut self, target: &Pose) -> Result<(), SwivelError>;
}
