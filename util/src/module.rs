//! Cyclic module interface
//!
//! Anything the executable runs once per control cycle exposes itself
//! through [`State`], so the main loop can feed it inputs and collect its
//! outputs without knowing what it does.

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A module processed once per cycle.
pub trait State {
    /// Inputs gathered by the executable before calling the module.
    type InputData;
    /// Values handed on to later stages of the cycle.
    type OutputData;
    /// Diagnostics describing how this cycle went.
    type StatusReport;
    /// Failure which stops the cycle.
    type ProcError;

    /// Process one cycle.
    ///
    /// Recoverable problems are reported in the status report, only failures
    /// the caller has to act on are returned as errors.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
