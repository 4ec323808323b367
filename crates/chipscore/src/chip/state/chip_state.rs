//! Chip state tracking trait.
//!
//! This module provides the `ChipState` trait implemented by the register
//! models of each supported chip.

/// Base trait for chip state tracking
///
/// Implementors own a chip's register file and derived per-channel state,
/// and update it from raw register writes as they appear in the log.
pub trait ChipState {
    /// One raw write as recorded in a frame.
    type Write: Copy;

    /// Update state from a register write
    ///
    /// # Arguments
    ///
    /// * `write` - The write to apply
    fn apply(&mut self, write: Self::Write);

    /// Apply every write of a frame in order.
    fn apply_all(&mut self, writes: &[Self::Write]) {
        for &w in writes {
            self.apply(w);
        }
    }

    /// Reset all state
    ///
    /// Returns the chip to its power-on state.
    fn reset(&mut self);

    /// Get the number of channels this chip has
    fn channel_count(&self) -> usize;
}
