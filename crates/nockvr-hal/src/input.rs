//! Synthetic input injection.
//!
//! The controller hook is abstracted behind [`InputBackend`]; the rest of the
//! system only talks to [`SyntheticInputInjector`], which remembers every
//! slot it has asserted so [`SyntheticInputInjector::clear_all`] can always
//! return the input layer to a clean state.

use std::collections::BTreeSet;

use nockvr_types::{ActionChannel, ButtonId, ButtonState, Hand, InputAddress, NockError};
use tracing::{debug, warn};

/// The external input layer: real button state plus synthetic overrides.
pub trait InputBackend: Send {
    /// Assert a persistent synthetic state on `address` until cleared.
    ///
    /// # Errors
    ///
    /// Returns [`NockError::InputRejected`] if the hook refuses the override.
    fn set_fake_state(&mut self, address: InputAddress) -> Result<(), NockError>;

    /// Remove a synthetic state previously asserted on `address`.
    fn clear_fake_state(&mut self, address: InputAddress) -> Result<(), NockError>;

    /// Emit a single synthetic edge without holding it.
    fn send_fake_event(&mut self, address: InputAddress, state: ButtonState)
    -> Result<(), NockError>;

    /// Whether the physical button is currently held.
    fn is_pressed(&self, hand: Hand, button: ButtonId, channel: ActionChannel) -> bool;
}

/// Tracks and drives the synthetic states this system owns.
pub struct SyntheticInputInjector {
    backend: Box<dyn InputBackend>,
    asserted: BTreeSet<InputAddress>,
}

impl SyntheticInputInjector {
    pub fn new(backend: Box<dyn InputBackend>) -> Self {
        Self {
            backend,
            asserted: BTreeSet::new(),
        }
    }

    /// Assert `address` down.  Re-asserting an already held slot is a no-op.
    pub fn set_down(&mut self, address: InputAddress) -> Result<(), NockError> {
        if self.asserted.contains(&address) {
            return Ok(());
        }
        self.backend.set_fake_state(address)?;
        self.asserted.insert(address);
        debug!(?address, "synthetic input asserted");
        Ok(())
    }

    /// Clear one asserted slot.  Clearing a slot we never asserted is a no-op.
    ///
    /// The slot stays tracked when the backend rejects the clear, so a later
    /// [`clear_all`](Self::clear_all) retries it.
    pub fn clear_down(&mut self, address: InputAddress) -> Result<(), NockError> {
        if !self.asserted.contains(&address) {
            return Ok(());
        }
        self.backend.clear_fake_state(address)?;
        self.asserted.remove(&address);
        debug!(?address, "synthetic input cleared");
        Ok(())
    }

    /// Clear every slot this injector has asserted.
    ///
    /// Every slot is attempted.  Slots the backend refused stay tracked for
    /// the next call and the first error is returned.
    pub fn clear_all(&mut self) -> Result<(), NockError> {
        let mut first_err = None;
        let mut refused = BTreeSet::new();
        for address in std::mem::take(&mut self.asserted) {
            if let Err(e) = self.backend.clear_fake_state(address) {
                warn!(?address, error = %e, "failed to clear synthetic input, will retry");
                refused.insert(address);
                first_err.get_or_insert(e);
            }
        }
        self.asserted = refused;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Emit a momentary release edge on `address` without asserting a hold.
    pub fn send_momentary(&mut self, address: InputAddress) -> Result<(), NockError> {
        debug!(?address, "synthetic release edge");
        self.backend.send_fake_event(address, ButtonState::Up)
    }

    pub fn is_asserted(&self, address: InputAddress) -> bool {
        self.asserted.contains(&address)
    }

    /// Number of slots currently asserted.
    pub fn asserted_count(&self) -> usize {
        self.asserted.len()
    }

    /// Physical button state, read through the backend.
    pub fn is_pressed(&self, hand: Hand, button: ButtonId, channel: ActionChannel) -> bool {
        self.backend.is_pressed(hand, button, channel)
    }
}
