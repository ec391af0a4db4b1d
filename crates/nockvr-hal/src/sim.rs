//! In-process doubles for the controller hook and feedback outputs.
//!
//! Both types are cheap handles over shared state: box one clone into the
//! runtime and keep another to press buttons and inspect what was emitted.
//! They let the whole nocking stack run headless in tests and in the
//! `nockvr replay` command.
//!
//! # Example
//!
//! ```rust
//! use nockvr_hal::input::SyntheticInputInjector;
//! use nockvr_hal::sim::SimInputBackend;
//! use nockvr_types::{ButtonId, Hand, InputAddress};
//!
//! let sim = SimInputBackend::new();
//! let mut injector = SyntheticInputInjector::new(Box::new(sim.clone()));
//!
//! injector
//!     .set_down(InputAddress::press(Hand::Right, ButtonId::Trigger))
//!     .expect("sim backend accepts overrides");
//! assert_eq!(sim.fake_down_count(), 1);
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nockvr_perception::{Transform3D, Vec3};
use nockvr_types::{ActionChannel, ButtonId, ButtonState, Hand, InputAddress, NockError};

use crate::feedback::{FeedbackSink, VisualEffect};
use crate::input::InputBackend;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// Input backend
// ────────────────────────────────────────────────────────────────────────────

/// One call received by [`SimInputBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOp {
    SetDown(InputAddress),
    ClearDown(InputAddress),
    Momentary(InputAddress, ButtonState),
}

#[derive(Debug, Default)]
struct SimInputState {
    pressed: BTreeSet<(Hand, ButtonId, ActionChannel)>,
    fake_down: BTreeSet<InputAddress>,
    ops: Vec<InputOp>,
    reject: bool,
}

/// Simulated controller hook.  Records every synthetic operation.
#[derive(Debug, Clone, Default)]
pub struct SimInputBackend {
    state: Arc<Mutex<SimInputState>>,
}

impl SimInputBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the physical state of a press-channel button.
    pub fn set_pressed(&self, hand: Hand, button: ButtonId, down: bool) {
        let mut state = lock(&self.state);
        let key = (hand, button, ActionChannel::Press);
        if down {
            state.pressed.insert(key);
        } else {
            state.pressed.remove(&key);
        }
    }

    /// Make every subsequent synthetic operation fail.
    pub fn set_reject(&self, reject: bool) {
        lock(&self.state).reject = reject;
    }

    pub fn ops(&self) -> Vec<InputOp> {
        lock(&self.state).ops.clone()
    }

    pub fn clear_ops(&self) {
        lock(&self.state).ops.clear();
    }

    pub fn is_fake_down(&self, address: InputAddress) -> bool {
        lock(&self.state).fake_down.contains(&address)
    }

    pub fn fake_down_count(&self) -> usize {
        lock(&self.state).fake_down.len()
    }

    fn check(state: &SimInputState, address: InputAddress) -> Result<(), NockError> {
        if state.reject {
            Err(NockError::InputRejected {
                address,
                details: "simulated hook rejection".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl InputBackend for SimInputBackend {
    fn set_fake_state(&mut self, address: InputAddress) -> Result<(), NockError> {
        let mut state = lock(&self.state);
        Self::check(&state, address)?;
        state.fake_down.insert(address);
        state.ops.push(InputOp::SetDown(address));
        Ok(())
    }

    fn clear_fake_state(&mut self, address: InputAddress) -> Result<(), NockError> {
        let mut state = lock(&self.state);
        Self::check(&state, address)?;
        state.fake_down.remove(&address);
        state.ops.push(InputOp::ClearDown(address));
        Ok(())
    }

    fn send_fake_event(
        &mut self,
        address: InputAddress,
        button_state: ButtonState,
    ) -> Result<(), NockError> {
        let mut state = lock(&self.state);
        Self::check(&state, address)?;
        state.ops.push(InputOp::Momentary(address, button_state));
        Ok(())
    }

    fn is_pressed(&self, hand: Hand, button: ButtonId, channel: ActionChannel) -> bool {
        lock(&self.state).pressed.contains(&(hand, button, channel))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Feedback sink
// ────────────────────────────────────────────────────────────────────────────

/// One output emitted through [`SimFeedbackSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackRecord {
    Vibrate { hand: Hand, waveform: Vec<f32> },
    Sound(String),
    /// Effect and the world position it was attached at.
    Visual { effect: VisualEffect, at: Vec3 },
}

#[derive(Debug)]
struct SimFeedbackState {
    known_sounds: BTreeSet<String>,
    records: Vec<FeedbackRecord>,
}

/// Simulated haptics/audio/VFX output.  Only sounds registered with
/// [`SimFeedbackSink::with_sound`] resolve.
#[derive(Debug, Clone)]
pub struct SimFeedbackSink {
    state: Arc<Mutex<SimFeedbackState>>,
}

impl Default for SimFeedbackSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SimFeedbackSink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimFeedbackState {
                known_sounds: BTreeSet::new(),
                records: Vec::new(),
            })),
        }
    }

    pub fn with_sound(self, sound_id: &str) -> Self {
        lock(&self.state).known_sounds.insert(sound_id.to_string());
        self
    }

    pub fn records(&self) -> Vec<FeedbackRecord> {
        lock(&self.state).records.clone()
    }
}

impl FeedbackSink for SimFeedbackSink {
    fn vibrate(&mut self, hand: Hand, waveform: &[f32]) -> Result<(), NockError> {
        lock(&self.state).records.push(FeedbackRecord::Vibrate {
            hand,
            waveform: waveform.to_vec(),
        });
        Ok(())
    }

    fn play_sound(&mut self, sound_id: &str) -> Result<(), NockError> {
        let mut state = lock(&self.state);
        if !state.known_sounds.contains(sound_id) {
            return Err(NockError::ResourceUnresolved {
                channel: "sound".to_string(),
                id: sound_id.to_string(),
            });
        }
        state.records.push(FeedbackRecord::Sound(sound_id.to_string()));
        Ok(())
    }

    fn apply_visual(
        &mut self,
        effect: VisualEffect,
        anchor: &Transform3D,
    ) -> Result<(), NockError> {
        lock(&self.state).records.push(FeedbackRecord::Visual {
            effect,
            at: anchor.translation,
        });
        Ok(())
    }
}
