//! Blocked-action feedback: haptics, sound, and a visual effect.
//!
//! [`FeedbackDispatcher`] rate-limits triggers and fans each one out to the
//! three channels of a [`FeedbackSink`].  Channels are independent: a sound
//! id that does not resolve never prevents the vibration or the effect, and
//! a missing player anchor only drops the effect.

use std::time::Duration;

use nockvr_perception::{Anchor, Transform3D};
use nockvr_types::{Hand, NockError};
use tracing::{debug, warn};

/// Minimum spacing between two dispatched feedback bursts.
pub const MIN_FEEDBACK_INTERVAL: Duration = Duration::from_millis(1400);

/// Pulse amplitudes for the blocked vibration, scaled by haptic strength.
pub const BLOCKED_WAVEFORM: [f32; 6] = [1.0, 0.6, 0.0, 1.0, 0.6, 0.0];

/// The fixed set of selectable visual effects.  Index `0` means "off".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualEffect {
    Sparks = 1,
    Frost = 2,
    Smoke = 3,
}

impl VisualEffect {
    /// Resolve a configured index.  `0` and out-of-range indices yield `None`.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(VisualEffect::Sparks),
            2 => Some(VisualEffect::Frost),
            3 => Some(VisualEffect::Smoke),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualEffect::Sparks => "sparks",
            VisualEffect::Frost => "frost",
            VisualEffect::Smoke => "smoke",
        }
    }
}

/// Output device for feedback.  Each method fails on its own.
pub trait FeedbackSink: Send {
    /// Play `waveform` on the controller held in `hand`.
    fn vibrate(&mut self, hand: Hand, waveform: &[f32]) -> Result<(), NockError>;

    /// Play a sound positioned at the player.
    ///
    /// # Errors
    ///
    /// Returns [`NockError::ResourceUnresolved`] for unknown ids.
    fn play_sound(&mut self, sound_id: &str) -> Result<(), NockError>;

    /// Attach `effect` at `anchor`, the player's feedback node in world space.
    fn apply_visual(&mut self, effect: VisualEffect, anchor: &Transform3D)
    -> Result<(), NockError>;
}

/// What a single trigger should emit.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest<'a> {
    /// Controller that receives the vibration.
    pub hand: Hand,
    pub haptic_strength: f32,
    pub sound_id: Option<&'a str>,
    pub visual_index: u8,
    /// World transform of [`Anchor::Player`], resolved by the caller.
    pub player_anchor: Option<Transform3D>,
}

/// Rate-limited feedback trigger.
#[derive(Debug, Clone)]
pub struct FeedbackDispatcher {
    min_interval: Duration,
    last_trigger: Option<Duration>,
}

impl Default for FeedbackDispatcher {
    fn default() -> Self {
        Self::new(MIN_FEEDBACK_INTERVAL)
    }
}

impl FeedbackDispatcher {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_trigger: None,
        }
    }

    /// Time of the last dispatched burst.
    pub fn last_trigger(&self) -> Option<Duration> {
        self.last_trigger
    }

    /// Forget the rate-limit history.
    pub fn reset(&mut self) {
        self.last_trigger = None;
    }

    /// Dispatch `request` at time `now` unless one was dispatched less than
    /// the minimum interval ago.  Returns whether a burst was dispatched.
    pub fn trigger(
        &mut self,
        now: Duration,
        request: &FeedbackRequest<'_>,
        sink: &mut dyn FeedbackSink,
    ) -> bool {
        if let Some(last) = self.last_trigger
            && now.saturating_sub(last) < self.min_interval
        {
            return false;
        }
        self.last_trigger = Some(now);
        debug!(?request, "dispatching blocked feedback");

        if request.haptic_strength > 0.0 {
            let waveform: Vec<f32> = BLOCKED_WAVEFORM
                .iter()
                .map(|a| a * request.haptic_strength)
                .collect();
            if let Err(e) = sink.vibrate(request.hand, &waveform) {
                warn!(error = %e, "haptic feedback skipped");
            }
        }

        if let Some(sound_id) = request.sound_id
            && let Err(e) = sink.play_sound(sound_id)
        {
            warn!(error = %e, "sound feedback skipped");
        }

        if request.visual_index != 0
            && let Err(e) = Self::visual(request, sink)
        {
            warn!(error = %e, "visual feedback skipped");
        }
        true
    }

    fn visual(request: &FeedbackRequest<'_>, sink: &mut dyn FeedbackSink) -> Result<(), NockError> {
        let Some(effect) = VisualEffect::from_index(request.visual_index) else {
            return Err(NockError::ResourceUnresolved {
                channel: "visual".to_string(),
                id: request.visual_index.to_string(),
            });
        };
        let anchor = request
            .player_anchor
            .ok_or_else(|| NockError::AnchorUnavailable(Anchor::Player.as_str().to_string()))?;
        sink.apply_visual(effect, &anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{FeedbackRecord, SimFeedbackSink};
    use nockvr_perception::{Quaternion, Vec3};

    fn request(sound: Option<&str>, visual: u8) -> FeedbackRequest<'_> {
        FeedbackRequest {
            hand: Hand::Right,
            haptic_strength: 0.5,
            sound_id: sound,
            visual_index: visual,
            player_anchor: Some(Transform3D::identity()),
        }
    }

    #[test]
    fn second_trigger_within_interval_is_suppressed() {
        let mut sink = SimFeedbackSink::new();
        let mut fx = FeedbackDispatcher::default();

        assert!(fx.trigger(Duration::ZERO, &request(None, 0), &mut sink));
        assert!(!fx.trigger(Duration::from_millis(1399), &request(None, 0), &mut sink));
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn trigger_after_interval_fires_again() {
        let mut sink = SimFeedbackSink::new();
        let mut fx = FeedbackDispatcher::default();

        assert!(fx.trigger(Duration::from_secs(1), &request(None, 0), &mut sink));
        assert!(fx.trigger(Duration::from_millis(2400), &request(None, 0), &mut sink));
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn haptic_waveform_is_scaled() {
        let mut sink = SimFeedbackSink::new();
        let mut fx = FeedbackDispatcher::default();
        fx.trigger(Duration::ZERO, &request(None, 0), &mut sink);

        match &sink.records()[0] {
            FeedbackRecord::Vibrate { hand, waveform } => {
                assert_eq!(*hand, Hand::Right);
                assert!((waveform[0] - 0.5).abs() < f32::EPSILON);
                assert!((waveform[1] - 0.3).abs() < 1e-6);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn zero_strength_skips_haptics() {
        let mut sink = SimFeedbackSink::new().with_sound("UIBlocked");
        let mut fx = FeedbackDispatcher::default();
        let req = FeedbackRequest {
            haptic_strength: 0.0,
            ..request(Some("UIBlocked"), 0)
        };
        fx.trigger(Duration::ZERO, &req, &mut sink);
        assert_eq!(
            sink.records(),
            vec![FeedbackRecord::Sound("UIBlocked".to_string())]
        );
    }

    #[test]
    fn unresolved_sound_does_not_block_other_channels() {
        let mut sink = SimFeedbackSink::new();
        let mut fx = FeedbackDispatcher::default();

        assert!(fx.trigger(Duration::ZERO, &request(Some("ghost"), 2), &mut sink));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], FeedbackRecord::Vibrate { .. }));
        assert!(matches!(
            records[1],
            FeedbackRecord::Visual {
                effect: VisualEffect::Frost,
                ..
            }
        ));
    }

    #[test]
    fn missing_anchor_and_bad_index_are_skipped() {
        let mut sink = SimFeedbackSink::new().with_sound("UIBlocked");
        let mut fx = FeedbackDispatcher::default();

        let no_anchor = FeedbackRequest {
            player_anchor: None,
            ..request(Some("UIBlocked"), 1)
        };
        fx.trigger(Duration::ZERO, &no_anchor, &mut sink);
        fx.trigger(Duration::from_secs(5), &request(None, 9), &mut sink);

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert!(!records.iter().any(|r| matches!(r, FeedbackRecord::Visual { .. })));
    }

    #[test]
    fn visual_is_placed_at_the_player_anchor() {
        let mut sink = SimFeedbackSink::new();
        let mut fx = FeedbackDispatcher::default();
        let at = Vec3::new(1.0, 2.0, 3.0);
        let req = FeedbackRequest {
            haptic_strength: 0.0,
            player_anchor: Some(Transform3D::new(at, Quaternion::identity())),
            ..request(None, 3)
        };
        fx.trigger(Duration::ZERO, &req, &mut sink);
        assert_eq!(
            sink.records(),
            vec![FeedbackRecord::Visual {
                effect: VisualEffect::Smoke,
                at
            }]
        );
    }

    #[test]
    fn visual_index_table() {
        assert_eq!(VisualEffect::from_index(0), None);
        assert_eq!(VisualEffect::from_index(3), Some(VisualEffect::Smoke));
        assert_eq!(VisualEffect::from_index(4), None);
    }
}
