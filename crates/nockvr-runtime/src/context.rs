//! [`ArrowNockContext`] – the per-player nocking orchestrator.
//!
//! Owns every collaborator the state machine needs and turns external
//! callbacks into [`Input`]s:
//!
//! 1. **Filter** – equip events from other actors or during pause, and
//!    button events nobody subscribed to, are dropped.
//! 2. **Sense** – geometry and stamina are sampled only in the states that
//!    read them.
//! 3. **Transition** – [`transition`] computes the next state and commands.
//! 4. **Execute** – commands are applied to the input injector and the
//!    feedback dispatcher.  Failures are logged and never propagated.
//!
//! Contexts are independent of each other; nothing here is process-global.

use std::sync::Arc;

use nockvr_hal::{
    FeedbackDispatcher, FeedbackRequest, FeedbackSink, InputBackend, InputSubscriptions,
    SyntheticInputInjector,
};
use nockvr_kernel::StaminaGate;
use nockvr_perception::{Anchor, AnchorSource, GeometryProbe};
use nockvr_types::{
    ActionChannel, AmmoKind, ButtonEvent, ButtonId, ButtonState, Clock, EquipEvent, ItemKind,
    MenuEvent, NockSettings, WeaponKind,
};
use tracing::{debug, info, trace, warn};

use crate::machine::{Command, Input, Machine, NockState, TickReading, Transition, transition};
use crate::world::GameWorld;

/// Ticks between two polls of the [`SettingsSource`].
pub const SETTINGS_POLL_TICKS: u64 = 90;

/// Where updated settings come from at runtime.
pub trait SettingsSource: Send {
    /// Settings that changed since the previous call, if any.
    fn poll(&mut self) -> Option<NockSettings>;

    /// Re-read unconditionally.  `None` keeps the current settings.
    fn reload(&mut self) -> Option<NockSettings>;
}

pub struct ArrowNockContext {
    machine: Machine,
    settings: NockSettings,
    stamina_gate: StaminaGate,
    probe: GeometryProbe,
    injector: SyntheticInputInjector,
    subscriptions: InputSubscriptions,
    feedback: FeedbackDispatcher,
    feedback_sink: Box<dyn FeedbackSink>,
    world: Box<dyn GameWorld>,
    clock: Arc<dyn Clock>,
    settings_source: Option<Box<dyn SettingsSource>>,
    ticks: u64,
}

impl ArrowNockContext {
    pub fn new(
        settings: NockSettings,
        world: Box<dyn GameWorld>,
        input: Box<dyn InputBackend>,
        feedback_sink: Box<dyn FeedbackSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = settings.sanitized();
        let mut ctx = Self {
            machine: Machine::default(),
            stamina_gate: StaminaGate::new(settings.stamina_threshold),
            settings,
            probe: GeometryProbe::new(),
            injector: SyntheticInputInjector::new(input),
            subscriptions: InputSubscriptions::new(),
            feedback: FeedbackDispatcher::default(),
            feedback_sink,
            world,
            clock,
            settings_source: None,
            ticks: 0,
        };
        ctx.resubscribe();
        info!(
            arrow_hand = %ctx.settings.arrow_hand(),
            enabled = ctx.settings.enabled,
            "arrow nock context ready"
        );
        ctx
    }

    /// Poll `source` every [`SETTINGS_POLL_TICKS`] ticks and on menu close.
    pub fn with_settings_source(mut self, source: Box<dyn SettingsSource>) -> Self {
        self.settings_source = Some(source);
        self
    }

    pub fn state(&self) -> NockState {
        self.machine.state
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn settings(&self) -> &NockSettings {
        &self.settings
    }

    /// Synthetic button states currently asserted on the input layer.
    pub fn asserted_count(&self) -> usize {
        self.injector.asserted_count()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Event handlers
    // ────────────────────────────────────────────────────────────────────────

    /// Equip-change callback.  Returns `None` when the event is not relevant.
    pub fn on_equip(&mut self, event: &EquipEvent) -> Option<Transition> {
        if event.actor_id != self.world.player_id() {
            trace!(actor = event.actor_id, "equip on another actor ignored");
            return None;
        }
        if self.world.is_paused() {
            trace!("equip while paused ignored");
            return None;
        }

        let input = match self.world.item_kind(event.item_form_id)? {
            ItemKind::Ammo(AmmoKind::Arrow) if event.equipped => {
                let bow_hand = self.settings.bow_hand();
                if self.world.equipped_weapon(bow_hand) != Some(WeaponKind::Bow) {
                    debug!(%bow_hand, "arrow equipped without a bow in the other hand");
                    return None;
                }
                Input::ArrowEquipped {
                    held_button: self.held_candidate(),
                    angle: self.probe.sample_bow_hand_angle(self.world.as_ref()),
                }
            }
            ItemKind::Ammo(AmmoKind::Arrow) | ItemKind::Weapon(WeaponKind::Bow)
                if !event.equipped =>
            {
                Input::Unequipped
            }
            _ => return None,
        };
        Some(self.drive(input))
    }

    /// Real button callback.  Returns `None` for unsubscribed events.
    pub fn on_button(&mut self, event: &ButtonEvent) -> Option<Transition> {
        if !self.subscriptions.accepts(event) {
            return None;
        }
        let input = match event.state {
            ButtonState::Down => Input::ButtonDown(event.button),
            ButtonState::Up => Input::ButtonUp(event.button),
        };
        Some(self.drive(input))
    }

    /// Menu callback.  A closing menu may mean the configuration was edited,
    /// so the settings source is re-read.  Returns the reset transition when
    /// the new settings forced one.
    pub fn on_menu(&mut self, event: &MenuEvent) -> Option<Transition> {
        if event.opening {
            return None;
        }
        let settings = self.settings_source.as_mut().and_then(|s| s.reload())?;
        debug!(menu = %event.menu_name, "menu closed, settings reloaded");
        self.apply_settings(settings)
    }

    /// A save was loaded: drop all per-session state.
    pub fn on_game_load(&mut self) -> Transition {
        self.probe.reset();
        self.feedback.reset();
        info!("game loaded, nocking state reset");
        self.drive(Input::GameLoaded)
    }

    /// Per-frame update.
    ///
    /// When the periodic settings poll forces a reset, that transition is
    /// returned and the frame is not sampled.
    pub fn tick(&mut self) -> Transition {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % SETTINGS_POLL_TICKS == 0
            && let Some(settings) = self.settings_source.as_mut().and_then(|s| s.poll())
            && let Some(reset) = self.apply_settings(settings)
        {
            return reset;
        }

        let radius_sq = self.settings.overlap_radius_sq();
        let reading = match self.machine.state {
            NockState::ArrowHeld => TickReading {
                overlapping: self.probe.overlapping(self.world.as_ref(), radius_sq),
                has_stamina: self.stamina_gate.has_stamina(self.world.stamina()),
                angle: None,
            },
            NockState::TryingToNock => TickReading {
                overlapping: self.probe.overlapping(self.world.as_ref(), radius_sq),
                has_stamina: true,
                angle: Some(self.probe.sample_bow_hand_angle(self.world.as_ref())),
            },
            NockState::Idle | NockState::ArrowNocked => TickReading::default(),
        };
        trace!(?reading, state = %self.machine.state, "tick");
        self.drive(Input::Tick(reading))
    }

    /// Swap in new settings.
    ///
    /// Changing the arrow hand, the fire button, the candidate list, or the
    /// master switch rebinds the button subscriptions and forces Idle; the
    /// returned transition reports that reset.  Other changes apply in place.
    ///
    /// `debug_print` is only read when tracing is installed, so a new value
    /// does not change the active log filter.
    pub fn apply_settings(&mut self, settings: NockSettings) -> Option<Transition> {
        let settings = settings.sanitized();
        let rebind = settings.arrow_hand() != self.settings.arrow_hand()
            || settings.fire_button != self.settings.fire_button
            || settings.enabled != self.settings.enabled
            || settings.button_priority != self.settings.button_priority;

        self.stamina_gate = StaminaGate::new(settings.stamina_threshold);
        self.settings = settings;
        info!(rebind, "settings applied");

        if !rebind {
            return None;
        }
        self.resubscribe();
        self.probe.reset();
        Some(self.drive(Input::Reconfigured))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Internals
    // ────────────────────────────────────────────────────────────────────────

    fn drive(&mut self, input: Input) -> Transition {
        let now = self.clock.now();
        let step = transition(&self.machine, &input, &self.settings, now);
        if step.changed() {
            debug!(from = %step.from, to = %step.to(), ?input, "nock state transition");
        }
        self.execute(&step.commands, now);
        self.machine = step.next.clone();
        step
    }

    fn execute(&mut self, commands: &[Command], now: std::time::Duration) {
        for command in commands {
            let result = match *command {
                Command::SetDown(address) => self.injector.set_down(address),
                Command::ClearDown(address) => self.injector.clear_down(address),
                Command::ClearAll => self.injector.clear_all(),
                Command::SendMomentary(address) => self.injector.send_momentary(address),
                Command::TriggerFeedback => {
                    let request = FeedbackRequest {
                        hand: self.settings.arrow_hand(),
                        haptic_strength: self.settings.haptic_strength,
                        sound_id: self.settings.blocked_sound_id(),
                        visual_index: self.settings.visual_effect,
                        player_anchor: self.world.anchor_transform(Anchor::Player),
                    };
                    self.feedback
                        .trigger(now, &request, self.feedback_sink.as_mut());
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!(error = %e, ?command, "synthetic input command failed");
            }
        }
    }

    /// First candidate button physically held on the arrow hand.
    fn held_candidate(&self) -> Option<ButtonId> {
        let hand = self.settings.arrow_hand();
        self.settings
            .button_priority
            .iter()
            .copied()
            .find(|&b| self.injector.is_pressed(hand, b, ActionChannel::Press))
    }

    fn resubscribe(&mut self) {
        self.subscriptions.unsubscribe_all();
        if self.settings.enabled {
            self.subscriptions
                .subscribe(&self.settings.button_priority, self.settings.arrow_hand());
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
