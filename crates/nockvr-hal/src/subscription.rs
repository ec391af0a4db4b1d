//! [`InputSubscriptions`] – which real button events reach the state machine.
//!
//! Listeners register a button set for one hand and receive an opaque
//! [`SubscriptionToken`].  Reconfiguring (e.g. switching hand mode) is
//! `unsubscribe_all` followed by fresh `subscribe` calls, so stale
//! registrations cannot leak across modes.

use std::collections::{BTreeMap, BTreeSet};

use nockvr_types::{ActionChannel, ButtonEvent, ButtonId, Hand};

/// Handle returned by [`InputSubscriptions::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

#[derive(Debug, Clone)]
struct Subscription {
    hand: Hand,
    buttons: BTreeSet<ButtonId>,
}

/// Registry of active button subscriptions.
///
/// ```
/// use nockvr_hal::subscription::InputSubscriptions;
/// use nockvr_types::{ActionChannel, ButtonEvent, ButtonId, ButtonState, Hand};
///
/// let mut subs = InputSubscriptions::new();
/// let token = subs.subscribe(&[ButtonId::Trigger, ButtonId::Grip], Hand::Right);
///
/// let ev = ButtonEvent {
///     hand: Hand::Right,
///     button: ButtonId::Grip,
///     channel: ActionChannel::Press,
///     state: ButtonState::Down,
/// };
/// assert!(subs.accepts(&ev));
///
/// subs.unsubscribe(token);
/// assert!(!subs.accepts(&ev));
/// ```
#[derive(Debug, Default)]
pub struct InputSubscriptions {
    next_token: u64,
    active: BTreeMap<SubscriptionToken, Subscription>,
}

impl InputSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for press-channel events of `buttons` on `hand`.
    pub fn subscribe(&mut self, buttons: &[ButtonId], hand: Hand) -> SubscriptionToken {
        self.next_token += 1;
        let token = SubscriptionToken(self.next_token);
        self.active.insert(
            token,
            Subscription {
                hand,
                buttons: buttons.iter().copied().collect(),
            },
        );
        token
    }

    /// Drop one subscription.  Returns `false` for unknown tokens.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.active.remove(&token).is_some()
    }

    pub fn unsubscribe_all(&mut self) {
        self.active.clear();
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether any subscription covers `event`.  Touch-channel events are
    /// never delivered.
    pub fn accepts(&self, event: &ButtonEvent) -> bool {
        event.channel == ActionChannel::Press
            && self
                .active
                .values()
                .any(|s| s.hand == event.hand && s.buttons.contains(&event.button))
    }
}
