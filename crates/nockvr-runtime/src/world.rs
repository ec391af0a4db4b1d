//! Read-only view of the game the nocking context runs inside.

use nockvr_perception::AnchorSource;
use nockvr_types::{Hand, ItemKind, ResourceValue, WeaponKind};

/// Actor and item queries, plus the skeleton anchors of the local player.
///
/// Implementations answer from whatever the host engine exposes.  Every
/// query may legitimately come back empty (loading screens, unloaded
/// actors) and callers treat that as "not applicable", never as an error.
pub trait GameWorld: AnchorSource + Send {
    /// Reference id of the locally controlled player.
    fn player_id(&self) -> u32;

    /// `true` while the game is paused (menus, loading).
    fn is_paused(&self) -> bool;

    /// Classify an equippable form.  `None` for forms that are neither
    /// weapons nor ammunition.
    fn item_kind(&self, form_id: u32) -> Option<ItemKind>;

    /// Weapon currently equipped in `hand` by the player.
    fn equipped_weapon(&self, hand: Hand) -> Option<WeaponKind>;

    /// The player's stamina, when readable.
    fn stamina(&self) -> Option<ResourceValue>;
}
