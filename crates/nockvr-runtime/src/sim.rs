//! [`SimWorld`] – a scripted stand-in for the host game.
//!
//! The skeleton is a small [`NodeGraph`]:
//!
//! ```text
//! world ─┬─ bow_hand ── bow_anchor
//!        ├─ arrow_hand ── arrow_anchor
//!        └─ player
//! ```
//!
//! Moving a hand moves its anchor; removing a node makes the anchors below
//! it unresolvable until the hand is placed again.  Like the `nockvr-hal`
//! doubles, clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nockvr_perception::transform::WORLD;
use nockvr_perception::{Anchor, AnchorSource, NodeGraph, SkeletonAnchors, Transform3D};
use nockvr_types::{AmmoKind, Hand, ItemKind, ResourceValue, WeaponKind};

use crate::world::GameWorld;

/// Reference id of the simulated player.
pub const PLAYER_ID: u32 = 0x14;
/// Form ids pre-registered by [`SimWorld::new`].
pub const HUNTING_BOW: u32 = 0x0001_3985;
pub const IRON_ARROW: u32 = 0x0001_397D;
pub const STEEL_BOLT: u32 = 0x0200_0BB3;
pub const IRON_SWORD: u32 = 0x0001_2EB7;

pub const BOW_HAND_NODE: &str = "bow_hand";
pub const ARROW_HAND_NODE: &str = "arrow_hand";
pub const PLAYER_NODE: &str = "player";

#[derive(Debug)]
struct SimWorldState {
    paused: bool,
    items: HashMap<u32, ItemKind>,
    equipped: HashMap<Hand, WeaponKind>,
    stamina: Option<ResourceValue>,
    anchors: SkeletonAnchors,
}

fn lock(m: &Mutex<SimWorldState>) -> MutexGuard<'_, SimWorldState> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared-handle simulated game.
#[derive(Debug, Clone)]
pub struct SimWorld {
    state: Arc<Mutex<SimWorldState>>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    /// A player with full stamina and both hands at the origin, i.e.
    /// overlapping with zero relative rotation.
    pub fn new() -> Self {
        let mut graph = NodeGraph::new();
        graph.set_node(WORLD, BOW_HAND_NODE, Transform3D::identity());
        graph.set_node(BOW_HAND_NODE, "bow_anchor", Transform3D::identity());
        graph.set_node(WORLD, ARROW_HAND_NODE, Transform3D::identity());
        graph.set_node(ARROW_HAND_NODE, "arrow_anchor", Transform3D::identity());
        graph.set_node(WORLD, PLAYER_NODE, Transform3D::identity());

        let items = HashMap::from([
            (HUNTING_BOW, ItemKind::Weapon(WeaponKind::Bow)),
            (IRON_SWORD, ItemKind::Weapon(WeaponKind::Other)),
            (IRON_ARROW, ItemKind::Ammo(AmmoKind::Arrow)),
            (STEEL_BOLT, ItemKind::Ammo(AmmoKind::Bolt)),
        ]);

        Self {
            state: Arc::new(Mutex::new(SimWorldState {
                paused: false,
                items,
                equipped: HashMap::new(),
                stamina: Some(ResourceValue {
                    current: 100.0,
                    max: 100.0,
                }),
                anchors: SkeletonAnchors::new(graph, "bow_anchor", "arrow_anchor", PLAYER_NODE),
            })),
        }
    }

    pub fn set_equipped(&self, hand: Hand, weapon: Option<WeaponKind>) {
        let mut state = lock(&self.state);
        match weapon {
            Some(w) => state.equipped.insert(hand, w),
            None => state.equipped.remove(&hand),
        };
    }

    pub fn set_paused(&self, paused: bool) {
        lock(&self.state).paused = paused;
    }

    pub fn set_stamina(&self, stamina: Option<ResourceValue>) {
        lock(&self.state).stamina = stamina;
    }

    /// Place the bow hand.  Re-adds the node if it was removed.
    pub fn set_bow_pose(&self, pose: Transform3D) {
        lock(&self.state)
            .anchors
            .graph
            .set_node(WORLD, BOW_HAND_NODE, pose);
    }

    /// Place the arrow hand.  Re-adds the node if it was removed.
    pub fn set_arrow_hand_pose(&self, pose: Transform3D) {
        lock(&self.state)
            .anchors
            .graph
            .set_node(WORLD, ARROW_HAND_NODE, pose);
    }

    /// Detach a skeleton node so every anchor below it stops resolving.
    pub fn remove_node(&self, node: &str) {
        lock(&self.state).anchors.graph.remove_node(node);
    }
}

impl AnchorSource for SimWorld {
    fn anchor_transform(&self, anchor: Anchor) -> Option<Transform3D> {
        lock(&self.state).anchors.anchor_transform(anchor)
    }
}

impl GameWorld for SimWorld {
    fn player_id(&self) -> u32 {
        PLAYER_ID
    }

    fn is_paused(&self) -> bool {
        lock(&self.state).paused
    }

    fn item_kind(&self, form_id: u32) -> Option<ItemKind> {
        lock(&self.state).items.get(&form_id).copied()
    }

    fn equipped_weapon(&self, hand: Hand) -> Option<WeaponKind> {
        lock(&self.state).equipped.get(&hand).copied()
    }

    fn stamina(&self) -> Option<ResourceValue> {
        lock(&self.state).stamina
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nockvr_perception::Vec3;
    use nockvr_perception::transform::Quaternion;

    #[test]
    fn anchors_follow_hand_poses() {
        let world = SimWorld::new();
        world.set_arrow_hand_pose(Transform3D::new(
            Vec3::new(3.0, 0.0, 0.0),
            Quaternion::identity(),
        ));
        let hand = world.anchor_transform(Anchor::OffHand).expect("anchor resolves");
        assert!((hand.translation.x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn removed_hand_hides_anchor_until_placed_again() {
        let world = SimWorld::new();
        world.remove_node(BOW_HAND_NODE);
        assert!(world.anchor_transform(Anchor::Bow).is_none());

        world.set_bow_pose(Transform3D::identity());
        assert!(world.anchor_transform(Anchor::Bow).is_some());
    }

    #[test]
    fn player_anchor_can_go_missing() {
        let world = SimWorld::new();
        assert!(world.anchor_transform(Anchor::Player).is_some());
        world.remove_node(PLAYER_NODE);
        assert!(world.anchor_transform(Anchor::Player).is_none());
    }

    #[test]
    fn builtin_items_are_classified() {
        let world = SimWorld::new();
        assert_eq!(
            world.item_kind(IRON_ARROW),
            Some(ItemKind::Ammo(AmmoKind::Arrow))
        );
        assert_eq!(
            world.item_kind(HUNTING_BOW),
            Some(ItemKind::Weapon(WeaponKind::Bow))
        );
        assert_eq!(world.item_kind(0xDEAD), None);
    }
}
