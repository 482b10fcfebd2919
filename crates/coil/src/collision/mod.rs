//! 2D collision detection: spatial hash broad phase, group bitmasks, and
//! circle/box narrow phase. There is no response beyond callbacks; the per-frame
//! pass lives in [`ObjectManager::check_collisions`](crate::object_manager::ObjectManager::check_collisions).

pub mod collider;
pub mod grid;
pub mod groups;

pub use collider::{Collider, ColliderShape};
pub use grid::SpatialHashGrid;
pub use groups::{CollisionGroupRegistry, MAX_GROUPS, UNKNOWN_GROUP};

/// Either direction of the category/mask test admits the pair.
///
/// Entities left at `category == 0 && mask == 0` never pass.
pub fn masks_allow(category_a: u32, mask_a: u32, category_b: u32, mask_b: u32) -> bool {
    (category_a & mask_b) != 0 || (category_b & mask_a) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_direction_suffices() {
        let mut groups = CollisionGroupRegistry::new();
        let player = groups.group_bit("player");
        let enemy = groups.group_bit("enemy");
        let pickup = groups.group_bit("pickup");

        // enemy tests against player; the player's own mask is empty
        assert!(masks_allow(enemy, player, player, 0));
        assert!(masks_allow(player, 0, enemy, player));
        // pickup is neither the player nor anything in the enemy mask
        assert!(!masks_allow(enemy, player, pickup, 0));
    }

    #[test]
    fn unconfigured_entities_never_pass() {
        assert!(!masks_allow(0, 0, 0, 0));
        assert!(!masks_allow(0, 0, 1, 0));
    }
}
