//! Tag ↔ bit table backing category/mask filtering.

use std::collections::HashMap;

/// Number of distinct groups a `u32` mask can address.
pub const MAX_GROUPS: u32 = 32;

/// Returned by [`CollisionGroupRegistry::group_tag`] for unassigned bits.
pub const UNKNOWN_GROUP: &str = "unknown";

/// Append-only mapping from group tags to single-bit masks.
///
/// The first request for an unseen tag allocates the next free bit. Bits are
/// never reclaimed.
#[derive(Debug, Default, Clone)]
pub struct CollisionGroupRegistry {
    tag_to_bit: HashMap<String, u32>,
    bit_to_tag: HashMap<u32, String>,
    next_bit: u32,
}

impl CollisionGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bit for `tag`, allocating one if the tag is new.
    ///
    /// Once all 32 bits are taken a new tag gets `0`, which matches nothing,
    /// and an error is logged.
    pub fn group_bit(&mut self, tag: &str) -> u32 {
        if let Some(&bit) = self.tag_to_bit.get(tag) {
            return bit;
        }
        if self.next_bit >= MAX_GROUPS {
            log::error!("Collision group limit ({MAX_GROUPS}) reached, '{tag}' gets no bit");
            return 0;
        }
        let bit = 1u32 << self.next_bit;
        self.next_bit += 1;
        self.tag_to_bit.insert(tag.to_owned(), bit);
        self.bit_to_tag.insert(bit, tag.to_owned());
        bit
    }

    /// Bit for an already registered tag, without allocating.
    pub fn existing_bit(&self, tag: &str) -> Option<u32> {
        self.tag_to_bit.get(tag).copied()
    }

    /// OR of the bits for every tag in `tags`, allocating as needed.
    pub fn mask_of(&mut self, tags: &[&str]) -> u32 {
        tags.iter().fold(0, |mask, tag| mask | self.group_bit(tag))
    }

    /// Tag owning `bit`, or [`UNKNOWN_GROUP`].
    pub fn group_tag(&self, bit: u32) -> &str {
        self.bit_to_tag
            .get(&bit)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_GROUP)
    }

    pub fn len(&self) -> usize {
        self.tag_to_bit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tag_to_bit.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_allocated_in_order_and_reused_per_tag() {
        let mut groups = CollisionGroupRegistry::new();
        assert_eq!(groups.group_bit("player"), 1);
        assert_eq!(groups.group_bit("enemy"), 2);
        assert_eq!(groups.group_bit("bullet"), 4);
        assert_eq!(groups.group_bit("player"), 1);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn reverse_lookup_falls_back_to_unknown() {
        let mut groups = CollisionGroupRegistry::new();
        let bit = groups.group_bit("wall");
        assert_eq!(groups.group_tag(bit), "wall");
        assert_eq!(groups.group_tag(1 << 20), UNKNOWN_GROUP);
    }

    #[test]
    fn mask_is_or_of_bits() {
        let mut groups = CollisionGroupRegistry::new();
        let mask = groups.mask_of(&["a", "b", "c"]);
        assert_eq!(mask, 0b111);
    }

    #[test]
    fn thirty_third_group_gets_no_bit() {
        let mut groups = CollisionGroupRegistry::new();
        for i in 0..32 {
            assert_eq!(groups.group_bit(&format!("g{i}")), 1 << i);
        }
        assert_eq!(groups.group_bit("overflow"), 0);
        assert_eq!(groups.existing_bit("overflow"), None);
        assert_eq!(groups.group_bit("g31"), 1 << 31);
    }
}
