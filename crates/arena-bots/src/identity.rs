//! Spawn-time identity rolls: level, outfit, color, weapon, name.

use arena_common::{CosmeticId, WeaponId};
use std::ops::Range;

use crate::catalog::{Catalog, ColorSwatch, CosmeticSlot};

/// Player level at or below which bots spawn in the starter band.
pub const STARTER_PLAYER_LEVEL: u32 = 3;

/// Cosmetics worn by a bot. A full set overrides the individual slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outfit {
    /// Headwear
    pub hat: Option<CosmeticId>,
    /// Legwear
    pub pant: Option<CosmeticId>,
    /// Accessory
    pub accessory: Option<CosmeticId>,
    /// Complete outfit
    pub full_set: Option<CosmeticId>,
}

impl Outfit {
    /// Whether a full set is worn.
    #[must_use]
    pub const fn is_full_set(&self) -> bool {
        self.full_set.is_some()
    }
}

/// Who a bot is for the duration of one spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Display name
    pub name: String,
    /// Level, at least 1
    pub level: u32,
    /// Body color
    pub color: Option<ColorSwatch>,
    /// Worn cosmetics
    pub outfit: Outfit,
    /// Held weapon type
    pub weapon: Option<WeaponId>,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: 1,
            color: None,
            outfit: Outfit::default(),
            weapon: None,
        }
    }
}

/// Level band a bot spawns in, upper bound exclusive.
///
/// Starter players (level 3 or below) face levels 1 and 2; otherwise bots
/// span 75% to 125% of the player's level.
#[must_use]
pub fn level_range(player_level: u32) -> Range<u32> {
    if player_level <= STARTER_PLAYER_LEVEL {
        return 1..3;
    }
    let min = (player_level as f32 * 0.75).floor() as u32;
    let max = (player_level as f32 * 1.25).floor() as u32;
    min.max(1)..max.max(min + 1)
}

/// Samples a level uniformly from [`level_range`].
pub fn roll_level(rng: &mut fastrand::Rng, player_level: u32) -> u32 {
    rng.u32(level_range(player_level))
}

/// Rolls cosmetics on top of `base`.
///
/// Two times in three each individual slot is independently replaced with
/// probability 1/2; otherwise a single full set is forced.
pub fn roll_outfit(rng: &mut fastrand::Rng, catalog: &dyn Catalog, base: Outfit) -> Outfit {
    let mut outfit = base;

    if rng.u32(0..3) > 0 {
        if rng.u32(0..2) > 0 {
            outfit.hat = catalog.random_cosmetic(CosmeticSlot::Hat, rng).or(outfit.hat);
        }
        if rng.u32(0..2) > 0 {
            outfit.pant = catalog.random_cosmetic(CosmeticSlot::Pant, rng).or(outfit.pant);
        }
        if rng.u32(0..2) > 0 {
            outfit.accessory = catalog
                .random_cosmetic(CosmeticSlot::Accessory, rng)
                .or(outfit.accessory);
        }
    } else {
        outfit.full_set = catalog
            .random_cosmetic(CosmeticSlot::FullSet, rng)
            .or(outfit.full_set);
    }

    outfit
}
