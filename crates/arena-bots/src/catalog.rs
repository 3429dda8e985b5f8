//! Resource catalogs: names, colors, cosmetics, weapons.
//!
//! Catalog lookups are pure queries. The only side effect is consuming the
//! caller's RNG.

use arena_common::{ArenaError, ColorId, CosmeticId, WeaponId};
use glam::Vec4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for catalog construction.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required pool has no entries
    #[error("Catalog has no {0}")]
    Empty(&'static str),
    /// TOML parse failure
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<CatalogError> for ArenaError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err.to_string())
    }
}

/// Body part a cosmetic item occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CosmeticSlot {
    /// Headwear
    Hat,
    /// Legwear
    Pant,
    /// Shield, wings, tail and the like
    Accessory,
    /// Complete outfit that overrides the other slots
    FullSet,
}

/// A body color choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSwatch {
    /// Color ID
    pub id: ColorId,
    /// Display name
    pub name: String,
    /// Normal (non-highlighted) tint, RGBA in 0..=1
    pub normal: Vec4,
}

/// A cosmetic item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmeticItem {
    /// Item ID
    pub id: CosmeticId,
    /// Slot it occupies
    pub slot: CosmeticSlot,
    /// Display name
    pub name: String,
}

/// A throwable weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponItem {
    /// Weapon ID
    pub id: WeaponId,
    /// Display name
    pub name: String,
}

/// Random-choice queries used while spawning a bot.
pub trait Catalog {
    /// A display name.
    fn random_name(&self, rng: &mut fastrand::Rng) -> String;

    /// A body color.
    fn random_color(&self, rng: &mut fastrand::Rng) -> ColorSwatch;

    /// A cosmetic for `slot`, or `None` if the slot has no items.
    fn random_cosmetic(&self, slot: CosmeticSlot, rng: &mut fastrand::Rng) -> Option<CosmeticId>;

    /// A weapon.
    fn random_weapon(&self, rng: &mut fastrand::Rng) -> WeaponId;
}

/// Catalog backed by in-memory lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticCatalog {
    names: Vec<String>,
    colors: Vec<ColorSwatch>,
    #[serde(default)]
    cosmetics: Vec<CosmeticItem>,
    weapons: Vec<WeaponItem>,
}

impl StaticCatalog {
    /// Creates a catalog. Names, colors and weapons must not be empty.
    pub fn new(
        names: Vec<String>,
        colors: Vec<ColorSwatch>,
        cosmetics: Vec<CosmeticItem>,
        weapons: Vec<WeaponItem>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            names,
            colors,
            cosmetics,
            weapons,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses a catalog from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.names.is_empty() {
            return Err(CatalogError::Empty("names"));
        }
        if self.colors.is_empty() {
            return Err(CatalogError::Empty("colors"));
        }
        if self.weapons.is_empty() {
            return Err(CatalogError::Empty("weapons"));
        }
        Ok(())
    }

    /// Built-in content used when no catalog file is supplied.
    #[must_use]
    pub fn builtin() -> Self {
        let names = [
            "Ash", "Bolt", "Cinder", "Dusk", "Echo", "Flint", "Grim", "Hex", "Ivy", "Jinx",
            "Knox", "Lark", "Moss", "Nyx", "Onyx", "Pike",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();

        let colors = [
            ("Red", Vec4::new(0.86, 0.2, 0.2, 1.0)),
            ("Blue", Vec4::new(0.2, 0.4, 0.9, 1.0)),
            ("Green", Vec4::new(0.25, 0.75, 0.3, 1.0)),
            ("Yellow", Vec4::new(0.95, 0.85, 0.2, 1.0)),
            ("Purple", Vec4::new(0.6, 0.3, 0.8, 1.0)),
            ("Orange", Vec4::new(0.95, 0.55, 0.15, 1.0)),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (name, normal))| ColorSwatch {
            id: ColorId::new(i as u16),
            name: name.to_owned(),
            normal,
        })
        .collect();

        let cosmetics = [
            (CosmeticSlot::Hat, "Arrow Hat"),
            (CosmeticSlot::Hat, "Crown"),
            (CosmeticSlot::Hat, "Horns"),
            (CosmeticSlot::Pant, "Batman"),
            (CosmeticSlot::Pant, "Chambray"),
            (CosmeticSlot::Pant, "Rainbow"),
            (CosmeticSlot::Accessory, "Shield"),
            (CosmeticSlot::Accessory, "Book"),
            (CosmeticSlot::FullSet, "Devil"),
            (CosmeticSlot::FullSet, "Angel"),
            (CosmeticSlot::FullSet, "Witch"),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (slot, name))| CosmeticItem {
            id: CosmeticId::new(i as u16),
            slot,
            name: name.to_owned(),
        })
        .collect();

        let weapons = ["Axe", "Boomerang", "Hammer", "Knife", "Candy"]
            .into_iter()
            .enumerate()
            .map(|(i, name)| WeaponItem {
                id: WeaponId::new(i as u16),
                name: name.to_owned(),
            })
            .collect();

        Self {
            names,
            colors,
            cosmetics,
            weapons,
        }
    }

    /// Looks up a weapon by ID.
    #[must_use]
    pub fn weapon(&self, id: WeaponId) -> Option<&WeaponItem> {
        self.weapons.iter().find(|w| w.id == id)
    }

    /// Looks up a cosmetic by ID.
    #[must_use]
    pub fn cosmetic(&self, id: CosmeticId) -> Option<&CosmeticItem> {
        self.cosmetics.iter().find(|c| c.id == id)
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog for StaticCatalog {
    fn random_name(&self, rng: &mut fastrand::Rng) -> String {
        self.names[rng.usize(..self.names.len())].clone()
    }

    fn random_color(&self, rng: &mut fastrand::Rng) -> ColorSwatch {
        self.colors[rng.usize(..self.colors.len())].clone()
    }

    fn random_cosmetic(&self, slot: CosmeticSlot, rng: &mut fastrand::Rng) -> Option<CosmeticId> {
        let matching: Vec<CosmeticId> = self
            .cosmetics
            .iter()
            .filter(|c| c.slot == slot)
            .map(|c| c.id)
            .collect();
        if matching.is_empty() {
            return None;
        }
        Some(matching[rng.usize(..matching.len())])
    }

    fn random_weapon(&self, rng: &mut fastrand::Rng) -> WeaponId {
        self.weapons[rng.usize(..self.weapons.len())].id
    }
}
