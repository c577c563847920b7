//! Actor-side game state: hit points, modifiers, spells, saves.
//!
//! These types mirror the slice of the host platform's actor document the
//! Blood Stone interaction touches. Maximum HP is always derived from the
//! base value plus the enabled modifiers, never stored, so a committed
//! modifier change is visible to the very next read.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for embedded items (spells, stones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Saving Throws
// ============================================================================

/// The three saving throw types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveType {
    Fortitude,
    Reflex,
    Will,
}

impl SaveType {
    pub fn name(&self) -> &'static str {
        match self {
            SaveType::Fortitude => "Fortitude",
            SaveType::Reflex => "Reflex",
            SaveType::Will => "Will",
        }
    }
}

impl fmt::Display for SaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Hit-Point Modifiers
// ============================================================================

/// A labeled, signed adjustment to an actor's maximum hit points.
///
/// Repeated Blood Stone activations merge into the single entry carrying the
/// stone's label rather than appending new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpModifier {
    pub label: String,
    pub modifier: i32,
    pub enabled: bool,
    pub predicate: Vec<String>,
}

impl HpModifier {
    pub fn new(label: impl Into<String>, modifier: i32) -> Self {
        Self {
            label: label.into(),
            modifier,
            enabled: true,
            predicate: Vec::new(),
        }
    }
}

/// Maximum HP derived from a base value and a modifier list, floored at
/// zero. A drain that outgrows the base leaves the actor at 0/0, it does
/// not produce a negative maximum.
pub fn derived_max(base: i32, modifiers: &[HpModifier]) -> i32 {
    (base + modifiers
        .iter()
        .filter(|m| m.enabled)
        .map(|m| m.modifier)
        .sum::<i32>())
    .max(0)
}

// ============================================================================
// Spells
// ============================================================================

/// A spell known by an actor. Heightening is display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    pub id: ItemId,
    pub name: String,
    pub level: u8,
}

impl Spell {
    pub fn new(name: impl Into<String>, level: u8) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            level,
        }
    }

    /// The level announced for the heightened cast, capped at 10.
    pub fn heightened_level(&self) -> u8 {
        (self.level + 1).min(10)
    }
}

// ============================================================================
// Actors
// ============================================================================

/// An actor as seen by the Blood Stone interaction.
///
/// A missing entry in `save_bonuses` means the actor lacks that saving-throw
/// capability entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub level: i32,
    pub current_hp: i32,
    pub base_max_hp: i32,
    pub hp_modifiers: Vec<HpModifier>,
    pub spells: Vec<Spell>,
    pub stones: Vec<crate::item::Stone>,
    pub save_bonuses: HashMap<SaveType, i32>,
}

impl Actor {
    pub fn new(name: impl Into<String>, level: i32, max_hp: i32) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
            level,
            current_hp: max_hp,
            base_max_hp: max_hp,
            hp_modifiers: Vec::new(),
            spells: Vec::new(),
            stones: Vec::new(),
            save_bonuses: HashMap::new(),
        }
    }

    /// Maximum HP: base plus every enabled modifier.
    pub fn max_hp(&self) -> i32 {
        derived_max(self.base_max_hp, &self.hp_modifiers)
    }

    pub fn save_bonus(&self, save: SaveType) -> Option<i32> {
        self.save_bonuses.get(&save).copied()
    }

    /// Spells of level 1 or higher, the ones the stone can heighten.
    pub fn eligible_spells(&self) -> impl Iterator<Item = &Spell> {
        self.spells.iter().filter(|s| s.level >= 1)
    }

    pub fn spell(&self, id: ItemId) -> Option<&Spell> {
        self.spells.iter().find(|s| s.id == id)
    }

    pub fn hp_modifier(&self, label: &str) -> Option<&HpModifier> {
        self.hp_modifiers.iter().find(|m| m.label == label)
    }

    /// Clone this actor as a fresh instance with new document ids.
    ///
    /// Used when spawning a copy of a registry template onto the canvas.
    pub fn instantiate(&self) -> Actor {
        let mut copy = self.clone();
        copy.id = ActorId::new();
        for spell in &mut copy.spells {
            spell.id = ItemId::new();
        }
        for stone in &mut copy.stones {
            stone.id = ItemId::new();
        }
        copy
    }
}

/// Create a sample spellcaster for tests and demos.
pub fn create_sample_caster(name: impl Into<String>) -> Actor {
    let mut actor = Actor::new(name, 5, 45);
    actor.save_bonuses.insert(SaveType::Fortitude, 12);
    actor.save_bonuses.insert(SaveType::Reflex, 10);
    actor.save_bonuses.insert(SaveType::Will, 9);
    actor.spells.push(Spell::new("Prestidigitation", 0));
    actor.spells.push(Spell::new("Magic Missile", 1));
    actor.spells.push(Spell::new("Fireball", 3));
    actor
}
