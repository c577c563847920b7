//! The Blood Stone item and its persisted drain state.
//!
//! The stone carries string-keyed flags scoped to a `world` namespace, the
//! shape the host platform persists for items. The cumulative drain counter
//! lives in one of those flags as an explicit `{seeded, value}` pair so a
//! stone corrected back down to exactly zero is still distinguishable from a
//! stone that was never used.

use crate::actor::ItemId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Display label used to locate the stone and its HP modifier.
pub const STONE_LABEL: &str = "Blood Stone";

/// Total drain at which the stone becomes saturated and self-destructs.
pub const DRAIN_CAP: u32 = 100;

/// Inclusive range for the latent-drain seed rolled on first use.
pub const SEED_MIN: u32 = 6;
pub const SEED_MAX: u32 = 60;

/// Flag scope and key under which the drain state is persisted.
pub const FLAG_SCOPE: &str = "world";
pub const DRAIN_FLAG: &str = "hpDrained";

// ============================================================================
// Stone
// ============================================================================

/// A consumable Blood Stone embedded in an actor's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stone {
    pub id: ItemId,
    pub name: String,
    /// Persisted flags, keyed `scope.key`.
    pub flags: HashMap<String, Value>,
}

impl Stone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            flags: HashMap::new(),
        }
    }

    /// A fresh, never-used Blood Stone.
    pub fn blood_stone() -> Self {
        Self::new(STONE_LABEL)
    }

    pub fn get_flag(&self, scope: &str, key: &str) -> Option<&Value> {
        self.flags.get(&format!("{scope}.{key}"))
    }

    pub fn set_flag(&mut self, scope: &str, key: &str, value: Value) {
        self.flags.insert(format!("{scope}.{key}"), value);
    }

    /// Read the drain state out of this stone's flags.
    pub fn drain_state(&self) -> DrainState {
        DrainState::from_flag(self.get_flag(FLAG_SCOPE, DRAIN_FLAG))
    }

    pub fn set_drain_state(&mut self, state: DrainState) {
        self.set_flag(FLAG_SCOPE, DRAIN_FLAG, state.to_flag());
    }
}

// ============================================================================
// Drain State
// ============================================================================

/// Cumulative permanent-HP drain tracked per stone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrainState {
    /// Whether the latent-drain seed has been rolled for this stone.
    pub seeded: bool,
    /// Total HP drained so far, latent seed included.
    pub value: u32,
}

impl DrainState {
    /// Decode a persisted flag value.
    ///
    /// A bare integer is the original script's format and migrates as
    /// `seeded = (value != 0)`. Anything unreadable counts as never used.
    pub fn from_flag(flag: Option<&Value>) -> DrainState {
        match flag {
            Some(value) => {
                if let Some(n) = value.as_u64() {
                    return DrainState {
                        seeded: n != 0,
                        value: n as u32,
                    };
                }
                serde_json::from_value(value.clone()).unwrap_or_default()
            }
            None => DrainState::default(),
        }
    }

    pub fn to_flag(&self) -> Value {
        json!({ "seeded": self.seeded, "value": self.value })
    }

    /// Add one activation's permanent loss, rolling the latent seed first if
    /// this stone has never been used. Returns the seed when one was rolled.
    pub fn absorb<R: Rng>(&mut self, loss: u32, rng: &mut R) -> Option<u32> {
        let seed = if !self.seeded {
            let s = rng.gen_range(SEED_MIN..=SEED_MAX);
            self.seeded = true;
            self.value = s;
            Some(s)
        } else {
            None
        };
        self.value += loss;
        seed
    }

    /// A saturated stone has reached the cap and must crack.
    pub fn is_saturated(&self) -> bool {
        self.value >= DRAIN_CAP
    }
}
