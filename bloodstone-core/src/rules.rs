//! Outcome resolution for a Blood Stone activation.
//!
//! Maps the degree of success on the fortitude save to the permanent
//! hit-point loss and (policy-dependent) immediate damage, and defines the
//! `Effect` record describing what an activation did. Effects are
//! observational; only the state held by the store is authoritative.

use crate::dice::DegreeOfSuccess;
use serde::{Deserialize, Serialize};

/// How harshly the stone treats its bearer.
///
/// The two original variants of the item disagreed on whether good saves
/// still cost blood; both are supported and the choice is configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrainPolicy {
    /// A critical success escapes unharmed and no immediate damage is ever
    /// dealt; only the permanent loss applies.
    Merciful,
    /// Every activation costs at least 1 permanent HP, and immediate damage
    /// mirrors the permanent loss.
    #[default]
    Exacting,
}

/// Permanent loss and immediate damage for one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoneOutcome {
    pub permanent_loss: i32,
    pub damage: i32,
}

/// The core table: degree of success to (permanent loss, immediate damage).
pub fn resolve_outcome(
    degree: DegreeOfSuccess,
    actor_level: i32,
    policy: DrainPolicy,
) -> StoneOutcome {
    let (permanent_loss, damage) = match policy {
        DrainPolicy::Merciful => match degree {
            DegreeOfSuccess::CriticalSuccess => (0, 0),
            DegreeOfSuccess::Success => (1, 0),
            DegreeOfSuccess::Failure => (actor_level, 0),
            DegreeOfSuccess::CriticalFailure => (actor_level * 2, 0),
        },
        DrainPolicy::Exacting => match degree {
            DegreeOfSuccess::CriticalSuccess => (1, 0),
            DegreeOfSuccess::Success => (1, 1),
            DegreeOfSuccess::Failure => (actor_level, actor_level),
            DegreeOfSuccess::CriticalFailure => (actor_level * 2, actor_level * 2),
        },
    };
    StoneOutcome {
        permanent_loss,
        damage,
    }
}

/// Chat line announcing the outcome of the save.
pub fn describe_outcome(degree: DegreeOfSuccess, outcome: StoneOutcome) -> String {
    if outcome.permanent_loss == 0 {
        format!("{}: No ill effect.", degree.name())
    } else if outcome.damage == 0 {
        format!(
            "{}: Lose {} permanent HP.",
            degree.name(),
            outcome.permanent_loss
        )
    } else {
        format!(
            "{}: Lose {} permanent HP and take {} damage.",
            degree.name(),
            outcome.permanent_loss,
            outcome.damage
        )
    }
}

/// One applied state change, recorded in activation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// The chosen spell was announced at its heightened level.
    SpellHeightened { spell: String, from: u8, to: u8 },

    /// The fortitude save resolved.
    SaveResolved {
        degree: DegreeOfSuccess,
        total: i32,
        dc: i32,
    },

    /// Immediate damage was applied to current HP.
    DamageTaken { amount: i32, new_current: i32 },

    /// The cumulative modifier grew and maximum HP dropped.
    MaxHpReduced {
        loss: i32,
        new_max: i32,
        /// Current HP after clamping, when it exceeded the new maximum.
        clamped_current: Option<i32>,
    },

    /// The latent-drain seed was rolled on first use.
    DrainSeeded { seed: u32 },

    /// The drain counter advanced.
    DrainIncreased { amount: u32, total: u32, cap: u32 },

    /// The stone reached the cap, was destroyed, and an adversary spawn was
    /// attempted.
    StoneCracked { adversary: Option<String> },
}
