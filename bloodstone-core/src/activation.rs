//! The Blood Stone activation flow.
//!
//! A short-lived state machine run once per use of the stone: resolve the
//! controlled token and the stone, pick a spell to heighten, roll the
//! fortitude save, apply immediate damage and permanent loss, advance the
//! drain counter, and crack the stone once the counter reaches the cap.
//!
//! Preconditions fail with a user-visible message before anything mutates;
//! cancelling the spell picker aborts silently. Every commit goes through
//! the store's transactional patches, and each stage re-reads the state the
//! previous stage committed.

use crate::actor::{derived_max, HpModifier, ItemId, SaveType};
use crate::dice::{DegreeOfSuccess, DiceError, SaveRoller};
use crate::interaction::{Interaction, Severity, SpellOption};
use crate::item::{DRAIN_CAP, STONE_LABEL};
use crate::rules::{describe_outcome, resolve_outcome, DrainPolicy, Effect, StoneOutcome};
use crate::store::{ActorPatch, Position, StoreError, WorldStore};
use rand::Rng;
use thiserror::Error;

/// Errors that abort an activation.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("No token selected")]
    NoTokenSelected,

    #[error("No {0} found on this actor")]
    StoneNotFound(String),

    #[error("Actor has no spells of level 1 or higher")]
    NoEligibleSpells,

    #[error("Selected spell not found on this actor")]
    SpellNotFound,

    #[error("No {0} save on this actor")]
    MissingSave(SaveType),

    #[error(transparent)]
    Dice(#[from] DiceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration for the activation flow.
#[derive(Debug, Clone)]
pub struct ActivationConfig {
    /// Difficulty class of the fortitude save.
    pub save_dc: i32,

    /// Display label used to locate the stone and its HP modifier.
    pub stone_label: String,

    /// Drain total at which the stone cracks.
    pub drain_cap: u32,

    /// Outcome policy (see [`DrainPolicy`]).
    pub policy: DrainPolicy,

    /// Adversary names tried in order when the stone cracks.
    pub adversary_names: Vec<String>,

    /// Offset from the triggering token where the adversary appears.
    pub spawn_offset: (i64, i64),
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            save_dc: 25,
            stone_label: STONE_LABEL.to_string(),
            drain_cap: DRAIN_CAP,
            policy: DrainPolicy::default(),
            adversary_names: vec!["Kalavakus Demon".to_string(), "Blood Demon".to_string()],
            spawn_offset: (100, 0),
        }
    }
}

impl ActivationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_save_dc(mut self, dc: i32) -> Self {
        self.save_dc = dc;
        self
    }

    pub fn with_stone_label(mut self, label: impl Into<String>) -> Self {
        self.stone_label = label.into();
        self
    }

    pub fn with_drain_cap(mut self, cap: u32) -> Self {
        self.drain_cap = cap;
        self
    }

    pub fn with_policy(mut self, policy: DrainPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_adversary_names(mut self, names: Vec<String>) -> Self {
        self.adversary_names = names;
        self
    }

    pub fn with_spawn_offset(mut self, dx: i64, dy: i64) -> Self {
        self.spawn_offset = (dx, dy);
        self
    }
}

/// Result of running the flow.
#[derive(Debug, Clone)]
pub enum Activation {
    /// The user declined the spell picker; nothing happened.
    Cancelled,
    Completed(ActivationReport),
}

/// What a completed activation did.
#[derive(Debug, Clone)]
pub struct ActivationReport {
    pub degree: DegreeOfSuccess,
    pub outcome: StoneOutcome,
    /// Stone drain total after this activation.
    pub drained: u32,
    /// Whether the stone reached the cap and was destroyed.
    pub stone_cracked: bool,
    pub effects: Vec<Effect>,
}

/// One activation of a Blood Stone, borrowing the world and its ports.
pub struct StoneActivation<'a, R: Rng> {
    store: &'a mut WorldStore,
    ui: &'a mut dyn Interaction,
    saves: &'a mut dyn SaveRoller,
    rng: &'a mut R,
    config: ActivationConfig,
}

impl<'a, R: Rng> StoneActivation<'a, R> {
    pub fn new(
        store: &'a mut WorldStore,
        ui: &'a mut dyn Interaction,
        saves: &'a mut dyn SaveRoller,
        rng: &'a mut R,
    ) -> Self {
        Self {
            store,
            ui,
            saves,
            rng,
            config: ActivationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ActivationConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the activation. `stone` may name the item directly (the item
    /// macro path); otherwise the actor's inventory is searched by label.
    pub fn run(&mut self, stone: Option<ItemId>) -> Result<Activation, ActivationError> {
        let label = self.config.stone_label.clone();

        // Stage 1: resolve token, actor, and stone.
        let Some(token) = self.store.selected_token().copied() else {
            self.ui.notify(Severity::Warn, "Select a token first.");
            return Err(ActivationError::NoTokenSelected);
        };
        let actor_id = token.actor;

        let resolved = match stone {
            Some(id) if self.store.stone(actor_id, id).is_ok() => Some(id),
            Some(_) => None,
            None => self.store.find_stone(actor_id, &label)?,
        };
        let Some(stone_id) = resolved else {
            self.ui
                .notify(Severity::Warn, &format!("No {label} found on this actor."));
            return Err(ActivationError::StoneNotFound(label));
        };

        // Stage 2: spell selection and heightening announcement.
        let actor = self.store.actor(actor_id)?;
        let options: Vec<SpellOption> = actor
            .eligible_spells()
            .map(|s| SpellOption {
                id: s.id,
                name: s.name.clone(),
                level: s.level,
            })
            .collect();
        if options.is_empty() {
            self.ui
                .notify(Severity::Warn, "Actor has no 1st-level+ spells.");
            return Err(ActivationError::NoEligibleSpells);
        }

        let title = format!("{label} - Select Spell");
        let Some(spell_id) = self.ui.select_spell(&title, &options) else {
            return Ok(Activation::Cancelled);
        };

        let actor = self.store.actor(actor_id)?;
        let spell = actor
            .spell(spell_id)
            .ok_or(ActivationError::SpellNotFound)?;
        let (spell_name, old_level, new_level) =
            (spell.name.clone(), spell.level, spell.heightened_level());
        let actor_name = actor.name.clone();
        let actor_level = actor.level;
        let fortitude = actor.save_bonus(SaveType::Fortitude);

        let mut effects = Vec::new();
        self.ui.chat(&format!(
            "{label} heightens {spell_name} from {old_level} to {new_level}."
        ));
        self.ui
            .chat(&format!("{actor_name} casts {spell_name} (lvl {new_level})."));
        effects.push(Effect::SpellHeightened {
            spell: spell_name,
            from: old_level,
            to: new_level,
        });

        // Stage 3: fortitude save.
        let Some(bonus) = fortitude else {
            self.ui
                .notify(Severity::Error, "No Fortitude save on this actor.");
            return Err(ActivationError::MissingSave(SaveType::Fortitude));
        };
        let roll = self.saves.roll_save(bonus, self.config.save_dc)?;
        effects.push(Effect::SaveResolved {
            degree: roll.degree,
            total: roll.total,
            dc: roll.dc,
        });

        // Stage 4: outcome resolution.
        let outcome = resolve_outcome(roll.degree, actor_level, self.config.policy);
        let message = describe_outcome(roll.degree, outcome);
        self.ui.chat(&message);
        self.ui.notify(Severity::Info, &message);

        // Stage 5: immediate damage, committed before the permanent loss.
        if outcome.damage > 0 {
            let current = self.store.actor(actor_id)?.current_hp;
            let new_current = (current - outcome.damage).max(0);
            self.store
                .apply(actor_id, ActorPatch::new().with_hp_current(new_current))?;
            self.ui.chat(&format!(
                "{actor_name} takes {} damage from the {label}.",
                outcome.damage
            ));
            effects.push(Effect::DamageTaken {
                amount: outcome.damage,
                new_current,
            });
        }

        let mut stone_cracked = false;
        let drained;

        if outcome.permanent_loss > 0 {
            // Stage 6: merge the permanent loss into the cumulative
            // modifier and clamp current HP, as one patch.
            let loss = outcome.permanent_loss;
            let actor = self.store.actor(actor_id)?;
            let mut modifiers = actor.hp_modifiers.clone();
            match modifiers.iter_mut().find(|m| m.label == label) {
                Some(entry) => entry.modifier -= loss,
                None => modifiers.push(HpModifier::new(&label, -loss)),
            }
            // Derive the new max from the patched list so the zero floor
            // applies; a loss deeper than the base must not wedge the flow
            // before the drain stages.
            let new_max = derived_max(actor.base_max_hp, &modifiers);
            let current = actor.current_hp;

            let mut patch = ActorPatch::new().with_hp_modifiers(modifiers);
            let clamped_current = if current > new_max {
                patch = patch.with_hp_current(new_max);
                Some(new_max)
            } else {
                None
            };
            self.store.apply(actor_id, patch)?;
            effects.push(Effect::MaxHpReduced {
                loss,
                new_max,
                clamped_current,
            });

            // Stage 7: advance the drain counter.
            let mut drain = self.store.drain_state(actor_id, stone_id)?;
            if let Some(seed) = drain.absorb(loss as u32, self.rng) {
                self.ui.chat(&format!(
                    "The {label} already hums with {seed} stolen HP."
                ));
                effects.push(Effect::DrainSeeded { seed });
            }
            self.store.set_drain_state(actor_id, stone_id, drain)?;
            self.ui.chat(&format!(
                "{label} drains {loss} HP (stone total {}/{}).",
                drain.value, self.config.drain_cap
            ));
            effects.push(Effect::DrainIncreased {
                amount: loss as u32,
                total: drain.value,
                cap: self.config.drain_cap,
            });
            drained = drain.value;

            // Stage 8: the awakening. Irreversible; the stone stops
            // existing, so it cannot re-trigger.
            if drain.value >= self.config.drain_cap {
                self.ui.notify(
                    Severity::Error,
                    &format!("The {label} cracks - a blood demon emerges!"),
                );
                let adversary = self.spawn_adversary(token.position);
                self.store.delete_stone(actor_id, stone_id)?;
                stone_cracked = true;
                effects.push(Effect::StoneCracked { adversary });
            }
        } else {
            drained = self.store.drain_state(actor_id, stone_id)?.value;
        }

        Ok(Activation::Completed(ActivationReport {
            degree: roll.degree,
            outcome,
            drained,
            stone_cracked,
            effects,
        }))
    }

    /// Try the configured adversary names in order; a missing template or a
    /// failed spawn is skipped silently.
    fn spawn_adversary(&mut self, origin: Position) -> Option<String> {
        let (dx, dy) = self.config.spawn_offset;
        let position = Position {
            x: origin.x + dx,
            y: origin.y + dy,
        };
        for name in &self.config.adversary_names {
            if let Some(template) = self.store.find_actor_by_name(name) {
                if self.store.spawn_at(template, position).is_ok() {
                    return Some(name.clone());
                }
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::DrainState;
    use crate::testing::{assert_hp, SpellPick, TestHarness};

    fn completed(result: Result<Activation, ActivationError>) -> ActivationReport {
        match result.expect("activation should complete") {
            Activation::Completed(report) => report,
            Activation::Cancelled => panic!("activation was cancelled"),
        }
    }

    #[test]
    fn test_exacting_success_drains_and_damages() {
        let mut harness = TestHarness::new();
        harness.saves.queue(DegreeOfSuccess::Success);

        let report = completed(harness.activate());
        assert_eq!(report.outcome.permanent_loss, 1);
        assert_eq!(report.outcome.damage, 1);
        assert!(!report.stone_cracked);

        // Damage dropped current to 44, then the modifier dropped max to 44
        assert_hp(&harness, 44, 44);
        assert_eq!(harness.modifier(), Some(-1));

        // Freshly seeded stone: total is seed + 1
        let drain = harness.drained();
        assert!(drain.seeded);
        assert!((7..=61).contains(&drain.value));
        assert_eq!(report.drained, drain.value);
    }

    #[test]
    fn test_merciful_critical_success_is_free() {
        let mut harness = TestHarness::new().with_policy(DrainPolicy::Merciful);
        harness.saves.queue(DegreeOfSuccess::CriticalSuccess);

        let report = completed(harness.activate());
        assert_eq!(report.outcome.permanent_loss, 0);
        assert_hp(&harness, 45, 45);
        assert_eq!(harness.modifier(), None);

        // No loss means the stone is not even seeded
        assert!(!harness.drained().seeded);
        assert_eq!(report.drained, 0);
    }

    #[test]
    fn test_merciful_failure_clamps_current_hp() {
        let mut harness = TestHarness::new().with_policy(DrainPolicy::Merciful);
        harness.saves.queue(DegreeOfSuccess::Failure);

        let report = completed(harness.activate());
        assert_eq!(report.outcome.permanent_loss, 5);
        assert_eq!(report.outcome.damage, 0);

        // No immediate damage, so current (45) exceeded the new max (40)
        assert_hp(&harness, 40, 40);
        assert!(report.effects.iter().any(|e| matches!(
            e,
            Effect::MaxHpReduced {
                loss: 5,
                new_max: 40,
                clamped_current: Some(40)
            }
        )));
    }

    #[test]
    fn test_repeat_activations_merge_modifier() {
        let mut harness = TestHarness::new();
        harness.saves.queue(DegreeOfSuccess::Success);
        harness.saves.queue(DegreeOfSuccess::CriticalFailure);

        completed(harness.activate());
        completed(harness.activate());

        let actor = harness.store.actor(harness.actor_id).unwrap();
        let entries: Vec<_> = actor
            .hp_modifiers
            .iter()
            .filter(|m| m.label == "Blood Stone")
            .collect();
        assert_eq!(entries.len(), 1);
        // 1 from the success, 10 (level 5 doubled) from the critical failure
        assert_eq!(entries[0].modifier, -11);
    }

    #[test]
    fn test_cancellation_has_no_side_effects() {
        let mut harness = TestHarness::new();
        harness.ui.queue_pick(SpellPick::Cancel);

        let result = harness.activate().expect("cancel is not an error");
        assert!(matches!(result, Activation::Cancelled));

        assert!(harness.ui.chat_log.is_empty());
        assert!(harness.ui.notices.is_empty());
        assert_hp(&harness, 45, 45);
        assert!(!harness.drained().seeded);
    }

    #[test]
    fn test_missing_fortitude_save_aborts_without_mutation() {
        let mut harness = TestHarness::new();
        harness
            .store
            .actor_mut(harness.actor_id)
            .unwrap()
            .save_bonuses
            .remove(&SaveType::Fortitude);

        let err = harness.activate().unwrap_err();
        assert!(matches!(
            err,
            ActivationError::MissingSave(SaveType::Fortitude)
        ));
        assert!(harness
            .ui
            .notices
            .iter()
            .any(|(s, m)| *s == Severity::Error && m.contains("No Fortitude save")));
        assert_hp(&harness, 45, 45);
        assert_eq!(harness.modifier(), None);
        assert!(!harness.drained().seeded);
    }

    #[test]
    fn test_unexpected_save_result_aborts_before_mutation() {
        let mut harness = TestHarness::new();
        harness.saves.queue_raw(7);

        let err = harness.activate().unwrap_err();
        assert!(matches!(
            err,
            ActivationError::Dice(DiceError::UnexpectedSaveResult(7))
        ));
        assert_hp(&harness, 45, 45);
        assert!(!harness.drained().seeded);
    }

    #[test]
    fn test_no_token_selected() {
        let mut harness = TestHarness::new();
        harness.store.clear_selection();

        let err = harness.activate().unwrap_err();
        assert!(matches!(err, ActivationError::NoTokenSelected));
        assert!(harness
            .ui
            .notices
            .iter()
            .any(|(s, _)| *s == Severity::Warn));
    }

    #[test]
    fn test_stone_missing() {
        let mut harness = TestHarness::new();
        let stone_id = harness.stone_id;
        harness
            .store
            .delete_stone(harness.actor_id, stone_id)
            .unwrap();

        let err = harness.activate().unwrap_err();
        assert!(matches!(err, ActivationError::StoneNotFound(_)));
    }

    #[test]
    fn test_no_eligible_spells() {
        let mut harness = TestHarness::new();
        harness
            .store
            .actor_mut(harness.actor_id)
            .unwrap()
            .spells
            .retain(|s| s.level == 0);

        let err = harness.activate().unwrap_err();
        assert!(matches!(err, ActivationError::NoEligibleSpells));
    }

    #[test]
    fn test_threshold_cracks_stone_and_spawns_demon() {
        let mut harness = TestHarness::new();
        harness.register_adversary("Kalavakus Demon");
        harness.set_drain(DrainState {
            seeded: true,
            value: 99,
        });
        harness.saves.queue(DegreeOfSuccess::Success);

        let report = completed(harness.activate());
        assert_eq!(report.drained, 100);
        assert!(report.stone_cracked);
        assert!(!harness.has_stone());

        // A fresh demon instance stands next to the triggering token
        let demons: Vec<_> = harness
            .store
            .tokens()
            .iter()
            .filter(|t| {
                harness
                    .store
                    .actor(t.actor)
                    .is_ok_and(|a| a.name == "Kalavakus Demon")
            })
            .collect();
        assert_eq!(demons.len(), 1);
        assert_eq!(demons[0].position, Position { x: 200, y: 100 });
        assert!(report.effects.iter().any(|e| matches!(
            e,
            Effect::StoneCracked {
                adversary: Some(name)
            } if name == "Kalavakus Demon"
        )));
    }

    #[test]
    fn test_threshold_falls_back_to_second_adversary() {
        let mut harness = TestHarness::new();
        harness.register_adversary("Blood Demon");
        harness.set_drain(DrainState {
            seeded: true,
            value: 99,
        });
        harness.saves.queue(DegreeOfSuccess::Success);

        let report = completed(harness.activate());
        assert!(report.effects.iter().any(|e| matches!(
            e,
            Effect::StoneCracked {
                adversary: Some(name)
            } if name == "Blood Demon"
        )));
    }

    #[test]
    fn test_threshold_without_adversary_still_destroys_stone() {
        let mut harness = TestHarness::new();
        harness.set_drain(DrainState {
            seeded: true,
            value: 99,
        });
        harness.saves.queue(DegreeOfSuccess::Success);

        let report = completed(harness.activate());
        assert!(report.stone_cracked);
        assert!(!harness.has_stone());
        assert!(report
            .effects
            .iter()
            .any(|e| matches!(e, Effect::StoneCracked { adversary: None })));
    }

    #[test]
    fn test_direct_stone_id_skips_label_lookup() {
        let mut harness = TestHarness::new();
        harness.saves.queue(DegreeOfSuccess::Success);
        let stone_id = harness.stone_id;

        let report = completed(harness.activate_with(Some(stone_id)));
        assert_eq!(report.outcome.permanent_loss, 1);
    }

    #[test]
    fn test_seeded_drain_accumulates_exactly() {
        let mut harness = TestHarness::new();
        harness.set_drain(DrainState {
            seeded: true,
            value: 40,
        });
        harness.saves.queue(DegreeOfSuccess::CriticalFailure);

        let report = completed(harness.activate());
        // Level 5 doubled: 10 loss on top of the stored 40
        assert_eq!(report.drained, 50);
        assert!(!report.stone_cracked);
    }

    #[test]
    fn test_damage_exceeding_current_floors_at_zero() {
        let mut harness = TestHarness::new();
        harness.store.actor_mut(harness.actor_id).unwrap().current_hp = 3;
        harness.saves.queue(DegreeOfSuccess::Failure);

        let report = completed(harness.activate());
        // Level 5: 5 damage against 3 current HP
        assert_hp(&harness, 0, 40);
        assert!(report.effects.iter().any(|e| matches!(
            e,
            Effect::DamageTaken {
                amount: 5,
                new_current: 0
            }
        )));
    }

    #[test]
    fn test_loss_exceeding_max_leaves_zero_and_still_cracks() {
        // An actor whose whole HP pool is smaller than one bad activation:
        // the flow must run through the drain and crack stages regardless
        let mut harness = TestHarness::new();
        {
            let actor = harness.store.actor_mut(harness.actor_id).unwrap();
            actor.base_max_hp = 8;
            actor.current_hp = 8;
        }
        harness.set_drain(DrainState {
            seeded: true,
            value: 99,
        });
        harness.saves.queue(DegreeOfSuccess::CriticalFailure);

        let report = completed(harness.activate());
        // Level 5 doubled: 10 damage floors current, 10 loss floors max
        assert_hp(&harness, 0, 0);
        assert_eq!(harness.modifier(), Some(-10));
        assert_eq!(report.drained, 109);
        assert!(report.stone_cracked);
        assert!(!harness.has_stone());
    }

    #[test]
    fn test_loss_exceeding_max_clamps_current_without_damage() {
        let mut harness = TestHarness::new().with_policy(DrainPolicy::Merciful);
        {
            let actor = harness.store.actor_mut(harness.actor_id).unwrap();
            actor.base_max_hp = 8;
            actor.current_hp = 8;
        }
        harness.saves.queue(DegreeOfSuccess::CriticalFailure);

        let report = completed(harness.activate());
        // Merciful deals no immediate damage, so the clamp does all the work
        assert_hp(&harness, 0, 0);
        assert!(report.effects.iter().any(|e| matches!(
            e,
            Effect::MaxHpReduced {
                loss: 10,
                new_max: 0,
                clamped_current: Some(0)
            }
        )));
        assert!(harness.drained().seeded);
    }
}
