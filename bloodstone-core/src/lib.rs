//! Blood Stone consumable mechanics.
//!
//! This crate provides:
//! - The full Blood Stone activation flow (spell heightening, fortitude
//!   save, permanent HP loss, cumulative drain, adversary spawn)
//! - A correction tool for rewriting the permanent-loss modifier
//! - A transactional world store with structured actor patches
//! - Scriptable interaction and save ports for headless testing
//!
//! # Quick Start
//!
//! ```ignore
//! use bloodstone_core::{ConsoleInteraction, D20Roller, StoneActivation, WorldStore};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = WorldStore::new();
//!     // ... insert an actor, its stone, and a selected token ...
//!
//!     let mut ui = ConsoleInteraction;
//!     let mut saves = D20Roller::new(StdRng::from_entropy());
//!     let mut rng = StdRng::from_entropy();
//!
//!     let outcome = StoneActivation::new(&mut store, &mut ui, &mut saves, &mut rng)
//!         .run(None)?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod activation;
pub mod actor;
pub mod correction;
pub mod dice;
pub mod interaction;
pub mod item;
pub mod rules;
pub mod store;
pub mod testing;

// Primary public API
pub use activation::{
    Activation, ActivationConfig, ActivationError, ActivationReport, StoneActivation,
};
pub use actor::{create_sample_caster, Actor, ActorId, HpModifier, ItemId, SaveType, Spell};
pub use correction::{Correction, CorrectionError, CorrectionReport, StoneCorrection};
pub use dice::{D20Roller, DegreeOfSuccess, DiceError, SaveRoll, SaveRoller};
pub use interaction::{ConsoleInteraction, Interaction, Severity, SpellOption};
pub use item::{DrainState, Stone, DRAIN_CAP, STONE_LABEL};
pub use rules::{describe_outcome, resolve_outcome, DrainPolicy, Effect, StoneOutcome};
pub use store::{ActorPatch, Position, StoreError, Token, WorldStore};
pub use testing::{assert_chat_contains, assert_hp, ScriptedInteraction, ScriptedSaves, SpellPick, TestHarness};
