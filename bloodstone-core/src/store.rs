//! Authoritative world state with transactional actor updates.
//!
//! `WorldStore` stands in for the host platform's document model: actors
//! with embedded items, canvas tokens, and a name registry. All actor
//! mutation goes through [`ActorPatch`], an atomic multi-field update that
//! is validated before anything is committed. Reads after a committed patch
//! always observe it, including the derived maximum HP.
//!
//! Two interleaved activations against the same stone are not synchronized:
//! the drain counter is read-modify-write without isolation. Acceptable in
//! the single-user, turn-based setting this models.

use crate::actor::{derived_max, Actor, ActorId, HpModifier, ItemId};
use crate::item::{DrainState, Stone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from store lookups and patch application.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Actor {0} not found")]
    ActorNotFound(ActorId),

    #[error("Item {0} not found on actor")]
    ItemNotFound(ItemId),

    #[error("Patch rejected: current HP {requested} below zero")]
    NegativeHp { requested: i32 },

    #[error("Patch rejected: current HP {requested} above maximum {max}")]
    HpAboveMax { requested: i32, max: i32 },
}

/// Canvas position in grid pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// A canvas token referencing an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub actor: ActorId,
    pub position: Position,
}

/// Structured multi-field actor update, applied atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorPatch {
    pub hp_current: Option<i32>,
    pub hp_modifiers: Option<Vec<HpModifier>>,
}

impl ActorPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hp_current(mut self, current: i32) -> Self {
        self.hp_current = Some(current);
        self
    }

    pub fn with_hp_modifiers(mut self, modifiers: Vec<HpModifier>) -> Self {
        self.hp_modifiers = Some(modifiers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.hp_current.is_none() && self.hp_modifiers.is_none()
    }
}

/// In-memory actor/item/token store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WorldStore {
    actors: HashMap<ActorId, Actor>,
    /// Insertion order, for deterministic registry lookups.
    order: Vec<ActorId>,
    tokens: Vec<Token>,
    selected: Option<usize>,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Actors
    // ------------------------------------------------------------------

    pub fn insert_actor(&mut self, actor: Actor) -> ActorId {
        let id = actor.id;
        self.order.push(id);
        self.actors.insert(id, actor);
        id
    }

    pub fn actor(&self, id: ActorId) -> Result<&Actor, StoreError> {
        self.actors.get(&id).ok_or(StoreError::ActorNotFound(id))
    }

    /// Direct mutable access to an actor.
    ///
    /// Use with caution - modifications made here bypass patch validation.
    /// Intended for world setup, not for the activation flows.
    pub fn actor_mut(&mut self, id: ActorId) -> Result<&mut Actor, StoreError> {
        self.actors
            .get_mut(&id)
            .ok_or(StoreError::ActorNotFound(id))
    }

    /// Registry lookup by display name, in insertion order.
    pub fn find_actor_by_name(&self, name: &str) -> Option<ActorId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.actors.get(id).is_some_and(|a| a.name == name))
    }

    /// Apply a structured patch atomically.
    ///
    /// Every field is validated against the post-patch state before any of
    /// them is written: current HP must stay within `[0, max]` where max is
    /// derived from the patched modifier list.
    pub fn apply(&mut self, id: ActorId, patch: ActorPatch) -> Result<(), StoreError> {
        let actor = self.actors.get(&id).ok_or(StoreError::ActorNotFound(id))?;

        let new_current = patch.hp_current.unwrap_or(actor.current_hp);
        let new_max = derived_max(
            actor.base_max_hp,
            patch.hp_modifiers.as_deref().unwrap_or(&actor.hp_modifiers),
        );
        if new_current < 0 {
            return Err(StoreError::NegativeHp {
                requested: new_current,
            });
        }
        if new_current > new_max {
            return Err(StoreError::HpAboveMax {
                requested: new_current,
                max: new_max,
            });
        }

        // Validation passed; commit all fields together.
        let actor = self
            .actors
            .get_mut(&id)
            .ok_or(StoreError::ActorNotFound(id))?;
        if let Some(current) = patch.hp_current {
            actor.current_hp = current;
        }
        if let Some(modifiers) = patch.hp_modifiers {
            actor.hp_modifiers = modifiers;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stones
    // ------------------------------------------------------------------

    /// Embed a stone in an actor's inventory.
    pub fn add_stone(&mut self, actor: ActorId, stone: Stone) -> Result<ItemId, StoreError> {
        let owner = self
            .actors
            .get_mut(&actor)
            .ok_or(StoreError::ActorNotFound(actor))?;
        let id = stone.id;
        owner.stones.push(stone);
        Ok(id)
    }

    /// First stone on the actor whose name matches the label exactly.
    pub fn find_stone(&self, actor: ActorId, label: &str) -> Result<Option<ItemId>, StoreError> {
        Ok(self
            .actor(actor)?
            .stones
            .iter()
            .find(|s| s.name == label)
            .map(|s| s.id))
    }

    pub fn stone(&self, actor: ActorId, item: ItemId) -> Result<&Stone, StoreError> {
        self.actor(actor)?
            .stones
            .iter()
            .find(|s| s.id == item)
            .ok_or(StoreError::ItemNotFound(item))
    }

    pub fn drain_state(&self, actor: ActorId, item: ItemId) -> Result<DrainState, StoreError> {
        Ok(self.stone(actor, item)?.drain_state())
    }

    pub fn set_drain_state(
        &mut self,
        actor: ActorId,
        item: ItemId,
        state: DrainState,
    ) -> Result<(), StoreError> {
        let owner = self
            .actors
            .get_mut(&actor)
            .ok_or(StoreError::ActorNotFound(actor))?;
        let stone = owner
            .stones
            .iter_mut()
            .find(|s| s.id == item)
            .ok_or(StoreError::ItemNotFound(item))?;
        stone.set_drain_state(state);
        Ok(())
    }

    /// Delete a stone from its owning actor, returning the removed item.
    pub fn delete_stone(&mut self, actor: ActorId, item: ItemId) -> Result<Stone, StoreError> {
        let owner = self
            .actors
            .get_mut(&actor)
            .ok_or(StoreError::ActorNotFound(actor))?;
        let idx = owner
            .stones
            .iter()
            .position(|s| s.id == item)
            .ok_or(StoreError::ItemNotFound(item))?;
        Ok(owner.stones.remove(idx))
    }

    // ------------------------------------------------------------------
    // Tokens & spawning
    // ------------------------------------------------------------------

    pub fn place_token(&mut self, actor: ActorId, position: Position) {
        self.tokens.push(Token { actor, position });
    }

    /// Select the first token belonging to the given actor.
    pub fn select_token(&mut self, actor: ActorId) -> bool {
        match self.tokens.iter().position(|t| t.actor == actor) {
            Some(idx) => {
                self.selected = Some(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// The controlled token, if any.
    pub fn selected_token(&self) -> Option<&Token> {
        self.selected.and_then(|idx| self.tokens.get(idx))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Spawn a fresh instance of a registry actor at the given position.
    pub fn spawn_at(&mut self, template: ActorId, position: Position) -> Result<ActorId, StoreError> {
        let spawned = self.actor(template)?.instantiate();
        let id = self.insert_actor(spawned);
        self.place_token(id, position);
        Ok(id)
    }
}
