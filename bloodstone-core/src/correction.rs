//! Correction tool for the Blood Stone HP modifier.
//!
//! Game masters occasionally need to rewrite the cumulative permanent loss
//! (a missed activation, a botched ruling). This flow prompts for the new
//! total, rewrites the single Blood-Stone modifier, and clamps current HP
//! down to the recomputed maximum, all in one patch.

use crate::actor::derived_max;
use crate::interaction::{Interaction, Severity};
use crate::item::STONE_LABEL;
use crate::store::{ActorPatch, StoreError, WorldStore};
use thiserror::Error;

/// Errors that abort a correction.
#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("No token selected")]
    NoTokenSelected,

    #[error("No {0} modifier found on this actor")]
    ModifierNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of running the correction tool.
#[derive(Debug, Clone)]
pub enum Correction {
    /// The user dismissed the prompt; nothing happened.
    Cancelled,
    Applied(CorrectionReport),
}

/// What an applied correction changed.
#[derive(Debug, Clone)]
pub struct CorrectionReport {
    /// The new total permanent loss (stored as `-new_total` on the entry).
    pub new_total: i32,
    pub new_max: i32,
    /// Current HP after clamping, when it exceeded the new maximum.
    pub clamped_current: Option<i32>,
}

/// One run of the correction tool, borrowing the world and the UI port.
pub struct StoneCorrection<'a> {
    store: &'a mut WorldStore,
    ui: &'a mut dyn Interaction,
    label: String,
}

impl<'a> StoneCorrection<'a> {
    pub fn new(store: &'a mut WorldStore, ui: &'a mut dyn Interaction) -> Self {
        Self {
            store,
            ui,
            label: STONE_LABEL.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn run(&mut self) -> Result<Correction, CorrectionError> {
        let label = self.label.clone();

        let Some(token) = self.store.selected_token().copied() else {
            self.ui.notify(Severity::Warn, "Select a token first.");
            return Err(CorrectionError::NoTokenSelected);
        };
        let actor_id = token.actor;

        let actor = self.store.actor(actor_id)?;
        let Some(idx) = actor.hp_modifiers.iter().position(|m| m.label == label) else {
            self.ui
                .notify(Severity::Warn, &format!("No {label} modifier found."));
            return Err(CorrectionError::ModifierNotFound(label));
        };
        let current_total = -(actor.hp_modifiers[idx].modifier) as i64;

        let title = format!("Adjust {label} Loss");
        let Some(input) =
            self.ui
                .prompt_amount(&title, "New total HP loss", current_total)
        else {
            return Ok(Correction::Cancelled);
        };
        // The sign is implied; a negative entry means the same total.
        let new_total = input.unsigned_abs().min(i32::MAX as u64) as i32;

        let actor = self.store.actor(actor_id)?;
        let mut modifiers = actor.hp_modifiers.clone();
        modifiers[idx].modifier = -new_total;

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

        self.ui.notify(
            Severity::Info,
            &format!("{label} permanent loss set to {new_total} HP."),
        );

        Ok(Correction::Applied(CorrectionReport {
            new_total,
            new_max,
            clamped_current,
        }))
    }
}
