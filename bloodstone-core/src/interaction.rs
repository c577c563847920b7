//! User-interaction port.
//!
//! The host platform's dialogs, transient notifications, and chat log are
//! reached through the `Interaction` trait, injected into the flows rather
//! than looked up globally. Tests substitute a scripted responder (see
//! `crate::testing`); live play can use [`ConsoleInteraction`].

use crate::actor::ItemId;
use std::fmt;
use std::io::{self, BufRead, Write};

/// Notification severity, mirroring the host's info/warn/error levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// One selectable spell in the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellOption {
    pub id: ItemId,
    pub name: String,
    pub level: u8,
}

impl fmt::Display for SpellOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (lvl {})", self.name, self.level)
    }
}

/// Capability for prompting the user and surfacing messages.
///
/// `None` from either prompt means the user cancelled; the flows then abort
/// without mutating anything.
pub trait Interaction {
    /// Modal spell-selection dialog.
    fn select_spell(&mut self, title: &str, options: &[SpellOption]) -> Option<ItemId>;

    /// Modal numeric prompt (used by the correction tool).
    fn prompt_amount(&mut self, title: &str, label: &str, default: i64) -> Option<i64>;

    /// Transient notification.
    fn notify(&mut self, severity: Severity, message: &str);

    /// Append-only chat feed.
    fn chat(&mut self, message: &str);
}

/// Terminal implementation of the interaction port.
///
/// Options are listed numbered; an empty or unparseable reply cancels the
/// dialog, and an empty reply to the numeric prompt accepts the default.
#[derive(Debug, Default)]
pub struct ConsoleInteraction;

impl ConsoleInteraction {
    pub fn new() -> Self {
        Self
    }

    fn read_line() -> Option<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    }
}

impl Interaction for ConsoleInteraction {
    fn select_spell(&mut self, title: &str, options: &[SpellOption]) -> Option<ItemId> {
        println!("{title}");
        for (i, option) in options.iter().enumerate() {
            println!("  {}. {option}", i + 1);
        }
        print!("Spell (1-{}, blank to cancel): ", options.len());
        let _ = io::stdout().flush();

        let reply = Self::read_line()?;
        let choice: usize = reply.parse().ok()?;
        options.get(choice.checked_sub(1)?).map(|o| o.id)
    }

    fn prompt_amount(&mut self, title: &str, label: &str, default: i64) -> Option<i64> {
        println!("{title}");
        print!("{label} [{default}]: ");
        let _ = io::stdout().flush();

        let reply = Self::read_line()?;
        if reply.is_empty() {
            return Some(default);
        }
        reply.parse().ok()
    }

    fn notify(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => println!("[info] {message}"),
            Severity::Warn => println!("[warn] {message}"),
            Severity::Error => eprintln!("[error] {message}"),
        }
    }

    fn chat(&mut self, message: &str) {
        println!("{message}");
    }
}
