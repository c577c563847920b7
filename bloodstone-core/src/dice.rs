//! d20 checks and degrees of success.
//!
//! The Blood Stone forces a fortitude save against a fixed DC. This module
//! provides the four-valued degree-of-success enumeration, the rules for
//! deriving it from a d20 check, and the `SaveRoller` port through which the
//! activation flow obtains save results.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for save resolution.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Unexpected save result: {0}")]
    UnexpectedSaveResult(i64),
}

/// Four-valued outcome of a check against a difficulty class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DegreeOfSuccess {
    CriticalSuccess,
    Success,
    Failure,
    CriticalFailure,
}

impl DegreeOfSuccess {
    /// Derive the degree from a completed d20 check.
    ///
    /// Beat the DC by 10 or more for a critical success, miss it by 10 or
    /// more for a critical failure. A natural 20 improves the degree one
    /// step; a natural 1 worsens it one step.
    pub fn from_check(total: i32, natural: u32, dc: i32) -> Self {
        let base = if total >= dc + 10 {
            DegreeOfSuccess::CriticalSuccess
        } else if total >= dc {
            DegreeOfSuccess::Success
        } else if total <= dc - 10 {
            DegreeOfSuccess::CriticalFailure
        } else {
            DegreeOfSuccess::Failure
        };

        match natural {
            20 => base.improved(),
            1 => base.worsened(),
            _ => base,
        }
    }

    /// Parse a raw numeric degree as delivered by an external save
    /// subsystem: 3, 2, 1, 0 from best to worst. Anything else is an error.
    pub fn from_external(raw: i64) -> Result<Self, DiceError> {
        match raw {
            3 => Ok(DegreeOfSuccess::CriticalSuccess),
            2 => Ok(DegreeOfSuccess::Success),
            1 => Ok(DegreeOfSuccess::Failure),
            0 => Ok(DegreeOfSuccess::CriticalFailure),
            other => Err(DiceError::UnexpectedSaveResult(other)),
        }
    }

    /// The raw numeric form used by external save subsystems.
    pub fn to_external(self) -> i64 {
        match self {
            DegreeOfSuccess::CriticalSuccess => 3,
            DegreeOfSuccess::Success => 2,
            DegreeOfSuccess::Failure => 1,
            DegreeOfSuccess::CriticalFailure => 0,
        }
    }

    /// One step better (critical success stays put).
    pub fn improved(self) -> Self {
        match self {
            DegreeOfSuccess::CriticalFailure => DegreeOfSuccess::Failure,
            DegreeOfSuccess::Failure => DegreeOfSuccess::Success,
            _ => DegreeOfSuccess::CriticalSuccess,
        }
    }

    /// One step worse (critical failure stays put).
    pub fn worsened(self) -> Self {
        match self {
            DegreeOfSuccess::CriticalSuccess => DegreeOfSuccess::Success,
            DegreeOfSuccess::Success => DegreeOfSuccess::Failure,
            _ => DegreeOfSuccess::CriticalFailure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            DegreeOfSuccess::CriticalSuccess | DegreeOfSuccess::Success
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DegreeOfSuccess::CriticalSuccess => "Critical Success",
            DegreeOfSuccess::Success => "Success",
            DegreeOfSuccess::Failure => "Failure",
            DegreeOfSuccess::CriticalFailure => "Critical Failure",
        }
    }
}

impl fmt::Display for DegreeOfSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of a single saving throw.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaveRoll {
    /// The face shown by the d20.
    pub natural: u32,
    /// Natural roll plus the actor's save bonus.
    pub total: i32,
    /// The difficulty class rolled against.
    pub dc: i32,
    pub degree: DegreeOfSuccess,
}

/// Saving-throw capability consumed by the activation flow.
///
/// Implementations may roll real dice or bridge to an external save
/// subsystem; only the latter can fail (on an out-of-range raw degree).
pub trait SaveRoller {
    fn roll_save(&mut self, bonus: i32, dc: i32) -> Result<SaveRoll, DiceError>;
}

/// Rolls a real d20 with the supplied RNG.
pub struct D20Roller<R: Rng> {
    rng: R,
}

impl<R: Rng> D20Roller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SaveRoller for D20Roller<R> {
    fn roll_save(&mut self, bonus: i32, dc: i32) -> Result<SaveRoll, DiceError> {
        let natural = self.rng.gen_range(1..=20u32);
        let total = natural as i32 + bonus;
        Ok(SaveRoll {
            natural,
            total,
            dc,
            degree: DegreeOfSuccess::from_check(total, natural, dc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_degree_bands() {
        let dc = 25;
        assert_eq!(
            DegreeOfSuccess::from_check(35, 15, dc),
            DegreeOfSuccess::CriticalSuccess
        );
        assert_eq!(
            DegreeOfSuccess::from_check(25, 15, dc),
            DegreeOfSuccess::Success
        );
        assert_eq!(
            DegreeOfSuccess::from_check(24, 15, dc),
            DegreeOfSuccess::Failure
        );
        assert_eq!(
            DegreeOfSuccess::from_check(15, 15, dc),
            DegreeOfSuccess::CriticalFailure
        );
    }

    #[test]
    fn test_natural_twenty_improves() {
        // 20 + 4 = 24 would be a plain failure against DC 25
        assert_eq!(
            DegreeOfSuccess::from_check(24, 20, 25),
            DegreeOfSuccess::Success
        );
    }

    #[test]
    fn test_natural_one_worsens() {
        // 1 + 24 = 25 would be a plain success against DC 25
        assert_eq!(
            DegreeOfSuccess::from_check(25, 1, 25),
            DegreeOfSuccess::Failure
        );
    }

    #[test]
    fn test_from_external() {
        assert_eq!(
            DegreeOfSuccess::from_external(3).unwrap(),
            DegreeOfSuccess::CriticalSuccess
        );
        assert_eq!(
            DegreeOfSuccess::from_external(0).unwrap(),
            DegreeOfSuccess::CriticalFailure
        );
        assert!(matches!(
            DegreeOfSuccess::from_external(-1),
            Err(DiceError::UnexpectedSaveResult(-1))
        ));
        assert!(matches!(
            DegreeOfSuccess::from_external(4),
            Err(DiceError::UnexpectedSaveResult(4))
        ));
    }

    #[test]
    fn test_step_adjustments_saturate() {
        assert_eq!(
            DegreeOfSuccess::CriticalSuccess.improved(),
            DegreeOfSuccess::CriticalSuccess
        );
        assert_eq!(
            DegreeOfSuccess::CriticalFailure.worsened(),
            DegreeOfSuccess::CriticalFailure
        );
    }

    #[test]
    fn test_roller_range() {
        let mut roller = D20Roller::new(StdRng::seed_from_u64(7));
        for _ in 0..100 {
            let roll = roller.roll_save(12, 25).unwrap();
            assert!(roll.natural >= 1 && roll.natural <= 20);
            assert_eq!(roll.total, roll.natural as i32 + 12);
            assert_eq!(
                roll.degree,
                DegreeOfSuccess::from_check(roll.total, roll.natural, 25)
            );
        }
    }
}
