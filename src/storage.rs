use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;

use crate::error::{InvalidCardStateSnafu, Result};
use crate::scheduler::{CardState, State};

/// How the surrounding persistence layer represents a scheduling record:
/// stability and difficulty are kept as integers scaled by 100 so database
/// rows never accumulate floating-point drift. The scheduler itself only ever
/// sees [`CardState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCardState {
    pub state: u8,
    /// Days times 100, e.g. 250 for 2.5 days.
    pub stability: i64,
    /// Difficulty times 100, e.g. 500 for 5.0.
    pub difficulty: i32,
    pub scheduled_days: u32,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    pub reps: u32,
    pub lapses: u32,
    pub step: u32,
}

impl From<&CardState> for StoredCardState {
    fn from(card: &CardState) -> Self {
        Self {
            state: card.state as u8,
            stability: (card.stability * 100.0).round() as i64,
            difficulty: (card.difficulty * 100.0).round() as i32,
            scheduled_days: card.scheduled_days,
            due: card.due,
            last_review: card.last_review,
            reps: card.reps,
            lapses: card.lapses,
            step: card.step as u32,
        }
    }
}

impl StoredCardState {
    /// Converts back to the scheduler's representation, re-validating the row
    /// so corrupt storage surfaces as an error instead of bad scheduling.
    pub fn into_card_state(self) -> Result<CardState> {
        let state = State::from_repr(self.state).context(InvalidCardStateSnafu {
            reason: format!("unknown state discriminant {}", self.state),
        })?;
        let card = CardState {
            state,
            stability: self.stability as f32 / 100.0,
            difficulty: self.difficulty as f32 / 100.0,
            scheduled_days: self.scheduled_days,
            due: self.due,
            last_review: self.last_review,
            reps: self.reps,
            lapses: self.lapses,
            step: self.step as usize,
        };
        card.check()?;
        Ok(card)
    }
}
