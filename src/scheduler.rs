use std::fmt;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, FromRepr};

use snafu::OptionExt;

use crate::error::{InvalidCardStateSnafu, InvalidRatingSnafu, InvalidRetentionSnafu, Result, SchedulerError};
use crate::memory::{
    MemoryState, init_difficulty, init_stability, next_difficulty, next_forget_stability,
    next_recall_stability, next_short_term_stability,
};
use crate::parameters::{D_MAX, D_MIN, DEFAULT_PARAMETERS, PARAMETER_COUNT, Parameters, S_MIN, check_parameters};
use crate::retention::{DEFAULT_DESIRED_RETENTION, forgetting_curve, next_interval, with_fuzz};

pub const LEARNING_STEPS_MINUTES: [i64; 2] = [1, 10];
pub const RELEARNING_STEPS_MINUTES: [i64; 1] = [10];
pub const GRADUATING_INTERVAL_DAYS: u32 = 1;
pub const EASY_INTERVAL_DAYS: u32 = 4;

const SECONDS_PER_DAY: f32 = 86_400.0;

/// Life-cycle phase of a card. Governs which step table and stability
/// formulas apply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, FromRepr, Default,
)]
#[repr(u8)]
pub enum State {
    #[default]
    New = 0,
    Learning = 1,
    Review = 2,
    Relearning = 3,
}

/// The learner's self-reported recall quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, FromRepr)]
#[repr(u8)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl TryFrom<u8> for Rating {
    type Error = SchedulerError;

    fn try_from(value: u8) -> Result<Self> {
        Rating::from_repr(value).context(InvalidRatingSnafu { value })
    }
}

/// The full scheduling record of one flashcard, as stored by the caller and
/// consumed/produced whole by every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub state: State,
    /// Days; 0.0 until the first rating, at least 0.1 afterwards.
    pub stability: f32,
    /// 1.0 to 10.0; 0.0 until the first rating.
    pub difficulty: f32,
    /// Interval chosen at the last transition that landed in review. Sub-day
    /// phases report 0 and carry the real granularity in `due`.
    pub scheduled_days: u32,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    /// Successful reviews along the graduation lineage; not reset on lapse.
    pub reps: u32,
    /// Review-to-relearning transitions.
    pub lapses: u32,
    /// Index into the current phase's step table.
    pub step: usize,
}

impl CardState {
    /// A card that has never been rated, due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: State::New,
            stability: 0.0,
            difficulty: 0.0,
            scheduled_days: 0,
            due: now,
            last_review: None,
            reps: 0,
            lapses: 0,
            step: 0,
        }
    }

    pub fn memory_state(&self) -> Option<MemoryState> {
        (self.state != State::New).then_some(MemoryState {
            stability: self.stability,
            difficulty: self.difficulty,
        })
    }

    /// Rejects records that violate the scheduling invariants, e.g. rows
    /// corrupted in storage. Failing fast here beats clamping, which would
    /// mask persistence bugs.
    pub(crate) fn check(&self) -> Result<()> {
        if self.state == State::New {
            if self.last_review.is_some() {
                return InvalidCardStateSnafu {
                    reason: "new card has a last_review timestamp",
                }
                .fail();
            }
            return Ok(());
        }
        if self.last_review.is_none() {
            return InvalidCardStateSnafu {
                reason: format!("{:?} card has no last_review timestamp", self.state),
            }
            .fail();
        }
        if !self.stability.is_finite() || self.stability < S_MIN {
            return InvalidCardStateSnafu {
                reason: format!("stability {} is outside [{S_MIN}, inf)", self.stability),
            }
            .fail();
        }
        if !self.difficulty.is_finite() || !(D_MIN..=D_MAX).contains(&self.difficulty) {
            return InvalidCardStateSnafu {
                reason: format!("difficulty {} is outside [{D_MIN}, {D_MAX}]", self.difficulty),
            }
            .fail();
        }
        Ok(())
    }
}

/// What one review did to a card: the replacement record plus the recall
/// probability the card had at the moment it was rated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub card: CardState,
    pub retrievability: f32,
}

/// Delay shown to the learner on a rating button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IntervalLabel {
    Minutes(u32),
    Days(u32),
    Months(f32),
    Years(f32),
}

impl IntervalLabel {
    fn from_next_card(card: &CardState, now: DateTime<Utc>) -> Self {
        if card.scheduled_days == 0 {
            let minutes = (card.due - now).num_minutes().max(1);
            return Self::Minutes(minutes as u32);
        }
        let days = card.scheduled_days;
        if days >= 365 {
            Self::Years(round_tenth(days as f32 / 365.0))
        } else if days >= 30 {
            Self::Months(round_tenth(days as f32 / 30.0))
        } else {
            Self::Days(days)
        }
    }
}

fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

impl fmt::Display for IntervalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(m) => write!(f, "{m}m"),
            Self::Days(d) => write!(f, "{d}d"),
            Self::Months(mo) => write!(f, "{mo:.1}mo"),
            Self::Years(y) => write!(f, "{y:.1}y"),
        }
    }
}

/// The would-be outcome of one rating, as computed by [`Scheduler::preview`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemState {
    pub card: CardState,
    pub label: IntervalLabel,
}

/// Preview of all four rating buttons for one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStates {
    pub again: ItemState,
    pub hard: ItemState,
    pub good: ItemState,
    pub easy: ItemState,
    /// Recall probability at preview time, shared by all four branches.
    pub retrievability: f32,
}

impl NextStates {
    pub fn get(&self, rating: Rating) -> &ItemState {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }
}

/// The scheduler itself: a weight table plus a target retention. Cheap to
/// clone, safe to share across threads, owns no mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    parameters: [f32; PARAMETER_COUNT],
    desired_retention: f32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            parameters: DEFAULT_PARAMETERS,
            desired_retention: DEFAULT_DESIRED_RETENTION,
        }
    }
}

impl Scheduler {
    /// Builds a scheduler from a (possibly personalized) weight table.
    pub fn new(parameters: &Parameters) -> Result<Self> {
        Ok(Self {
            parameters: check_parameters(parameters)?,
            desired_retention: DEFAULT_DESIRED_RETENTION,
        })
    }

    pub fn with_desired_retention(mut self, desired_retention: f32) -> Result<Self> {
        if !desired_retention.is_finite()
            || !(0.0..=1.0).contains(&desired_retention)
            || desired_retention == 0.0
        {
            return InvalidRetentionSnafu {
                value: desired_retention,
            }
            .fail();
        }
        self.desired_retention = desired_retention;
        Ok(self)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Recall probability of the card at `now`; 0.0 for a card that was never
    /// reviewed or has no memory formed yet.
    pub fn current_retrievability(&self, card: &CardState, now: DateTime<Utc>) -> f32 {
        if card.stability <= 0.0 {
            return 0.0;
        }
        forgetting_curve(elapsed_days(card, now), card.stability)
    }

    /// Applies one rating to a card and returns the replacement record along
    /// with the retrievability it had when rated.
    ///
    /// `fuzz` randomizes day-granularity review intervals by a few percent so
    /// cards do not cluster; pass `None` for fully deterministic output.
    pub fn next_state(
        &self,
        card: &CardState,
        rating: Rating,
        now: DateTime<Utc>,
        fuzz: Option<&mut dyn RngCore>,
    ) -> Result<ReviewOutcome> {
        card.check()?;
        let retrievability = self.current_retrievability(card, now);

        let mut next = card.clone();
        next.last_review = Some(now);
        next.scheduled_days = 0;

        match card.state {
            State::New => self.rate_new(&mut next, rating, now),
            State::Learning => self.rate_learning(card, &mut next, rating, now),
            State::Review => self.rate_review(card, &mut next, rating, retrievability, now, fuzz),
            State::Relearning => self.rate_relearning(card, &mut next, rating, now),
        }

        Ok(ReviewOutcome {
            card: next,
            retrievability,
        })
    }

    /// Computes, without mutating anything, the record each of the four
    /// ratings would produce right now. Runs the same transition as
    /// [`Self::next_state`] with fuzz off, so the two can never disagree.
    pub fn preview(&self, card: &CardState, now: DateTime<Utc>) -> Result<NextStates> {
        let rate = |rating| -> Result<ItemState> {
            let outcome = self.next_state(card, rating, now, None)?;
            Ok(ItemState {
                label: IntervalLabel::from_next_card(&outcome.card, now),
                card: outcome.card,
            })
        };
        Ok(NextStates {
            again: rate(Rating::Again)?,
            hard: rate(Rating::Hard)?,
            good: rate(Rating::Good)?,
            easy: rate(Rating::Easy)?,
            retrievability: self.current_retrievability(card, now),
        })
    }

    fn rate_new(&self, next: &mut CardState, rating: Rating, now: DateTime<Utc>) {
        let w = &self.parameters;
        next.difficulty = init_difficulty(w, rating);
        next.stability = init_stability(w, rating);
        next.step = 0;
        match rating {
            Rating::Again | Rating::Hard => {
                next.state = State::Learning;
                next.due = now + Duration::minutes(LEARNING_STEPS_MINUTES[0]);
            }
            Rating::Good => {
                next.state = State::Review;
                next.reps = 1;
                next.scheduled_days = GRADUATING_INTERVAL_DAYS;
                next.due = now + Duration::days(GRADUATING_INTERVAL_DAYS as i64);
            }
            Rating::Easy => {
                next.state = State::Review;
                next.reps = 1;
                next.scheduled_days = EASY_INTERVAL_DAYS;
                next.due = now + Duration::days(EASY_INTERVAL_DAYS as i64);
            }
        }
    }

    fn rate_learning(
        &self,
        card: &CardState,
        next: &mut CardState,
        rating: Rating,
        now: DateTime<Utc>,
    ) {
        let w = &self.parameters;
        match rating {
            Rating::Again => {
                next.step = 0;
                next.stability = init_stability(w, Rating::Again);
                next.due = now + Duration::minutes(LEARNING_STEPS_MINUTES[0]);
            }
            Rating::Hard => {
                let index = card.step.min(LEARNING_STEPS_MINUTES.len() - 1);
                next.stability = next_short_term_stability(w, card.stability, rating);
                next.due = now + Duration::minutes(LEARNING_STEPS_MINUTES[index]);
            }
            Rating::Good => {
                next.step = card.step + 1;
                next.stability = next_short_term_stability(w, card.stability, rating);
                if next.step >= LEARNING_STEPS_MINUTES.len() {
                    self.graduate(next, GRADUATING_INTERVAL_DAYS, now);
                } else {
                    next.due = now + Duration::minutes(LEARNING_STEPS_MINUTES[next.step]);
                }
            }
            Rating::Easy => {
                next.stability = next_short_term_stability(w, card.stability, rating);
                self.graduate(next, EASY_INTERVAL_DAYS, now);
            }
        }
    }

    /// Moves a learning card into review with at least `floor_days` of delay.
    fn graduate(&self, next: &mut CardState, floor_days: u32, now: DateTime<Utc>) {
        next.state = State::Review;
        next.step = 0;
        next.reps = 1;
        next.scheduled_days = floor_days.max(next_interval(next.stability, self.desired_retention));
        next.due = now + Duration::days(next.scheduled_days as i64);
        debug!(
            "card graduated to review: interval {} days, stability {:.2}",
            next.scheduled_days, next.stability
        );
    }

    fn rate_review(
        &self,
        card: &CardState,
        next: &mut CardState,
        rating: Rating,
        retrievability: f32,
        now: DateTime<Utc>,
        fuzz: Option<&mut dyn RngCore>,
    ) {
        let w = &self.parameters;
        next.difficulty = next_difficulty(w, card.difficulty, rating);

        if rating == Rating::Again {
            next.state = State::Relearning;
            next.step = 0;
            next.lapses = card.lapses + 1;
            next.stability = next_forget_stability(w, card.difficulty, card.stability, retrievability);
            next.due = now + Duration::minutes(RELEARNING_STEPS_MINUTES[0]);
            debug!(
                "card lapsed (lapse #{}): stability {:.2} -> {:.2}",
                next.lapses, card.stability, next.stability
            );
            return;
        }

        next.reps = card.reps + 1;
        next.stability =
            next_recall_stability(w, card.difficulty, card.stability, retrievability, rating);
        let mut interval = next_interval(next.stability, self.desired_retention);
        if let Some(rng) = fuzz {
            interval = with_fuzz(interval, rng);
        }
        interval = match rating {
            // A Hard answer never pushes the card much further out than the
            // interval it just failed to comfortably clear.
            Rating::Hard => interval.min(card.scheduled_days + 1).max(1),
            // Easy must land strictly beyond what Good would have given on
            // the same inputs.
            Rating::Easy => {
                let good_stability = next_recall_stability(
                    w,
                    card.difficulty,
                    card.stability,
                    retrievability,
                    Rating::Good,
                );
                let good_interval = next_interval(good_stability, self.desired_retention);
                interval.max(good_interval + 1)
            }
            _ => interval,
        };
        next.scheduled_days = interval;
        next.due = now + Duration::days(interval as i64);
    }

    fn rate_relearning(
        &self,
        card: &CardState,
        next: &mut CardState,
        rating: Rating,
        now: DateTime<Utc>,
    ) {
        let w = &self.parameters;
        match rating {
            Rating::Again => {
                // Stability deliberately carries over unchanged here; only
                // the step index resets.
                next.step = 0;
                next.due = now + Duration::minutes(RELEARNING_STEPS_MINUTES[0]);
            }
            Rating::Hard => {
                let index = card.step.min(RELEARNING_STEPS_MINUTES.len() - 1);
                next.due = now + Duration::minutes(RELEARNING_STEPS_MINUTES[index]);
            }
            Rating::Good => {
                next.step = card.step + 1;
                if next.step >= RELEARNING_STEPS_MINUTES.len() {
                    next.state = State::Review;
                    next.step = 0;
                    next.scheduled_days =
                        next_interval(next.stability, self.desired_retention).max(1);
                    next.due = now + Duration::days(next.scheduled_days as i64);
                } else {
                    next.due = now + Duration::minutes(RELEARNING_STEPS_MINUTES[next.step]);
                }
            }
            Rating::Easy => {
                next.state = State::Review;
                next.step = 0;
                next.stability =
                    next_recall_stability(w, card.difficulty, card.stability, 0.0, rating);
                next.scheduled_days = next_interval(next.stability, self.desired_retention).max(1);
                next.due = now + Duration::days(next.scheduled_days as i64);
            }
        }
    }
}

fn elapsed_days(card: &CardState, now: DateTime<Utc>) -> f32 {
    card.last_review
        .map(|last| (now - last).num_seconds() as f32 / SECONDS_PER_DAY)
        .unwrap_or(0.0)
}
