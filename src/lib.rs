//! Spaced-repetition scheduling core for flashcard review.
//!
//! Pure, single-card FSRS-4.5 computations: given a card's scheduling record
//! and the learner's rating, produce the next record and due date. Storage,
//! card content and transport belong to the caller.

mod error;
mod memory;
mod parameters;
mod retention;
mod scheduler;
mod storage;

pub use error::{Result, SchedulerError};
pub use memory::MemoryState;
pub use parameters::{
    DECAY, DEFAULT_PARAMETERS, FACTOR, PARAMETER_COUNT, Parameters, check_parameters,
};
pub use retention::{
    DEFAULT_DESIRED_RETENTION, MAXIMUM_INTERVAL, forgetting_curve, next_interval,
};
pub use scheduler::{
    CardState, EASY_INTERVAL_DAYS, GRADUATING_INTERVAL_DAYS, IntervalLabel, ItemState,
    LEARNING_STEPS_MINUTES, NextStates, RELEARNING_STEPS_MINUTES, Rating, ReviewOutcome,
    Scheduler, State,
};
pub use storage::StoredCardState;
