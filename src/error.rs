use snafu::Snafu;

#[derive(Snafu, Debug, Clone, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum SchedulerError {
    #[snafu(display("rating {value} is outside 1..=4"))]
    InvalidRating { value: u8 },
    #[snafu(display("invalid parameter table: {reason}"))]
    InvalidParameters { reason: String },
    #[snafu(display("corrupt scheduling record: {reason}"))]
    InvalidCardState { reason: String },
    #[snafu(display("desired retention {value} is outside (0, 1]"))]
    InvalidRetention { value: f32 },
}

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;
