//! The rollover: archiving each owner's totals at the end of a calendar month
//! and starting the next month from zero.

mod run;
mod scheduler;

pub use run::{OwnerOutcome, Rollover, RolloverReport, RolloverState};
pub use scheduler::{
    SchedulerConfig, SchedulerHandle, duration_until_next_period, spawn_scheduler,
};
