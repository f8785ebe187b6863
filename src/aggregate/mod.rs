//! The running aggregate: each owner's spending limit and totals for the
//! current period.

mod aggregate_endpoint;
mod core;
mod limit_endpoint;

pub use aggregate_endpoint::get_aggregate_endpoint;
pub use core::{AggregateSummary, RunningAggregate, create_aggregate_table};
pub use limit_endpoint::{get_limit_endpoint, set_limit_endpoint};

pub(crate) use core::{
    adjust_totals, apply_delta, get_aggregate, list_aggregate_owners, reset_totals, upsert_limit,
};
