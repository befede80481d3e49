// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! Clock/budget accounting, the exponential moving average primitive, and the
//! wire-level data model shared by every other TickRPC crate.

mod budget;
mod clock;
pub mod context;
mod ema;
mod error;
mod model;

pub use budget::{Budget, BudgetTimer};
pub use clock::{Clock, Instant, SystemClock};
pub use context::{Activation, Context, ContextGuard, Scene};
pub use ema::Ema;
pub use error::{Error, Result};
pub use model::{ClientId, EncodedValue, Request, Response, StreamId, StreamMessage};
