// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use thiserror::Error;

/// Errors raised while configuring the clock/budget primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("max_time_per_update must be greater than zero")]
    ZeroBudget,
    #[error("ema smoothing factor must be within (0.0, 1.0], got {0}")]
    InvalidAlpha(String),
}

pub type Result<T> = std::result::Result<T, Error>;
