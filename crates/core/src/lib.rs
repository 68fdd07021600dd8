// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gr-core: job model, storage tiers and shared primitives for the Grind job runner

pub mod clock;
pub mod id;
pub mod job;
pub mod tier;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use job::{FailureKind, Job, JobId, JobRequest, JobStatus, DEFAULT_MAX_RETRIES};
pub use tier::{StorageTier, TierError, VolumeLayout};
