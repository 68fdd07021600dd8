// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Grind job dispatch and execution engine

mod config;
mod dispatch;
mod engine;
mod error;
mod executor;
mod job_logger;
mod queue;
mod retry;
mod worker;

pub use config::EngineConfig;
pub use dispatch::{Dispatch, DispatchBridge};
pub use engine::{Engine, EngineDeps, EngineHandle};
pub use error::EngineError;
pub use executor::{CancelError, ExecError, Executor, Registration};
pub use job_logger::{JobLogger, LogEntry, LogLevel};
pub use queue::{Delivery, DurableQueue, QueueError, Receipt, PENDING_LIST, PROCESSING_LIST};
pub use retry::{Decision, RetryCoordinator};
pub use worker::{Outcome, WorkerPool};
