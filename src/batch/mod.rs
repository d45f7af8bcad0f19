// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Batch Execution
//!
//! Fans a sequence of independent operations out over tokio tasks with a
//! bounded number in flight and collects every outcome into an ordered
//! [`BatchReport`].
//!
//! ## Contract
//!
//! - At most `concurrency_limit` operations run at once.
//! - The report has one item per input, in input order.
//! - A failing, panicking or cancelled item never affects the others, and
//!   the batch call itself never fails because of them. Callers check
//!   [`BatchReport::failed_count`] to detect partial failure.
//! - A zero concurrency limit is rejected before anything runs.
//! - On deadline expiry or cancellation, unfinished items are reported as
//!   [`ItemError::Cancelled`] rather than omitted.
//!
//! No retries happen here; retry policy belongs to the transport.

pub mod executor;
pub mod report;

pub use executor::{run_batch, BatchExecutor, BatchProgress, CancelPolicy};
pub use report::{BatchItem, BatchReport, ItemError, ItemState};
