// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-item outcomes and the ordered batch report.

use crate::error::Error;

/// Final state of one batch item.
///
/// Items move from pending to running to one of these. An item cancelled
/// before it was launched is `Failed` without ever running. Live counts of
/// pending and running items are on
/// [`BatchProgress`](super::executor::BatchProgress).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    Succeeded,
    Failed,
}

/// Why a batch item did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum ItemError<E> {
    /// The operation returned an error.
    #[error("{0}")]
    Failed(E),
    /// The batch deadline expired or the batch was cancelled first.
    #[error("cancelled before completion")]
    Cancelled,
    /// The operation panicked.
    #[error("operation panicked: {0}")]
    Panicked(String),
}

impl<E> ItemError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ItemError::Cancelled)
    }

    /// The operation's own error, if that is why the item failed.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            ItemError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// One unit of work and its outcome.
#[derive(Debug)]
pub struct BatchItem<I, O, E> {
    /// Position in the submitted input sequence.
    pub index: usize,
    pub input: I,
    pub state: ItemState,
    pub result: Result<O, ItemError<E>>,
}

impl<I, O, E> BatchItem<I, O, E> {
    pub(crate) fn new(index: usize, input: I, result: Result<O, ItemError<E>>) -> Self {
        let state = if result.is_ok() {
            ItemState::Succeeded
        } else {
            ItemState::Failed
        };
        Self {
            index,
            input,
            state,
            result,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&O> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ItemError<E>> {
        self.result.as_ref().err()
    }
}

/// Outcome of a batch, ordered by input index.
///
/// `succeeded_count() + failed_count() == len()` always holds.
#[derive(Debug)]
pub struct BatchReport<I, O, E> {
    items: Vec<BatchItem<I, O, E>>,
    succeeded_count: usize,
    failed_count: usize,
}

impl<I, O, E> BatchReport<I, O, E> {
    pub(crate) fn from_items(items: Vec<BatchItem<I, O, E>>) -> Self {
        let succeeded_count = items.iter().filter(|item| item.is_success()).count();
        let failed_count = items.len() - succeeded_count;
        Self {
            items,
            succeeded_count,
            failed_count,
        }
    }

    pub fn empty() -> Self {
        Self::from_items(Vec::new())
    }

    pub fn items(&self) -> &[BatchItem<I, O, E>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<BatchItem<I, O, E>> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded_count
    }

    /// Items that failed for any reason, cancellations included.
    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn cancelled_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.error().is_some_and(ItemError::is_cancelled))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count == 0
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &BatchItem<I, O, E>> {
        self.items.iter().filter(|item| item.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchItem<I, O, E>> {
        self.items.iter().filter(|item| !item.is_success())
    }

    /// Results in input order, dropping the inputs.
    pub fn into_results(self) -> Vec<Result<O, ItemError<E>>> {
        self.items.into_iter().map(|item| item.result).collect()
    }
}

impl<I, O> BatchReport<I, O, Error> {
    /// Results in input order with batch-level failures folded into
    /// [`Error`]: cancellation becomes [`Error::Cancelled`].
    pub fn into_flat_results(self) -> Vec<crate::error::Result<O>> {
        self.items
            .into_iter()
            .map(|item| item.result.map_err(Error::from))
            .collect()
    }
}

impl From<ItemError<Error>> for Error {
    fn from(err: ItemError<Error>) -> Self {
        match err {
            ItemError::Failed(e) => e,
            ItemError::Cancelled => Error::Cancelled,
            ItemError::Panicked(message) => Error::Panicked(message),
        }
    }
}
