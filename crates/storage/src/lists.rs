// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory named FIFO lists and the operations that mutate them.
//!
//! Every mutation is expressed as a [`ListOp`] so the same value can be
//! applied live, written to the journal, and replayed on open.

use crate::list_store::ListStoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListOp {
    /// Append to the tail.
    Push { list: String, value: String },
    /// Pop the head of `from` and append it to `to`.
    MoveFirst { from: String, to: String },
    /// Remove up to `count` occurrences from the head; 0 removes all.
    Remove {
        list: String,
        value: String,
        count: usize,
    },
    /// Move every entry of `from`, in order, to the tail of `to`.
    MoveAll { from: String, to: String },
}

impl ListOp {
    pub fn push(list: &str, value: &str) -> Self {
        ListOp::Push {
            list: list.to_string(),
            value: value.to_string(),
        }
    }

    pub fn move_first(from: &str, to: &str) -> Self {
        ListOp::MoveFirst {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn remove(list: &str, value: &str, count: usize) -> Self {
        ListOp::Remove {
            list: list.to_string(),
            value: value.to_string(),
            count,
        }
    }

    pub fn move_all(from: &str, to: &str) -> Self {
        ListOp::MoveAll {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// What applying an op did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Applied {
    pub moved: Option<String>,
    pub affected: usize,
}

#[derive(Debug, Default, Clone)]
pub struct Lists {
    lists: BTreeMap<String, VecDeque<String>>,
}

impl Lists {
    pub fn len(&self, list: &str) -> usize {
        self.lists.get(list).map_or(0, VecDeque::len)
    }

    /// Entries of `list`, head first.
    pub fn range(&self, list: &str) -> Vec<String> {
        self.lists
            .get(list)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether applying `op` would change anything. No-ops are not journaled.
    pub fn would_change(&self, op: &ListOp) -> bool {
        match op {
            ListOp::Push { .. } => true,
            ListOp::MoveFirst { from, .. } | ListOp::MoveAll { from, .. } => self.len(from) > 0,
            ListOp::Remove { list, value, .. } => {
                self.lists
                    .get(list)
                    .is_some_and(|l| l.iter().any(|v| v == value))
            }
        }
    }

    pub fn apply(&mut self, op: &ListOp) -> Applied {
        let applied = match op {
            ListOp::Push { list, value } => {
                self.lists
                    .entry(list.clone())
                    .or_default()
                    .push_back(value.clone());
                Applied {
                    moved: None,
                    affected: 1,
                }
            }
            ListOp::MoveFirst { from, to } => {
                let Some(value) = self.lists.get_mut(from).and_then(VecDeque::pop_front) else {
                    return Applied::default();
                };
                self.lists
                    .entry(to.clone())
                    .or_default()
                    .push_back(value.clone());
                Applied {
                    moved: Some(value),
                    affected: 1,
                }
            }
            ListOp::Remove { list, value, count } => {
                let Some(entries) = self.lists.get_mut(list) else {
                    return Applied::default();
                };
                let limit = if *count == 0 { usize::MAX } else { *count };
                let mut removed = 0;
                entries.retain(|v| {
                    if removed < limit && v == value {
                        removed += 1;
                        false
                    } else {
                        true
                    }
                });
                Applied {
                    moved: None,
                    affected: removed,
                }
            }
            ListOp::MoveAll { from, to } => {
                let drained: Vec<String> = self
                    .lists
                    .get_mut(from)
                    .map(|l| l.drain(..).collect())
                    .unwrap_or_default();
                let affected = drained.len();
                self.lists.entry(to.clone()).or_default().extend(drained);
                Applied {
                    moved: None,
                    affected,
                }
            }
        };
        self.lists.retain(|_, entries| !entries.is_empty());
        applied
    }

    /// Ops that rebuild the current contents from empty.
    pub fn rebuild_ops(&self) -> Vec<ListOp> {
        self.lists
            .iter()
            .flat_map(|(list, entries)| {
                entries.iter().map(move |value| ListOp::Push {
                    list: list.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }
}

/// Retry `attempt` whenever `notify` fires, until it yields a value or
/// `timeout` elapses.
pub(crate) async fn wait_for_entry<F>(
    notify: &Notify,
    timeout: Duration,
    mut attempt: F,
) -> Result<Option<String>, ListStoreError>
where
    F: FnMut() -> Result<Option<String>, ListStoreError>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(value) = attempt()? {
            return Ok(Some(value));
        }
        if tokio::time::timeout_at(deadline, notified).await.is_err() {
            return Ok(None);
        }
    }
}

#[cfg(test)]
#[path = "lists_tests.rs"]
mod tests;
