/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::local_storage::{LocalStorage, SEARCH_HISTORY_KEY};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

pub const MAX_HISTORY_ITEMS: usize = 1000;

/// Moves `query` (trimmed) to the front of `history`, capping the list at `cap`.
/// Returns false when the query is blank and nothing changed.
pub(crate) fn push_recent(history: &mut Vec<String>, query: &str, cap: usize) -> bool {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return false;
    }
    if let Some(idx) = history.iter().position(|q| q == trimmed) {
        history.remove(idx);
    }
    history.insert(0, trimmed.to_string());
    history.truncate(cap);
    true
}

/// Search history shared by every profile, kept in its own storage slot.
pub struct SearchHistoryStore {
    storage: Arc<dyn LocalStorage>,
    history: Vec<String>,
}

impl SearchHistoryStore {
    pub fn load(storage: Arc<dyn LocalStorage>) -> Result<Self> {
        let saved = storage
            .get_item(SEARCH_HISTORY_KEY)
            .context("read search history")?;
        let history = match saved {
            Some(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(v) => v,
                Err(e) => {
                    warn!("failed to load search history: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(Self { storage, history })
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn add_to_history(&mut self, query: &str) -> Result<()> {
        if !push_recent(&mut self.history, query, MAX_HISTORY_ITEMS) {
            return Ok(());
        }
        self.save()
    }

    pub fn delete_history_item(&mut self, index: usize) -> Result<()> {
        if index >= self.history.len() {
            return Ok(());
        }
        self.history.remove(index);
        self.save()
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        let text = serde_json::to_string(&self.history).context("serialize search history")?;
        self.storage.set_item(SEARCH_HISTORY_KEY, &text)
    }
}
