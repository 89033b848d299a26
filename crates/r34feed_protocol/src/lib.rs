/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub tags: Vec<String>,
    pub file_url: String,
}

/// Persisted preference state of one named profile.
///
/// List fields default to empty so snapshots written before favorites,
/// likes, viewed history and search history existed still load.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ban_list: Vec<String>,
    #[serde(default)]
    pub tags_rate: BTreeMap<String, i32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub liked: Vec<String>,
    #[serde(default)]
    pub viewed: Vec<String>,
    #[serde(default)]
    pub search_history: Vec<String>,
}

impl ProfileSnapshot {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            ban_list: Vec::new(),
            tags_rate: BTreeMap::new(),
            is_active: false,
            is_locked: false,
            favorites: Vec::new(),
            liked: Vec::new(),
            viewed: Vec::new(),
            search_history: Vec::new(),
        }
    }
}
