/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::local_storage::{LocalStorage, PROFILES_KEY};
use crate::search_history::push_recent;
use anyhow::{Context, Result};
use r34feed_protocol::ProfileSnapshot;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_PROFILE_NAME: &str = "Default";
pub const MAX_VIEWED_POSTS: usize = 10_000;
pub const MAX_SEARCH_HISTORY: usize = 1000;
pub const RATING_MIN: i32 = -100;
pub const RATING_MAX: i32 = 100;

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn load_profiles(storage: &dyn LocalStorage) -> Result<Vec<ProfileSnapshot>> {
    let stored = storage.get_item(PROFILES_KEY).context("read profiles")?;
    let Some(text) = stored else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<ProfileSnapshot>>(&text) {
        Ok(mut v) => {
            for rate in v.iter_mut().flat_map(|p| p.tags_rate.values_mut()) {
                *rate = (*rate).clamp(RATING_MIN, RATING_MAX);
            }
            Ok(v)
        }
        Err(e) => {
            warn!("failed to load profiles, starting empty: {e}");
            Ok(Vec::new())
        }
    }
}

/// Registry of named preference profiles with exactly one active profile.
///
/// Every mutation writes the whole registry back to the `r34-profiles` slot.
/// Operations on "the active profile" are no-ops when none is active.
pub struct ProfilesStore {
    storage: Arc<dyn LocalStorage>,
    profiles: Vec<ProfileSnapshot>,
    active_profile_id: String,
}

impl ProfilesStore {
    pub fn load(storage: Arc<dyn LocalStorage>) -> Result<Self> {
        let profiles = load_profiles(storage.as_ref())?;
        let mut store = Self {
            storage,
            profiles,
            active_profile_id: String::new(),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&mut self) -> Result<()> {
        if self.profiles.is_empty() {
            info!("no profiles stored, creating {DEFAULT_PROFILE_NAME}");
            self.create_new_profile(DEFAULT_PROFILE_NAME)?;
            return Ok(());
        }
        let target = self
            .profiles
            .iter()
            .find(|p| p.is_active)
            .or_else(|| self.profiles.first())
            .map(|p| p.id.clone());
        if let Some(id) = target {
            self.load_profile(&id)?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let text = serde_json::to_string(&self.profiles).context("serialize profiles")?;
        self.storage.set_item(PROFILES_KEY, &text)
    }

    pub fn profiles(&self) -> &[ProfileSnapshot] {
        &self.profiles
    }

    pub fn active_profile_id(&self) -> &str {
        &self.active_profile_id
    }

    pub fn active_profile(&self) -> Option<&ProfileSnapshot> {
        self.profiles
            .iter()
            .find(|p| p.id == self.active_profile_id)
    }

    pub fn find(&self, id: &str) -> Option<&ProfileSnapshot> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Resolves a profile by exact id, then by exact name.
    pub fn find_by_id_or_name(&self, key: &str) -> Option<&ProfileSnapshot> {
        self.find(key)
            .or_else(|| self.profiles.iter().find(|p| p.name == key))
    }

    /// Applies `f` to the active profile and persists when it reports a change.
    fn update_active<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ProfileSnapshot) -> bool,
    {
        let active_id = self.active_profile_id.clone();
        let Some(profile) = self.profiles.iter_mut().find(|p| p.id == active_id) else {
            debug!("no active profile");
            return Ok(());
        };
        if f(profile) {
            self.save()?;
        }
        Ok(())
    }

    fn update_by_id<F>(&mut self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ProfileSnapshot),
    {
        let Some(profile) = self.profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(());
        };
        f(profile);
        self.save()
    }

    pub fn load_profile(&mut self, target_id: &str) -> Result<()> {
        for p in self.profiles.iter_mut() {
            p.is_active = p.id == target_id;
        }
        self.active_profile_id = target_id.to_string();
        self.save()
    }

    pub fn create_new_profile(&mut self, name: &str) -> Result<String> {
        let profile = ProfileSnapshot::new(generate_id(), name.to_string());
        let id = profile.id.clone();
        self.profiles.push(profile);
        self.load_profile(&id)?;
        info!("created profile {name} ({id})");
        Ok(id)
    }

    pub fn delete_profile(&mut self, target_id: &str) -> Result<()> {
        let Some(idx) = self.profiles.iter().position(|p| p.id == target_id) else {
            return Ok(());
        };
        self.profiles.remove(idx);

        if target_id == self.active_profile_id {
            match self.profiles.first().map(|p| p.id.clone()) {
                Some(first) => self.load_profile(&first)?,
                None => {
                    self.create_new_profile(DEFAULT_PROFILE_NAME)?;
                }
            }
        } else {
            self.save()?;
        }
        Ok(())
    }

    pub fn rename_profile(&mut self, target_id: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.to_string();
        self.update_by_id(target_id, move |p| p.name = new_name)
    }

    pub fn toggle_lock(&mut self, target_id: &str) -> Result<()> {
        self.update_by_id(target_id, |p| p.is_locked = !p.is_locked)
    }

    pub fn add_to_ban_list(&mut self, tag: &str) -> Result<()> {
        self.update_active(|p| ban(p, tag))
    }

    pub fn remove_from_ban_list(&mut self, tag: &str) -> Result<()> {
        self.update_active(|p| remove_first(&mut p.ban_list, tag))
    }

    /// Sets a rating back to zero; tags that were never rated stay unrated.
    pub fn reset_tag_rating(&mut self, tag: &str) -> Result<()> {
        self.update_active(|p| match p.tags_rate.get_mut(tag) {
            Some(r) => {
                *r = 0;
                true
            }
            None => false,
        })
    }

    pub fn set_tag_rating(&mut self, tag: &str, rating: i32) -> Result<()> {
        self.update_active(|p| {
            p.tags_rate
                .insert(tag.to_string(), rating.clamp(RATING_MIN, RATING_MAX));
            true
        })
    }

    pub fn like(&mut self, tags: &[String], file_url: Option<&str>) -> Result<()> {
        self.update_active(|p| {
            if p.is_locked {
                return false;
            }
            for tag in tags {
                let r = p.tags_rate.entry(tag.clone()).or_insert(0);
                *r = r.saturating_add(1).min(RATING_MAX);
            }
            if let Some(url) = file_url.filter(|u| !u.is_empty()) {
                if !p.liked.iter().any(|l| l == url) {
                    p.liked.insert(0, url.to_string());
                }
            }
            true
        })
    }

    /// Lowers each tag by one. A tag pushed down to the floor is banned.
    pub fn dislike(&mut self, tags: &[String]) -> Result<()> {
        self.update_active(|p| {
            if p.is_locked {
                return false;
            }
            for tag in tags {
                let r = p.tags_rate.entry(tag.clone()).or_insert(0);
                *r = r.saturating_sub(1).max(RATING_MIN);
                if *r <= RATING_MIN {
                    ban(p, tag);
                }
            }
            true
        })
    }

    pub fn toggle_favorite(&mut self, file_url: &str) -> Result<()> {
        self.update_active(|p| {
            if !remove_first(&mut p.favorites, file_url) {
                p.favorites.insert(0, file_url.to_string());
            }
            true
        })
    }

    pub fn remove_from_favorites(&mut self, file_url: &str) -> Result<()> {
        self.update_active(|p| remove_first(&mut p.favorites, file_url))
    }

    pub fn remove_from_liked(&mut self, file_url: &str) -> Result<()> {
        self.update_active(|p| remove_first(&mut p.liked, file_url))
    }

    pub fn add_to_viewed(&mut self, post_id: &str) -> Result<()> {
        self.update_active(|p| {
            p.viewed.push(post_id.to_string());
            if p.viewed.len() > MAX_VIEWED_POSTS {
                let overflow = p.viewed.len() - MAX_VIEWED_POSTS;
                p.viewed.drain(..overflow);
            }
            true
        })
    }

    pub fn is_viewed(&self, post_id: &str) -> bool {
        self.active_profile()
            .map(|p| p.viewed.iter().any(|v| v == post_id))
            .unwrap_or(false)
    }

    pub fn add_to_search_history(&mut self, query: &str) -> Result<()> {
        self.update_active(|p| push_recent(&mut p.search_history, query, MAX_SEARCH_HISTORY))
    }

    pub fn delete_search_history_item(&mut self, index: usize) -> Result<()> {
        self.update_active(|p| {
            if index >= p.search_history.len() {
                return false;
            }
            p.search_history.remove(index);
            true
        })
    }

    pub fn clear_search_history(&mut self) -> Result<()> {
        self.update_active(|p| {
            p.search_history.clear();
            true
        })
    }

    /// Rated tags of the active profile, highest first, ties by name.
    pub fn top_rated_tags(&self, limit: usize) -> Vec<(String, i32)> {
        let Some(p) = self.active_profile() else {
            return Vec::new();
        };
        let mut out = p
            .tags_rate
            .iter()
            .map(|(t, r)| (t.clone(), *r))
            .collect::<Vec<_>>();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out.truncate(limit);
        out
    }
}

fn ban(p: &mut ProfileSnapshot, tag: &str) -> bool {
    if p.ban_list.iter().any(|t| t == tag) {
        return false;
    }
    p.ban_list.push(tag.to_string());
    true
}

fn remove_first(list: &mut Vec<String>, item: &str) -> bool {
    match list.iter().position(|v| v == item) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn fresh() -> (Arc<MemoryStorage>, ProfilesStore) {
        let mem = Arc::new(MemoryStorage::new());
        let store = ProfilesStore::load(mem.clone()).unwrap();
        (mem, store)
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn stored(mem: &MemoryStorage) -> Vec<ProfileSnapshot> {
        let text = mem.get_item(PROFILES_KEY).unwrap().unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn empty_storage_creates_active_default() {
        let (mem, store) = fresh();
        assert_eq!(store.profiles().len(), 1);
        let active = store.active_profile().unwrap();
        assert_eq!(active.name, DEFAULT_PROFILE_NAME);
        assert!(active.is_active);
        assert_eq!(stored(&mem).len(), 1);
    }

    #[test]
    fn init_restores_flagged_profile() {
        let mem = Arc::new(MemoryStorage::new());
        let mut a = ProfileSnapshot::new("a".into(), "A".into());
        let mut b = ProfileSnapshot::new("b".into(), "B".into());
        a.is_active = false;
        b.is_active = true;
        mem.set_item(PROFILES_KEY, &serde_json::to_string(&vec![a, b]).unwrap())
            .unwrap();
        let store = ProfilesStore::load(mem).unwrap();
        assert_eq!(store.active_profile_id(), "b");
    }

    #[test]
    fn init_falls_back_to_first_profile() {
        let mem = Arc::new(MemoryStorage::new());
        let a = ProfileSnapshot::new("a".into(), "A".into());
        let b = ProfileSnapshot::new("b".into(), "B".into());
        mem.set_item(PROFILES_KEY, &serde_json::to_string(&vec![a, b]).unwrap())
            .unwrap();
        let store = ProfilesStore::load(mem.clone()).unwrap();
        assert_eq!(store.active_profile_id(), "a");
        assert!(stored(&mem)[0].is_active);
    }

    #[test]
    fn corrupt_storage_resets_to_default() {
        let mem = Arc::new(MemoryStorage::new());
        mem.set_item(PROFILES_KEY, "[{oops").unwrap();
        let store = ProfilesStore::load(mem).unwrap();
        assert_eq!(store.profiles().len(), 1);
        assert_eq!(store.active_profile().unwrap().name, DEFAULT_PROFILE_NAME);
    }

    #[test]
    fn load_profile_keeps_single_active_flag() {
        let (mem, mut store) = fresh();
        let second = store.create_new_profile("Second").unwrap();
        assert_eq!(store.active_profile_id(), second);
        let first = store.profiles()[0].id.clone();
        store.load_profile(&first).unwrap();
        let flags = stored(&mem)
            .iter()
            .map(|p| p.is_active)
            .collect::<Vec<_>>();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn deleting_active_profile_activates_first() {
        let (_mem, mut store) = fresh();
        let first = store.profiles()[0].id.clone();
        let second = store.create_new_profile("Second").unwrap();
        store.delete_profile(&second).unwrap();
        assert_eq!(store.active_profile_id(), first);
        assert_eq!(store.profiles().len(), 1);
    }

    #[test]
    fn deleting_last_profile_recreates_default() {
        let (_mem, mut store) = fresh();
        let only = store.active_profile_id().to_string();
        store.rename_profile(&only, "Renamed").unwrap();
        store.delete_profile(&only).unwrap();
        assert_eq!(store.profiles().len(), 1);
        let active = store.active_profile().unwrap();
        assert_ne!(active.id, only);
        assert_eq!(active.name, DEFAULT_PROFILE_NAME);
    }

    #[test]
    fn deleting_inactive_or_unknown_profile() {
        let (mem, mut store) = fresh();
        let first = store.profiles()[0].id.clone();
        let second = store.create_new_profile("Second").unwrap();
        store.delete_profile("missing").unwrap();
        assert_eq!(store.profiles().len(), 2);
        store.delete_profile(&first).unwrap();
        assert_eq!(store.active_profile_id(), second);
        assert_eq!(stored(&mem).len(), 1);
    }

    #[test]
    fn rename_and_lock_by_id() {
        let (_mem, mut store) = fresh();
        let id = store.active_profile_id().to_string();
        store.rename_profile(&id, "Main").unwrap();
        store.toggle_lock(&id).unwrap();
        let p = store.find_by_id_or_name("Main").unwrap();
        assert_eq!(p.id, id);
        assert!(p.is_locked);
        store.toggle_lock(&id).unwrap();
        assert!(!store.active_profile().unwrap().is_locked);
    }

    #[test]
    fn ban_list_has_no_duplicates() {
        let (_mem, mut store) = fresh();
        store.add_to_ban_list("gore").unwrap();
        store.add_to_ban_list("gore").unwrap();
        store.add_to_ban_list("feet").unwrap();
        assert_eq!(store.active_profile().unwrap().ban_list, tags(&["gore", "feet"]));
        store.remove_from_ban_list("gore").unwrap();
        store.remove_from_ban_list("absent").unwrap();
        assert_eq!(store.active_profile().unwrap().ban_list, tags(&["feet"]));
    }

    #[test]
    fn set_tag_rating_is_clamped() {
        let (_mem, mut store) = fresh();
        store.set_tag_rating("a", 250).unwrap();
        store.set_tag_rating("b", -250).unwrap();
        store.set_tag_rating("c", 42).unwrap();
        let rate = &store.active_profile().unwrap().tags_rate;
        assert_eq!(rate["a"], 100);
        assert_eq!(rate["b"], -100);
        assert_eq!(rate["c"], 42);
    }

    #[test]
    fn reset_only_touches_rated_tags() {
        let (_mem, mut store) = fresh();
        store.set_tag_rating("a", 10).unwrap();
        store.reset_tag_rating("a").unwrap();
        store.reset_tag_rating("never").unwrap();
        let rate = &store.active_profile().unwrap().tags_rate;
        assert_eq!(rate.get("a"), Some(&0));
        assert_eq!(rate.get("never"), None);
    }

    #[test]
    fn like_increments_caps_and_records_url() {
        let (_mem, mut store) = fresh();
        store.set_tag_rating("top", 100).unwrap();
        store.like(&tags(&["top", "new"]), Some("u1")).unwrap();
        store.like(&tags(&["new"]), Some("u2")).unwrap();
        store.like(&tags(&["new"]), Some("u1")).unwrap();
        let p = store.active_profile().unwrap();
        assert_eq!(p.tags_rate["top"], 100);
        assert_eq!(p.tags_rate["new"], 3);
        assert_eq!(p.liked, tags(&["u2", "u1"]));
    }

    #[test]
    fn dislike_floors_and_bans() {
        let (_mem, mut store) = fresh();
        store.set_tag_rating("bad", -99).unwrap();
        store.dislike(&tags(&["bad", "meh"])).unwrap();
        store.dislike(&tags(&["bad"])).unwrap();
        let p = store.active_profile().unwrap();
        assert_eq!(p.tags_rate["bad"], -100);
        assert_eq!(p.tags_rate["meh"], -1);
        assert_eq!(p.ban_list, tags(&["bad"]));
    }

    #[test]
    fn locked_profile_ignores_votes() {
        let (_mem, mut store) = fresh();
        let id = store.active_profile_id().to_string();
        store.toggle_lock(&id).unwrap();
        store.like(&tags(&["a"]), Some("u")).unwrap();
        store.dislike(&tags(&["b"])).unwrap();
        let p = store.active_profile().unwrap();
        assert!(p.tags_rate.is_empty());
        assert!(p.liked.is_empty());
    }

    #[test]
    fn favorites_toggle_and_remove() {
        let (_mem, mut store) = fresh();
        store.toggle_favorite("a").unwrap();
        store.toggle_favorite("b").unwrap();
        assert_eq!(store.active_profile().unwrap().favorites, tags(&["b", "a"]));
        store.toggle_favorite("b").unwrap();
        assert_eq!(store.active_profile().unwrap().favorites, tags(&["a"]));
        store.remove_from_favorites("a").unwrap();
        assert!(store.active_profile().unwrap().favorites.is_empty());
    }

    #[test]
    fn remove_from_liked() {
        let (_mem, mut store) = fresh();
        store.like(&[], Some("x")).unwrap();
        store.like(&[], Some("y")).unwrap();
        store.remove_from_liked("x").unwrap();
        assert_eq!(store.active_profile().unwrap().liked, tags(&["y"]));
    }

    #[test]
    fn viewed_is_capped_dropping_oldest() {
        let (_mem, mut store) = fresh();
        for i in 0..(MAX_VIEWED_POSTS + 3) {
            store.add_to_viewed(&i.to_string()).unwrap();
        }
        let p = store.active_profile().unwrap();
        assert_eq!(p.viewed.len(), MAX_VIEWED_POSTS);
        assert_eq!(p.viewed[0], "3");
        assert!(!store.is_viewed("0"));
        assert!(store.is_viewed(&(MAX_VIEWED_POSTS + 2).to_string()));
    }

    #[test]
    fn profile_search_history() {
        let (_mem, mut store) = fresh();
        store.add_to_search_history(" cat ").unwrap();
        store.add_to_search_history("dog").unwrap();
        store.add_to_search_history("cat").unwrap();
        store.add_to_search_history("").unwrap();
        assert_eq!(
            store.active_profile().unwrap().search_history,
            tags(&["cat", "dog"])
        );
        store.delete_search_history_item(1).unwrap();
        store.delete_search_history_item(5).unwrap();
        assert_eq!(store.active_profile().unwrap().search_history, tags(&["cat"]));
        store.clear_search_history().unwrap();
        assert!(store.active_profile().unwrap().search_history.is_empty());
    }

    #[test]
    fn history_is_per_profile() {
        let (_mem, mut store) = fresh();
        store.add_to_search_history("first").unwrap();
        store.create_new_profile("Other").unwrap();
        assert!(store.active_profile().unwrap().search_history.is_empty());
    }

    #[test]
    fn top_rated_tags_order() {
        let (_mem, mut store) = fresh();
        store.set_tag_rating("b", 5).unwrap();
        store.set_tag_rating("a", 5).unwrap();
        store.set_tag_rating("c", 9).unwrap();
        store.set_tag_rating("d", -3).unwrap();
        assert_eq!(
            store.top_rated_tags(3),
            vec![("c".to_string(), 9), ("a".to_string(), 5), ("b".to_string(), 5)]
        );
    }

    #[test]
    fn state_survives_reload() {
        let (mem, mut store) = fresh();
        store.add_to_ban_list("x").unwrap();
        store.like(&tags(&["y"]), Some("u")).unwrap();
        let id = store.active_profile_id().to_string();
        let reloaded = ProfilesStore::load(mem).unwrap();
        assert_eq!(reloaded.active_profile_id(), id);
        assert_eq!(reloaded.active_profile(), store.active_profile());
    }

    #[test]
    fn out_of_range_stored_ratings_are_clamped() {
        let mem = Arc::new(MemoryStorage::new());
        mem.set_item(
            PROFILES_KEY,
            r#"[{"id":"p1","name":"Main","isActive":true,"tagsRate":{"x":2147483647,"y":-2147483648}}]"#,
        )
        .unwrap();
        let mut store = ProfilesStore::load(mem.clone()).unwrap();
        let p = store.active_profile().unwrap();
        assert_eq!(p.tags_rate["x"], RATING_MAX);
        assert_eq!(p.tags_rate["y"], RATING_MIN);

        store.like(&tags(&["x"]), None).unwrap();
        store.dislike(&tags(&["y"])).unwrap();
        let p = store.active_profile().unwrap();
        assert_eq!(p.tags_rate["x"], RATING_MAX);
        assert_eq!(p.tags_rate["y"], RATING_MIN);
        assert!(p.ban_list.contains(&"y".to_string()));
    }
}
