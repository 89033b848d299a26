/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::post_source::{PostQuery, PostSource, MIN_POST_TAGS};
use anyhow::Result;
use r34feed_protocol::Post;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub const LIMIT: u32 = 100;

/// Pages through the post listing one post at a time, skipping posts already
/// handed out in this session or reported seen by the caller.
pub struct PostFeed<S> {
    source: S,
    posts: Vec<Post>,
    viewed: HashSet<String>,
    ban_list: Vec<String>,
    search_tags: Vec<String>,
    current_page: u32,
    current_index: usize,
    limit: u32,
    loading: Arc<AtomicBool>,
}

impl<S: PostSource> PostFeed<S> {
    pub fn new(source: S) -> Self {
        Self::with_limit(source, LIMIT)
    }

    pub fn with_limit(source: S, limit: u32) -> Self {
        Self {
            source,
            posts: Vec::new(),
            viewed: HashSet::new(),
            ban_list: Vec::new(),
            search_tags: Vec::new(),
            current_page: 0,
            current_index: 0,
            limit: limit.max(1),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Shared view of [`Self::loading`], readable while a fetch holds the feed.
    pub fn loading_flag(&self) -> Arc<AtomicBool> {
        self.loading.clone()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn add_to_ban_list(&mut self, tag: &str) {
        if !self.ban_list.iter().any(|t| t == tag) {
            self.ban_list.push(tag.to_string());
        }
    }

    pub fn remove_from_ban_list(&mut self, tag: &str) {
        if let Some(idx) = self.ban_list.iter().position(|t| t == tag) {
            self.ban_list.remove(idx);
        }
    }

    pub fn set_ban_list(&mut self, tags: &[String]) {
        self.ban_list.clear();
        for t in tags {
            self.add_to_ban_list(t);
        }
    }

    /// Restricts the feed to posts matching `tags` and restarts from the first page.
    pub fn set_search_tags(&mut self, tags: Vec<String>) {
        self.search_tags = tags;
        self.posts.clear();
        self.current_page = 0;
        self.current_index = 0;
    }

    pub fn is_session_viewed(&self, post_id: &str) -> bool {
        self.viewed.contains(post_id)
    }

    fn query(&self) -> PostQuery {
        PostQuery {
            page: self.current_page,
            limit: self.limit,
            tags: self.search_tags.clone(),
            exclude: self.ban_list.clone(),
        }
    }

    /// Returns `None` once the listing runs out of pages.
    pub async fn next_post<F>(&mut self, is_seen: F) -> Result<Option<Post>>
    where
        F: Fn(&Post) -> bool,
    {
        self.loading.store(true, Ordering::Release);
        let res = self.advance(is_seen).await;
        self.loading.store(false, Ordering::Release);
        res
    }

    async fn advance<F>(&mut self, is_seen: F) -> Result<Option<Post>>
    where
        F: Fn(&Post) -> bool,
    {
        loop {
            if self.current_index >= self.posts.len() {
                self.current_index = 0;
                let fetched = self.source.fetch_posts(&self.query()).await?;
                if fetched.is_empty() {
                    info!("post listing exhausted at page {}", self.current_page);
                    self.posts.clear();
                    return Ok(None);
                }
                debug!("page {} returned {} posts", self.current_page, fetched.len());
                self.posts = fetched;
                self.current_page += 1;
            }

            let post = &self.posts[self.current_index];
            self.current_index += 1;

            if self.viewed.contains(&post.id) || post.tags.len() < MIN_POST_TAGS || is_seen(post) {
                continue;
            }
            let post = post.clone();
            self.viewed.insert(post.id.clone());
            return Ok(Some(post));
        }
    }
}
