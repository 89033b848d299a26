/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::post_source::{PostQuery, PostSource};
use anyhow::Result;
use r34feed_protocol::Post;

/// Browsing state of a tag search ("line" view).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineState {
    pub search_tags: String,
    pub posts: Vec<Post>,
    pub displayed_posts: Vec<Post>,
    pub current_page: u32,
    pub current_index: usize,
    pub saved_scroll_position: u64,
}

impl LineState {
    pub fn new(search_tags: &str) -> Self {
        Self {
            search_tags: search_tags.trim().to_string(),
            ..Self::default()
        }
    }

    /// Clears fetched and displayed posts; the search tags are kept.
    pub fn reset(&mut self) {
        self.posts.clear();
        self.displayed_posts.clear();
        self.current_page = 0;
        self.current_index = 0;
        self.saved_scroll_position = 0;
    }

    pub fn tags(&self) -> Vec<String> {
        self.search_tags
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Moves up to `batch` posts into `displayed_posts`, fetching pages as the
    /// buffer runs dry. Returns how many were added; fewer than `batch` means
    /// the listing is exhausted.
    pub async fn load_more<S>(
        &mut self,
        source: &S,
        exclude: &[String],
        limit: u32,
        batch: usize,
    ) -> Result<usize>
    where
        S: PostSource + ?Sized,
    {
        let mut added = 0;
        while added < batch {
            if self.current_index >= self.posts.len() {
                let query = PostQuery {
                    page: self.current_page,
                    limit,
                    tags: self.tags(),
                    exclude: exclude.to_vec(),
                };
                let fetched = source.fetch_posts(&query).await?;
                if fetched.is_empty() {
                    break;
                }
                self.posts = fetched;
                self.current_page += 1;
                self.current_index = 0;
            }
            self.displayed_posts
                .push(self.posts[self.current_index].clone());
            self.current_index += 1;
            added += 1;
        }
        Ok(added)
    }
}
