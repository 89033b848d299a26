/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::config::ClientConfig;
use crate::http_retry::{send_with_retry, RetryPolicy};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use r34feed_protocol::Post;
use std::time::Duration;
use tracing::{debug, warn};
use urlencoding::encode;

/// Posts with fewer tags than this are too poorly tagged to rate.
pub const MIN_POST_TAGS: usize = 10;

/// Always excluded from listings: only still images are shown.
pub const BASE_EXCLUDED_TAGS: [&str; 2] = ["video", "gif"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub page: u32,
    pub limit: u32,
    pub tags: Vec<String>,
    pub exclude: Vec<String>,
}

#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;
}

/// Tag expression for the `tags=` parameter: search tags, then `-tag` exclusions, `+`-joined.
pub fn tag_expression(query: &PostQuery) -> String {
    let include = query
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| encode(t).into_owned());
    let exclude = BASE_EXCLUDED_TAGS
        .iter()
        .map(|t| t.to_string())
        .chain(query.exclude.iter().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
        .map(|t| format!("-{}", encode(&t)));
    include.chain(exclude).collect::<Vec<_>>().join("+")
}

pub fn build_post_list_url(cfg: &ClientConfig, query: &PostQuery) -> String {
    format!(
        "{}&api_key={}&user_id={}&pid={}&limit={}&tags={}",
        cfg.base_url,
        encode(&cfg.api_key),
        encode(&cfg.user_id),
        query.page,
        query.limit,
        tag_expression(query)
    )
}

fn post_from_element(e: &BytesStart<'_>) -> Result<Option<Post>> {
    let mut id = String::new();
    let mut tags = String::new();
    let mut file_url = String::new();
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"id" => id = value.trim().to_string(),
            b"tags" => tags = value.into_owned(),
            b"file_url" => file_url = value.into_owned(),
            _ => {}
        }
    }
    let tags = tags
        .split_whitespace()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if id.is_empty() || tags.len() < MIN_POST_TAGS {
        return Ok(None);
    }
    Ok(Some(Post { id, tags, file_url }))
}

fn api_failure(e: &BytesStart<'_>) -> Result<Option<String>> {
    let mut success = true;
    let mut reason = String::new();
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"success" => success = attr.unescape_value()?.trim() != "false",
            b"reason" => reason = attr.unescape_value()?.into_owned(),
            _ => {}
        }
    }
    Ok((!success).then_some(reason))
}

/// Extracts `<post>` elements from a post listing document, dropping posts
/// without an id or with too few tags.
pub fn parse_posts_xml(text: &str) -> Result<Vec<Post>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();
    loop {
        match reader.read_event().context("parse post listing xml")? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"post" => {
                    if let Some(post) = post_from_element(&e)? {
                        out.push(post);
                    }
                }
                b"response" => {
                    if let Some(reason) = api_failure(&e)? {
                        return Err(anyhow!("post api rejected request: {reason}"));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

#[derive(Clone)]
pub struct HttpPostSource {
    client: reqwest::Client,
    cfg: ClientConfig,
    retry: RetryPolicy,
}

impl HttpPostSource {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        if cfg.api_key.is_empty() || cfg.user_id.is_empty() {
            warn!("api key or user id not configured, requests may be rejected");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs.max(1)))
            .user_agent(concat!("r34feed/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        let retry = RetryPolicy::new(cfg.retry_attempts);
        Ok(Self { client, cfg, retry })
    }
}

#[async_trait]
impl PostSource for HttpPostSource {
    async fn fetch_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let url = build_post_list_url(&self.cfg, query);
        debug!(page = query.page, limit = query.limit, "fetching post listing");
        let resp = send_with_retry(|| self.client.get(&url), self.retry).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("post listing failed: {status}"));
        }
        let text = resp.text().await.context("read post listing body")?;
        parse_posts_xml(&text)
    }
}
