/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use rand::{thread_rng, Rng};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

pub const MAX_ATTEMPTS: u32 = 5;

/// How often and how patiently a request is re-sent after 429/5xx or a
/// transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    base: Duration,
    ceiling: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.clamp(1, MAX_ATTEMPTS),
            base: Duration::from_millis(200),
            ceiling: Duration::from_secs(5),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before re-send number `retry` (0-based), jitter excluded.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.ceiling)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn jitter() -> Duration {
    Duration::from_millis(thread_rng().gen_range(0..=200))
}

/// Sends the request built by `build` until it succeeds, fails permanently or
/// the policy runs out. The last response is returned even when it is a 5xx.
pub async fn send_with_retry<F>(mut build: F, policy: RetryPolicy) -> Result<Response>
where
    F: FnMut() -> RequestBuilder,
{
    let mut retry = 0;
    loop {
        let last = retry + 1 >= policy.attempts;
        match build().send().await {
            Ok(resp) if last || !is_retryable(resp.status()) => return Ok(resp),
            Ok(resp) => debug!(status = %resp.status(), retry, "retrying request"),
            Err(e) if last => return Err(e).context("send request"),
            Err(e) => debug!(retry, "retrying after transport error: {e}"),
        }
        tokio::time::sleep(policy.backoff(retry) + jitter()).await;
        retry += 1;
    }
}
