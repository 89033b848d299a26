/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod config;
pub mod http_retry;
pub mod line;
pub mod local_storage;
pub mod post_feed;
pub mod post_source;
pub mod profiles;
pub mod search_history;
