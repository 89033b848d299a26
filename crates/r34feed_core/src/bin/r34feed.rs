/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use r34feed_core::config::{resolve_config_path, ClientConfig};
use r34feed_core::line::LineState;
use r34feed_core::local_storage::{LocalStorage, MemoryStorage, SqliteStorage};
use r34feed_core::post_feed::PostFeed;
use r34feed_core::post_source::HttpPostSource;
use r34feed_core::profiles::ProfilesStore;
use r34feed_core::search_history::SearchHistoryStore;
use r34feed_protocol::Post;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "r34feed", version, about = "Browse, rate and curate tagged posts")]
struct Cli {
    /// Path to the JSON client config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep all state in memory for this run only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCmd,
    },
    /// Manage the active profile's ban list
    Ban {
        #[command(subcommand)]
        action: BanCmd,
    },
    /// Inspect and edit tag ratings
    Rating {
        #[command(subcommand)]
        action: RatingCmd,
    },
    /// Raise the rating of each tag by one
    Like {
        tags: Vec<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Lower the rating of each tag by one
    Dislike { tags: Vec<String> },
    /// Manage favorites
    Favorite {
        #[command(subcommand)]
        action: FavoriteCmd,
    },
    /// Manage liked posts
    Liked {
        #[command(subcommand)]
        action: LikedCmd,
    },
    /// Manage search history
    History {
        /// Address the history shared by all profiles
        #[arg(long)]
        global: bool,
        #[command(subcommand)]
        action: HistoryCmd,
    },
    /// Fetch the next unseen posts for the active profile
    Next {
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Search posts by tags
    Search {
        tags: Vec<String>,
        #[arg(long, default_value_t = 20)]
        batch: usize,
    },
}

#[derive(Subcommand)]
enum ProfileCmd {
    List,
    Create { name: String },
    Use { profile: String },
    Rename { profile: String, name: String },
    Delete { profile: String },
    Lock { profile: String },
}

#[derive(Subcommand)]
enum BanCmd {
    List,
    Add { tag: String },
    Remove { tag: String },
}

#[derive(Subcommand)]
enum RatingCmd {
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    Set {
        tag: String,
        #[arg(allow_negative_numbers = true)]
        rating: i32,
    },
    Reset { tag: String },
}

#[derive(Subcommand)]
enum FavoriteCmd {
    List,
    Toggle { url: String },
    Remove { url: String },
}

#[derive(Subcommand)]
enum LikedCmd {
    List,
    Remove { url: String },
}

#[derive(Subcommand)]
enum HistoryCmd {
    List,
    Add { query: String },
    Delete { index: usize },
    Clear,
}

fn log_filter(verbose: u8) -> Result<EnvFilter> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    Ok(EnvFilter::from_default_env().add_directive(level.parse()?))
}

fn init_tracing(verbose: u8) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose)?)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn open_storage(cli: &Cli, cfg: &ClientConfig) -> Result<Arc<dyn LocalStorage>> {
    if cli.ephemeral {
        return Ok(Arc::new(MemoryStorage::new()));
    }
    let path = cfg.storage_path()?;
    debug!("storage: {}", path.display());
    Ok(Arc::new(SqliteStorage::open(path)?))
}

fn resolve_profile_id(profiles: &ProfilesStore, key: &str) -> Result<String> {
    profiles
        .find_by_id_or_name(key)
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow!("unknown profile: {key}"))
}

fn print_list(items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        println!("{i:>4}  {item}");
    }
}

fn print_post(post: &Post) {
    println!("{}  {}", post.id, post.file_url);
    println!("      {}", post.tags.join(" "));
}

fn run_profile(profiles: &mut ProfilesStore, action: ProfileCmd) -> Result<()> {
    match action {
        ProfileCmd::List => {
            for p in profiles.profiles() {
                let marker = if p.is_active { "*" } else { " " };
                let lock = if p.is_locked { " [locked]" } else { "" };
                println!("{marker} {}  {}{lock}", p.id, p.name);
            }
        }
        ProfileCmd::Create { name } => {
            let id = profiles.create_new_profile(&name)?;
            println!("{id}");
        }
        ProfileCmd::Use { profile } => {
            let id = resolve_profile_id(profiles, &profile)?;
            profiles.load_profile(&id)?;
        }
        ProfileCmd::Rename { profile, name } => {
            let id = resolve_profile_id(profiles, &profile)?;
            profiles.rename_profile(&id, &name)?;
        }
        ProfileCmd::Delete { profile } => {
            let id = resolve_profile_id(profiles, &profile)?;
            profiles.delete_profile(&id)?;
        }
        ProfileCmd::Lock { profile } => {
            let id = resolve_profile_id(profiles, &profile)?;
            profiles.toggle_lock(&id)?;
        }
    }
    Ok(())
}

fn run_history(
    storage: Arc<dyn LocalStorage>,
    profiles: &mut ProfilesStore,
    global: bool,
    action: HistoryCmd,
) -> Result<()> {
    if global {
        let mut history = SearchHistoryStore::load(storage)?;
        match action {
            HistoryCmd::List => print_list(history.history()),
            HistoryCmd::Add { query } => history.add_to_history(&query)?,
            HistoryCmd::Delete { index } => history.delete_history_item(index)?,
            HistoryCmd::Clear => history.clear_history()?,
        }
        return Ok(());
    }
    match action {
        HistoryCmd::List => {
            if let Some(p) = profiles.active_profile() {
                print_list(&p.search_history);
            }
        }
        HistoryCmd::Add { query } => profiles.add_to_search_history(&query)?,
        HistoryCmd::Delete { index } => profiles.delete_search_history_item(index)?,
        HistoryCmd::Clear => profiles.clear_search_history()?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg_path = resolve_config_path(cli.config.clone())?;
    debug!("config: {}", cfg_path.display());
    let cfg = ClientConfig::load(&cfg_path)?;
    let storage = open_storage(&cli, &cfg)?;
    let mut profiles = ProfilesStore::load(storage.clone())?;

    match cli.command {
        Command::Profile { action } => run_profile(&mut profiles, action)?,
        Command::Ban { action } => match action {
            BanCmd::List => {
                if let Some(p) = profiles.active_profile() {
                    print_list(&p.ban_list);
                }
            }
            BanCmd::Add { tag } => profiles.add_to_ban_list(&tag)?,
            BanCmd::Remove { tag } => profiles.remove_from_ban_list(&tag)?,
        },
        Command::Rating { action } => match action {
            RatingCmd::List { limit } => {
                for (tag, rating) in profiles.top_rated_tags(limit) {
                    println!("{rating:>5}  {tag}");
                }
            }
            RatingCmd::Set { tag, rating } => profiles.set_tag_rating(&tag, rating)?,
            RatingCmd::Reset { tag } => profiles.reset_tag_rating(&tag)?,
        },
        Command::Like { tags, url } => profiles.like(&tags, url.as_deref())?,
        Command::Dislike { tags } => profiles.dislike(&tags)?,
        Command::Favorite { action } => match action {
            FavoriteCmd::List => {
                if let Some(p) = profiles.active_profile() {
                    print_list(&p.favorites);
                }
            }
            FavoriteCmd::Toggle { url } => profiles.toggle_favorite(&url)?,
            FavoriteCmd::Remove { url } => profiles.remove_from_favorites(&url)?,
        },
        Command::Liked { action } => match action {
            LikedCmd::List => {
                if let Some(p) = profiles.active_profile() {
                    print_list(&p.liked);
                }
            }
            LikedCmd::Remove { url } => profiles.remove_from_liked(&url)?,
        },
        Command::History { global, action } => {
            run_history(storage.clone(), &mut profiles, global, action)?
        }
        Command::Next { count } => {
            let source = HttpPostSource::new(cfg.clone())?;
            let mut feed = PostFeed::with_limit(source, cfg.page_limit);
            if let Some(p) = profiles.active_profile() {
                feed.set_ban_list(&p.ban_list);
            }
            let loading = feed.loading_flag();
            let progress = tokio::spawn(async move {
                let mut tick = tokio::time::interval(Duration::from_secs(2));
                tick.tick().await;
                loop {
                    tick.tick().await;
                    if loading.load(Ordering::Acquire) {
                        info!("still fetching posts");
                    }
                }
            });
            for _ in 0..count {
                let next = feed.next_post(|p| profiles.is_viewed(&p.id)).await?;
                let Some(post) = next else {
                    println!("no more posts");
                    break;
                };
                profiles.add_to_viewed(&post.id)?;
                print_post(&post);
            }
            progress.abort();
            debug!(page = feed.current_page(), "feed stopped");
        }
        Command::Search { tags, batch } => {
            let query = tags.join(" ");
            profiles.add_to_search_history(&query)?;
            SearchHistoryStore::load(storage.clone())?.add_to_history(&query)?;

            let source = HttpPostSource::new(cfg.clone())?;
            let exclude = profiles
                .active_profile()
                .map(|p| p.ban_list.clone())
                .unwrap_or_default();
            let mut line = LineState::new(&query);
            let added = line
                .load_more(&source, &exclude, cfg.page_limit, batch)
                .await?;
            info!("search '{query}' returned {added} posts");
            for post in &line.displayed_posts {
                print_post(post);
            }
        }
    }
    Ok(())
}
