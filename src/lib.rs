//! # TaskFlow
//!
//! A personal activity hub. TaskFlow pulls stats from LeetCode, Codeforces,
//! GitHub, Reddit, and Gmail, merges them into one view, and derives
//! insights and a daily digest from it. It also serves the markdown
//! renderer and draft cache used by the note editor.
//!
//! Pure logic (models, analysis, insights, markdown) lives in the
//! `taskflow-core` crate; this crate adds the network, config, and
//! process surfaces around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ Providers                │
//! │ LeetCode/Codeforces/     │──┐
//! │ GitHub/Reddit/Email      │  │  join_all + timeout
//! └──────────────────────────┘  ▼
//!                      ┌─────────────────┐    ┌───────────────────┐
//!                      │   Aggregator    │◀───│ SyntheticFallback │
//!                      └────────┬────────┘    │   (demo mode)     │
//!                               │             └───────────────────┘
//!                  ┌────────────┴───────────┐
//!                  ▼                        ▼
//!             ┌──────────┐            ┌──────────┐
//!             │   CLI    │            │   HTTP   │
//!             │(taskflow)│            │  (axum)  │
//!             └──────────┘            └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! taskflow sources                 # check identities and tokens
//! taskflow stats                   # fetch and summarize everything
//! taskflow digest                  # today's highlights and action items
//! taskflow render notes/today.md   # inspect a note's blocks
//! taskflow serve                   # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Provider error taxonomy |
//! | [`http`] | Shared HTTP client with retry |
//! | [`normalize`] | Clamping and timestamp helpers for upstream data |
//! | [`traits`] | `StatsProvider` trait and registry |
//! | [`provider_leetcode`] | LeetCode client |
//! | [`provider_codeforces`] | Codeforces client |
//! | [`provider_github`] | GitHub client |
//! | [`provider_reddit`] | Reddit client |
//! | [`provider_email`] | Gmail client |
//! | [`fallback`] | Synthetic data for demo mode |
//! | [`aggregator`] | Concurrent fan-out and merge |
//! | [`drafts`] | Note draft cache |
//! | [`server`] | JSON HTTP server |
//! | [`sources`] | `taskflow sources` |
//! | [`stats`] | `taskflow stats`, `insights`, `digest` |
//! | [`notes`] | `taskflow render`, `toggle` |

pub mod aggregator;
pub mod config;
pub mod drafts;
pub mod error;
pub mod fallback;
pub mod http;
pub mod normalize;
pub mod notes;
pub mod provider_codeforces;
pub mod provider_email;
pub mod provider_github;
pub mod provider_leetcode;
pub mod provider_reddit;
pub mod server;
pub mod sources;
pub mod stats;
pub mod traits;
