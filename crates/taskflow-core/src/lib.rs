//! # taskflow-core
//!
//! I/O-free core for TaskFlow.
//!
//! This crate holds the pieces of TaskFlow that operate purely on in-memory
//! values: the normalized activity model shared by every provider, the
//! derived metrics computed over it, the insight and daily-digest
//! generators, and the markdown parser used by the note editor.
//!
//! Nothing here touches the network, the filesystem, or the clock. Functions
//! that depend on "now" take it as an argument.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Provider stats records and the aggregated view |
//! | [`analysis`] | Submission and activity analysis, streaks, daily counts |
//! | [`insights`] | Insight sentences, daily digest, staleness check |
//! | [`markdown`] | Block parser, inline tokenizer, todo toggle |
//! | [`note`] | Markdown notes |

pub mod analysis;
pub mod insights;
pub mod markdown;
pub mod models;
pub mod note;

pub use insights::{generate_daily_digest, generate_user_insights, should_update};
pub use markdown::{render, toggle_todo, Block, InlineSpan};
pub use models::{
    AggregatedServicesData, DailyDigest, DataOrigin, FailureKind, Provider, ProviderStats,
    ServiceIdentities,
};
pub use note::MarkdownDocument;
