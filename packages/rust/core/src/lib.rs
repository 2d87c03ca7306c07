//! Core domain logic for deliverybot.
//!
//! This crate ties together channel lookup, submission parsing, roster
//! tracking, repository cloning and prod checks into the end-to-end
//! `collect` workflow.

pub mod classifier;
pub mod extractor;
pub mod locator;
pub mod materializer;
pub mod pipeline;
pub mod roster;
pub mod tracker;

pub use classifier::{classify_line, classify_message, extract_url};
pub use extractor::{extract_submission, normalize_nickname, resolve_author_name};
pub use locator::{ChannelLocation, locate, locate_in};
pub use materializer::{MaterializeOutcome, RepoMaterializer};
pub use pipeline::{
    CollectConfig, CollectDeps, Delivery, DeliveryReport, MessageOutcome, ProgressReporter,
    SilentProgress, collect_deliveries,
};
pub use roster::Roster;
pub use tracker::{Attribution, DeliveryTracker};
