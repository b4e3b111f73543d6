//! Gift coordination for people who plan ahead: ranked, status-tracked gift
//! ideas per giftee, plus an AI-assisted brainstorming pipeline that turns a
//! scenario and whatever context you have into structured suggestions.
//!
//! The pieces compose leaf-first:
//! - [`store`] persists giftees and ideas behind the [`store::GiftStore`] trait.
//! - [`ranking::RankEngine`] keeps each giftee's list densely ranked 1..=n.
//! - [`status::StatusMachine`] walks an idea through
//!   considering → acquired → wrapped → given, one step at a time.
//! - [`brainstorm::BrainstormService`] normalizes context, assembles a
//!   scenario prompt, calls the generation provider, and parses the reply
//!   into [`types::GiftSuggestion`]s.

pub mod brainstorm;
pub mod config;
pub mod error;
pub mod providers;
pub mod ranking;
pub mod status;
pub mod store;
pub mod types;
pub mod utils;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod testing;

pub use brainstorm::{BrainstormOutcome, BrainstormPhase, BrainstormService, RawContext, Scenario};
pub use error::GiftError;
pub use ranking::RankEngine;
pub use status::{GiftProgress, StatusMachine};
pub use store::{GiftStore, SqliteGiftStore};
