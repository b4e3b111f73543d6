use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::GiftError;
use crate::store::GiftStore;
use crate::types::{GiftIdea, GiftIdeaPatch, GiftStatus};

impl GiftStatus {
    /// Next stage in the linear workflow, or `None` from `Given`.
    pub fn next(self) -> Option<GiftStatus> {
        match self {
            GiftStatus::Considering => Some(GiftStatus::Acquired),
            GiftStatus::Acquired => Some(GiftStatus::Wrapped),
            GiftStatus::Wrapped => Some(GiftStatus::Given),
            GiftStatus::Given => None,
        }
    }

    /// Previous stage, or `None` from `Considering`.
    pub fn prev(self) -> Option<GiftStatus> {
        match self {
            GiftStatus::Considering => None,
            GiftStatus::Acquired => Some(GiftStatus::Considering),
            GiftStatus::Wrapped => Some(GiftStatus::Acquired),
            GiftStatus::Given => Some(GiftStatus::Wrapped),
        }
    }

    /// True once the gift is in hand (or further along).
    pub fn is_acquired(self) -> bool {
        !matches!(self, GiftStatus::Considering)
    }
}

/// Pipeline counts for one giftee's ideas. `acquired` counts ideas that are
/// acquired or further along, `wrapped` counts wrapped or further along, so
/// the columns read as "at least this far".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GiftProgress {
    pub total: usize,
    pub acquired: usize,
    pub wrapped: usize,
    pub given: usize,
    /// Share of ideas acquired, in percent. Zero for an empty list.
    pub percentage: f64,
}

impl GiftProgress {
    pub fn from_ideas(ideas: &[GiftIdea]) -> Self {
        if ideas.is_empty() {
            return Self::default();
        }
        let total = ideas.len();
        let acquired = ideas.iter().filter(|i| i.status.is_acquired()).count();
        let wrapped = ideas
            .iter()
            .filter(|i| matches!(i.status, GiftStatus::Wrapped | GiftStatus::Given))
            .count();
        let given = ideas.iter().filter(|i| i.status == GiftStatus::Given).count();
        Self {
            total,
            acquired,
            wrapped,
            given,
            percentage: acquired as f64 / total as f64 * 100.0,
        }
    }
}

/// Applies lifecycle transitions to stored ideas, one legal step at a time.
/// There are no shortcuts and no wraparound: advancing a given gift and
/// reverting a considering one are hard errors.
pub struct StatusMachine {
    store: Arc<dyn GiftStore>,
}

impl StatusMachine {
    pub fn new(store: Arc<dyn GiftStore>) -> Self {
        Self { store }
    }

    /// Considering → Acquired → Wrapped → Given.
    pub async fn advance(&self, idea_id: i64) -> Result<GiftIdea, GiftError> {
        let idea = self.fetch(idea_id).await?;
        let next = idea.status.next().ok_or(GiftError::TerminalState)?;
        self.write_status(idea, next).await
    }

    /// Undo one step, e.g. a return or a wrapping mishap.
    pub async fn revert(&self, idea_id: i64) -> Result<GiftIdea, GiftError> {
        let idea = self.fetch(idea_id).await?;
        let prev = idea.status.prev().ok_or(GiftError::InitialState)?;
        self.write_status(idea, prev).await
    }

    /// Progress snapshot across all of the giftee's ideas.
    pub async fn progress(&self, giftee_id: i64) -> Result<GiftProgress, GiftError> {
        let ideas = self
            .store
            .list_ideas_for_giftee(giftee_id)
            .await
            .map_err(GiftError::Store)?;
        Ok(GiftProgress::from_ideas(&ideas))
    }

    async fn fetch(&self, idea_id: i64) -> Result<GiftIdea, GiftError> {
        self.store
            .get_gift_idea(idea_id)
            .await
            .map_err(GiftError::Store)?
            .ok_or_else(|| GiftError::Validation(format!("gift idea {} not found", idea_id)))
    }

    async fn write_status(&self, idea: GiftIdea, to: GiftStatus) -> Result<GiftIdea, GiftError> {
        let patch = GiftIdeaPatch {
            status: Some(to),
            ..Default::default()
        };
        let updated = self
            .store
            .update_gift_idea(idea.id, &patch)
            .await
            .map_err(GiftError::Store)?
            .ok_or_else(|| GiftError::Validation(format!("gift idea {} not found", idea.id)))?;
        info!(
            idea_id = idea.id,
            from = idea.status.as_str(),
            to = to.as_str(),
            "Gift status transition"
        );
        Ok(updated)
    }
}
