use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::error::GiftError;
use crate::store::GiftStore;
use crate::types::{GiftIdea, GiftIdeaPatch, GiftSuggestion, NewGiftIdea};
use crate::utils::parse_single_price;

/// Maintains the dense 1-based rank ordering of each giftee's ideas.
///
/// Every idea mutation goes through here. A per-giftee mutex serializes the
/// read-modify-write sequences so that density (ranks are exactly 1..=n)
/// survives concurrent callers; after each rank-moving operation the ordering
/// is re-read and verified under the same lock.
pub struct RankEngine {
    store: Arc<dyn GiftStore>,
    giftee_locks: RwLock<HashMap<i64, Arc<Mutex<()>>>>,
}

/// Rank an idea lands on when a sibling relocates from `old` to `target`.
/// `None` means the idea is outside the affected window and keeps its rank.
fn shifted_rank(rank: i64, old: i64, target: i64) -> Option<i64> {
    if old < target && rank > old && rank <= target {
        Some(rank - 1)
    } else if old > target && rank >= target && rank < old {
        Some(rank + 1)
    } else {
        None
    }
}

impl RankEngine {
    pub fn new(store: Arc<dyn GiftStore>) -> Self {
        Self {
            store,
            giftee_locks: RwLock::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, giftee_id: i64) -> Arc<Mutex<()>> {
        {
            let locks = self.giftee_locks.read().await;
            if let Some(lock) = locks.get(&giftee_id) {
                return lock.clone();
            }
        }
        let mut locks = self.giftee_locks.write().await;
        locks
            .entry(giftee_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Ideas for the giftee, sorted by rank.
    pub async fn list(&self, giftee_id: i64) -> Result<Vec<GiftIdea>, GiftError> {
        self.store
            .list_ideas_for_giftee(giftee_id)
            .await
            .map_err(GiftError::Store)
    }

    /// Adds a new idea at the bottom of the list: rank = current count + 1.
    pub async fn insert(
        &self,
        giftee_id: i64,
        draft: &NewGiftIdea,
    ) -> Result<GiftIdea, GiftError> {
        draft.validate()?;
        self.ensure_giftee(giftee_id).await?;

        let lock = self.lock_for(giftee_id).await;
        let _guard = lock.lock().await;

        let ideas = self.list(giftee_id).await?;
        let rank = ideas.len() as i64 + 1;
        let idea = self
            .store
            .create_gift_idea(giftee_id, draft, rank)
            .await
            .map_err(GiftError::Store)?;
        info!(giftee_id, idea_id = idea.id, rank, "Gift idea added");
        self.verify_density(giftee_id).await?;
        Ok(idea)
    }

    /// Edits title, description, url, or price. Rank and status changes are
    /// rejected here; use [`RankEngine::reorder`] and the status machine.
    pub async fn edit(
        &self,
        giftee_id: i64,
        idea_id: i64,
        patch: &GiftIdeaPatch,
    ) -> Result<GiftIdea, GiftError> {
        patch.validate()?;
        if patch.rank.is_some() {
            return Err(GiftError::Validation(
                "rank cannot be patched directly; use reorder".into(),
            ));
        }
        if patch.status.is_some() {
            return Err(GiftError::Validation(
                "status cannot be patched directly; use the status machine".into(),
            ));
        }

        let idea = self
            .store
            .get_gift_idea(idea_id)
            .await
            .map_err(GiftError::Store)?
            .ok_or(GiftError::OutOfRange { giftee_id, idea_id })?;
        if idea.giftee_id != giftee_id {
            return Err(GiftError::OutOfRange { giftee_id, idea_id });
        }

        self.store
            .update_gift_idea(idea_id, patch)
            .await
            .map_err(GiftError::Store)?
            .ok_or(GiftError::OutOfRange { giftee_id, idea_id })
    }

    /// Moves an idea to `new_position` (1-based). Positions beyond either end
    /// clamp to the nearest valid slot; everything between the old and new
    /// position shifts by one toward the vacated slot.
    pub async fn reorder(
        &self,
        giftee_id: i64,
        idea_id: i64,
        new_position: i64,
    ) -> Result<GiftIdea, GiftError> {
        let lock = self.lock_for(giftee_id).await;
        let _guard = lock.lock().await;

        let ideas = self.list(giftee_id).await?;
        let Some(subject) = ideas.iter().find(|i| i.id == idea_id) else {
            return Err(GiftError::OutOfRange { giftee_id, idea_id });
        };
        let old_rank = subject.rank;
        let target = new_position.clamp(1, ideas.len() as i64);
        if target == old_rank {
            debug!(giftee_id, idea_id, rank = old_rank, "Reorder to current position, no-op");
            return Ok(subject.clone());
        }

        for idea in &ideas {
            if idea.id == idea_id {
                continue;
            }
            if let Some(shifted) = shifted_rank(idea.rank, old_rank, target) {
                self.write_rank(idea.id, shifted).await?;
            }
        }
        let moved = self.write_rank(idea_id, target).await?;
        info!(giftee_id, idea_id, from = old_rank, to = target, "Gift idea reordered");
        self.verify_density(giftee_id).await?;
        Ok(moved)
    }

    /// Removes an idea and closes the gap it leaves: everything below it
    /// moves up one rank.
    pub async fn delete(&self, giftee_id: i64, idea_id: i64) -> Result<(), GiftError> {
        let lock = self.lock_for(giftee_id).await;
        let _guard = lock.lock().await;

        let ideas = self.list(giftee_id).await?;
        let Some(subject) = ideas.iter().find(|i| i.id == idea_id) else {
            return Err(GiftError::OutOfRange { giftee_id, idea_id });
        };
        let removed_rank = subject.rank;

        self.store
            .delete_gift_idea(idea_id)
            .await
            .map_err(GiftError::Store)?;
        for idea in &ideas {
            if idea.rank > removed_rank {
                self.write_rank(idea.id, idea.rank - 1).await?;
            }
        }
        info!(giftee_id, idea_id, rank = removed_rank, "Gift idea removed, ranks compacted");
        self.verify_density(giftee_id).await?;
        Ok(())
    }

    /// Persists an AI suggestion as a real idea at the bottom of the list.
    /// The why-it-fits rationale becomes the description; a price is recorded
    /// only when the suggested range names one unambiguous amount.
    pub async fn promote(
        &self,
        giftee_id: i64,
        suggestion: &GiftSuggestion,
    ) -> Result<GiftIdea, GiftError> {
        let draft = NewGiftIdea {
            title: suggestion.title.clone(),
            description: if suggestion.why_it_fits.is_empty() {
                None
            } else {
                Some(suggestion.why_it_fits.clone())
            },
            url: None,
            price: parse_single_price(&suggestion.price_range),
        };
        debug!(giftee_id, title = %suggestion.title, "Promoting suggestion to gift idea");
        self.insert(giftee_id, &draft).await
    }

    async fn ensure_giftee(&self, giftee_id: i64) -> Result<(), GiftError> {
        self.store
            .get_giftee(giftee_id)
            .await
            .map_err(GiftError::Store)?
            .ok_or_else(|| GiftError::Validation(format!("giftee {} not found", giftee_id)))?;
        Ok(())
    }

    async fn write_rank(&self, idea_id: i64, rank: i64) -> Result<GiftIdea, GiftError> {
        let patch = GiftIdeaPatch {
            rank: Some(rank),
            ..Default::default()
        };
        self.store
            .update_gift_idea(idea_id, &patch)
            .await
            .map_err(GiftError::Store)?
            .ok_or_else(|| {
                GiftError::Invariant(format!("gift idea {} vanished during rank shift", idea_id))
            })
    }

    /// Ranks must read back as exactly 1..=n. A violation means the
    /// serialization above has a hole, so it is loud and fatal.
    async fn verify_density(&self, giftee_id: i64) -> Result<(), GiftError> {
        let ideas = self.list(giftee_id).await?;
        for (i, idea) in ideas.iter().enumerate() {
            let expected = i as i64 + 1;
            if idea.rank != expected {
                error!(
                    giftee_id,
                    idea_id = idea.id,
                    rank = idea.rank,
                    expected,
                    "Rank density violated"
                );
                return Err(GiftError::Invariant(format!(
                    "giftee {} idea {} has rank {}, expected {}",
                    giftee_id, idea.id, idea.rank, expected
                )));
            }
        }
        Ok(())
    }
}
