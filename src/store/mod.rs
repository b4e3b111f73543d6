mod sqlite;

use async_trait::async_trait;

pub use sqlite::SqliteGiftStore;

use crate::types::{GiftIdea, GiftIdeaPatch, Giftee, GifteePatch, NewGiftIdea, NewGiftee};

/// Persistence contract for giftees and their gift ideas.
///
/// Each operation is atomic for the rows it names; multi-row consistency
/// (rank shifts, promotion) is the rank engine's job above this layer. The
/// one exception is giftee deletion, which cascades to the giftee's ideas in
/// a single transaction. Idea listings come back sorted by rank ascending.
///
/// Patches follow set-if-some semantics: a `Some` field overwrites, a `None`
/// field is left untouched. Update and delete return `None`/`false` for rows
/// that do not exist rather than erroring. Giftee drafts and patches are
/// validated here; idea validation lives in the rank engine, which owns idea
/// writes.
#[async_trait]
pub trait GiftStore: Send + Sync {
    async fn create_giftee(&self, draft: &NewGiftee) -> anyhow::Result<Giftee>;
    async fn get_giftee(&self, giftee_id: i64) -> anyhow::Result<Option<Giftee>>;
    async fn update_giftee(
        &self,
        giftee_id: i64,
        patch: &GifteePatch,
    ) -> anyhow::Result<Option<Giftee>>;
    /// Deletes the giftee and every idea attached to it.
    async fn delete_giftee(&self, giftee_id: i64) -> anyhow::Result<bool>;
    /// Sorted by name for stable display.
    async fn list_giftees_for_user(&self, user_id: i64) -> anyhow::Result<Vec<Giftee>>;

    /// Inserts with the rank the engine computed; status starts at considering.
    async fn create_gift_idea(
        &self,
        giftee_id: i64,
        draft: &NewGiftIdea,
        rank: i64,
    ) -> anyhow::Result<GiftIdea>;
    async fn get_gift_idea(&self, idea_id: i64) -> anyhow::Result<Option<GiftIdea>>;
    async fn update_gift_idea(
        &self,
        idea_id: i64,
        patch: &GiftIdeaPatch,
    ) -> anyhow::Result<Option<GiftIdea>>;
    async fn delete_gift_idea(&self, idea_id: i64) -> anyhow::Result<bool>;
    /// Sorted by rank ascending.
    async fn list_ideas_for_giftee(&self, giftee_id: i64) -> anyhow::Result<Vec<GiftIdea>>;
}
