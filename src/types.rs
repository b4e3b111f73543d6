use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GiftError;

/// A person gifts are being planned for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Giftee {
    pub id: i64,
    /// Owning user; giftee lists are scoped per user.
    pub user_id: i64,
    pub name: String,
    pub relationship: Option<String>,
    pub budget: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Draft for creating a giftee.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGiftee {
    pub user_id: i64,
    pub name: String,
    pub relationship: Option<String>,
    pub budget: Option<f64>,
    pub notes: Option<String>,
}

impl NewGiftee {
    pub fn validate(&self) -> Result<(), GiftError> {
        if self.name.trim().is_empty() {
            return Err(GiftError::Validation("giftee name must not be empty".into()));
        }
        if let Some(budget) = self.budget {
            if budget < 0.0 {
                return Err(GiftError::Validation(format!(
                    "budget must not be negative, got {budget}"
                )));
            }
        }
        Ok(())
    }
}

/// Partial update for a giftee. `Some` sets the field, `None` leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GifteePatch {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub budget: Option<f64>,
    pub notes: Option<String>,
}

impl GifteePatch {
    pub fn validate(&self) -> Result<(), GiftError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(GiftError::Validation("giftee name must not be empty".into()));
            }
        }
        if let Some(budget) = self.budget {
            if budget < 0.0 {
                return Err(GiftError::Validation(format!(
                    "budget must not be negative, got {budget}"
                )));
            }
        }
        Ok(())
    }
}

/// Lifecycle stage of a gift idea. Strictly linear; transitions live on
/// [`GiftStatus::next`] and [`GiftStatus::prev`] in the status module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftStatus {
    Considering,
    Acquired,
    Wrapped,
    Given,
}

impl GiftStatus {
    /// Stable string form used in the store and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            GiftStatus::Considering => "considering",
            GiftStatus::Acquired => "acquired",
            GiftStatus::Wrapped => "wrapped",
            GiftStatus::Given => "given",
        }
    }

    pub fn parse(s: &str) -> Option<GiftStatus> {
        match s.trim().to_ascii_lowercase().as_str() {
            "considering" => Some(GiftStatus::Considering),
            "acquired" => Some(GiftStatus::Acquired),
            "wrapped" => Some(GiftStatus::Wrapped),
            "given" => Some(GiftStatus::Given),
            _ => None,
        }
    }
}

/// A concrete gift idea attached to a giftee, ordered by `rank`.
///
/// Ranks are dense and 1-based within each giftee: 1 is top priority and the
/// set of ranks is always exactly 1..=n. The rank engine owns every mutation
/// that could disturb that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftIdea {
    pub id: i64,
    pub giftee_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub rank: i64,
    pub status: GiftStatus,
    pub created_at: DateTime<Utc>,
}

/// Draft for creating a gift idea. Rank and status are assigned by the rank
/// engine, never by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGiftIdea {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub price: Option<f64>,
}

impl NewGiftIdea {
    pub fn validate(&self) -> Result<(), GiftError> {
        if self.title.trim().is_empty() {
            return Err(GiftError::Validation("gift idea title must not be empty".into()));
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                return Err(GiftError::Validation(format!(
                    "price must not be negative, got {price}"
                )));
            }
        }
        Ok(())
    }
}

/// Partial update for a gift idea. Rank and status fields exist for the rank
/// engine and status machine; caller-facing edits must leave them `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GiftIdeaPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub rank: Option<i64>,
    pub status: Option<GiftStatus>,
}

impl GiftIdeaPatch {
    pub fn validate(&self) -> Result<(), GiftError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(GiftError::Validation("gift idea title must not be empty".into()));
            }
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                return Err(GiftError::Validation(format!(
                    "price must not be negative, got {price}"
                )));
            }
        }
        Ok(())
    }
}

/// How much effort a suggested gift takes to pull off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Moderate,
    Challenging,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Moderate => "Moderate",
            Difficulty::Challenging => "Challenging",
        }
    }

    /// Case-insensitive match against the canonical labels.
    pub fn parse(s: &str) -> Option<Difficulty> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "moderate" => Some(Difficulty::Moderate),
            "challenging" => Some(Difficulty::Challenging),
            _ => None,
        }
    }
}

/// How likely a suggested gift is to miss the mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Case-insensitive match against the canonical labels.
    pub fn parse(s: &str) -> Option<RiskLevel> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

/// One AI-suggested gift, parsed out of a generation reply. Not persisted
/// until promoted into a [`GiftIdea`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftSuggestion {
    pub title: String,
    pub why_it_fits: String,
    pub price_range: String,
    pub where_to_find: String,
    pub difficulty: Difficulty,
    pub customization_ideas: String,
    pub risk_level: RiskLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_rejected() {
        let draft = NewGiftee {
            user_id: 1,
            name: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(draft.validate(), Err(GiftError::Validation(_))));
    }

    #[test]
    fn negative_budget_rejected() {
        let draft = NewGiftee {
            user_id: 1,
            name: "Sam".to_string(),
            budget: Some(-5.0),
            ..Default::default()
        };
        assert!(matches!(draft.validate(), Err(GiftError::Validation(_))));
    }

    #[test]
    fn idea_draft_requires_title() {
        let draft = NewGiftIdea::default();
        assert!(draft.validate().is_err());

        let draft = NewGiftIdea {
            title: "Chess set".to_string(),
            ..Default::default()
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn patch_with_no_fields_is_valid() {
        assert!(GifteePatch::default().validate().is_ok());
        assert!(GiftIdeaPatch::default().validate().is_ok());
    }

    #[test]
    fn patch_cannot_blank_a_title() {
        let patch = GiftIdeaPatch {
            title: Some("".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            GiftStatus::Considering,
            GiftStatus::Acquired,
            GiftStatus::Wrapped,
            GiftStatus::Given,
        ] {
            assert_eq!(GiftStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(GiftStatus::parse("GIVEN"), Some(GiftStatus::Given));
        assert_eq!(GiftStatus::parse("returned"), None);
    }

    #[test]
    fn suggestion_enums_default_to_middle_values() {
        assert_eq!(Difficulty::default(), Difficulty::Moderate);
        assert_eq!(RiskLevel::default(), RiskLevel::Medium);
    }

    #[test]
    fn suggestion_enum_parsing_ignores_case() {
        assert_eq!(Difficulty::parse(" easy "), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse("CHALLENGING"), Some(Difficulty::Challenging));
        assert_eq!(Difficulty::parse("very hard"), None);
        assert_eq!(RiskLevel::parse("Low"), Some(RiskLevel::Low));
        assert_eq!(RiskLevel::parse("extreme"), None);
    }
}
