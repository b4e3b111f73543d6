use serde::{Deserialize, Serialize};

use crate::error::GiftError;

/// A named slot a scenario's template interpolates, with the fallback value
/// used when the caller leaves it blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub fallback: &'static str,
}

const fn slot(name: &'static str, fallback: &'static str) -> SlotSpec {
    SlotSpec { name, fallback }
}

const GENERAL_SLOTS: &[SlotSpec] = &[
    slot("relationship", "someone special"),
    slot("budget", "no specific budget"),
    slot("interests", "Not specified"),
    slot("gift_preferences", "Open to suggestions"),
    slot("notes", "None"),
];

const BUDGET_CONSCIOUS_SLOTS: &[SlotSpec] = &[
    slot("relationship", "someone special"),
    slot("budget", "no specific budget"),
    slot("values", "Not specified"),
    slot("interests", "Not specified"),
];

const EXPERIENCE_VS_PHYSICAL_SLOTS: &[SlotSpec] = &[
    slot("budget", "no specific budget"),
    slot("energy_level", "Mixed"),
    slot("interests", "Not specified"),
    slot("logistics", "Flexible"),
];

const LAST_MINUTE_SLOTS: &[SlotSpec] = &[
    slot("relationship", "someone special"),
    slot("days_until_event", "3-5"),
    slot("budget", "no specific budget"),
    slot("interests", "Not specified"),
    slot("shopping_method", "both"),
];

const DIY_PERSONALIZED_SLOTS: &[SlotSpec] = &[
    slot("relationship", "someone special"),
    slot("your_skills", "Basic crafting"),
    slot("time_available", "A few hours"),
    slot("budget", "no specific budget"),
    slot("interests", "Not specified"),
];

const GROUP_GIFT_SLOTS: &[SlotSpec] = &[
    slot("relationship", "someone special"),
    slot("main_gift", "Not specified"),
    slot("budget", "no specific budget"),
    slot("interests", "Not specified"),
];

const MINIMAL_INFO_SLOTS: &[SlotSpec] = &[
    slot("relationship", "someone special"),
    slot("budget", "no specific budget"),
];

const LUXURY_SLOTS: &[SlotSpec] = &[
    slot("relationship", "someone special"),
    slot("budget", "no specific budget"),
    slot("values", "Quality and craftsmanship"),
    slot("interests", "Not specified"),
    slot("priority", "Quality over quantity"),
];

/// The closed set of brainstorming scenarios. Each one carries its own
/// prompt template and slot table; there is no free-form scenario input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    General,
    BudgetConscious,
    ExperienceVsPhysical,
    LastMinute,
    DiyPersonalized,
    GroupGift,
    MinimalInfo,
    Luxury,
}

impl Scenario {
    pub const ALL: [Scenario; 8] = [
        Scenario::General,
        Scenario::BudgetConscious,
        Scenario::ExperienceVsPhysical,
        Scenario::LastMinute,
        Scenario::DiyPersonalized,
        Scenario::GroupGift,
        Scenario::MinimalInfo,
        Scenario::Luxury,
    ];

    /// Stable snake_case tag used at string boundaries (requests, logs).
    /// Matches the serde representation.
    pub fn tag(self) -> &'static str {
        match self {
            Scenario::General => "general",
            Scenario::BudgetConscious => "budget_conscious",
            Scenario::ExperienceVsPhysical => "experience_vs_physical",
            Scenario::LastMinute => "last_minute",
            Scenario::DiyPersonalized => "diy_personalized",
            Scenario::GroupGift => "group_gift",
            Scenario::MinimalInfo => "minimal_info",
            Scenario::Luxury => "luxury",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Scenario, GiftError> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|s| s.tag() == tag)
            .ok_or_else(|| GiftError::UnknownScenario(tag.to_string()))
    }

    /// Human-facing picker label.
    pub fn label(self) -> &'static str {
        match self {
            Scenario::General => "General Brainstorming",
            Scenario::BudgetConscious => "Budget-Conscious",
            Scenario::ExperienceVsPhysical => "Experience vs Physical",
            Scenario::LastMinute => "Last-Minute",
            Scenario::DiyPersonalized => "DIY/Personalized",
            Scenario::GroupGift => "Group Gift Addition",
            Scenario::MinimalInfo => "Minimal Information",
            Scenario::Luxury => "Luxury/High-End",
        }
    }

    /// One-line picker description.
    pub fn description(self) -> &'static str {
        match self {
            Scenario::General => "Standard gift brainstorming with full context",
            Scenario::BudgetConscious => "Thoughtful gifts on a tight budget",
            Scenario::ExperienceVsPhysical => "Compare experience and physical gift options",
            Scenario::LastMinute => "Quick gifts available now",
            Scenario::DiyPersonalized => "Gifts you can create yourself",
            Scenario::GroupGift => "Complement a group gift",
            Scenario::MinimalInfo => "Safe bets when you don't know them well",
            Scenario::Luxury => "Premium, exceptional quality gifts",
        }
    }

    /// Slots this scenario's template interpolates, in template order. Every
    /// slot carries a fallback, so normalization is total.
    pub fn slots(self) -> &'static [SlotSpec] {
        match self {
            Scenario::General => GENERAL_SLOTS,
            Scenario::BudgetConscious => BUDGET_CONSCIOUS_SLOTS,
            Scenario::ExperienceVsPhysical => EXPERIENCE_VS_PHYSICAL_SLOTS,
            Scenario::LastMinute => LAST_MINUTE_SLOTS,
            Scenario::DiyPersonalized => DIY_PERSONALIZED_SLOTS,
            Scenario::GroupGift => GROUP_GIFT_SLOTS,
            Scenario::MinimalInfo => MINIMAL_INFO_SLOTS,
            Scenario::Luxury => LUXURY_SLOTS,
        }
    }
}
