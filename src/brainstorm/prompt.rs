use crate::brainstorm::context::PromptContext;
use crate::brainstorm::scenario::Scenario;
use crate::error::GiftError;

/// Sent as the system prompt on every generation request. The block format
/// described here is the contract the suggestion parser relies on.
pub const SYSTEM_INSTRUCTIONS: &str = "\
You are a thoughtful gift advisor helping someone find meaningful gifts. \
Your suggestions should be specific, actionable, and include clear reasoning \
for why each gift fits this particular person.

Format every suggestion exactly like this, numbered in order:

Suggestion 1: [Gift Title]
Title: [Gift Title]
Why It Fits: [Specific reasoning about this person]
Price Range: [Estimated cost]
Where to Find: [Store, site, or how to make it]
Difficulty: [Easy, Moderate, or Challenging]
Customization Ideas: [Ways to personalize it]
Risk Level: [Low, Medium, or High]

Do not add commentary before the first suggestion or after the last one.";

/// One piece of a scenario template: literal text or an interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Lit(&'static str),
    Slot(&'static str),
    GifteeName,
    Count,
}

use Segment::{Count, GifteeName, Lit, Slot};

const GENERAL_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" thoughtful gift ideas for "),
    GifteeName,
    Lit(", who is a "),
    Slot("relationship"),
    Lit(".\n\nContext:\n- Budget: "),
    Slot("budget"),
    Lit("\n- Interests/hobbies: "),
    Slot("interests"),
    Lit("\n- Gift preferences: "),
    Slot("gift_preferences"),
    Lit("\n- Any additional notes: "),
    Slot("notes"),
    Lit("\n\nFocus on gifts that show you understand what matters to them."),
];

const BUDGET_CONSCIOUS_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" budget-conscious but thoughtful gift ideas for "),
    GifteeName,
    Lit(", who is a "),
    Slot("relationship"),
    Lit(".\n\nContext:\n- Budget: "),
    Slot("budget"),
    Lit("\n- What matters most to them: "),
    Slot("values"),
    Lit("\n- Interests: "),
    Slot("interests"),
    Lit("\n\nFocus on creative, meaningful gifts that maximize thoughtfulness over cost."),
];

const EXPERIENCE_VS_PHYSICAL_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" gift ideas for "),
    GifteeName,
    Lit(", including both experience and physical options.\n\nContext:\n- Budget: "),
    Slot("budget"),
    Lit("\n- Energy level preference: "),
    Slot("energy_level"),
    Lit("\n- Interests: "),
    Slot("interests"),
    Lit("\n- Logistics: "),
    Slot("logistics"),
    Lit("\n\nInclude a mix of experiences and physical gifts so they can compare."),
];

const LAST_MINUTE_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" last-minute gift ideas for "),
    GifteeName,
    Lit(", who is a "),
    Slot("relationship"),
    Lit(".\n\nContext:\n- Time available: "),
    Slot("days_until_event"),
    Lit(" days\n- Budget: "),
    Slot("budget"),
    Lit("\n- Interests: "),
    Slot("interests"),
    Lit("\n- Can shop online or in-person: "),
    Slot("shopping_method"),
    Lit("\n\nFocus on gifts that can be obtained quickly but still feel thoughtful."),
];

const DIY_PERSONALIZED_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" DIY/personalized gift ideas for "),
    GifteeName,
    Lit(", who is a "),
    Slot("relationship"),
    Lit(".\n\nContext:\n- Your skills: "),
    Slot("your_skills"),
    Lit("\n- Time available: "),
    Slot("time_available"),
    Lit("\n- Budget for supplies: "),
    Slot("budget"),
    Lit("\n- Their interests: "),
    Slot("interests"),
    Lit("\n\nFocus on gifts you can create or personalize yourself."),
];

const GROUP_GIFT_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" gift ideas that would complement a group gift for "),
    GifteeName,
    Lit(", who is a "),
    Slot("relationship"),
    Lit(".\n\nContext:\n- Main gift from group: "),
    Slot("main_gift"),
    Lit("\n- Your contribution budget: "),
    Slot("budget"),
    Lit("\n- Their interests: "),
    Slot("interests"),
    Lit("\n\nFocus on gifts that complement or enhance the main gift."),
];

const MINIMAL_INFO_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" thoughtful gift ideas for "),
    GifteeName,
    Lit(", who is a "),
    Slot("relationship"),
    Lit(".\n\nI don't know them very well, so suggest safe, universally appreciated gifts that work for a "),
    Slot("relationship"),
    Lit(".\n\nBudget: "),
    Slot("budget"),
    Lit("\n\nFocus on reliable, well-received gifts appropriate for this relationship."),
];

const LUXURY_TEMPLATE: &[Segment] = &[
    Lit("Generate "),
    Count,
    Lit(" luxury/high-end gift ideas for "),
    GifteeName,
    Lit(", who is a "),
    Slot("relationship"),
    Lit(".\n\nContext:\n- Budget: "),
    Slot("budget"),
    Lit("\n- Their values: "),
    Slot("values"),
    Lit("\n- Interests: "),
    Slot("interests"),
    Lit("\n- Priority: "),
    Slot("priority"),
    Lit("\n\nFocus on exceptional quality, experiences, or items they wouldn't buy themselves."),
];

fn template_for(scenario: Scenario) -> &'static [Segment] {
    match scenario {
        Scenario::General => GENERAL_TEMPLATE,
        Scenario::BudgetConscious => BUDGET_CONSCIOUS_TEMPLATE,
        Scenario::ExperienceVsPhysical => EXPERIENCE_VS_PHYSICAL_TEMPLATE,
        Scenario::LastMinute => LAST_MINUTE_TEMPLATE,
        Scenario::DiyPersonalized => DIY_PERSONALIZED_TEMPLATE,
        Scenario::GroupGift => GROUP_GIFT_TEMPLATE,
        Scenario::MinimalInfo => MINIMAL_INFO_TEMPLATE,
        Scenario::Luxury => LUXURY_TEMPLATE,
    }
}

/// Renders the scenario's template with the normalized context. Pure:
/// identical inputs yield byte-identical prompts.
pub fn assemble(context: &PromptContext, giftee_name: &str, requested_count: u32) -> String {
    let mut out = String::new();
    for segment in template_for(context.scenario()) {
        match segment {
            Lit(text) => out.push_str(text),
            Slot(name) => out.push_str(context.value(name)),
            GifteeName => out.push_str(giftee_name),
            Count => out.push_str(&requested_count.to_string()),
        }
    }
    out
}

/// Startup check: every slot a template references must be covered by its
/// scenario's slot table, so rendering can never hit an unresolved name.
pub fn validate_templates() -> Result<(), GiftError> {
    for scenario in Scenario::ALL {
        for segment in template_for(scenario) {
            if let Slot(name) = segment {
                if !scenario.slots().iter().any(|s| s.name == *name) {
                    return Err(GiftError::Invariant(format!(
                        "template for {} references slot '{}' with no fallback",
                        scenario.tag(),
                        name
                    )));
                }
            }
        }
    }
    Ok(())
}
