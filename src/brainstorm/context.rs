use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::brainstorm::scenario::Scenario;
use crate::types::Giftee;
use crate::utils::format_currency;

/// Caller-supplied, possibly incomplete field map for a brainstorm request.
/// Keys are slot names; unknown keys are simply ignored by normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawContext {
    fields: HashMap<String, String>,
}

impl RawContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.fields.insert(field.to_string(), value.to_string());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Seeds relationship, budget, and interests from a stored giftee record,
    /// the fields a caller usually already has on file. Notes double as
    /// interests until the caller overrides them.
    pub fn from_giftee(giftee: &Giftee) -> Self {
        let mut ctx = Self::new();
        if let Some(relationship) = &giftee.relationship {
            ctx = ctx.with("relationship", relationship);
        }
        if let Some(budget) = giftee.budget {
            ctx = ctx.with("budget", &format_currency(budget));
        }
        if let Some(notes) = &giftee.notes {
            ctx = ctx.with("interests", notes);
        }
        ctx
    }
}

/// Fully resolved slot values for one scenario render. Every slot the
/// scenario's template references is present, so assembly never has to
/// improvise a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptContext {
    scenario: Scenario,
    values: BTreeMap<&'static str, String>,
}

impl PromptContext {
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Resolved value for a slot; empty for slots the scenario doesn't use.
    pub fn value(&self, slot: &str) -> &str {
        self.values.get(slot).map(String::as_str).unwrap_or("")
    }
}

/// Resolves every slot the scenario requires: the caller's value when it is
/// non-empty after trimming, the slot's fallback otherwise. Total and pure;
/// no input map can make it fail.
pub fn normalize(scenario: Scenario, raw: &RawContext) -> PromptContext {
    let mut values = BTreeMap::new();
    for spec in scenario.slots() {
        let value = match raw.get(spec.name) {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => spec.fallback.to_string(),
        };
        values.insert(spec.name, value);
    }
    PromptContext { scenario, values }
}
