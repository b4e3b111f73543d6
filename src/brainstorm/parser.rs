use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::GiftError;
use crate::types::{Difficulty, GiftSuggestion, RiskLevel};
use crate::utils::truncate_str;

/// A recoverable defect in one suggestion block. The block index is the
/// number the model printed in its `Suggestion N:` header, when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub block: Option<u32>,
    pub reason: String,
}

/// Strips surrounding whitespace and markdown emphasis from a field value.
fn clean_value(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .to_string()
}

/// Splits a generation reply into `Suggestion N:` blocks and extracts one
/// [`GiftSuggestion`] per usable block.
///
/// The parser is deliberately tolerant: markdown dressing, label casing,
/// bullet prefixes, and missing optional fields are absorbed. Blocks that
/// cannot yield a title are dropped with a warning rather than failing the
/// whole reply. Only a reply with no usable blocks at all is an error.
pub fn parse(
    text: &str,
    requested_count: u32,
) -> Result<(Vec<GiftSuggestion>, Vec<ParseWarning>), GiftError> {
    // Whitespace after the ordinal must stay on the header line: a bare
    // `Suggestion N:` header is titleless, not a header that owns the next
    // line. `\s` would cross the newline; `[ \t]` cannot.
    static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?mi)^\s*(?:#{1,6}\s*)?\*{0,2}\s*suggestion\s+(\d+)[ \t]*[:.)\-]?[ \t]*(.*)$")
            .expect("suggestion header regex should compile")
    });
    static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^\s*(?:[-*>]\s*)?(?:\*{1,2}|_{1,2})?\s*(title|why it fits|price range|where to find|difficulty|customization ideas|risk level)\s*(?:\*{1,2}|_{1,2})?\s*:\s*(?:\*{1,2}|_{1,2})?\s*(.*)$",
        )
        .expect("suggestion field regex should compile")
    });

    // Header positions delimit the blocks: each block runs from the end of
    // its header line to the start of the next header (or end of text).
    let mut headers: Vec<(usize, usize, Option<u32>, String)> = Vec::new();
    for caps in HEADER_RE.captures_iter(text) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let inline_title = caps
            .get(2)
            .map(|m| clean_value(m.as_str()))
            .unwrap_or_default();
        headers.push((whole.start(), whole.end(), number, inline_title));
    }

    if headers.is_empty() {
        return Err(GiftError::EmptyResponse);
    }

    let mut suggestions = Vec::new();
    let mut warnings = Vec::new();

    for (i, (_, body_start, number, inline_title)) in headers.iter().enumerate() {
        let body_end = headers.get(i + 1).map(|h| h.0).unwrap_or(text.len());
        let body = &text[*body_start..body_end];

        // First occurrence of a label wins; later lines that match no label
        // continue the current field's value.
        let mut fields: HashMap<String, String> = HashMap::new();
        let mut current: Option<String> = None;
        for line in body.lines() {
            if let Some(caps) = FIELD_RE.captures(line) {
                let key = match caps.get(1) {
                    Some(m) => m.as_str().to_lowercase(),
                    None => continue,
                };
                let value = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
                if fields.contains_key(&key) {
                    current = None;
                } else {
                    fields.insert(key.clone(), value);
                    current = Some(key);
                }
            } else if let Some(key) = &current {
                if !line.trim().is_empty() {
                    if let Some(value) = fields.get_mut(key) {
                        value.push('\n');
                        value.push_str(line);
                    }
                }
            }
        }

        let field =
            |name: &str| -> String { fields.get(name).map(|v| clean_value(v)).unwrap_or_default() };

        let title = {
            let from_field = field("title");
            if from_field.is_empty() {
                inline_title.clone()
            } else {
                from_field
            }
        };
        if title.is_empty() {
            warnings.push(ParseWarning {
                block: *number,
                reason: "block has no title".to_string(),
            });
            continue;
        }

        let difficulty_raw = field("difficulty");
        let difficulty = if difficulty_raw.is_empty() {
            Difficulty::default()
        } else {
            match Difficulty::parse(&difficulty_raw) {
                Some(d) => d,
                None => {
                    warnings.push(ParseWarning {
                        block: *number,
                        reason: format!(
                            "unrecognized difficulty '{}', using moderate",
                            truncate_str(&difficulty_raw, 40)
                        ),
                    });
                    Difficulty::default()
                }
            }
        };

        let risk_raw = field("risk level");
        let risk_level = if risk_raw.is_empty() {
            RiskLevel::default()
        } else {
            match RiskLevel::parse(&risk_raw) {
                Some(r) => r,
                None => {
                    warnings.push(ParseWarning {
                        block: *number,
                        reason: format!(
                            "unrecognized risk level '{}', using medium",
                            truncate_str(&risk_raw, 40)
                        ),
                    });
                    RiskLevel::default()
                }
            }
        };

        suggestions.push(GiftSuggestion {
            title,
            why_it_fits: field("why it fits"),
            price_range: field("price range"),
            where_to_find: field("where to find"),
            difficulty,
            customization_ideas: field("customization ideas"),
            risk_level,
        });
    }

    if suggestions.is_empty() {
        for warning in &warnings {
            warn!(
                block = ?warning.block,
                reason = %warning.reason,
                "Discarding unusable suggestion block"
            );
        }
        return Err(GiftError::EmptyResponse);
    }

    if suggestions.len() > requested_count as usize {
        debug!(
            parsed = suggestions.len(),
            requested = requested_count,
            "Truncating extra suggestions"
        );
        suggestions.truncate(requested_count as usize);
    }

    Ok((suggestions, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_block(n: u32, title: &str) -> String {
        format!(
            "Suggestion {n}: {title}\n\
             Title: {title}\n\
             Why It Fits: Fits interest {n}.\n\
             Price Range: $20-$40\n\
             Where to Find: Local market\n\
             Difficulty: Easy\n\
             Customization Ideas: Add a note.\n\
             Risk Level: Low\n\n"
        )
    }

    // ==== Well-formed replies ====

    #[test]
    fn well_formed_blocks_parse_cleanly() {
        let text = format!(
            "{}{}{}",
            full_block(1, "Star Map"),
            full_block(2, "Baking Class"),
            full_block(3, "Wool Socks")
        );
        let (suggestions, warnings) = parse(&text, 5).unwrap();

        assert_eq!(suggestions.len(), 3);
        assert!(warnings.is_empty());

        let first = &suggestions[0];
        assert_eq!(first.title, "Star Map");
        assert_eq!(first.why_it_fits, "Fits interest 1.");
        assert_eq!(first.price_range, "$20-$40");
        assert_eq!(first.where_to_find, "Local market");
        assert_eq!(first.difficulty, Difficulty::Easy);
        assert_eq!(first.customization_ideas, "Add a note.");
        assert_eq!(first.risk_level, RiskLevel::Low);
        assert_eq!(suggestions[2].title, "Wool Socks");
    }

    #[test]
    fn surplus_suggestions_are_truncated() {
        let text: String = (1..=5).map(|n| full_block(n, &format!("Gift {n}"))).collect();
        let (suggestions, warnings) = parse(&text, 3).unwrap();

        assert_eq!(suggestions.len(), 3);
        assert!(warnings.is_empty());
        assert_eq!(suggestions[2].title, "Gift 3");
    }

    // ==== Tolerance ====

    #[test]
    fn markdown_dressing_is_tolerated() {
        let text = "### **Suggestion 1: Star Map**\n\
                    - **Why It Fits:** They love astronomy.\n\
                    * **Price Range**: $50\n\
                    > _Difficulty_: Challenging\n";
        let (suggestions, warnings) = parse(text, 3).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(suggestions[0].title, "Star Map");
        assert_eq!(suggestions[0].why_it_fits, "They love astronomy.");
        assert_eq!(suggestions[0].price_range, "$50");
        assert_eq!(suggestions[0].difficulty, Difficulty::Challenging);
    }

    #[test]
    fn labels_are_case_insensitive() {
        let text = "SUGGESTION 1: Mug\n\
                    TITLE: Hand-thrown Mug\n\
                    price range: $30\n\
                    RISK LEVEL: high\n";
        let (suggestions, _) = parse(text, 1).unwrap();

        assert_eq!(suggestions[0].title, "Hand-thrown Mug");
        assert_eq!(suggestions[0].price_range, "$30");
        assert_eq!(suggestions[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn inline_title_used_when_title_field_missing() {
        let text = "Suggestion 1: Custom Star Map\n\
                    Why It Fits: They chart constellations.\n";
        let (suggestions, warnings) = parse(text, 1).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(suggestions[0].title, "Custom Star Map");
    }

    #[test]
    fn multi_line_values_are_joined() {
        let text = "Suggestion 1: Photo Album\n\
                    Customization Ideas: Engrave their initials.\n\
                    Add the adoption date inside the cover.\n\
                    Difficulty: Easy\n";
        let (suggestions, _) = parse(text, 1).unwrap();

        assert_eq!(
            suggestions[0].customization_ideas,
            "Engrave their initials.\nAdd the adoption date inside the cover."
        );
        assert_eq!(suggestions[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn duplicate_fields_keep_the_first() {
        let text = "Suggestion 1: Scarf\n\
                    Price Range: $25\n\
                    Price Range: $999\n";
        let (suggestions, _) = parse(text, 1).unwrap();

        assert_eq!(suggestions[0].price_range, "$25");
    }

    #[test]
    fn missing_optional_fields_default_silently() {
        let text = "Suggestion 1: Candle\n";
        let (suggestions, warnings) = parse(text, 1).unwrap();

        assert!(warnings.is_empty());
        let s = &suggestions[0];
        assert_eq!(s.why_it_fits, "");
        assert_eq!(s.price_range, "");
        assert_eq!(s.where_to_find, "");
        assert_eq!(s.customization_ideas, "");
        assert_eq!(s.difficulty, Difficulty::Moderate);
        assert_eq!(s.risk_level, RiskLevel::Medium);
    }

    // ==== Degradation and rejection ====

    #[test]
    fn titleless_block_is_dropped_with_warning() {
        let text = format!(
            "{}Suggestion 2:\nWhy It Fits: No title anywhere.\n\n{}",
            full_block(1, "Star Map"),
            full_block(3, "Wool Socks")
        );
        let (suggestions, warnings) = parse(&text, 5).unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].block, Some(2));
        assert!(warnings[0].reason.contains("no title"));
    }

    #[test]
    fn leading_titleless_block_does_not_displace_later_suggestions() {
        let text = format!(
            "Suggestion 1:\nWhy It Fits: Orphaned rationale.\n\n{}{}{}",
            full_block(2, "Star Map"),
            full_block(3, "Baking Class"),
            full_block(4, "Wool Socks")
        );
        let (suggestions, warnings) = parse(&text, 3).unwrap();

        let titles: Vec<&str> = suggestions.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Star Map", "Baking Class", "Wool Socks"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].block, Some(1));
    }

    #[test]
    fn unrecognized_enum_values_warn_and_fall_back() {
        let text = "Suggestion 1: Drone\n\
                    Difficulty: Very Hard\n\
                    Risk Level: Extreme\n";
        let (suggestions, warnings) = parse(text, 1).unwrap();

        assert_eq!(suggestions[0].difficulty, Difficulty::Moderate);
        assert_eq!(suggestions[0].risk_level, RiskLevel::Medium);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].reason.contains("Very Hard"));
        assert!(warnings[1].reason.contains("Extreme"));
    }

    #[test]
    fn empty_and_prose_only_replies_are_rejected() {
        assert!(matches!(parse("", 3), Err(GiftError::EmptyResponse)));
        assert!(matches!(
            parse("Here are some lovely ideas for you to consider!", 3),
            Err(GiftError::EmptyResponse)
        ));
    }

    #[test]
    fn all_blocks_unusable_is_rejected() {
        let text = "Suggestion 1:\nWhy It Fits: Nameless.\n\nSuggestion 2:\nPrice Range: $5\n";
        assert!(matches!(parse(text, 3), Err(GiftError::EmptyResponse)));
    }
}
