//! Score Document Parser and Item Materializer.
//!
//! The model returns one relevance score per résumé entry, keyed by section and
//! by the entry's position in that section. `parse_scores` validates the whole
//! document (all-or-nothing), `materialize` binds each score back to the entry
//! it describes (per-item, out-of-range references are skipped).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::warn;

use crate::llm_client::strip_code_fences;
use crate::models::resume::{
    keyword_text, scorable_skill_keywords, section_entries, Category,
};

pub const DEFAULT_REASONING: &str = "No reasoning provided";

#[derive(Debug, Error)]
pub enum ScoreParseError {
    #[error("Malformed score document: {0}")]
    MalformedScoreDocument(String),
}

/// One score as reported by the model, before it is bound to a résumé entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScoreEntry {
    /// Kept as reported so that negative or fractional references survive
    /// parsing and are rejected per-item by the materializer.
    pub index: f64,
    pub score: f64,
    pub reasoning: Option<String>,
    pub name: Option<String>,
}

/// Score document with every category present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawScores {
    pub categories: BTreeMap<Category, Vec<RawScoreEntry>>,
}

impl RawScores {
    pub fn entries(&self, category: Category) -> &[RawScoreEntry] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A résumé entry annotated with the model's relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub category: Category,
    pub index: usize,
    pub score: f64,
    pub reasoning: String,
    /// Snapshot of the source entry. Skills wrap the keyword as `{value: ...}`.
    pub original_data: Value,
    /// Keyword text, only for skills.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Parses the model's raw score text.
///
/// Missing categories default to empty lists (logged). Any item without a
/// numeric `index` or `score` fails the whole document.
pub fn parse_scores(raw_text: &str) -> Result<RawScores, ScoreParseError> {
    let body = strip_code_fences(raw_text);
    let document: JsonValue = serde_json::from_str(body)
        .map_err(|e| ScoreParseError::MalformedScoreDocument(format!("invalid JSON: {e}")))?;

    let object = document.as_object().ok_or_else(|| {
        ScoreParseError::MalformedScoreDocument("expected a JSON object".to_string())
    })?;

    let mut categories = BTreeMap::new();
    let mut missing = Vec::new();

    for category in Category::ALL {
        let Some(items) = object.get(category.key()) else {
            missing.push(category.key());
            categories.insert(category, Vec::new());
            continue;
        };

        let items = items.as_array().ok_or_else(|| {
            ScoreParseError::MalformedScoreDocument(format!(
                "'{category}' must be an array"
            ))
        })?;

        let entries = items
            .iter()
            .enumerate()
            .map(|(position, item)| parse_entry(category, position, item))
            .collect::<Result<Vec<_>, _>>()?;

        categories.insert(category, entries);
    }

    if !missing.is_empty() {
        warn!(
            "Score document missing categories {:?}; defaulted to empty",
            missing
        );
    }

    Ok(RawScores { categories })
}

fn parse_entry(
    category: Category,
    position: usize,
    item: &JsonValue,
) -> Result<RawScoreEntry, ScoreParseError> {
    let malformed = |field: &str| {
        ScoreParseError::MalformedScoreDocument(format!(
            "{category}[{position}] has no numeric '{field}'"
        ))
    };

    let index = item
        .get("index")
        .and_then(JsonValue::as_f64)
        .ok_or_else(|| malformed("index"))?;

    let score = item
        .get("score")
        .and_then(JsonValue::as_f64)
        .ok_or_else(|| malformed("score"))?;

    Ok(RawScoreEntry {
        index,
        score,
        reasoning: item
            .get("reasoning")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        name: item.get("name").and_then(JsonValue::as_str).map(str::to_string),
    })
}

/// Binds every raw score to the résumé entry it refers to.
pub fn materialize(scores: &RawScores, document: &Value) -> Vec<ScoredItem> {
    let skill_keywords = scorable_skill_keywords(document);
    let mut items = Vec::new();

    for category in Category::ALL {
        let originals: Vec<&Value> = match category {
            Category::Skills => skill_keywords.clone(),
            Category::Work
            | Category::Projects
            | Category::Education
            | Category::Certificates => section_entries(document, category).iter().collect(),
        };

        for raw in scores.entries(category) {
            let Some(original) = position(raw.index)
                .and_then(|i| originals.get(i).map(|original| (i, *original)))
            else {
                warn!(
                    "Skipping {category} score with out-of-range index {} (section has {} items)",
                    raw.index,
                    originals.len()
                );
                continue;
            };
            let (index, original) = original;

            let reasoning = raw
                .reasoning
                .clone()
                .unwrap_or_else(|| DEFAULT_REASONING.to_string());

            let item = match category {
                Category::Skills => {
                    let mut wrapper = Mapping::new();
                    wrapper.insert(Value::from("value"), original.clone());
                    ScoredItem {
                        category,
                        index,
                        score: raw.score,
                        reasoning,
                        original_data: Value::Mapping(wrapper),
                        name: keyword_text(original).or_else(|| raw.name.clone()),
                    }
                }
                Category::Work
                | Category::Projects
                | Category::Education
                | Category::Certificates => ScoredItem {
                    category,
                    index,
                    score: raw.score,
                    reasoning,
                    original_data: original.clone(),
                    name: None,
                },
            };
            items.push(item);
        }
    }

    items
}

/// A reported index refers to an entry only when it is a non-negative whole number.
fn position(index: f64) -> Option<usize> {
    if index.fract() != 0.0 || index < 0.0 || index > usize::MAX as f64 {
        return None;
    }
    Some(index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = r#"
work:
  - name: Acme
    position: Engineer
  - name: Globex
    position: Lead
projects:
  - name: tailor
education:
  - institution: MIT
skills:
  - name: Languages
    keywords: [English]
  - name: Backend
    keywords: [Rust, Postgres]
  - name: Cloud
    keywords: [AWS]
"#;

    fn resume() -> Value {
        serde_yaml::from_str(RESUME).unwrap()
    }

    #[test]
    fn test_fenced_document_missing_categories_defaults_to_empty() {
        let raw = "```json\n{\"work\":[{\"index\":0,\"score\":80}]}\n```";
        let scores = parse_scores(raw).unwrap();

        assert_eq!(scores.entries(Category::Work).len(), 1);
        assert_eq!(scores.entries(Category::Work)[0].score, 80.0);
        for category in [
            Category::Projects,
            Category::Education,
            Category::Certificates,
            Category::Skills,
        ] {
            assert!(
                scores.categories.contains_key(&category),
                "{category} key must exist after parsing"
            );
            assert!(scores.entries(category).is_empty());
        }
    }

    #[test]
    fn test_missing_score_fails_whole_document() {
        let raw = r#"{"work":[{"index":0,"score":80},{"index":1}]}"#;
        let err = parse_scores(raw).unwrap_err();
        assert!(err.to_string().contains("score"), "got: {err}");
    }

    #[test]
    fn test_non_numeric_index_fails_whole_document() {
        let raw = r#"{"projects":[{"index":"zero","score":80}]}"#;
        assert!(parse_scores(raw).is_err());
    }

    #[test]
    fn test_non_object_document_fails() {
        assert!(parse_scores("[1, 2, 3]").is_err());
        assert!(parse_scores("the model rambled instead").is_err());
    }

    #[test]
    fn test_category_must_be_array() {
        assert!(parse_scores(r#"{"work": {"index": 0, "score": 1}}"#).is_err());
    }

    #[test]
    fn test_optional_fields_and_integral_float_index() {
        let raw = r#"{"skills":[{"index":1.0,"score":72.5,"reasoning":"core","name":"Postgres"}]}"#;
        let scores = parse_scores(raw).unwrap();
        let entry = &scores.entries(Category::Skills)[0];
        assert_eq!(entry.index, 1.0);
        assert_eq!(entry.reasoning.as_deref(), Some("core"));
        assert_eq!(entry.name.as_deref(), Some("Postgres"));
    }

    #[test]
    fn test_materialize_binds_entries_and_skips_out_of_range() {
        let raw = r#"{
            "work": [{"index": 1, "score": 90}, {"index": 5, "score": 99}, {"index": -1, "score": 99}],
            "education": [{"index": 0, "score": 60, "reasoning": "relevant degree"}]
        }"#;
        let items = materialize(&parse_scores(raw).unwrap(), &resume());

        assert_eq!(items.len(), 2, "out-of-range indices must be dropped");
        let work = &items[0];
        assert_eq!(work.category, Category::Work);
        assert_eq!(work.index, 1);
        assert_eq!(work.original_data["name"], Value::from("Globex"));
        assert_eq!(work.reasoning, DEFAULT_REASONING);
        assert!(work.name.is_none());
        assert_eq!(items[1].reasoning, "relevant degree");
    }

    #[test]
    fn test_fractional_index_is_skipped_without_losing_siblings() {
        let raw = r#"{"work":[{"index":0,"score":90},{"index":1.5,"score":80}]}"#;
        let scores = parse_scores(raw).expect("a fractional index must not fail the document");
        assert_eq!(scores.entries(Category::Work).len(), 2);

        let items = materialize(&scores, &resume());
        assert_eq!(items.len(), 1, "only the whole-number index binds to an entry");
        assert_eq!(items[0].index, 0);
        assert_eq!(items[0].original_data["name"], Value::from("Acme"));
    }

    #[test]
    fn test_materialize_skills_index_into_flattened_keywords() {
        // Flattened scorable keywords: [Rust, Postgres, AWS]; Languages is excluded.
        let raw = r#"{"skills": [{"index": 2, "score": 70}, {"index": 3, "score": 70}]}"#;
        let items = materialize(&parse_scores(raw).unwrap(), &resume());

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name.as_deref(), Some("AWS"));
        assert_eq!(items[0].original_data["value"], Value::from("AWS"));
    }
}
