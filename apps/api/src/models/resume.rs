//! Résumé document model.
//!
//! The document is kept as an untyped `serde_yaml::Value` so fields the tailor
//! does not know about survive a filter pass unchanged. Only the five scored
//! sections are given typed access here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Skill group that is never scored or filtered.
pub const LANGUAGES_GROUP: &str = "Languages";

/// Résumé section eligible for relevance scoring.
///
/// Declaration order is significant: it is the tie-break order used when two
/// sections compete for the same slot during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Projects,
    Education,
    Certificates,
    Skills,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Projects,
        Category::Education,
        Category::Certificates,
        Category::Skills,
    ];

    /// Sections whose top-level entries are kept or dropped whole.
    pub const ENTRY_SECTIONS: [Category; 4] = [
        Category::Work,
        Category::Projects,
        Category::Education,
        Category::Certificates,
    ];

    /// Key of this section in both the résumé document and the score document.
    pub fn key(self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Projects => "projects",
            Category::Education => "education",
            Category::Certificates => "certificates",
            Category::Skills => "skills",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Top-level entries of a section, or an empty slice when the key is absent
/// or not a list.
pub fn section_entries(document: &Value, category: Category) -> &[Value] {
    document
        .get(category.key())
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// True for the skill group that is exempt from scoring and filtering.
pub fn is_languages_group(group: &Value) -> bool {
    group.get("name").and_then(Value::as_str) == Some(LANGUAGES_GROUP)
}

/// Every keyword of every skill group except `Languages`, in document order.
///
/// Indices in the score document's `skills` list refer to this flattened list.
pub fn scorable_skill_keywords(document: &Value) -> Vec<&Value> {
    section_entries(document, Category::Skills)
        .iter()
        .filter(|group| !is_languages_group(group))
        .filter_map(|group| group.get("keywords").and_then(Value::as_sequence))
        .flatten()
        .collect()
}

/// Text of a skill keyword. Scalars are rendered; nested values have no text.
pub fn keyword_text(keyword: &Value) -> Option<String> {
    match keyword {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
