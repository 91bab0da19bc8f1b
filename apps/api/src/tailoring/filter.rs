//! Document Filter: rebuilds the résumé with only the selected entries.

use std::collections::HashSet;

use serde_yaml::Value;

use crate::models::resume::{is_languages_group, keyword_text, Category};
use crate::tailoring::scores::ScoredItem;

/// Returns a copy of `original` keeping only selected entries and skills.
///
/// Entry sections keep document order regardless of the order of
/// `selected_items`. A section with nothing selected becomes an empty list.
/// The `Languages` skill group and every unscored field pass through untouched.
pub fn build_filtered_document(
    original: &Value,
    selected_items: &[ScoredItem],
    selected_skills: &[ScoredItem],
) -> Value {
    let mut filtered = original.clone();

    for category in Category::ENTRY_SECTIONS {
        let keep: HashSet<usize> = selected_items
            .iter()
            .filter(|item| item.category == category)
            .map(|item| item.index)
            .collect();

        if let Some(Value::Sequence(entries)) = filtered.get_mut(category.key()) {
            *entries = std::mem::take(entries)
                .into_iter()
                .enumerate()
                .filter(|(index, _)| keep.contains(index))
                .map(|(_, entry)| entry)
                .collect();
        }
    }

    let skill_names: HashSet<&str> = selected_skills
        .iter()
        .filter_map(|skill| skill.name.as_deref())
        .collect();

    if let Some(Value::Sequence(groups)) = filtered.get_mut(Category::Skills.key()) {
        for group in groups.iter_mut().filter(|group| !is_languages_group(group)) {
            if let Some(Value::Sequence(keywords)) = group.get_mut("keywords") {
                keywords.retain(|keyword| {
                    keyword_text(keyword).is_some_and(|text| skill_names.contains(text.as_str()))
                });
            }
        }
    }

    filtered
}
