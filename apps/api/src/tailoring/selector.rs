//! Selection Engine: decides which scored résumé items survive tailoring.
//!
//! Pure and deterministic: no LLM calls, no I/O. The model only supplies
//! scores; every keep/drop decision is made here.
//!
//! Order of operations (changing it changes results under capacity pressure):
//! 1. Education is selected on its own, newest first.
//! 2. Remaining items are split at `min_score`.
//! 3. A minimum number of work items is promoted from below the threshold.
//! 4. The selection is padded up to `min_items`.
//! 5. The selection is capped at `max_items` with per-category proportions.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::models::resume::Category;
use crate::tailoring::scores::ScoredItem;

pub const DEFAULT_TOP_SKILLS: usize = 20;

/// End-date markers for education that is still in progress.
const ONGOING_MARKERS: &[&str] = &["present", "current", "ongoing"];
/// Keys probed, in order, for an education entry's end date.
const END_DATE_KEYS: &[&str] = &["endDate", "end_date", "end"];

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Tunables for one selection run. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    pub min_score: f64,
    pub min_items: usize,
    pub max_items: usize,
    /// Share of the capped selection reserved per category. Categories absent
    /// here only receive leftover slots.
    pub proportions: BTreeMap<Category, f64>,
    pub min_work_items: usize,
    pub max_education_items: usize,
    pub education_min_score: f64,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            min_score: 40.0,
            min_items: 10,
            max_items: 15,
            proportions: BTreeMap::from([
                (Category::Work, 0.65),
                (Category::Projects, 0.30),
                (Category::Certificates, 0.05),
            ]),
            min_work_items: 2,
            max_education_items: 5,
            education_min_score: 50.0,
        }
    }
}

/// Summary of one selection run. Scores are 0 when nothing was selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionMetrics {
    pub total_scored: usize,
    pub items_selected: usize,
    pub items_rejected: usize,
    pub min_score: f64,
    pub max_score: f64,
    pub average_score: f64,
    pub by_category: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub items: Vec<ScoredItem>,
    pub metrics: SelectionMetrics,
}

// ────────────────────────────────────────────────────────────────────────────
// Selection algorithm
// ────────────────────────────────────────────────────────────────────────────

/// Selects which non-skill items to keep. Skill items in `items` are ignored;
/// see `top_skills`.
pub fn select(items: &[ScoredItem], options: &SelectionOptions) -> SelectionOutcome {
    let mut education = Vec::new();
    let mut other = Vec::new();
    for item in items {
        match item.category {
            Category::Education => education.push(item.clone()),
            Category::Work | Category::Projects | Category::Certificates => {
                other.push(item.clone())
            }
            Category::Skills => {}
        }
    }
    let total_scored = education.len() + other.len();

    let education = select_education(education, options);

    sort_by_score_desc(&mut other);
    let (mut above, mut below): (Vec<_>, Vec<_>) = other
        .into_iter()
        .partition(|item| item.score >= options.min_score);
    debug!(
        "{} items at or above score {}, {} below",
        above.len(),
        options.min_score,
        below.len()
    );

    enforce_work_floor(&mut above, &mut below, options.min_work_items);

    let target_min = options.min_items.saturating_sub(education.len());
    if above.len() < target_min {
        let padding = (target_min - above.len()).min(below.len());
        info!(
            "Padding selection with {} below-threshold items (target minimum {})",
            padding, target_min
        );
        above.extend(below.drain(..padding));
    }

    let target_max = options.max_items.saturating_sub(education.len());
    if above.len() > target_max {
        info!(
            "Capping selection from {} to {} items by category proportion",
            above.len(),
            target_max
        );
        above = allocate_by_proportion(above, target_max, options);
    }

    let mut selected = above;
    selected.extend(education);

    let metrics = compute_metrics(&selected, total_scored);
    info!(
        "Selected {}/{} items (avg score {:.1})",
        metrics.items_selected, metrics.total_scored, metrics.average_score
    );

    SelectionOutcome {
        items: selected,
        metrics,
    }
}

/// The `limit` highest-scored skill items, best first.
pub fn top_skills(items: &[ScoredItem], limit: usize) -> Vec<ScoredItem> {
    let mut skills: Vec<ScoredItem> = items
        .iter()
        .filter(|item| item.category == Category::Skills)
        .cloned()
        .collect();
    sort_by_score_desc(&mut skills);
    skills.truncate(limit);
    skills
}

/// Walks education newest-first. Items below `education_min_score` are skipped
/// until something has been accepted, after which the first one ends the walk.
/// Never returns empty when education exists.
fn select_education(mut education: Vec<ScoredItem>, options: &SelectionOptions) -> Vec<ScoredItem> {
    if education.is_empty() {
        return education;
    }
    order_education(&mut education);

    let mut selected: Vec<ScoredItem> = Vec::new();
    for item in &education {
        if selected.len() >= options.max_education_items {
            break;
        }
        if item.score < options.education_min_score {
            if selected.is_empty() {
                continue;
            }
            break;
        }
        selected.push(item.clone());
    }

    if selected.is_empty() {
        let best = education
            .into_iter()
            .reduce(|best, item| if item.score > best.score { item } else { best });
        if let Some(best) = best {
            warn!(
                "All education below score {}; keeping highest-scored entry ({})",
                options.education_min_score, best.score
            );
            selected.push(best);
        }
    }

    selected
}

/// Newest end date first, in-progress first of all. Falls back to descending
/// score when any end date cannot be read.
fn order_education(education: &mut [ScoredItem]) {
    let end_dates: Result<Vec<NaiveDate>, String> = education
        .iter()
        .map(|item| education_end_date(&item.original_data))
        .collect();

    match end_dates {
        Ok(dates) => {
            let mut keyed: Vec<(NaiveDate, ScoredItem)> =
                dates.into_iter().zip(education.iter().cloned()).collect();
            keyed.sort_by(|(a, _), (b, _)| b.cmp(a));
            for (slot, (_, item)) in education.iter_mut().zip(keyed) {
                *slot = item;
            }
        }
        Err(unparsed) => {
            warn!(
                "Could not read education end date {:?}; ordering education by score",
                unparsed
            );
            sort_by_score_desc(education);
        }
    }
}

/// End date of an education entry. Missing or in-progress entries are far future.
fn education_end_date(entry: &Value) -> Result<NaiveDate, String> {
    let raw = END_DATE_KEYS.iter().find_map(|key| entry.get(*key));

    match raw {
        None | Some(Value::Null) => Ok(NaiveDate::MAX),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|year| i32::try_from(year).ok())
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .ok_or_else(|| n.to_string()),
        Some(Value::String(s)) => parse_end_date(s),
        Some(other) => Err(format!("{other:?}")),
    }
}

fn parse_end_date(text: &str) -> Result<NaiveDate, String> {
    let text = text.trim();
    if text.is_empty() || ONGOING_MARKERS.contains(&text.to_lowercase().as_str()) {
        return Ok(NaiveDate::MAX);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d") {
        return Ok(date);
    }
    if text.len() == 4 {
        if let Some(date) = text
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        {
            return Ok(date);
        }
    }
    // "Jun 2021" / "June 2021"
    NaiveDate::parse_from_str(&format!("1 {text}"), "%d %B %Y").map_err(|_| text.to_string())
}

/// Promotes the best below-threshold work items until `min_work_items` are
/// selected. A résumé with too few work items overall is accepted as is.
fn enforce_work_floor(above: &mut Vec<ScoredItem>, below: &mut Vec<ScoredItem>, min_work_items: usize) {
    let work_above = above.iter().filter(|item| is_work(item)).count();
    if work_above >= min_work_items {
        return;
    }

    let work_below = below.iter().filter(|item| is_work(item)).count();
    if work_above + work_below < min_work_items {
        warn!(
            "Only {} work items exist; minimum of {} cannot be met",
            work_above + work_below,
            min_work_items
        );
        return;
    }

    let mut needed = min_work_items - work_above;
    info!("Promoting {} below-threshold work items", needed);

    // `below` is sorted by score, so the first work items are the best ones.
    let mut remaining = Vec::with_capacity(below.len());
    for item in below.drain(..) {
        if needed > 0 && is_work(&item) {
            above.push(item);
            needed -= 1;
        } else {
            remaining.push(item);
        }
    }
    *below = remaining;
    sort_by_score_desc(above);
}

fn is_work(item: &ScoredItem) -> bool {
    item.category == Category::Work
}

/// Next unallocated item of one category, ordered by score. Equal scores go
/// to the category declared first.
#[derive(Debug)]
struct Candidate {
    score: f64,
    category: Category,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.category.cmp(&self.category))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Trims `pool` to `target_max` items. Each category first gets
/// `floor(target_max × proportion)` slots (work never less than
/// `min_work_items`), then leftover slots go one at a time to the best
/// remaining item across categories.
fn allocate_by_proportion(
    pool: Vec<ScoredItem>,
    target_max: usize,
    options: &SelectionOptions,
) -> Vec<ScoredItem> {
    let mut groups: BTreeMap<Category, Vec<ScoredItem>> = BTreeMap::new();
    for item in pool {
        groups.entry(item.category).or_default().push(item);
    }
    for group in groups.values_mut() {
        sort_by_score_desc(group);
    }

    let mut taken: BTreeMap<Category, usize> = BTreeMap::new();
    let mut allocated = 0usize;
    for (&category, group) in &groups {
        let proportion = options.proportions.get(&category).copied().unwrap_or(0.0);
        let mut quota = (target_max as f64 * proportion).floor() as usize;
        if category == Category::Work {
            quota = quota.max(options.min_work_items);
        }
        let quota = quota.min(group.len()).min(target_max - allocated);
        taken.insert(category, quota);
        allocated += quota;
    }

    let mut frontier: BinaryHeap<Candidate> = groups
        .iter()
        .filter_map(|(&category, group)| {
            group.get(taken[&category]).map(|item| Candidate {
                score: item.score,
                category,
            })
        })
        .collect();

    while allocated < target_max {
        let Some(best) = frontier.pop() else {
            break;
        };
        let count = taken.entry(best.category).or_default();
        *count += 1;
        allocated += 1;
        if let Some(next) = groups[&best.category].get(*count) {
            frontier.push(Candidate {
                score: next.score,
                category: best.category,
            });
        }
    }

    debug!("Slots per category after capping: {:?}", taken);

    let mut selected: Vec<ScoredItem> = groups
        .into_iter()
        .flat_map(|(category, group)| {
            let count = taken.get(&category).copied().unwrap_or(0);
            group.into_iter().take(count)
        })
        .collect();
    sort_by_score_desc(&mut selected);
    selected
}

fn compute_metrics(selected: &[ScoredItem], total_scored: usize) -> SelectionMetrics {
    let mut by_category = BTreeMap::new();
    for item in selected {
        *by_category.entry(item.category).or_insert(0) += 1;
    }

    let (min_score, max_score, average_score) = if selected.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let scores = selected.iter().map(|item| item.score);
        let min = scores.clone().fold(f64::INFINITY, f64::min);
        let max = scores.clone().fold(f64::NEG_INFINITY, f64::max);
        let average = scores.sum::<f64>() / selected.len() as f64;
        (min, max, average)
    };

    SelectionMetrics {
        total_scored,
        items_selected: selected.len(),
        items_rejected: total_scored.saturating_sub(selected.len()),
        min_score,
        max_score,
        average_score,
        by_category,
    }
}

fn sort_by_score_desc(items: &mut [ScoredItem]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
