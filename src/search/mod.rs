use std::cmp::{max, min};
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumString};
use time::{Duration, PrimitiveDateTime};

use crate::error::{EngineError, EngineResult};
use crate::model::temporal::parse_date;
use crate::model::Priority;

mod predicate;

pub use predicate::Predicate;

/// Half-open range over a record's date key: `from` inclusive, `to` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RangeFilter {
    pub from: Option<PrimitiveDateTime>,
    pub to: Option<PrimitiveDateTime>,
}

impl RangeFilter {
    pub fn has_range(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    pub fn contains(&self, at: PrimitiveDateTime) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }

    /// Narrows this range to its intersection with `other`.
    pub fn merge(&mut self, other: RangeFilter) {
        if let Some(from) = other.from {
            self.from = Some(match self.from {
                Some(existing) => max(existing, from),
                None => from,
            });
        }
        if let Some(to) = other.to {
            self.to = Some(match self.to {
                Some(existing) => min(existing, to),
                None => to,
            });
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum TimeWindow {
    #[default]
    All,
    Upcoming,
    Past,
    Completed,
}

/// Categorical narrowing applied on top of the free-text search.
///
/// Dimensions combine with AND; several values inside one dimension combine
/// with OR. An empty dimension places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Filters {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub statuses: Vec<String>,
    pub priorities: Vec<Priority>,
    pub favorite: Option<bool>,
    pub window: TimeWindow,
    pub date: RangeFilter,
}

impl Filters {
    pub fn has_filters(&self) -> bool {
        !self.categories.is_empty()
            || !self.tags.is_empty()
            || !self.statuses.is_empty()
            || !self.priorities.is_empty()
            || self.favorite.is_some()
            || self.window != TimeWindow::All
            || self.date.has_range()
    }

    pub fn category(mut self, name: impl Into<String>) -> Self {
        self.categories.push(name.into());
        self
    }

    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(name.into());
        self
    }

    pub fn status(mut self, label: impl Into<String>) -> Self {
        self.statuses.push(label.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priorities.push(priority);
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    /// Short labels for the active filters, in a stable order.
    pub fn chips(&self) -> Vec<String> {
        let mut chips = Vec::new();
        chips.extend(self.categories.iter().map(|c| format!("category:{c}")));
        chips.extend(self.tags.iter().map(|t| format!("tag:{t}")));
        chips.extend(self.statuses.iter().map(|s| format!("status:{s}")));
        chips.extend(self.priorities.iter().map(|p| format!("priority:{p}")));
        if let Some(favorite) = self.favorite {
            chips.push(format!("favorite:{}", if favorite { "yes" } else { "no" }));
        }
        if self.window != TimeWindow::All {
            chips.push(format!("window:{}", self.window));
        }
        if self.date.has_range() {
            chips.push("date-range".to_string());
        }
        chips
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub text: String,
    pub filters: Filters,
}

/// Splits a one-line query into search text and filters.
///
/// Recognised prefixes: `category:`, `tag:`, `status:`, `priority:`,
/// `favorite:`, `window:` and `date:` (a day or a `from..to` span of days,
/// either end optional). Everything else is search text. Whitespace between
/// neighbouring text words is kept as typed; words separated by a filter are
/// joined with one space.
pub fn parse_query(input: &str) -> EngineResult<ParsedQuery> {
    let mut query = ParsedQuery::default();
    let mut text = String::new();
    let mut previous_end: Option<usize> = None;
    for raw in input.split_whitespace() {
        let start = raw.as_ptr() as usize - input.as_ptr() as usize;
        if apply_filter(&mut query.filters, raw)? {
            previous_end = None;
            continue;
        }
        match previous_end {
            Some(end) => text.push_str(&input[end..start]),
            None if !text.is_empty() => text.push(' '),
            None => {}
        }
        text.push_str(raw);
        previous_end = Some(start + raw.len());
    }
    query.text = text;
    Ok(query)
}

/// Folds a `prefix:value` token into `filters`. Returns false for plain words.
fn apply_filter(filters: &mut Filters, raw: &str) -> EngineResult<bool> {
    let Some((prefix, value)) = raw.split_once(':') else {
        return Ok(false);
    };
    match prefix.to_ascii_lowercase().as_str() {
        "category" => filters.categories.push(require_value(prefix, value)?),
        "tag" => filters.tags.push(require_value(prefix, value)?),
        "status" => filters.statuses.push(require_value(prefix, value)?),
        "priority" => {
            let priority = Priority::from_str(value)
                .map_err(|_| EngineError::validation(format!("unknown priority {value:?}")))?;
            filters.priorities.push(priority);
        }
        "favorite" => filters.favorite = Some(parse_flag(value)?),
        "window" => {
            filters.window = TimeWindow::from_str(value)
                .map_err(|_| EngineError::validation(format!("unknown time window {value:?}")))?;
        }
        "date" => filters.date.merge(parse_date_range(value)?),
        _ => return Ok(false),
    }
    Ok(true)
}

fn require_value(prefix: &str, value: &str) -> EngineResult<String> {
    if value.is_empty() {
        return Err(EngineError::validation(format!("{prefix}: needs a value")));
    }
    Ok(value.to_string())
}

fn parse_flag(value: &str) -> EngineResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(EngineError::validation(format!(
            "favorite: expects yes or no, got {value:?}"
        ))),
    }
}

fn parse_date_range(spec: &str) -> EngineResult<RangeFilter> {
    let mut range = RangeFilter::default();
    let parts: Vec<&str> = spec.split("..").collect();
    match parts.as_slice() {
        [single] => {
            let (from, to) = day_bounds(single)?;
            range.from = Some(from);
            range.to = Some(to);
        }
        [from, to] => {
            if !from.is_empty() {
                range.from = Some(day_bounds(from)?.0);
            }
            if !to.is_empty() {
                range.to = Some(day_bounds(to)?.1);
            }
        }
        _ => {
            return Err(EngineError::validation(format!(
                "date: expects YYYY-MM-DD or FROM..TO, got {spec:?}"
            )))
        }
    }
    Ok(range)
}

fn day_bounds(raw: &str) -> EngineResult<(PrimitiveDateTime, PrimitiveDateTime)> {
    let date = parse_date("date", raw)
        .map_err(|_| EngineError::validation(format!("date: cannot parse {raw:?}")))?;
    let start = date.midnight();
    let end = start
        .checked_add(Duration::days(1))
        .ok_or_else(|| EngineError::validation(format!("date: {raw:?} is out of range")))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    #[test]
    fn splits_text_from_prefixed_filters() -> EngineResult<()> {
        let parsed = parse_query("学习 category:工作 status:pending priority:high React")?;
        assert_eq!(parsed.text, "学习 React");
        assert_eq!(parsed.filters.categories, vec!["工作".to_string()]);
        assert_eq!(parsed.filters.statuses, vec!["pending".to_string()]);
        assert_eq!(parsed.filters.priorities, vec![Priority::High]);
        Ok(())
    }

    #[test]
    fn repeated_prefixes_accumulate_within_a_dimension() -> EngineResult<()> {
        let parsed = parse_query("category:工作 category:学习 favorite:yes window:past")?;
        assert_eq!(parsed.filters.categories.len(), 2);
        assert_eq!(parsed.filters.favorite, Some(true));
        assert_eq!(parsed.filters.window, TimeWindow::Past);
        assert!(parsed.text.is_empty());
        Ok(())
    }

    #[test]
    fn date_ranges_are_half_open_days() -> EngineResult<()> {
        let parsed = parse_query("date:2025-12-01..2025-12-05")?;
        let range = parsed.filters.date;
        assert_eq!(range.from, Some(datetime!(2025-12-01 0:00)));
        assert_eq!(range.to, Some(datetime!(2025-12-06 0:00)));
        assert!(range.contains(datetime!(2025-12-05 23:59)));
        assert!(!range.contains(datetime!(2025-12-06 0:00)));

        let open = parse_query("date:..2025-12-05")?.filters.date;
        assert_eq!(open.from, None);
        Ok(())
    }

    #[test]
    fn merged_ranges_intersect() -> EngineResult<()> {
        let parsed = parse_query("date:2025-12-01..2025-12-31 date:2025-12-10..")?;
        assert_eq!(parsed.filters.date.from, Some(datetime!(2025-12-10 0:00)));
        assert_eq!(parsed.filters.date.to, Some(datetime!(2026-01-01 0:00)));
        Ok(())
    }

    #[test]
    fn bad_filter_values_are_rejected() {
        assert_matches!(parse_query("priority:urgent"), Err(EngineError::Validation { .. }));
        assert_matches!(parse_query("window:soon"), Err(EngineError::Validation { .. }));
        assert_matches!(parse_query("date:yesterday"), Err(EngineError::Validation { .. }));
        assert_matches!(parse_query("favorite:maybe"), Err(EngineError::Validation { .. }));
        assert_matches!(parse_query("category:"), Err(EngineError::Validation { .. }));
    }

    #[test]
    fn inner_whitespace_of_the_phrase_is_kept() -> EngineResult<()> {
        assert_eq!(parse_query("  a  b  ")?.text, "a  b");
        assert_eq!(parse_query("a\tb category:工作 c")?.text, "a\tb c");
        assert_eq!(parse_query("category:工作")?.text, "");
        Ok(())
    }

    #[test]
    fn unknown_prefixes_stay_in_the_text() -> EngineResult<()> {
        let parsed = parse_query("https://github.com tips")?;
        assert_eq!(parsed.text, "https://github.com tips");
        assert!(!parsed.filters.has_filters());
        Ok(())
    }

    #[test]
    fn chips_describe_active_filters() {
        let filters = Filters::default()
            .category("工作")
            .priority(Priority::Low)
            .window(TimeWindow::Upcoming);
        assert_eq!(
            filters.chips(),
            vec!["category:工作", "priority:low", "window:upcoming"]
        );
    }
}
