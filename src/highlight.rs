use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use crate::config::themes::ThemeName;

const RESET: &str = "\x1b[0m";

/// Marks search hits in CLI output. The whole trimmed phrase is one needle,
/// the same one the list predicate matches on.
#[derive(Debug, Clone)]
pub struct Highlighter {
    regex: Option<Regex>,
    open: &'static str,
}

impl Highlighter {
    pub fn new(search: &str, theme: ThemeName, colored: bool) -> Self {
        let phrase = search.trim();
        let regex = if colored && !phrase.is_empty() {
            build_highlight_regex(&[phrase.to_string()])
        } else {
            None
        };
        let open = match theme {
            ThemeName::Light => "\x1b[1;34m",
            ThemeName::Dark => "\x1b[1;33m",
        };
        Self { regex, open }
    }

    pub fn apply(&self, text: &str) -> String {
        let Some(regex) = &self.regex else {
            return text.to_string();
        };
        regex
            .replace_all(text, |caps: &regex::Captures<'_>| {
                format!("{}{}{RESET}", self.open, &caps[0])
            })
            .into_owned()
    }
}

pub fn build_highlight_regex(tokens: &[String]) -> Option<Regex> {
    if tokens.is_empty() {
        return None;
    }
    let mut unique = Vec::new();
    let mut seen = HashSet::new();
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let lowered = token.to_lowercase();
        if seen.insert(lowered) {
            unique.push(token.clone());
        }
    }
    if unique.is_empty() {
        return None;
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = unique
        .into_iter()
        .map(|token| regex::escape(&token))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_longer_tokens_first() {
        let regex = build_highlight_regex(&["学习".into(), "学习react".into()]).expect("regex");
        let matches: Vec<_> = regex.find_iter("学习React笔记").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["学习React"]);
    }

    #[test]
    fn deduplicates_case_insensitive_tokens() {
        let regex =
            build_highlight_regex(&["React".into(), "react".into(), "REACT".into()]).expect("regex");
        let matches: Vec<_> = regex.find_iter("react").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["react"]);
    }

    #[test]
    fn wraps_hits_and_keeps_original_casing() {
        let highlighter = Highlighter::new("react", ThemeName::Dark, true);
        assert_eq!(
            highlighter.apply("学习React笔记"),
            "学习\x1b[1;33mReact\x1b[0m笔记"
        );
    }

    #[test]
    fn phrase_is_highlighted_as_a_whole() {
        let highlighter = Highlighter::new(" react 笔记 ", ThemeName::Light, true);
        assert_eq!(highlighter.apply("学习React笔记"), "学习React笔记");
        assert_eq!(
            highlighter.apply("React 笔记整理"),
            "\x1b[1;34mReact 笔记\x1b[0m整理"
        );
    }

    #[test]
    fn plain_output_is_untouched() {
        let highlighter = Highlighter::new("react", ThemeName::Light, false);
        assert_eq!(highlighter.apply("学习React笔记"), "学习React笔记");
        let empty = Highlighter::new("   ", ThemeName::Light, true);
        assert_eq!(empty.apply("anything"), "anything");
    }
}
