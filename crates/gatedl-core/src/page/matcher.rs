//! First-match extraction from a page body.

use regex::Regex;
use std::collections::BTreeMap;

/// Result of searching a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMatch {
    /// Whole text of the first match.
    pub full: String,
    /// Last capture group to close in the match, or the whole match without groups.
    pub value: String,
    /// Named groups; `None` when the group did not participate.
    pub groups: BTreeMap<String, Option<String>>,
}

impl PageMatch {
    /// Reported values: named groups, plus `key` → `value` unless a named group already claims `key`.
    pub fn output_values(&self, key: &str) -> BTreeMap<String, Option<String>> {
        let mut out = self.groups.clone();
        out.entry(key.to_string())
            .or_insert_with(|| Some(self.value.clone()));
        out
    }
}

/// Search `body` for the first occurrence of `re`.
pub fn first_match(re: &Regex, body: &str) -> Option<PageMatch> {
    let caps = re.captures(body)?;
    let full = caps.get(0)?.as_str().to_string();

    // Group that closed last. Groups ending at the same offset close in the
    // order their `)` appears in the pattern.
    let close_order = group_close_order(re.as_str(), caps.len());
    let value = caps
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, m)| m.map(|m| (i, m)))
        .max_by(|(ia, a), (ib, b)| {
            a.end()
                .cmp(&b.end())
                .then(close_order[*ia].cmp(&close_order[*ib]))
        })
        .map(|(_, m)| m.as_str().to_string())
        .unwrap_or_else(|| full.clone());

    let groups = re
        .capture_names()
        .flatten()
        .map(|name| {
            (
                name.to_string(),
                caps.name(name).map(|m| m.as_str().to_string()),
            )
        })
        .collect();

    Some(PageMatch {
        full,
        value,
        groups,
    })
}

/// Rank of each capture group's closing parenthesis in `pattern`, indexed by
/// group number. Falls back to group order if the scan disagrees with `groups`.
fn group_close_order(pattern: &str, groups: usize) -> Vec<usize> {
    let fallback = || (0..groups).collect::<Vec<_>>();
    let mut order = vec![0; groups];
    let mut open: Vec<Option<usize>> = Vec::new();
    let mut next_group = 1;
    let mut closed = 0;
    let mut class_depth = 0usize;
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => {
                class_depth += 1;
                if chars.peek() == Some(&'^') {
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                }
            }
            ']' if class_depth > 0 => class_depth -= 1,
            _ if class_depth > 0 => {}
            '(' => {
                let capturing = if chars.peek() == Some(&'?') {
                    let rest: String = chars.clone().skip(1).take(2).collect();
                    rest.starts_with("P<") || (rest.starts_with('<') && rest != "<=" && rest != "<!")
                } else {
                    true
                };
                if capturing {
                    open.push(Some(next_group));
                    next_group += 1;
                } else {
                    open.push(None);
                }
            }
            ')' => match open.pop() {
                Some(Some(g)) if g < groups => {
                    closed += 1;
                    order[g] = closed;
                }
                Some(None) => {}
                _ => return fallback(),
            },
            _ => {}
        }
    }

    if next_group != groups {
        return fallback();
    }
    order
}
