//! Match highlighting for search hits.
//!
//! Each query term that hit a stored field of the artifact yields one
//! [`MatchHighlight`] whose fragments are the matching lines with the
//! matched text wrapped in `<B>` tags.

use crate::artifact::{ArtifactInfo, MatchHighlight};
use crate::query::{tokenize, Query};

const OPEN: &str = "<B>";
const CLOSE: &str = "</B>";

pub fn highlight(query: &Query, info: &ArtifactInfo) -> Vec<MatchHighlight> {
    let mut out: Vec<MatchHighlight> = Vec::new();
    for (field, wanted) in query.terms() {
        let Some(value) = info.field_value(field) else {
            continue;
        };
        let terms: Vec<String> = match tokenize(wanted) {
            t if t.is_empty() => vec![wanted.to_lowercase()],
            t => t,
        };
        let fragments: Vec<String> = value
            .lines()
            .filter_map(|line| mark(line, &terms))
            .collect();
        if fragments.is_empty() {
            continue;
        }
        match out.iter_mut().find(|h| h.field == field) {
            Some(existing) => existing.fragments.extend(fragments),
            None => out.push(MatchHighlight { field, fragments }),
        }
    }
    out
}

/// Wrap every case-insensitive occurrence of any term. `None` when nothing
/// matched.
fn mark(line: &str, terms: &[String]) -> Option<String> {
    let lower = line.to_lowercase();
    // Byte offsets only line up when lowercasing kept lengths.
    if lower.len() != line.len() {
        return None;
    }
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for term in terms.iter().filter(|t| !t.is_empty()) {
        let mut from = 0;
        while let Some(pos) = lower[from..].find(term.as_str()) {
            let start = from + pos;
            spans.push((start, start + term.len()));
            from = start + term.len();
        }
    }
    if spans.is_empty() {
        return None;
    }
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (s, e) in spans {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }

    let mut result = String::with_capacity(line.len() + merged.len() * 7);
    let mut cursor = 0;
    for (s, e) in merged {
        result.push_str(&line[cursor..s]);
        result.push_str(OPEN);
        result.push_str(&line[s..e]);
        result.push_str(CLOSE);
        cursor = e;
    }
    result.push_str(&line[cursor..]);
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;

    #[test]
    fn test_wraps_matches() {
        let ai = ArtifactInfo::new("org.codehaus.qdox", "qdox", "1.5", "jar");
        let hl = highlight(&Query::scored(Field::GroupId, "qdox"), &ai);
        assert_eq!(hl.len(), 1);
        assert_eq!(hl[0].fragments, vec!["org.codehaus.<B>qdox</B>"]);
    }

    #[test]
    fn test_multiline_classnames() {
        let mut ai = ArtifactInfo::new("g", "a", "1", "jar");
        ai.classnames = vec!["/com/acme/Parser".into(), "/com/acme/Lexer".into()];
        let hl = highlight(&Query::scored(Field::Classnames, "parser"), &ai);
        assert_eq!(hl[0].fragments, vec!["/com/acme/<B>Parser</B>"]);
    }

    #[test]
    fn test_no_match_no_highlight() {
        let ai = ArtifactInfo::new("g", "a", "1", "jar");
        assert!(highlight(&Query::scored(Field::ArtifactId, "zzz"), &ai).is_empty());
    }
}
