use std::sync::LazyLock;

use regex::Regex;

use super::ParsedTable;
use crate::dom::clean_cell_text;

static ALIGNMENT_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?\s*:?-+:?\s*(?:\|\s*:?-+:?\s*)+\|?$")
        .expect("hardcoded alignment row regex is valid")
});

const ESCAPED_PIPE_PLACEHOLDER: char = '\u{1f}';

// `\|` stays inside its cell.
pub fn split_pipe_cells(line: &str) -> Vec<String> {
    let protected = line.trim().replace("\\|", &ESCAPED_PIPE_PLACEHOLDER.to_string());
    let inner = protected.strip_prefix('|').unwrap_or(&protected);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    inner
        .split('|')
        .map(|cell| clean_cell_text(&cell.replace(ESCAPED_PIPE_PLACEHOLDER, "|")))
        .collect()
}

pub fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains("---") || ALIGNMENT_ROW_RE.is_match(trimmed)
}

pub fn looks_like_pipe_table(text: &str) -> bool {
    text.lines()
        .filter(|line| {
            line.split('|')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .count()
                >= 2
        })
        .take(2)
        .count()
        == 2
}

pub fn parse_markdown_table(text: &str) -> Option<ParsedTable> {
    let mut headers: Option<Vec<String>> = None;
    let mut expect_separator = false;
    let mut rows = Vec::new();

    for line in text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains('|'))
    {
        if headers.is_none() {
            headers = Some(split_pipe_cells(line));
            expect_separator = true;
            continue;
        }
        if expect_separator {
            expect_separator = false;
            if is_separator_line(line) {
                continue;
            }
        }
        rows.push(split_pipe_cells(line));
    }

    ParsedTable::from_parts(headers.unwrap_or_default(), rows)
}

#[cfg(test)]
mod tests {
    use super::{is_separator_line, looks_like_pipe_table, split_pipe_cells};

    #[test]
    fn splits_bordered_and_bare_lines_the_same() {
        assert_eq!(split_pipe_cells("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_pipe_cells("a|b"), vec!["a", "b"]);
        assert_eq!(split_pipe_cells("| a |  | c |"), vec!["a", "", "c"]);
    }

    #[test]
    fn keeps_escaped_pipes_inside_cells() {
        assert_eq!(split_pipe_cells(r"| a \| b | c |"), vec!["a | b", "c"]);
    }

    #[test]
    fn recognizes_alignment_separators() {
        assert!(is_separator_line("|---|---|"));
        assert!(is_separator_line("| :-: | --: |"));
        assert!(!is_separator_line("| 1 | 2 |"));
    }

    #[test]
    fn pipe_shape_needs_two_multi_cell_lines() {
        assert!(looks_like_pipe_table("a | b\n1 | 2"));
        assert!(!looks_like_pipe_table("if (a || b) { run(); }"));
        assert!(!looks_like_pipe_table("a | b\njust prose"));
    }
}
