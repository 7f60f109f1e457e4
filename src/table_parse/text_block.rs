use super::ParsedTable;
use super::markdown::{looks_like_pipe_table, parse_markdown_table};

pub fn parse_text_block(text: &str) -> Option<ParsedTable> {
    if text.contains('|') {
        if !looks_like_pipe_table(text) {
            return None;
        }
        return parse_markdown_table(text);
    }

    let mut run: Vec<Vec<String>> = Vec::new();
    for line in text.lines() {
        let cells = split_whitespace_cells(line);
        if cells.len() >= 2 && !looks_like_sentence(line) {
            run.push(cells);
            continue;
        }
        if run.len() >= 2 {
            break;
        }
        run.clear();
    }

    if run.len() < 2 {
        return None;
    }
    let headers = run.remove(0);
    ParsedTable::from_parts(headers, run)
}

pub fn split_whitespace_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in trimmed.chars() {
        if ch == '\t' {
            flush_cell(&mut current, &mut cells);
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                flush_cell(&mut current, &mut cells);
                continue;
            }
            current.push(' ');
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }

    flush_cell(&mut current, &mut cells);
    cells
}

fn flush_cell(current: &mut String, cells: &mut Vec<String>) {
    let cell = current.trim();
    if !cell.is_empty() {
        cells.push(cell.to_string());
    }
    current.clear();
}

fn looks_like_sentence(line: &str) -> bool {
    ['.', '!', '?']
        .iter()
        .any(|punctuation| line.trim_end().ends_with(*punctuation))
}
