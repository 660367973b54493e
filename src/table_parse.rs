use std::collections::HashMap;

/// Splits a text-layer line on tabs or runs of two or more spaces.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut pending_spaces = 0_usize;

    let flush = |current: &mut String, cells: &mut Vec<String>| {
        let cell = current.trim();
        if !cell.is_empty() {
            cells.push(cell.to_string());
        }
        current.clear();
    };

    for ch in line.trim().chars() {
        if ch == '\t' {
            flush(&mut current, &mut cells);
            pending_spaces = 0;
        } else if ch.is_whitespace() {
            pending_spaces += 1;
        } else {
            match pending_spaces {
                0 => {}
                1 => current.push(' '),
                _ => flush(&mut current, &mut cells),
            }
            pending_spaces = 0;
            current.push(ch);
        }
    }
    flush(&mut current, &mut cells);

    cells
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Collapses embedded newlines and whitespace runs into single spaces.
pub(crate) fn clean_cell(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans every cell, then drops rows and columns that are empty throughout.
pub(crate) fn clean_rows(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let cleaned = rows
        .iter()
        .map(|row| row.iter().map(|cell| clean_cell(cell)).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect::<Vec<_>>();

    let width = cleaned.iter().map(Vec::len).max().unwrap_or(0);
    let keep = (0..width)
        .map(|column| {
            cleaned
                .iter()
                .any(|row| row.get(column).is_some_and(|cell| !cell.is_empty()))
        })
        .collect::<Vec<_>>();

    cleaned
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&keep)
                .filter_map(|(cell, keep)| keep.then_some(cell))
                .collect()
        })
        .collect()
}

/// Pads every row with empty cells up to `width`.
pub(crate) fn pad_rows(rows: &[Vec<String>], width: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut out = row.clone();
            if out.len() < width {
                out.resize(width, String::new());
            }
            out
        })
        .collect()
}

pub(crate) fn modal_width(rows: &[Vec<String>]) -> usize {
    let mut freq = HashMap::new();
    for width in rows.iter().map(Vec::len) {
        *freq.entry(width).or_insert(0_usize) += 1;
    }

    freq.into_iter()
        .max_by_key(|(width, count)| (*count, *width))
        .map_or(0, |(width, _)| width)
}
