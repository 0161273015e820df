//! Formula text handling: A1-style references, `SUM(A1:A9)` ranges and
//! dependency extraction.
//!
//! Formulas are arithmetic expressions evaluated by rhai. Cell references are
//! plain identifiers (`C65`), so the only preprocessing needed is range
//! expansion, which rewrites `SUM(D65:D70)` into `range_sum([D65, D66, ...])`.

use super::SurfaceError;

/// Name of the native function registered for expanded `SUM` ranges.
pub const RANGE_SUM_FN: &str = "range_sum";

/// Split an A1-style reference into a 1-based (column, row) pair.
///
/// Returns `None` unless the whole string is letters followed by digits.
pub fn split_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let letters_end = reference
        .find(|c: char| !c.is_ascii_uppercase())
        .unwrap_or(reference.len());
    if letters_end == 0 || letters_end == reference.len() || letters_end > 3 {
        return None;
    }

    let (letters, digits) = reference.split_at(letters_end);
    if !digits.chars().all(|c| c.is_ascii_digit()) || digits.starts_with('0') {
        return None;
    }

    let column = letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1));
    let row = digits.parse().ok()?;
    Some((column, row))
}

/// Whether `reference` is a valid upper-case A1-style cell reference.
pub fn is_cell_ref(reference: &str) -> bool {
    split_cell_ref(reference).is_some()
}

/// Upper-case and validate a cell reference.
pub fn normalize_cell_ref(reference: &str) -> Option<String> {
    let upper = reference.trim().to_ascii_uppercase();
    is_cell_ref(&upper).then_some(upper)
}

fn column_name(mut column: u32) -> String {
    let mut name = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        name.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Expand `start:end` into every cell of the rectangle, row-major.
pub fn expand_range(start: &str, end: &str) -> Result<Vec<String>, SurfaceError> {
    let invalid = || SurfaceError::Template(format!("invalid range {}:{}", start, end));
    let (c1, r1) = split_cell_ref(start).ok_or_else(invalid)?;
    let (c2, r2) = split_cell_ref(end).ok_or_else(invalid)?;

    let (col_lo, col_hi) = (c1.min(c2), c1.max(c2));
    let (row_lo, row_hi) = (r1.min(r2), r1.max(r2));

    let mut cells = Vec::with_capacity(((col_hi - col_lo + 1) * (row_hi - row_lo + 1)) as usize);
    for row in row_lo..=row_hi {
        for column in col_lo..=col_hi {
            cells.push(format!("{}{}", column_name(column), row));
        }
    }
    Ok(cells)
}

/// Rewrite every `SUM(X1:Y9)` in a formula into a `range_sum([...])` call.
pub fn expand_sum_ranges(formula: &str) -> Result<String, SurfaceError> {
    let mut output = String::with_capacity(formula.len());
    let mut rest = formula;

    while let Some(pos) = rest.find("SUM(") {
        let preceded_by_ident = rest[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        output.push_str(&rest[..pos]);
        if preceded_by_ident {
            output.push_str("SUM(");
            rest = &rest[pos + 4..];
            continue;
        }

        let after = &rest[pos + 4..];
        let close = after
            .find(')')
            .ok_or_else(|| SurfaceError::Template(format!("unclosed SUM in `{}`", formula)))?;
        let range = after[..close].trim();
        let (start, end) = range
            .split_once(':')
            .ok_or_else(|| SurfaceError::Template(format!("SUM expects a range, got `{}`", range)))?;

        let cells = expand_range(start.trim(), end.trim())?;
        output.push_str(RANGE_SUM_FN);
        output.push_str("([");
        output.push_str(&cells.join(", "));
        output.push_str("])");

        rest = &after[close + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Collect the distinct cell references a formula reads, in first-seen order.
pub fn dependencies(formula: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    let bytes = formula.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let token = &formula[start..i];
            if is_cell_ref(token) && !deps.iter().any(|d| d == token) {
                deps.push(token.to_string());
            }
        } else if c.is_ascii_digit() || c == b'.' {
            // numeric literal, including exponents like 1e5
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    deps
}
