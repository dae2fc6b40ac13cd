//! Splitting an evaluator result line into its expression and result halves.

/// Approximately-equals sign printed by the evaluator for inexact results.
pub const APPROX_SIGN: char = '\u{2248}';

/// Split `line` into `(expression, result)`.
///
/// In terse mode the evaluator prints only the result, so the whole line
/// is returned as the result. Otherwise the split happens at the last `=`
/// or `≈` that is not nested inside parentheses, so `f(x=2) = 5` yields
/// `f(x=2)` and `5`. A line without such a marker is all result.
pub fn split_equation(line: &str, terse: bool) -> (Option<&str>, &str) {
    if terse {
        return (None, line);
    }

    let mut depth: i32 = 0;
    for (idx, ch) in line.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => depth -= 1,
            '=' | APPROX_SIGN if depth == 0 => {
                let expression = line[..idx].trim_end();
                let result = line[idx + ch.len_utf8()..].trim_start();
                return (Some(expression), result);
            }
            _ => {}
        }
    }

    (None, line)
}
