const ERROR_MARKERS: [&str; 2] = ["warning:", "error:"];

/// Whether evaluator output reports a warning or an error.
///
/// The evaluator has no structured error channel, only these textual
/// markers, so this is a plain substring search (ASCII case ignored).
pub fn is_error(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|marker| lowered.contains(marker))
}
