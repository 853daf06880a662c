/// Whitespace as prompt text treats it: Unicode spaces and line breaks plus
/// the byte order mark, but not NEL (U+0085).
pub fn is_prompt_whitespace(c: char) -> bool {
    c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{0085}')
}

/// Split newline-delimited prompt text into individual prompts.
///
/// Blank lines are dropped, order is kept, and each prompt is trimmed.
pub fn split_prompts(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_matches(is_prompt_whitespace))
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// The text actually sent to the generator: `"<prompt>, <style>"` when a
/// non-blank style preset is given, otherwise the prompt unchanged.
pub fn effective_prompt(prompt: &str, style_preset: Option<&str>) -> String {
    match style_preset.filter(|s| !s.trim().is_empty()) {
        Some(style) => format!("{}, {}", prompt, style),
        None => prompt.to_string(),
    }
}
