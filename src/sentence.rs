use unicode_segmentation::UnicodeSegmentation;

/// Characters that complete a sentence.
pub const TERMINAL_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Splits the text into trimmed sentences.
pub fn sentences(s: &str) -> Vec<&str> {
    s.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Removes a trailing incomplete sentence from a block of text.
///
/// The last sentence is dropped only if the text does not end with terminal
/// punctuation and there is at least one other sentence left.
pub fn trim_incomplete(s: &str) -> String {
    let mut sentences = sentences(s);

    let complete = s
        .chars()
        .last()
        .map(|c| TERMINAL_PUNCTUATION.contains(&c))
        .unwrap_or(true);

    if !complete && sentences.len() > 1 {
        sentences.pop();
    }

    sentences.join(" ")
}
