/*!
 * Normalized string similarity for subtitle alignment.
 *
 * Text is compared case-insensitively with punctuation removed, using a
 * Levenshtein distance normalized by the longer string.
 */

/// Similarity scorer used by the aligner
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMatcher;

impl TextMatcher {
    /// Calculate similarity between two texts (0.0-1.0)
    ///
    /// Both sides are normalized first, so "Halo, dunia!" and "halo dunia" score 1.0.
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        let a_norm = normalize(a);
        let b_norm = normalize(b);
        normalized_similarity(&a_norm, &b_norm)
    }

    /// Check if two texts are at least `threshold` similar
    pub fn matches(&self, a: &str, b: &str, threshold: f32) -> bool {
        self.similarity(a, b) >= threshold
    }
}

/// Similarity of two already-normalized strings
pub fn normalized_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = levenshtein_distance(a, b);
    let max_len = a.chars().count().max(b.chars().count());

    1.0 - (distance as f32 / max_len as f32)
}

/// Lowercase, drop punctuation and collapse whitespace
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized words of a text
pub fn normalized_words(text: &str) -> Vec<String> {
    normalize(text).split(' ').filter(|w| !w.is_empty()).map(str::to_string).collect()
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Two-row optimization
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr_row[0] = i;

        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };

            curr_row[j] = (prev_row[j] + 1)                  // deletion
                .min(curr_row[j - 1] + 1)                    // insertion
                .min(prev_row[j - 1] + cost);                // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}
