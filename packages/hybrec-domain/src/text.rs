use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// NFKC-folds, lower-cases, and collapses every whitespace run to a single space.
pub fn normalize_text(input: &str) -> String {
	let folded = input.nfkc().collect::<String>().to_lowercase();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unicode word tokens of `input`, normalized, keeping tokens of at least `min_chars` characters.
pub fn tokenize(input: &str, min_chars: usize) -> Vec<String> {
	let normalized = normalize_text(input);

	normalized
		.unicode_words()
		.filter(|word| word.chars().count() >= min_chars.max(1))
		.map(str::to_string)
		.collect()
}

/// Returns true when `phrase` occurs in `text` starting on a word boundary.
///
/// Both sides must already be normalized with [`normalize_text`]. The phrase may end inside a
/// word so that "drill" matches "drills".
pub fn matches_at_word_start(text: &str, phrase: &str) -> bool {
	if phrase.is_empty() || text.len() < phrase.len() {
		return false;
	}

	for (idx, _) in text.match_indices(phrase) {
		let at_boundary = text[..idx]
			.chars()
			.next_back()
			.map(|ch| !ch.is_alphanumeric())
			.unwrap_or(true);

		if at_boundary {
			return true;
		}
	}

	false
}
