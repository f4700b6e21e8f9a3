//! Token-to-character offset alignment.
//!
//! Tokenizers report token strings, not positions in the original text.
//! [`rematch`] re-aligns each token against the text and records the
//! character indices (not bytes) it covers, so decoded token spans can be
//! sliced back out of the original text. Special and padding tokens map
//! to an empty index list.

/// Per-token character coverage: one entry per token, each an ordered list
/// of character indices into the original text.
pub type OffsetMapping = Vec<Vec<usize>>;

/// Align tokens against the original text.
///
/// Matching is case-insensitive and skips subword continuation markers
/// (`##` prefixes). Bracketed tokens (`[CLS]`, `[SEP]`, `[PAD]`, `[UNK]`)
/// and tokens that cannot be located in the remaining text get an empty
/// list. Character indices are strictly increasing across tokens in
/// textual order.
pub fn rematch(text: &str, tokens: &[String]) -> OffsetMapping {
    let lowered: Vec<char> = text.chars().map(fold_char).collect();

    let mut mapping = Vec::with_capacity(tokens.len());
    let mut offset = 0usize;
    for token in tokens {
        if is_special(token) {
            mapping.push(Vec::new());
            continue;
        }
        let piece: Vec<char> = token
            .strip_prefix("##")
            .unwrap_or(token)
            .chars()
            .map(fold_char)
            .collect();
        if piece.is_empty() {
            mapping.push(Vec::new());
            continue;
        }
        match find_from(&lowered, &piece, offset) {
            Some(start) => {
                mapping.push((start..start + piece.len()).collect());
                offset = start + piece.len();
            }
            None => mapping.push(Vec::new()),
        }
    }
    mapping
}

/// Case-fold a single char, keeping the mapping 1:1 with text positions.
fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn is_special(token: &str) -> bool {
    token.starts_with('[') && token.ends_with(']')
}

/// First occurrence of `needle` in `haystack` at or after `from`.
fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_word_tokens_align() {
        let mapping = rematch("John works", &toks(&["john", "works"]));
        assert_eq!(mapping[0], vec![0, 1, 2, 3]);
        assert_eq!(mapping[1], vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_special_tokens_map_to_empty() {
        let mapping = rematch("hi", &toks(&["[CLS]", "hi", "[SEP]", "[PAD]"]));
        assert!(mapping[0].is_empty());
        assert_eq!(mapping[1], vec![0, 1]);
        assert!(mapping[2].is_empty());
        assert!(mapping[3].is_empty());
    }

    #[test]
    fn test_subword_continuation() {
        let mapping = rematch("playing", &toks(&["play", "##ing"]));
        assert_eq!(mapping[0], vec![0, 1, 2, 3]);
        assert_eq!(mapping[1], vec![4, 5, 6]);
    }

    #[test]
    fn test_case_insensitive_alignment() {
        let mapping = rematch("Acme Corp", &toks(&["acme", "corp"]));
        assert_eq!(mapping[0], vec![0, 1, 2, 3]);
        assert_eq!(mapping[1], vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_unmatchable_token_maps_to_empty() {
        let mapping = rematch("abc", &toks(&["abc", "zzz"]));
        assert_eq!(mapping[0], vec![0, 1, 2]);
        assert!(mapping[1].is_empty());
    }

    #[test]
    fn test_char_indices_not_bytes() {
        // Multi-byte chars: indices must count chars, not bytes.
        let mapping = rematch("北京大学", &toks(&["北", "京", "大", "学"]));
        assert_eq!(mapping, vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_indices_strictly_increasing() {
        let mapping = rematch("aa bb aa", &toks(&["aa", "bb", "aa"]));
        let flat: Vec<usize> = mapping.iter().flatten().copied().collect();
        assert!(flat.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_mapping_length_matches_tokens() {
        let tokens = toks(&["[CLS]", "a", "b", "[SEP]", "[PAD]", "[PAD]"]);
        let mapping = rematch("ab", &tokens);
        assert_eq!(mapping.len(), tokens.len());
    }
}
