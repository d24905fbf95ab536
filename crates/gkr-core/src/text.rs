//! Small text-matching helpers shared by intent scoring, rewriting and
//! lexical query construction.

/// Whether `haystack` contains `needle`, ignoring ASCII case.
///
/// Needles made only of ASCII letters, digits, spaces and hyphens must sit on
/// word boundaries, so "kill" does not match inside "skill". Any other needle
/// (CJK, punctuation) is a plain substring match.
pub fn contains_term(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    let needle = needle.to_lowercase();

    let wordlike = needle
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-');
    if !wordlike {
        return haystack.contains(&needle);
    }

    let is_word_char = |c: char| c.is_alphanumeric();
    haystack.match_indices(&needle).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_term_word_boundaries() {
        assert!(contains_term("how to kill bile titan", "kill"));
        assert!(!contains_term("best skill tree", "kill"));
        assert!(contains_term("Bile Titan weak point", "bile titan"));
        assert!(contains_term("anti-tank weapons", "anti-tank"));
    }

    #[test]
    fn test_contains_term_cjk_is_substring() {
        assert!(contains_term("法师职业介绍", "介绍"));
        assert!(contains_term("怎么打胆汁泰坦", "胆汁泰坦"));
        assert!(!contains_term("法师", "战士"));
    }

    #[test]
    fn test_contains_term_empty_needle() {
        assert!(!contains_term("anything", "  "));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  bile   titan \n guide "), "bile titan guide");
    }
}
