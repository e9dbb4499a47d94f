//! Property-based test generators using proptest.
//!
//! Lengths are biased towards a caller-supplied small-buffer threshold so
//! both allocation paths get hit. Pass the access layer's own capacities
//! (`KEY_INLINE_CAPACITY`, `VALUE_INLINE_CAPACITY`).

use proptest::prelude::*;

/// Returns `[t - 1, t, t + 1]`.
pub fn around(threshold: usize) -> [usize; 3] {
    [threshold - 1, threshold, threshold + 1]
}

fn length_strategy(threshold: usize, min: usize, max: usize) -> impl Strategy<Value = usize> {
    prop_oneof![
        min..=max,
        threshold.saturating_sub(2).max(min)..=(threshold + 2),
    ]
}

/// Strategy for non-empty byte keys clustered around `threshold`.
pub fn byte_key_strategy(threshold: usize) -> impl Strategy<Value = Vec<u8>> {
    length_strategy(threshold, 1, threshold * 2 + 44)
        .prop_flat_map(|len| prop::collection::vec(any::<u8>(), len))
}

/// Strategy for non-empty text keys, ASCII and multi-byte mixed.
pub fn text_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_:/.-]{1,40}|[a-z\u{e9}\u{4e2d}\u{1F600}]{1,60}")
        .expect("Invalid regex")
}

/// Strategy for values clustered around `threshold`, including the empty value.
pub fn value_strategy(threshold: usize) -> impl Strategy<Value = Vec<u8>> {
    length_strategy(threshold, 0, threshold * 4)
        .prop_flat_map(|len| prop::collection::vec(any::<u8>(), len))
}

/// Strategy for well-formed wide (UTF-16) text, paired with its UTF-8 form.
pub fn wide_text_strategy() -> impl Strategy<Value = (Vec<u16>, String)> {
    prop::collection::vec(any::<char>(), 1..300).prop_map(|chars| {
        let text: String = chars.into_iter().collect();
        (text.encode_utf16().collect(), text)
    })
}

/// Strategy for text whose UTF-8 length is exactly `len` bytes.
pub fn ascii_text_of_len(len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(0x20u8..0x7f, len)
        .prop_map(|bytes| bytes.into_iter().map(char::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn around_threshold() {
        assert_eq!(around(128), [127, 128, 129]);
    }

    #[test]
    fn keys_are_never_empty() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let key = byte_key_strategy(128).new_tree(&mut runner).unwrap().current();
            assert!(!key.is_empty());
        }
    }

    #[test]
    fn value_lengths_stay_in_range() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let value = value_strategy(16).new_tree(&mut runner).unwrap().current();
            assert!(value.len() <= 64);
        }
    }

    #[test]
    fn wide_text_matches_utf8() {
        let mut runner = TestRunner::default();
        for _ in 0..50 {
            let (wide, text) = wide_text_strategy().new_tree(&mut runner).unwrap().current();
            assert_eq!(String::from_utf16(&wide).unwrap(), text);
        }
    }

    #[test]
    fn ascii_text_has_exact_length() {
        let mut runner = TestRunner::default();
        let text = ascii_text_of_len(129).new_tree(&mut runner).unwrap().current();
        assert_eq!(text.len(), 129);
    }
}
