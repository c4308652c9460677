//! Property tests for the equation normaliser.
//!
//! Inputs are built from a small token alphabet rather than arbitrary
//! strings: random bytes almost never form the shapes the rules look for,
//! while tokens like `σ`, `²`, `$$` and `` ` `` collide with each other in
//! exactly the ways real articles do.

use gitopedia_render::normalize;
use proptest::prelude::*;

fn token() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "a", "x", "mass", "E", "=", "mc2", " ", " ", "\n", "\n\n", ".", ",", "2", "10",
        "α", "β", "σ", "Σ", "π", "²", "³", "₁", "ₙ", "$", "$$", "$$$", "`", "```", "[", "]",
        "\\alpha", "(", ")", "https://x.org/σ²", "<b>", "</b>",
    ])
}

fn document(max_tokens: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(token(), 0..max_tokens).prop_map(|tokens| tokens.concat())
}

/// Prose that cannot open or close code, escapes, math or protected spans.
fn plain_prose() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["a", "word", " ", "E", "=", "mc2", "α", "σ", "²", "₁", ".", "x"]),
        0..12,
    )
    .prop_map(|tokens| tokens.concat())
}

fn code_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["x", "E = mc2", "σ²", "$", "$$$", "[", "\\[", "]", " ", "α₁", "<b>"]),
        1..10,
    )
    .prop_map(|tokens| tokens.concat())
}

/// Dollar soup without anything the normaliser would pass through verbatim.
fn dollar_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["a", "x", " ", "\n", "σ", "²", "2", "$", "$$", "$$$", "[", "]"]),
        0..24,
    )
    .prop_map(|tokens| tokens.concat())
    .prop_filter("no indented code", |s| !s.contains("    "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_normalize_is_idempotent(input in document(24)) {
        let once = normalize(&input);
        let twice = normalize(&once);
        prop_assert_eq!(twice, once, "input: {:?}", input);
    }

    #[test]
    fn prop_fenced_code_is_untouched(
        before in plain_prose(),
        code in code_text(),
        after in plain_prose(),
    ) {
        let block = format!("```\n{code}\n```\n");
        let input = format!("{before}\n\n{block}\n{after}");
        let out = normalize(&input);
        prop_assert!(out.contains(&block), "input: {:?}\noutput: {:?}", input, out);
    }

    #[test]
    fn prop_inline_code_is_untouched(
        before in plain_prose(),
        code in code_text(),
        after in plain_prose(),
    ) {
        let span = format!("`{code}`");
        let input = format!("{before} {span} {after}");
        let out = normalize(&input);
        prop_assert!(out.contains(&span), "input: {:?}\noutput: {:?}", input, out);
    }

    #[test]
    fn prop_no_quadruple_dollars(input in dollar_soup()) {
        let out = normalize(&input);
        prop_assert!(!out.contains("$$$$"), "input: {:?}\noutput: {:?}", input, out);
    }

    #[test]
    fn prop_plain_prose_without_math_is_unchanged(
        words in prop::collection::vec("[a-z]{1,8}", 0..12)
    ) {
        let input = words.join(" ");
        prop_assert_eq!(normalize(&input), input);
    }
}
