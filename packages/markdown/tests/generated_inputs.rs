//! Converter contract checked on generated Markdown.
//!
//! Inputs are random concatenations of markup fragments, so delimiters,
//! brackets, escapes and block markers collide in ways hand-written cases miss.

use daybook_markdown::{parse, parse_with_diagnostics, serialize};
use proptest::prelude::*;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};

const FRAGMENTS: &[&str] = &[
    "*", "**", "_", "__", "`", "[", "]", "(", ")", "](", "](u)", "[x]", "\\", "\\*", "\\[",
    "a", "bb", "1", "é", " ", "  ", "\n", "\n\n", "# ", "## ", "- ", "- [x] ", "- [ ] ",
    "1. ", "> ", "```", "---", "snake_case", "`code`", "[l](h)", "!", "#", ".",
];

fn markdown_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..32).prop_map(|parts| parts.concat())
}

fn assert_idempotent(source: &str) -> Result<(), TestCaseError> {
    let once = serialize(&parse(source));
    let twice = serialize(&parse(&once));
    prop_assert_eq!(&once, &twice, "input {:?}", source);
    Ok(())
}

#[test]
fn test_serialize_is_idempotent_on_seeded_inputs() {
    let config = Config {
        cases: 4000,
        failure_persistence: None,
        ..Config::default()
    };
    let mut runner =
        TestRunner::new_with_rng(config, TestRng::deterministic_rng(RngAlgorithm::ChaCha));

    runner
        .run(&markdown_strategy(), |source| assert_idempotent(&source))
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 512, .. ProptestConfig::default() })]

    #[test]
    fn test_serialize_is_idempotent(source in markdown_strategy()) {
        assert_idempotent(&source)?;
    }

    #[test]
    fn test_parse_reports_lines_inside_input(source in markdown_strategy()) {
        let output = parse_with_diagnostics(&source);
        let last_line = source.lines().count().max(1);
        for anomaly in output.anomalies.iter() {
            prop_assert!(
                (1..=last_line).contains(&anomaly.line()),
                "{} outside 1..={} for {:?}",
                anomaly,
                last_line,
                source
            );
        }
    }
}
