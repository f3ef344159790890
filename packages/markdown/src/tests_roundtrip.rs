/// Serialize-after-parse must be a fixed point after one pass
use crate::*;

fn assert_stable(source: &str) {
    let once = serialize(&parse(source));
    let twice = serialize(&parse(&once));
    assert_eq!(once, twice, "not stable for input {:?}", source);
}

#[test]
fn test_roundtrip_journal_entry() {
    let source = "# Tuesday\n\
        \n\
        Slept badly, *very* badly.\n\
        Coffee helped.\n\
        \n\
        ## Todo\n\
        \n\
        - [x] call the **bank**\n\
        - [ ] book `flight`\n\
        \n\
        > Be kind to yourself.\n\
        \n\
        1. first\n\
        3. second\n\
        \n\
        ---\n\
        \n\
        ```python\n\
        print('hi')\n\
        ```";

    let doc = parse(source);
    assert_eq!(doc.blocks.len(), 8);
    assert_stable(source);
}

#[test]
fn test_roundtrip_preserves_tree_for_canonical_input() {
    let canonical = "# Day\n\n\
        Text with **bold**, *italic* and [a link](https://example.com).\n\n\
        - one\n- two\n\n\
        - [x] done\n\n\
        > quoted\n>\n> - inside\n\n\
        ```rust\nfn main() {}\n```";

    let doc = parse(canonical);
    assert_eq!(serialize(&doc), canonical);
    assert_eq!(parse(&serialize(&doc)), doc);
}

#[test]
fn test_roundtrip_normalizes_markers() {
    let doc = parse("* a\n* b\n\n5. x\n9. y\n\n__strong__ _em_");
    assert_eq!(serialize(&doc), "- a\n- b\n\n1. x\n2. y\n\n**strong** *em*");
}

#[test]
fn test_roundtrip_collapses_blank_lines_outside_code() {
    let source = "a\n\n\n\nb\n\n```\nx\n\n\n\ny\n```";
    assert_eq!(serialize(&parse(source)), "a\n\nb\n\n```\nx\n\n\n\ny\n```");
}

#[test]
fn test_roundtrip_malformed_inputs() {
    let sources = [
        "**unclosed bold",
        "2 * 3 * 4",
        "***x*y**",
        "**a *b***",
        "_a_b_c_",
        "foo_bar_",
        "snake__case",
        "[not a link",
        "[label](has space)",
        "`unclosed code",
        "C:\\path\\to\\file",
        "trailing backslash \\",
        "\\# escaped heading",
        "####### seven hashes",
        "```\nnever closed",
        "- a\n  - nested\n    - deeper",
        "- item\n  continued\nplain",
        "> > > deep quote\n> back up",
        "* [ ] star task\n+ plus is text",
        "1.5 is not a list\n2024. is one",
        "- [x](y) link not task",
        "<b>html</b> stays text",
        "a  \n  b  ",
        "\t# tabbed heading",
        "\r\nwindows\r\nlines\r\n",
    ];

    for source in sources {
        assert_stable(source);
    }
}

#[test]
fn test_roundtrip_emphasis_combinations() {
    let sources = [
        "**a**__b__",
        "*a **b** c*",
        "**_x_ y**",
        "***both***",
        "a*b*c",
        "*[link](u)*",
        "**`code`**",
        "_a\nb_",
        "**a\n- b**",
    ];

    for source in sources {
        assert_stable(source);
    }
}

#[test]
fn test_roundtrip_empty_and_whitespace() {
    for source in ["", " ", "\n\n", ">", "-", "#", "```\n```"] {
        assert_stable(source);
    }
}

#[test]
fn test_parse_anomalies_reported_once() {
    let output = parse_with_diagnostics("**open and _also");
    assert_eq!(output.anomalies.len(), 2);
    assert!(output
        .anomalies
        .iter()
        .all(|anomaly| matches!(anomaly, ParseAnomaly::UnmatchedDelimiter { line: 1, .. })));
}
