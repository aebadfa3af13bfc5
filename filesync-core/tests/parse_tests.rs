//! Table-driven coverage of the line parsers and pattern grammar.

use filesync_core::{parse_file_specs, parse_list, ConfigError, DestinationInputs, RepoPatternSpec};
use rstest::rstest;

#[rstest]
#[case("file1\nfile2\nfile3\n", &[("file1", "file1"), ("file2", "file2"), ("file3", "file3")])]
#[case("file1\nfile2a=file2b\n", &[("file1", "file1"), ("file2a", "file2b")])]
#[case("file1\n file2a=file2b\n ", &[("file1", "file1"), ("file2a", "file2b")])]
#[case(
    "file1a=/tmp/foo/file1b\n/tmp/bar1/file2a=/tmp/bar2/file2b\n",
    &[("file1a", "/tmp/foo/file1b"), ("/tmp/bar1/file2a", "/tmp/bar2/file2b")]
)]
#[case("", &[])]
fn file_specs(#[case] input: &str, #[case] expected: &[(&str, &str)]) {
    let parsed: Vec<(String, String)> = parse_file_specs(input)
        .into_iter()
        .map(|spec| (spec.source_path, spec.destination_path))
        .collect();
    let expected: Vec<(String, String)> = expected
        .iter()
        .map(|(s, d)| (s.to_string(), d.to_string()))
        .collect();
    assert_eq!(parsed, expected);
}

#[rstest]
#[case(Some("item1"), &["item1"])]
#[case(Some(" item1\n "), &["item1"])]
#[case(Some("item1\nitem2\nitem3\n"), &["item1", "item2", "item3"])]
#[case(Some("item1\n item2 \nitem3\n"), &["item1", "item2", "item3"])]
#[case(Some(" item1\n item2 \nitem3\n "), &["item1", "item2", "item3"])]
#[case(Some(""), &[])]
#[case(None, &[])]
fn name_lists(#[case] input: Option<&str>, #[case] expected: &[&str]) {
    assert_eq!(parse_list(input), expected);
}

#[test]
fn plain_lines_map_to_themselves() {
    for line in ["a", "  padded  ", ".github/workflows/ci.yml", "./foo.txt"] {
        let specs = parse_file_specs(line);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].source_path, line.trim());
        assert_eq!(specs[0].destination_path, line.trim());
    }
}

#[rstest]
#[case("foo")]
#[case("/pattern")]
#[case("org/")]
#[case("org/a/b")]
fn malformed_patterns(#[case] input: &str) {
    let err = RepoPatternSpec::parse(input).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPattern { .. }), "got: {err}");
}

#[test]
fn destination_inputs_validate_every_list() {
    let inputs = DestinationInputs::from_lists(
        &["org/a".to_string()],
        &["org/^svc-.*$".to_string()],
        &["org/b".to_string()],
    )
    .expect("inputs");
    assert_eq!(inputs.explicit.len(), 1);
    assert_eq!(inputs.patterns[0].org_name, "org");
    assert!(inputs.exclude.contains("org/b"));

    let err = DestinationInputs::from_lists(&["bare-name".to_string()], &[], &[]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRepository { .. }), "got: {err}");
}
