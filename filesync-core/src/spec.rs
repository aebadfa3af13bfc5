//! Line-oriented parsers for the multi-line configuration inputs.
//!
//! Every parser trims each line and skips blank ones. Output order follows
//! input order.

use tracing::debug;

use crate::types::{FileDeleteSpec, FileTransferSpec};

/// Parse a file list where each line is `path` or `source=destination`.
pub fn parse_file_specs(input: &str) -> Vec<FileTransferSpec> {
    path_pairs(input)
        .map(|(source_path, destination_path)| {
            debug!(source = %source_path, destination = %destination_path, "configured source file");
            FileTransferSpec {
                source_path,
                destination_path,
            }
        })
        .collect()
}

/// Parse a delete list. Same line grammar as [`parse_file_specs`].
pub fn parse_delete_specs(input: &str) -> Vec<FileDeleteSpec> {
    path_pairs(input)
        .map(|(source_path, destination_path)| FileDeleteSpec {
            source_path,
            destination_path,
        })
        .collect()
}

/// Parse a plain name list. Absent and empty input both yield an empty list.
pub fn parse_list(input: Option<&str>) -> Vec<String> {
    input
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

// Splits on the first `=` only; anything after it belongs to the destination.
fn path_pairs(input: &str) -> impl Iterator<Item = (String, String)> + '_ {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('=') {
            Some((source, destination)) => {
                (source.trim().to_owned(), destination.trim().to_owned())
            }
            None => (line.to_owned(), line.to_owned()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(source: &str, destination: &str) -> FileTransferSpec {
        FileTransferSpec {
            source_path: source.to_owned(),
            destination_path: destination.to_owned(),
        }
    }

    #[test]
    fn mixed_plain_and_mapped_lines() {
        let specs = parse_file_specs("a.txt\nb.txt=c.txt\n");
        assert_eq!(specs, vec![pair("a.txt", "a.txt"), pair("b.txt", "c.txt")]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let specs = parse_file_specs("file1\n file2a = file2b\n ");
        assert_eq!(specs, vec![pair("file1", "file1"), pair("file2a", "file2b")]);
    }

    #[test]
    fn crlf_line_endings() {
        let specs = parse_file_specs("one\r\ntwo=three\r\n");
        assert_eq!(specs, vec![pair("one", "one"), pair("two", "three")]);
    }

    #[test]
    fn delete_specs_share_the_grammar() {
        let specs = parse_delete_specs("./bar.txt\nold.yml=.github/old.yml\n");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].destination_path, "./bar.txt");
        assert_eq!(specs[1].source_path, "old.yml");
        assert_eq!(specs[1].destination_path, ".github/old.yml");
    }

    #[test]
    fn list_of_empty_or_absent_input_is_empty() {
        assert!(parse_list(Some("")).is_empty());
        assert!(parse_list(None).is_empty());
        assert!(parse_list(Some(" \n\n  \n")).is_empty());
    }
}
