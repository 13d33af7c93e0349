//! Package allow-list input.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::path::Path;

/// Read the allow-list from `file` if given, otherwise from standard input
/// when it is not a terminal. No list at all means every package.
pub fn read(file: Option<&Path>) -> io::Result<Vec<String>> {
    if let Some(path) = file {
        return parse(BufReader::new(File::open(path)?));
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(Vec::new());
    }
    parse(stdin.lock())
}

/// One package name per line; blank lines and repeats are dropped.
fn parse(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut packages = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let package = line.trim();
        if !package.is_empty() && seen.insert(package.to_string()) {
            packages.push(package.to_string());
        }
    }
    Ok(packages)
}
