//! Version literals embedded in Go sources.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

const PRIMARY_IDENT: &str = "appVersion";
const LOOSE_IDENTS: [&str; 2] = ["appversion", "version"];

/// First version literal found under `root`, walking `.go` files in name order.
///
/// `.git`, `vendor` and hidden directories are skipped. Unreadable files are ignored.
pub fn discover_embedded_version(root: &Path) -> Option<String> {
  WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
    .filter_map(Result::ok)
    .filter(|entry| entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(".go"))
    .find_map(|entry| {
      let source = std::fs::read_to_string(entry.path()).ok()?;
      scan_source(&source)
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
  if !entry.file_type().is_dir() {
    return false;
  }
  let name = entry.file_name().to_string_lossy();
  name == "vendor" || name.starts_with('.')
}

/// Version literal in one source file.
///
/// `var appVersion = "<v>"` anywhere in the file wins; otherwise the first line
/// with an `appversion` or `version` identifier (any case) assigned a string.
pub fn scan_source(source: &str) -> Option<String> {
  source
    .lines()
    .find_map(primary_match)
    .or_else(|| source.lines().find_map(loose_match))
}

fn primary_match(line: &str) -> Option<String> {
  let rest = line.trim_start().strip_prefix("var")?;
  if !rest.starts_with(char::is_whitespace) {
    return None;
  }
  let rest = rest.trim_start().strip_prefix(PRIMARY_IDENT)?;
  let rest = rest.trim_start().strip_prefix('=')?;
  quoted(rest)
}

fn loose_match(line: &str) -> Option<String> {
  let lower = line.to_ascii_lowercase();
  LOOSE_IDENTS
    .iter()
    .flat_map(|ident| word_positions(&lower, ident))
    .filter_map(|end| {
      let tail = &line[end..];
      let eq = tail.find('=')?;
      quoted(&tail[eq + 1..])
    })
    .next()
}

/// End offsets of each whole-word occurrence of `word` in `haystack`.
fn word_positions<'a>(haystack: &'a str, word: &'a str) -> impl Iterator<Item = usize> + 'a {
  haystack.match_indices(word).filter_map(move |(start, _)| {
    let end = start + word.len();
    let before = haystack[..start].chars().next_back();
    let after = haystack[end..].chars().next();
    (!before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)).then_some(end)
  })
}

fn is_ident_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

/// Contents of a leading `"..."` literal, whitespace allowed before it.
fn quoted(rest: &str) -> Option<String> {
  let body = rest.trim_start().strip_prefix('"')?;
  let end = body.find('"')?;
  let value = &body[..end];
  (!value.is_empty()).then(|| value.to_string())
}
