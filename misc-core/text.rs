use std::{
  borrow::Cow,
  sync::LazyLock,
};

use regex::Regex;

/// ASCII and full-width commas and semicolons, with any surrounding
/// whitespace.
static LIST_DELIMITER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s*[,;，；]\s*").expect("list delimiter pattern is valid"));

/// Split `content` on list delimiters, dropping empty items.
///
/// ```
/// use misc_core::text::split_delimited;
///
/// assert_eq!(split_delimited("a, b；c，d"), ["a", "b", "c", "d"]);
/// ```
pub fn split_delimited(content: &str) -> Vec<String> {
  LIST_DELIMITER
    .split(content)
    .filter(|item| !item.is_empty())
    .map(str::to_string)
    .collect()
}

/// Separate the leading run of ASCII spaces from the trimmed rest of the line.
///
/// Only `' '` counts as indentation; a leading tab belongs to the content and
/// is trimmed away with it. A blank line yields empty content.
pub fn split_leading_spaces(line: &str) -> (&str, &str) {
  let content_start = line.find(|ch| ch != ' ').unwrap_or(line.len());
  let (prefix, rest) = line.split_at(content_start);
  (prefix, rest.trim())
}

/// Reverse the content of `line` by Unicode scalar value, keeping its
/// indentation in place.
pub fn reverse_content(line: &str) -> String {
  let (prefix, content) = split_leading_spaces(line);
  if content.is_empty() {
    return line.to_string();
  }

  let mut reversed = String::with_capacity(line.len());
  reversed.push_str(prefix);
  reversed.extend(content.chars().rev());
  reversed
}

/// Put exactly one space before the trailing `/>` of a tag that carries
/// attributes, e.g. `<a x="1"/>` becomes `<a x="1" />`.
pub fn normalize_self_closing_tag(line: &str) -> Cow<'_, str> {
  if !line.contains('=') {
    return Cow::Borrowed(line);
  }

  let Some(head) = line.trim_end().strip_suffix("/>") else {
    return Cow::Borrowed(line);
  };
  let normalized = format!("{} />", head.trim_end());
  if normalized == line {
    Cow::Borrowed(line)
  } else {
    Cow::Owned(normalized)
  }
}

pub fn trim_trailing(line: &str) -> &str {
  line.trim_end()
}

pub fn duplicate_in_line(line: &str) -> String {
  format!("{line} {line}")
}

/// Length in Unicode scalar values of the line without surrounding
/// whitespace.
pub fn content_length(line: &str) -> usize {
  line.trim().chars().count()
}

/// Parse the `repr` of a Python list of strings, e.g. `['', '/usr/lib']`.
///
/// Returns `None` when `text` is not a bracketed list of quoted strings.
pub fn parse_python_list(text: &str) -> Option<Vec<String>> {
  let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
  let mut chars = inner.chars().peekable();
  let mut entries = Vec::new();

  loop {
    while chars
      .next_if(|ch| ch.is_whitespace() || *ch == ',')
      .is_some()
    {}

    let Some(quote) = chars.next() else {
      break;
    };
    if quote != '\'' && quote != '"' {
      return None;
    }

    let mut entry = String::new();
    loop {
      match chars.next()? {
        '\\' => {
          match chars.next()? {
            'n' => entry.push('\n'),
            't' => entry.push('\t'),
            'r' => entry.push('\r'),
            escaped => entry.push(escaped),
          }
        },
        ch if ch == quote => break,
        ch => entry.push(ch),
      }
    }
    entries.push(entry);
  }

  Some(entries)
}
