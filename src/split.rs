//! Splits text on a single-character delimiter.

/**
  Splits `text` on every occurrence of `delimiter`. Empty segments between two adjacent
  delimiters are kept, but a trailing delimiter does not produce an empty final segment,
  and empty text produces no segments at all.

  ```
  use stackvm::split::split;
  assert_eq!(split("a  b", ' '), vec!["a", "", "b"]);
  assert_eq!(split("a\nb\n", '\n'), vec!["a", "b"]);
  ```
*/
pub fn split(text: &str, delimiter: char) -> Vec<&str> {
  text.split_terminator(delimiter).collect()
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_text_has_no_segments() {
    assert!(split("", '\n').is_empty());
  }

  #[test]
  fn lone_delimiter_is_one_empty_segment() {
    assert_eq!(split("\n", '\n'), vec![""]);
    assert_eq!(split("\n\n", '\n'), vec!["", ""]);
  }

  #[test]
  fn leading_delimiter_keeps_empty_first_segment() {
    assert_eq!(split(" ADD", ' '), vec!["", "ADD"]);
  }
}
