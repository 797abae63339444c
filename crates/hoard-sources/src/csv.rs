//! Reader for the MySQL-exported CSV files in GHTorrent dumps.
//!
//! The dialect differs from RFC 4180 in one important way: `\` escapes the
//! next character, both inside and outside quotes, and an unquoted `\N` is
//! SQL `NULL`. Quoted fields may span lines, and `""` inside quotes is a
//! literal quote. Invalid UTF-8 is replaced rather than rejected.

use std::io::BufRead;

use crate::{Error, Result};

/// One logical CSV row. `None` fields were `\N` (SQL `NULL`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
  /// 1-based line number where the row starts.
  pub line:   u64,
  pub fields: Vec<Option<String>>,
}

impl CsvRow {
  /// Field `i` as a string slice; `None` for `NULL` or a missing column.
  pub fn get(&self, i: usize) -> Option<&str> {
    self.fields.get(i).and_then(|f| f.as_deref())
  }
}

/// Iterator over the rows of a GHTorrent CSV file.
pub struct CsvReader<R> {
  reader: R,
  line:   u64,
  buf:    Vec<u8>,
}

impl<R: BufRead> CsvReader<R> {
  pub fn new(reader: R) -> Self { Self { reader, line: 0, buf: Vec::new() } }

  fn next_line(&mut self) -> std::io::Result<Option<String>> {
    self.buf.clear();
    if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
      return Ok(None);
    }
    self.line += 1;
    Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
  }

  fn read_row(&mut self) -> Result<Option<CsvRow>> {
    let mut field = FieldBuilder::default();
    let mut fields = Vec::new();
    let mut start = None;

    loop {
      let Some(text) = self.next_line()? else {
        return match start {
          None => Ok(None),
          Some(line) if field.in_quotes => {
            Err(Error::malformed(line, "unterminated quoted field at end of input"))
          }
          Some(line) => {
            fields.push(field.finish());
            Ok(Some(CsvRow { line, fields }))
          }
        };
      };

      if start.is_none() {
        if text.trim_end_matches(['\r', '\n']).is_empty() {
          continue;
        }
        start = Some(self.line);
      }

      let mut chars = text.chars().peekable();
      let mut continues = false;
      while let Some(c) = chars.next() {
        continues = false;
        match c {
          '\\' => match chars.next() {
            Some(escaped) => {
              field.push_escaped(escaped);
              continues = escaped == '\n';
            }
            None => field.push('\\'),
          },
          '"' if field.in_quotes => {
            if chars.peek() == Some(&'"') {
              chars.next();
              field.push('"');
            } else {
              field.in_quotes = false;
            }
          }
          '"' if field.is_empty() => {
            field.in_quotes = true;
            field.quoted = true;
          }
          ',' if !field.in_quotes => fields.push(std::mem::take(&mut field).finish()),
          '\r' | '\n' if !field.in_quotes => {}
          c => field.push(c),
        }
      }

      if !field.in_quotes && !continues {
        fields.push(field.finish());
        let line = start.unwrap_or(self.line);
        return Ok(Some(CsvRow { line, fields }));
      }
    }
  }
}

impl<R: BufRead> Iterator for CsvReader<R> {
  type Item = Result<CsvRow>;

  fn next(&mut self) -> Option<Self::Item> { self.read_row().transpose() }
}

#[derive(Default)]
struct FieldBuilder {
  text:      String,
  in_quotes: bool,
  quoted:    bool,
  /// The field so far is exactly an escaped `N`.
  null:      bool,
  touched:   bool,
}

impl FieldBuilder {
  fn is_empty(&self) -> bool { !self.touched }

  fn push(&mut self, c: char) {
    self.text.push(c);
    self.null = false;
    self.touched = true;
  }

  fn push_escaped(&mut self, c: char) {
    let first = !self.touched;
    self.push(c);
    self.null = first && c == 'N' && !self.in_quotes;
  }

  fn finish(self) -> Option<String> {
    if self.null && !self.quoted { None } else { Some(self.text) }
  }
}
