//! Minimal RFC 4180 row handling for streamed report files.
//!
//! Rows arrive one physical line at a time; a quoted field may span several
//! lines, so lines are accumulated until the open quoted field closes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("unterminated quoted field")]
    UnterminatedQuote,
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
}

/// Split one logical CSV record into unquoted field values.
pub fn split_record(record: &str) -> Result<Vec<String>, RowError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(RowError::UnterminatedQuote);
    }
    fields.push(field);
    Ok(fields)
}

/// Upper bound on a logical record still waiting for its closing quote.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Joins physical lines into logical records.
///
/// Quote state follows [`split_record`]: a quote only opens at the start of a
/// field, so a stray `"` inside an unquoted value never carries over to the
/// next line.
#[derive(Debug)]
pub struct RecordAssembler {
    pending: String,
    in_quotes: bool,
    field_empty: bool,
    limit: usize,
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::with_limit(MAX_RECORD_BYTES)
    }
}

impl RecordAssembler {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: String::new(),
            in_quotes: false,
            field_empty: true,
            limit,
        }
    }

    /// Feed one line (without its terminator). Returns a complete record once
    /// the line ends outside a quoted field.
    ///
    /// A record that grows past the limit while a quote is open is handed back
    /// as-is so the caller rejects it as unterminated.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if self.in_quotes {
            self.pending.push('\n');
            self.field_empty = false;
        }
        self.pending.push_str(line);
        self.scan(line);

        if !self.in_quotes || self.pending.len() > self.limit {
            return Some(self.take());
        }
        None
    }

    /// Whatever is left at end of input; only non-empty when a quote never closed.
    pub fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then_some(self.pending)
    }

    fn scan(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '"' if self.in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        self.field_empty = false;
                    } else {
                        self.in_quotes = false;
                    }
                }
                '"' if self.field_empty => self.in_quotes = true,
                ',' if !self.in_quotes => self.field_empty = true,
                _ => self.field_empty = false,
            }
        }
    }

    fn take(&mut self) -> String {
        self.in_quotes = false;
        self.field_empty = true;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_record() {
        assert_eq!(
            split_record("a,b,,d").unwrap(),
            vec!["a", "b", "", "d"]
        );
        assert_eq!(split_record("").unwrap(), vec![""]);
    }

    #[test]
    fn test_split_quoted_fields() {
        assert_eq!(
            split_record(r#""Spring, Sale","say ""hi""",3"#).unwrap(),
            vec!["Spring, Sale", r#"say "hi""#, "3"]
        );
    }

    #[test]
    fn test_split_keeps_inner_quote_in_unquoted_field() {
        assert_eq!(split_record(r#"12" screen,5"#).unwrap(), vec![r#"12" screen"#, "5"]);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert_eq!(
            split_record(r#"a,"broken"#),
            Err(RowError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_assembler_joins_multiline_quoted_field() {
        let mut assembler = RecordAssembler::default();
        assert_eq!(assembler.push_line(r#"1,"first"#), None);
        let record = assembler.push_line(r#"second",3"#).unwrap();
        assert_eq!(record, "1,\"first\nsecond\",3");
        assert_eq!(
            split_record(&record).unwrap(),
            vec!["1", "first\nsecond", "3"]
        );
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn test_assembler_reports_dangling_record() {
        let mut assembler = RecordAssembler::default();
        assert_eq!(assembler.push_line("a,b"), Some("a,b".to_string()));
        assert_eq!(assembler.push_line(r#"c,"open"#), None);
        assert_eq!(assembler.finish(), Some(r#"c,"open"#.to_string()));
    }

    #[test]
    fn test_assembler_ignores_inch_mark_in_unquoted_field() {
        let mut assembler = RecordAssembler::default();
        assert_eq!(
            assembler.push_line(r#"act_1,as-1,Promo 12" TV,5"#),
            Some(r#"act_1,as-1,Promo 12" TV,5"#.to_string())
        );
        assert_eq!(assembler.push_line("act_1,as-2,Next,6"), Some("act_1,as-2,Next,6".to_string()));
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn test_assembler_handles_escaped_quotes_across_lines() {
        let mut assembler = RecordAssembler::default();
        assert_eq!(assembler.push_line(r#"1,"say ""hi"""#), Some(r#"1,"say ""hi"""#.to_string()));
        assert_eq!(assembler.push_line(r#"2,"a "" b"#), None);
        let record = assembler.push_line(r#"c",3"#).unwrap();
        assert_eq!(
            split_record(&record).unwrap(),
            vec!["2", "a \" b\nc", "3"]
        );
    }

    #[test]
    fn test_assembler_gives_up_past_limit() {
        let mut assembler = RecordAssembler::with_limit(16);
        assert_eq!(assembler.push_line(r#"1,"open"#), None);
        let overflow = assembler.push_line("0123456789abcdef").unwrap();
        assert_eq!(split_record(&overflow), Err(RowError::UnterminatedQuote));

        assert_eq!(assembler.push_line("2,ok"), Some("2,ok".to_string()));
        assert_eq!(assembler.finish(), None);
    }
}
