//! Parser for the options mini-language: `key1='value1', key2='value2'`.
//!
//! Keys are runs of `[A-Za-z0-9_-]`. Values are single quoted and a
//! backslash makes the following byte literal, so `\'` is a quote and `\\` a
//! backslash. Whitespace is allowed around `=` and between pairs, commas are
//! optional separators.
//!
//! Recovery is lenient: a byte that does not fit the grammar is skipped and
//! scanning restarts looking for a key. Running out of text between pairs
//! ends parsing quietly. The one hard error is a quoted value that never
//! closes.

use crate::error::{HashError, Result};
use tracing::trace;

/// C `isspace`: unlike `u8::is_ascii_whitespace` this includes `\x0B`.
pub(crate) fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t'..=b'\r')
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Iterator over the `(key, value)` pairs of an options string.
///
/// Yields at most one `Err`, after which it is exhausted.
pub struct OptionsParser<'a> {
    text: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> OptionsParser<'a> {
    pub fn new(text: &'a str) -> Self {
        trace!(text, "parsing options");
        Self {
            text: text.as_bytes(),
            pos: 0,
            done: false,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    /// Expect `want` after optional whitespace. Skips one byte on mismatch.
    fn expect_byte(&mut self, want: u8) -> Option<bool> {
        self.skip_while(is_c_space);
        let b = self.peek()?;
        self.pos += 1;
        Some(b == want)
    }

    /// Read a quoted value whose opening quote is already consumed.
    fn value(&mut self, key: &str) -> Result<Vec<u8>> {
        let offset = self.pos - 1;
        let unterminated = || HashError::UnterminatedValue {
            key: key.to_owned(),
            offset,
        };
        let mut value = Vec::new();
        loop {
            let b = self.peek().ok_or_else(unterminated)?;
            self.pos += 1;
            match b {
                b'\\' => {
                    let escaped = self.peek().ok_or_else(unterminated)?;
                    self.pos += 1;
                    value.push(escaped);
                }
                b'\'' => return Ok(value),
                _ => value.push(b),
            }
        }
    }

    fn next_pair(&mut self) -> Option<Result<(String, Vec<u8>)>> {
        loop {
            self.skip_while(|b| is_c_space(b) || b == b',');
            self.peek()?;

            let start = self.pos;
            self.skip_while(is_key_byte);
            self.peek()?;
            if self.pos == start {
                trace!(offset = self.pos, "skipping byte before key");
                self.pos += 1;
                continue;
            }
            // Key bytes are ASCII.
            let key = String::from_utf8_lossy(&self.text[start..self.pos]).into_owned();

            if !self.expect_byte(b'=')? {
                trace!(key = %key, offset = self.pos - 1, "expected `=`");
                continue;
            }
            if !self.expect_byte(b'\'')? {
                trace!(key = %key, offset = self.pos - 1, "expected opening quote");
                continue;
            }
            return Some(self.value(&key).map(|value| {
                trace!(key = %key, len = value.len(), "parsed option");
                (key, value)
            }));
        }
    }
}

impl Iterator for OptionsParser<'_> {
    type Item = Result<(String, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_pair();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<(String, String)> {
        OptionsParser::new(text)
            .map(|r| {
                let (k, v) = r.unwrap();
                (k, String::from_utf8(v).unwrap())
            })
            .collect()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_owned(), v.to_owned())
    }

    #[test]
    fn two_pairs_with_comma() {
        assert_eq!(
            parse("colour='yellow', size='large'"),
            vec![pair("colour", "yellow"), pair("size", "large")]
        );
    }

    #[test]
    fn whitespace_around_equals_and_no_comma() {
        assert_eq!(
            parse("  a =  'x'\n\tb= ''  "),
            vec![pair("a", "x"), pair("b", "")]
        );
    }

    #[test]
    fn vertical_tab_and_form_feed_are_whitespace() {
        assert_eq!(
            parse("a\x0B=\x0B'x'\x0Bb\x0C=\r'y'"),
            vec![pair("a", "x"), pair("b", "y")]
        );
    }

    #[test]
    fn backslash_escapes_next_byte() {
        assert_eq!(parse(r"a='\'x\''"), vec![pair("a", "'x'")]);
        assert_eq!(parse(r"a='c:\\tmp'"), vec![pair("a", r"c:\tmp")]);
        assert_eq!(parse(r"a='\n'"), vec![pair("a", "n")]);
    }

    #[test]
    fn keys_allow_underscore_and_dash() {
        assert_eq!(
            parse("hash_type='bdb', new-name='x'"),
            vec![pair("hash_type", "bdb"), pair("new-name", "x")]
        );
    }

    #[test]
    fn malformed_bytes_are_skipped() {
        // `;` is not a key byte, `b:` lacks `=`, `c=x` lacks a quote.
        assert_eq!(
            parse(";a='1' b:'2' c=x d='4'"),
            vec![pair("a", "1"), pair("d", "4")]
        );
    }

    #[test]
    fn end_of_text_outside_value_is_quiet() {
        assert!(parse("").is_empty());
        assert!(parse(" , ,").is_empty());
        assert_eq!(parse("a='1', b"), vec![pair("a", "1")]);
        assert_eq!(parse("a='1', b ="), vec![pair("a", "1")]);
    }

    #[test]
    fn unterminated_value_is_an_error_once() {
        let mut p = OptionsParser::new("a='1', b='oops");
        assert_eq!(p.next().unwrap().unwrap().0, "a");
        match p.next() {
            Some(Err(HashError::UnterminatedValue { key, offset })) => {
                assert_eq!(key, "b");
                assert_eq!(offset, 9);
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.map(|(k, _)| k))),
        }
        assert!(p.next().is_none());

        let trailing_backslash: Vec<_> = OptionsParser::new(r"a='x\").collect();
        assert!(matches!(
            trailing_backslash.as_slice(),
            [Err(HashError::UnterminatedValue { .. })]
        ));
    }
}
