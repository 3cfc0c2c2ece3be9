//! String-typed conveniences on top of `Hash`.
//!
//! These treat keys and values as text, which is how option hashes built by
//! `from_string` are normally queried.

use crate::error::{HashError, Result};
use crate::hash::Hash;
use crate::options::{is_c_space, OptionsParser};

/// Parse a leading integer the way C `strtol` does with base 0.
///
/// Leading whitespace and a sign are accepted, `0x` selects hex, a leading
/// `0` selects octal. Parsing stops at the first byte that is not a digit of
/// the base and saturates on overflow. `None` when no digit was read.
fn parse_c_long(text: &str) -> Option<i64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while bytes.get(i).copied().is_some_and(is_c_space) {
        i += 1;
    }
    let negative = match bytes.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let at = |j: usize| bytes.get(j).copied();
    let radix = match (at(i), at(i + 1), at(i + 2)) {
        (Some(b'0'), Some(b'x' | b'X'), Some(h)) if h.is_ascii_hexdigit() => {
            i += 2;
            16
        }
        (Some(b'0'), _, _) => 8,
        _ => 10,
    };

    let mut acc: u64 = 0;
    let mut overflow = false;
    let mut digits = 0;
    while let Some(d) = at(i).and_then(|b| (b as char).to_digit(radix)) {
        match acc
            .checked_mul(u64::from(radix))
            .and_then(|a| a.checked_add(u64::from(d)))
        {
            Some(a) => acc = a,
            None => overflow = true,
        }
        digits += 1;
        i += 1;
    }
    if digits == 0 {
        return None;
    }

    let limit = if negative {
        i64::MIN.unsigned_abs()
    } else {
        i64::MAX as u64
    };
    Some(match (negative, overflow || acc > limit) {
        (false, true) => i64::MAX,
        (true, true) => i64::MIN,
        (false, false) => acc as i64,
        (true, false) => 0i64.wrapping_sub(acc as i64),
    })
}

impl Hash {
    /// First value of `key` as text. Invalid UTF-8 is replaced.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_one(key.as_bytes())?
            .map(|value| value.to_string_lossy()))
    }

    /// `get`, then remove `key` and all of its values.
    pub fn get_del(&mut self, key: &str) -> Result<Option<String>> {
        let value = self.get(key)?;
        if value.is_some() {
            self.delete_all(key.as_bytes())?;
        }
        Ok(value)
    }

    /// `yes`/`true` are true, `no`/`false` are false. Any other value, or an
    /// absent key, is `None`.
    ///
    /// Older C callers of this accessor read `false` as true; here it is false.
    pub fn get_as_boolean(&self, key: &str) -> Result<Option<bool>> {
        Ok(match self.get(key)?.as_deref() {
            Some("yes" | "true") => Some(true),
            Some("no" | "false") => Some(false),
            _ => None,
        })
    }

    /// First value of `key` as an integer, with C `strtol` base 0 rules.
    pub fn get_as_long(&self, key: &str) -> Result<Option<i64>> {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };
        match parse_c_long(&value) {
            Some(n) => Ok(Some(n)),
            None => Err(HashError::NotANumber {
                key: key.to_owned(),
                value,
            }),
        }
    }

    pub fn put_strings(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key.as_bytes(), value.as_bytes())
    }

    /// Add every pair of an options string such as
    /// `colour='yellow', size='large'`.
    ///
    /// On an unterminated value the pairs before it have already been added.
    pub fn from_string(&mut self, text: &str) -> Result<()> {
        for pair in OptionsParser::new(text) {
            let (key, value) = pair?;
            self.put(key.as_bytes(), &value)?;
        }
        Ok(())
    }

    /// Add pairs from an alternating `[key, value, key, value, ..]` slice.
    ///
    /// # Panics
    ///
    /// If `pairs` has odd length.
    pub fn from_array_of_strings(&mut self, pairs: &[&str]) -> Result<()> {
        assert!(
            pairs.len() % 2 == 0,
            "from_array_of_strings needs key/value pairs, got {} strings",
            pairs.len()
        );
        for kv in pairs.chunks_exact(2) {
            self.put_strings(kv[0], kv[1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use crate::memory::MemoryFactory;
    use std::rc::Rc;

    fn memory_hash() -> Hash {
        let factory = Rc::new(Factory::new("memory", MemoryFactory::default()));
        let mut h = Hash::new(factory).unwrap();
        h.open("options", 0o644, true, true, None).unwrap();
        h
    }

    #[test]
    fn strtol_bases_and_signs() {
        assert_eq!(parse_c_long("10"), Some(10));
        assert_eq!(parse_c_long("010"), Some(8));
        assert_eq!(parse_c_long("0x10"), Some(16));
        assert_eq!(parse_c_long("0XfF"), Some(255));
        assert_eq!(parse_c_long("  -42"), Some(-42));
        assert_eq!(parse_c_long("\x0B\x0C42"), Some(42));
        assert_eq!(parse_c_long("+7"), Some(7));
        assert_eq!(parse_c_long("0"), Some(0));
    }

    #[test]
    fn strtol_stops_at_first_non_digit() {
        assert_eq!(parse_c_long("12abc"), Some(12));
        assert_eq!(parse_c_long("09"), Some(0));
        // `0x` without a hex digit parses as the lone `0`.
        assert_eq!(parse_c_long("0xg"), Some(0));
        assert_eq!(parse_c_long("abc"), None);
        assert_eq!(parse_c_long(""), None);
        assert_eq!(parse_c_long("-"), None);
    }

    #[test]
    fn strtol_saturates() {
        assert_eq!(parse_c_long("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_c_long("9223372036854775808"), Some(i64::MAX));
        assert_eq!(parse_c_long("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_c_long("-99999999999999999999999"), Some(i64::MIN));
    }

    #[test]
    fn get_as_long_values() {
        let mut h = memory_hash();
        h.from_array_of_strings(&["hex", "0x10", "oct", "010", "dec", "10", "bad", "x1"])
            .unwrap();
        assert_eq!(h.get_as_long("hex").unwrap(), Some(16));
        assert_eq!(h.get_as_long("oct").unwrap(), Some(8));
        assert_eq!(h.get_as_long("dec").unwrap(), Some(10));
        assert_eq!(h.get_as_long("missing").unwrap(), None);
        match h.get_as_long("bad") {
            Err(HashError::NotANumber { key, value }) => {
                assert_eq!(key, "bad");
                assert_eq!(value, "x1");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn get_as_boolean_values() {
        let mut h = memory_hash();
        h.from_string("a='yes', b='true', c='no', d='false', e='maybe'")
            .unwrap();
        assert_eq!(h.get_as_boolean("a").unwrap(), Some(true));
        assert_eq!(h.get_as_boolean("b").unwrap(), Some(true));
        assert_eq!(h.get_as_boolean("c").unwrap(), Some(false));
        assert_eq!(h.get_as_boolean("d").unwrap(), Some(false));
        assert_eq!(h.get_as_boolean("e").unwrap(), None);
        assert_eq!(h.get_as_boolean("missing").unwrap(), None);
    }

    #[test]
    fn get_del_removes_every_value() {
        let mut h = memory_hash();
        h.put_strings("k", "1").unwrap();
        h.put_strings("k", "2").unwrap();
        assert_eq!(h.get_del("k").unwrap().as_deref(), Some("2"));
        assert!(!h.exists(b"k", None).unwrap());
        assert_eq!(h.get_del("k").unwrap(), None);
    }

    #[test]
    fn from_string_keeps_pairs_before_an_error() {
        let mut h = memory_hash();
        let err = h.from_string("a='1', b='2', c='never closed").unwrap_err();
        assert!(matches!(err, HashError::UnterminatedValue { .. }));
        assert_eq!(h.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(h.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(h.get("c").unwrap(), None);
    }

    #[test]
    fn from_string_unescapes_quotes() {
        let mut h = memory_hash();
        h.from_string(r"a='\'x\''").unwrap();
        assert_eq!(h.get("a").unwrap().as_deref(), Some("'x'"));
    }

    #[test]
    #[should_panic(expected = "key/value pairs")]
    fn from_array_of_strings_rejects_odd_length() {
        let mut h = memory_hash();
        let _ = h.from_array_of_strings(&["lonely"]);
    }
}
