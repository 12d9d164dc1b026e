use quickcheck::{QuickCheck, TestResult};

use super::chunked::Chunked;
use crate::{Decoder, Error, Value};

/// Property: a whitespace separated sequence of values decodes back to the
/// same sequence, followed by a clean end of stream, for any read sizes.
#[test]
fn multi_value_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(values: Vec<Value>, splits: Vec<usize>) -> TestResult {
        if values.is_empty() {
            return TestResult::discard();
        }
        let src = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n ");

        let mut dec = Decoder::new(Chunked::new(src, splits));
        let mut decoded = Vec::with_capacity(values.len());
        loop {
            let mut v = Value::Null;
            match dec.decode(&mut v) {
                Ok(()) => decoded.push(v),
                Err(Error::Eof) => break,
                Err(err) => return TestResult::error(err.to_string()),
            }
        }
        TestResult::from_bool(decoded == values)
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(Vec<Value>, Vec<usize>) -> TestResult);
}
