#![no_main]
use std::{cell::RefCell, io::Read};

use arbitrary::Arbitrary;
use jsonpipe::{Decoder, Value};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};
use serde_json::Map;

const HEADER: usize = 5; // 1 flag + 4-byte seed

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

static WS_TABLE: &[&[u8]] = &[b" ", b"\t", b"\n", b"\r", b"\r\n"];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

/// Mostly well-formed input: whitespace separated JSON documents, so the
/// fuzzer spends its time on values rather than on the first bad byte.
fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x03);
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let mut prefix = HEADER;
        while prefix < size.max(HEADER + 1) && prefix < max_size {
            let limit = max_size - prefix;
            prefix += append_whitespace(&mut data[prefix..], limit);
            let limit = max_size - prefix;
            prefix += append_value(&mut data[prefix..], size, limit);
            if data[0] & 1 == 0 {
                break;
            }
        }
        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

fn append_whitespace(buf: &mut [u8], limit: usize) -> usize {
    with_rng(|rng| {
        if limit == 0 {
            return 0;
        }
        let n = rng.random_range(1..=limit.min(4));
        let mut written = 0;
        for _ in 0..n {
            let w = WS_TABLE[rng.random_range(0..WS_TABLE.len())];
            if written + w.len() > limit {
                break;
            }
            buf[written..written + w.len()].copy_from_slice(w);
            written += w.len();
        }
        written
    })
}

fn append_value(data: &mut [u8], size: usize, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    let value = loop {
        let s = with_rng(|rng| rng.random_range(1..size.max(2) * 2).min(limit));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(value) = ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes)) {
            break value;
        }
    };
    let serialized = serde_json::to_vec(&value.0).expect("serializing a serde_json::Value");
    let len = serialized.len().min(limit);
    data[..len].copy_from_slice(&serialized[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryValue(serde_json::Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        use serde_json::Value as J;

        let value = match u.choose_index(21)? {
            0 => J::Null,
            1 => J::Bool(u.arbitrary()?),
            2 => {
                let n: f64 = u.arbitrary()?;
                J::Number(serde_json::Number::from_f64(n).ok_or(arbitrary::Error::IncorrectFormat)?)
            }
            3..=10 => J::String(u.arbitrary()?),
            11..=15 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                J::Array(elems.into_iter().map(|v| v.0).collect())
            }
            16..=20 => {
                let m: Vec<(String, ArbitraryValue)> = u.arbitrary()?;
                J::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, v.0))))
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryValue(value))
    }
}

/// Delivers the input in pseudo-random pieces derived from a seed.
struct Chunked<'a> {
    data: &'a [u8],
    state: u32,
}

impl Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.data.is_empty() {
            return Ok(0);
        }
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        let n = (self.state as usize % self.data.len() + 1).min(buf.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

struct Outcome {
    value: Value,
    result: Result<(), String>,
    syntax: bool,
}

fn outcome(source: impl Read) -> Outcome {
    let mut value = Value::Null;
    let result = jsonpipe::unmarshal(source, &mut value);
    let syntax = matches!(result, Err(jsonpipe::Error::Syntax(_)));
    Outcome {
        value,
        result: result.map_err(|e| format!("{e} @ {:?}", e.offset())),
        syntax,
    }
}

fn stream(source: impl Read) -> Vec<Result<Value, String>> {
    let mut dec = Decoder::new(source);
    let mut out = Vec::new();
    loop {
        let mut value = Value::Null;
        match dec.decode(&mut value) {
            Ok(()) => out.push(Ok(value)),
            Err(err) if err.is_eof() => return out,
            Err(err) => {
                out.push(Err(format!("{err} @ {:?}", err.offset())));
                return out;
            }
        }
    }
}

fn decode(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }
    let flags = data[0];
    let seed = u32::from_le_bytes([data[1], data[2], data[3], data[4]]) | 1;
    let data = &data[HEADER..];

    if flags & 2 == 0 {
        let whole = outcome(data);
        let chunked = outcome(Chunked { data, state: seed });
        assert_eq!(whole.result, chunked.result);
        if !whole.syntax {
            assert_eq!(whole.value, chunked.value);
        }
        assert_eq!(jsonpipe::valid(data), !whole.syntax);
    } else {
        assert_eq!(stream(data), stream(Chunked { data, state: seed }));
    }
}

fuzz_target!(|data: &[u8]| decode(data));
