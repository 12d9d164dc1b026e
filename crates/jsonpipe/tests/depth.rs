#![allow(missing_docs)]

use jsonpipe::{Decoder, DecoderOptions, Error, Value, decode_struct, unmarshal, unmarshal_with};

/// `levels` nested arrays wrapped in an object, so the outermost container
/// counts as one level.
fn nested_arrays(levels: usize) -> Vec<u8> {
    let mut src = b"{\"a\":".to_vec();
    src.extend(std::iter::repeat_n(b'[', levels - 1));
    src.extend(std::iter::repeat_n(b']', levels - 1));
    src.push(b'}');
    src
}

fn assert_max_depth(err: &Error, offset: usize) {
    assert!(matches!(err, Error::Syntax(_)), "{err:?}");
    assert!(err.to_string().ends_with("exceeded max depth"), "{err}");
    assert_eq!(err.offset(), Some(offset));
}

// These run on the default test thread. Deep results are taken apart one
// level at a time so that dropping them does not recurse either.

#[test]
fn deepest_accepted_nesting() {
    let mut v = Value::Null;
    unmarshal(&nested_arrays(10_000)[..], &mut v).unwrap();
    let Value::Object(mut fields) = v else {
        panic!("expected an object, got {v:?}");
    };
    let mut depth = 1;
    let mut cur = fields.remove("a");
    while let Some(Value::Array(mut items)) = cur {
        depth += 1;
        cur = items.pop();
    }
    assert_eq!(depth, 10_000);
}

#[test]
fn one_level_too_deep() {
    let mut v = Value::Null;
    let err = unmarshal(&nested_arrays(10_001)[..], &mut v).unwrap_err();
    // The offending bracket is the 10001st container, after the five
    // bytes of `{"a":` and 9999 brackets.
    assert_max_depth(&err, 5 + 10_000);
    assert_eq!(err.to_string(), "invalid character '[' exceeded max depth");
}

#[test]
fn millions_of_levels_fail_fast() {
    let src = vec![b'['; 3_000_000];
    let mut v = Value::Null;
    let err = unmarshal(&src[..], &mut v).unwrap_err();
    assert_max_depth(&err, 10_001);

    let src = b"{\"x\":".repeat(3_000_000);
    let err = unmarshal(&src[..], &mut v).unwrap_err();
    assert!(err.to_string().starts_with("invalid character '{'"), "{err}");
}

decode_struct! {
    #[derive(Debug, Default)]
    struct Chain {
        pub next: Option<Box<Chain>>,
        pub depth: u32,
    }
}

fn chain(levels: usize) -> Vec<u8> {
    let mut src = b"{\"next\":".repeat(levels - 1);
    src.extend_from_slice(b"{\"depth\":1}");
    src.extend(std::iter::repeat_n(b'}', levels - 1));
    src
}

#[test]
fn self_referential_struct_is_bounded_by_the_scanner() {
    let mut root = Chain::default();
    unmarshal(&chain(10_000)[..], &mut root).unwrap();
    let mut levels = 1;
    let mut depth = root.depth;
    let mut next = root.next.take();
    while let Some(mut node) = next {
        levels += 1;
        depth = node.depth;
        next = node.next.take();
    }
    assert_eq!(levels, 10_000);
    assert_eq!(depth, 1);

    let mut root = Chain::default();
    let err = unmarshal(&chain(10_001)[..], &mut root).unwrap_err();
    assert_max_depth(&err, 10_000 * 8 + 1);
    let mut next = root.next.take();
    while let Some(mut node) = next {
        next = node.next.take();
    }
}

#[test]
fn limit_follows_options() {
    let options = DecoderOptions {
        max_depth: 3,
        ..Default::default()
    };
    let mut v = Value::Null;
    unmarshal_with(&b"[[[1]]]"[..], &mut v, options.clone()).unwrap();
    let err = unmarshal_with(&b"[[[[1]]]]"[..], &mut v, options).unwrap_err();
    assert_max_depth(&err, 4);
}

#[test]
fn decoder_and_tokens_share_the_limit() {
    let src = vec![b'['; 2_000_000];
    let mut dec = Decoder::new(&src[..]);
    let err = dec.decode(&mut Value::Null).unwrap_err();
    assert_max_depth(&err, 10_001);

    let mut dec = Decoder::new(&src[..]);
    let err = loop {
        match dec.token() {
            Ok(_) => {}
            Err(err) => break err,
        }
    };
    assert_max_depth(&err, 10_001);
}
