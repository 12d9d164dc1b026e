#![allow(missing_docs)]

use std::io::Read;

use insta::assert_snapshot;
use jsonpipe::{Decoder, Error, Token, Value, decode_struct};

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    struct Message {
        pub name: String,
        pub text: String,
    }
}

fn all_tokens<R: Read>(dec: &mut Decoder<R>) -> String {
    let mut lines = Vec::new();
    loop {
        match dec.token() {
            Ok(tok) => lines.push(format!("{tok:?}")),
            Err(Error::Eof) => return lines.join("\n"),
            Err(err) => panic!("token failed: {err}"),
        }
    }
}

#[test]
fn decodes_a_sequence_of_values() {
    let src = "{\"Name\": \"Ed\", \"Text\": \"Knock knock.\"}\n\
               {\"Name\": \"Sam\", \"Text\": \"Who's there?\"}\n\
               \t{\"Name\": \"Ed\", \"Text\": \"Go fmt.\"}   \n";
    let mut dec = Decoder::new(src.as_bytes());
    let mut seen = Vec::new();
    loop {
        let mut msg = Message::default();
        match dec.decode(&mut msg) {
            Ok(()) => seen.push(format!("{}: {}", msg.name, msg.text)),
            Err(Error::Eof) => break,
            Err(err) => panic!("{err}"),
        }
    }
    assert_eq!(
        seen,
        ["Ed: Knock knock.", "Sam: Who's there?", "Ed: Go fmt."]
    );
}

#[test]
fn streams_array_elements() {
    let src = r#"
        [
            {"Name": "Ed", "Text": "Knock knock."},
            {"Name": "Sam", "Text": "Who's there?"},
            {"Name": "Ed", "Text": "Go fmt."}
        ]
    "#;
    let mut dec = Decoder::new(src.as_bytes());
    assert_eq!(dec.token().unwrap(), Token::Delim('['));
    let mut names = Vec::new();
    while dec.more() {
        let mut msg = Message::default();
        dec.decode(&mut msg).unwrap();
        names.push(msg.name);
    }
    assert_eq!(dec.token().unwrap(), Token::Delim(']'));
    assert!(dec.token().unwrap_err().is_eof());
    assert_eq!(names, ["Ed", "Sam", "Ed"]);
}

#[test]
fn token_stream_snapshot() {
    let src = r#"{"Message": "Hello", "Array": [1, 2, 3], "Null": null, "Number": 1.234}"#;
    let mut dec = Decoder::new(src.as_bytes());
    assert_snapshot!(all_tokens(&mut dec), @r#"
    Delim('{')
    String("Message")
    String("Hello")
    String("Array")
    Delim('[')
    Number(1.0)
    Number(2.0)
    Number(3.0)
    Delim(']')
    String("Null")
    Null
    String("Number")
    Number(1.234)
    Delim('}')
    "#);
}

#[test]
fn tokens_and_values_interleave_mid_object() {
    let src = r#"{"skip": 1, "keep": {"name": "x", "text": "y"}, "rest": [true]}"#;
    let mut dec = Decoder::new(src.as_bytes());
    assert_eq!(dec.token().unwrap(), Token::Delim('{'));
    assert_eq!(dec.token().unwrap(), Token::String("skip".into()));
    assert_eq!(dec.token().unwrap(), Token::Number(1.0));
    assert_eq!(dec.token().unwrap(), Token::String("keep".into()));
    let mut msg = Message::default();
    dec.decode(&mut msg).unwrap();
    assert_eq!(msg.text, "y");
    assert_eq!(dec.token().unwrap(), Token::String("rest".into()));
    let mut rest = Value::Null;
    dec.decode(&mut rest).unwrap();
    assert_eq!(rest, Value::Array(vec![Value::Boolean(true)]));
    assert!(!dec.more());
    assert_eq!(dec.token().unwrap(), Token::Delim('}'));
}

#[test]
fn type_errors_do_not_stop_the_stream() {
    let mut dec = Decoder::new(&br#""x" 2 300 4"#[..]);
    let mut n = 0u8;
    assert!(matches!(dec.decode(&mut n), Err(Error::Type(_))));
    dec.decode(&mut n).unwrap();
    assert_eq!(n, 2);
    let err = dec.decode(&mut n).unwrap_err();
    assert_eq!(err.offset(), Some(9));
    dec.decode(&mut n).unwrap();
    assert_eq!(n, 4);
    assert!(dec.decode(&mut n).unwrap_err().is_eof());
}

#[test]
fn syntax_errors_are_final() {
    let mut dec = Decoder::new(&b"[1] [2 }"[..]);
    let mut v = Value::Null;
    dec.decode(&mut v).unwrap();
    let first = dec.decode(&mut v).unwrap_err();
    assert_eq!(first.to_string(), "invalid character '}' after array element");
    assert_eq!(first.offset(), Some(8));
    let again = dec.decode(&mut v).unwrap_err();
    assert_eq!(again.to_string(), first.to_string());
}

#[test]
fn truncated_value_is_unexpected_end() {
    let mut dec = Decoder::new(&br#"{"a": 1} {"b": "#[..]);
    let mut v = Value::Null;
    dec.decode(&mut v).unwrap();
    let err = dec.decode(&mut v).unwrap_err();
    assert_eq!(err.to_string(), "unexpected end of JSON input");
}

#[test]
fn buffered_returns_unconsumed_bytes() {
    let mut dec = Decoder::new(&br#"{"a": 1} and then some text"#[..]);
    let mut v = Value::Null;
    dec.decode(&mut v).unwrap();
    assert_eq!(dec.input_offset(), 8);

    let mut rest = String::new();
    dec.buffered().read_to_string(&mut rest).unwrap();
    assert_eq!(rest, " and then some text");
}

#[test]
fn input_offset_tracks_consumption() {
    let mut dec = Decoder::new(&b" [ 10 , 20 ] "[..]);
    assert_eq!(dec.input_offset(), 0);
    dec.token().unwrap();
    assert_eq!(dec.input_offset(), 2);
    dec.token().unwrap();
    assert_eq!(dec.input_offset(), 5);
    dec.token().unwrap();
    assert_eq!(dec.input_offset(), 10);
    dec.token().unwrap();
    assert_eq!(dec.input_offset(), 12);
}

#[test]
fn transcode_rewrites_with_output_settings() {
    let src = br#"{"html": "<b>&</b>", "list": [1, 2]}  [ ]  "s""#;
    let mut dec = Decoder::new(&src[..]);
    dec.set_indent("", "  ");
    let mut out = Vec::new();
    dec.transcode(&mut out).unwrap();
    dec.set_indent("", "");
    dec.set_escape_html(false);
    dec.transcode(&mut out).unwrap();
    dec.transcode(&mut out).unwrap();
    assert!(dec.transcode(&mut out).unwrap_err().is_eof());

    assert_snapshot!(String::from_utf8(out).unwrap().trim_end(), @r#"
    {
      "html": "\u003cb\u003e\u0026\u003c/b\u003e",
      "list": [
        1,
        2
      ]
    }
    []
    "s"
    "#);
}

#[test]
fn use_number_applies_to_tokens_and_values() {
    let mut dec = Decoder::new(&b"[1.50, 2e3]"[..]);
    dec.use_number();
    dec.token().unwrap();
    assert_eq!(
        dec.token().unwrap(),
        Token::Literal(jsonpipe::Number::from("1.50"))
    );
    let mut v = Value::Null;
    dec.decode(&mut v).unwrap();
    assert_eq!(v.to_string(), "2e3");
}

#[test]
fn empty_and_blank_sources_end_cleanly() {
    for src in [&b""[..], &b" \n\t "[..]] {
        let mut dec = Decoder::new(src);
        let mut v = Value::Null;
        assert!(dec.decode(&mut v).unwrap_err().is_eof());
        assert!(!dec.more());
    }
}
