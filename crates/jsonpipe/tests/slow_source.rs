#![allow(missing_docs)]

use std::{
    io::{self, ErrorKind, Read},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
    time::Duration,
};

use jsonpipe::{Decoder, DecoderOptions, Error, RetryPolicy, Value, unmarshal, unmarshal_with};
use rstest::rstest;

/// A non-blocking pipe: reports `WouldBlock` until the producer sends more
/// and ends once the producer hangs up.
struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl ChannelReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.try_recv() {
                Ok(bytes) => self.pending = bytes,
                Err(TryRecvError::Empty) => return Err(ErrorKind::WouldBlock.into()),
                Err(TryRecvError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Sends `data` one byte at a time with a pause between bytes.
fn trickle(data: &'static [u8], pause: Duration) -> ChannelReader {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for &b in data {
            if tx.send(vec![b]).is_err() {
                return;
            }
            thread::sleep(pause);
        }
    });
    ChannelReader::new(rx)
}

/// Fails every other read with `Interrupted`.
struct Flaky<R> {
    inner: R,
    fail_next: bool,
}

impl<R: Read> Read for Flaky<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fail_next = !self.fail_next;
        if self.fail_next {
            return Err(ErrorKind::Interrupted.into());
        }
        self.inner.read(&mut buf[..1])
    }
}

/// Yields its bytes and then a hard failure.
struct Broken(&'static [u8]);

impl Read for Broken {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.0.is_empty() {
            return Err(io::Error::new(ErrorKind::ConnectionReset, "peer went away"));
        }
        let n = buf.len().min(self.0.len());
        buf[..n].copy_from_slice(&self.0[..n]);
        self.0 = &self.0[n..];
        Ok(n)
    }
}

/// Hands out one byte per read.
struct OneByte<'a>(&'a [u8]);

impl Read for OneByte<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.split_first() {
            Some((&b, rest)) if !buf.is_empty() => {
                buf[0] = b;
                self.0 = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

const DOC: &[u8] =
    b"{\"id\": 7, \"tags\": [\"a\", \"b\xc3\xa9\"], \"nested\": {\"ok\": true, \"n\": null}, \"pi\": 3.25}";

#[rstest]
#[case::immediate(RetryPolicy::Immediate)]
#[case::backoff(RetryPolicy::Backoff(Duration::from_micros(200)))]
fn decodes_from_a_trickling_pipe(#[case] retry: RetryPolicy) {
    let source = trickle(DOC, Duration::from_micros(50));
    let mut value = Value::Null;
    unmarshal_with(
        source,
        &mut value,
        DecoderOptions {
            retry,
            ..Default::default()
        },
    )
    .unwrap();
    let expected: serde_json::Value = serde_json::from_slice(DOC).unwrap();
    assert_eq!(serde_json::to_value(&value).unwrap(), expected);
}

#[test]
fn interrupted_reads_are_retried() {
    let mut value = Value::Null;
    unmarshal(
        Flaky {
            inner: &b"[1, \"two\", 3]"[..],
            fail_next: false,
        },
        &mut value,
    )
    .unwrap();
    assert_eq!(value.to_string(), r#"[1,"two",3]"#);
}

#[test]
fn source_failures_surface_as_io_errors() {
    let mut value = Value::Null;
    let err = unmarshal(Broken(br#"{"a": [1, 2"#), &mut value).unwrap_err();
    match err {
        Error::Io(io) => assert_eq!(io.kind(), ErrorKind::ConnectionReset),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn source_failure_leaves_decoder_unusable() {
    let mut dec = Decoder::new(Broken(br#"{"a": 1} {"b": "#));
    let mut value = Value::Null;
    dec.decode(&mut value).unwrap();
    assert!(matches!(dec.decode(&mut value), Err(Error::Io(_))));
    let err = dec.decode(&mut value).unwrap_err();
    assert!(matches!(err, Error::InvalidTarget(_)));
    assert!(err.to_string().contains("peer went away"), "{err}");
}

#[rstest]
#[case::valid(DOC)]
#[case::type_mismatch(br#"{"id": "seven", "pi": [1]}"#)]
#[case::bad_escape(br#"{"id": "\x"}"#)]
#[case::truncated(br#"{"id": 7, "tags": ["#)]
#[case::trailing(br#"{"id": 7} 8"#)]
fn byte_at_a_time_matches_whole_buffer(#[case] src: &[u8]) {
    #[derive(Debug, PartialEq)]
    struct Outcome(Value, Result<(), String>);

    fn run(source: impl Read) -> Outcome {
        let mut value = Value::Null;
        let result = unmarshal(source, &mut value).map_err(|e| format!("{e} @ {:?}", e.offset()));
        Outcome(value, result)
    }

    assert_eq!(run(src), run(OneByte(src)));
}

#[test]
fn values_are_delivered_before_the_writer_finishes() {
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let (ack_tx, ack_rx) = mpsc::channel::<String>();

    let consumer = thread::spawn(move || {
        let mut dec = Decoder::with_options(
            ChannelReader::new(rx),
            DecoderOptions {
                retry: RetryPolicy::Backoff(Duration::from_micros(100)),
                ..Default::default()
            },
        );
        let mut count = 0;
        loop {
            let mut value = Value::Null;
            match dec.decode(&mut value) {
                Ok(()) => {
                    count += 1;
                    if ack_tx.send(value.to_string()).is_err() {
                        break;
                    }
                }
                Err(Error::Eof) => break,
                Err(err) => panic!("{err}"),
            }
        }
        count
    });

    tx.send(br#"{"seq": 1, "body": "fir"#.to_vec()).unwrap();
    tx.send(br#"st"}"#.to_vec()).unwrap();
    // The second value is only written once the first has been seen.
    let first = ack_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(first, r#"{"body":"first","seq":1}"#);

    tx.send(b"\n[\"second\"]\n".to_vec()).unwrap();
    let second = ack_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(second, r#"["second"]"#);

    drop(tx);
    assert_eq!(consumer.join().unwrap(), 2);
}
