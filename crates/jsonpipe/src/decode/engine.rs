//! Assignment of scanned values into destinations.
//!
//! [`DecodeState`] walks the bytes of one value through a
//! [`LogicalStream`], which has already validated everything it hands out,
//! and writes into a [`Decode`] destination as it goes. Type mismatches are
//! remembered and decoding carries on; the last one is reported once the
//! value is done. Anything else aborts.

use std::io::Read;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::{
    Decode, EntryKey, MapSlot, StructSlot, Target, UnmarshalText,
    fields::{self, Step},
    short_type_name,
    unquote::unquote,
};
use crate::{
    Number,
    error::{Error, HookError, InvalidTargetError, SyntaxError, UnmarshalTypeError},
    scanner::is_space,
    stream::LogicalStream,
    value::{Array, Map, Value},
};

/// Remaining stack below which a nested value moves to a fresh segment.
const RED_ZONE: usize = 64 * 1024;
/// Size of each stack segment allocated for nesting.
const STACK_SEGMENT: usize = 1024 * 1024;

/// Struct and field names reported with type errors.
#[derive(Debug, Default)]
struct Context {
    struct_name: &'static str,
    fields: Vec<&'static str>,
}

pub(crate) struct DecodeState<'s, R> {
    stream: &'s mut LogicalStream<R>,
    pos: usize,
    use_number: bool,
    saved: Option<Error>,
    context: Context,
}

enum Resolved<'a> {
    Slot(&'a mut dyn Decode),
    /// Reaching the field needs an absent pointer that cannot be allocated.
    Blocked(&'static str),
}

impl<'s, R: Read> DecodeState<'s, R> {
    pub(crate) fn new(stream: &'s mut LogicalStream<R>, pos: usize, use_number: bool) -> Self {
        Self {
            stream,
            pos,
            use_number,
            saved: None,
            context: Context::default(),
        }
    }

    /// Position after the decoded value and the error to report for it, if
    /// any.
    pub(crate) fn finish(self) -> (usize, Option<Error>) {
        (self.pos, self.saved)
    }

    /// Decodes the value starting at the current position into `dst`.
    ///
    /// Typed destinations nest through this call once per container, up to
    /// the scanner's depth limit, so the stack grows on demand.
    pub(crate) fn value(&mut self, dst: &mut dyn Decode) -> Result<(), Error> {
        stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || self.nested_value(dst))
    }

    fn nested_value(&mut self, dst: &mut dyn Decode) -> Result<(), Error> {
        let c = self.skip_space()?;
        let type_name = dst.type_name();
        match dst.target() {
            Target::Hook(hook) => {
                let raw = self.capture()?;
                return hook.unmarshal_json(&raw).map_err(|e| self.hook_error(e));
            }
            Target::Raw(raw) => {
                let bytes = self.capture()?;
                raw.set(&bytes);
                return Ok(());
            }
            Target::Pointer(ptr) if c == b'{' || c == b'[' => {
                return self.value(ptr.get_or_insert());
            }
            Target::Any(slot) if c == b'{' || c == b'[' => return self.any(slot),
            target if c == b'{' => return self.object(target, type_name),
            target if c == b'[' => return self.array(target, type_name),
            _ => {}
        }
        let item = self.literal_item()?;
        let end = self.pos;
        self.store(&item, dst, false, end)
    }

    fn object(&mut self, target: Target<'_>, type_name: &'static str) -> Result<(), Error> {
        match target {
            Target::Struct(slot) => self.struct_fields(slot),
            Target::Map(slot) => self.map_entries(slot),
            _ => {
                self.type_error("object", type_name, self.pos + 1);
                self.skip_value()
            }
        }
    }

    fn struct_fields(&mut self, slot: &mut dyn StructSlot) -> Result<(), Error> {
        let info = slot.info();
        let table = fields::cached(info);
        self.pos += 1;
        if self.close_early(b'}')? {
            return Ok(());
        }
        loop {
            let (key, _) = self.object_key()?;
            match table.lookup(&key) {
                Some(field) => {
                    let outer = std::mem::replace(&mut self.context.struct_name, info.name);
                    self.context.fields.push(field.name);
                    let result = match resolve(&mut *slot, &field.path) {
                        Ok(Resolved::Slot(dst)) if field.quoted => self.quoted(dst),
                        Ok(Resolved::Slot(dst)) => self.value(dst),
                        Ok(Resolved::Blocked(embed)) => {
                            self.save(Error::EmbeddedPointer(embed));
                            self.skip_value()
                        }
                        Err(err) => Err(err),
                    };
                    self.context.fields.pop();
                    self.context.struct_name = outer;
                    result?;
                }
                None => self.skip_value()?,
            }
            if self.member_end(b'}')? {
                break;
            }
            self.release();
        }
        self.release();
        Ok(())
    }

    fn map_entries(&mut self, slot: &mut dyn MapSlot) -> Result<(), Error> {
        self.pos += 1;
        if self.close_early(b'}')? {
            return Ok(());
        }
        loop {
            let (key, start) = self.object_key()?;
            let entry = EntryKey::new(&key, start + 1);
            let mismatch =
                slot.decode_entry(&entry, &mut |elem: &mut dyn Decode| self.value(elem))?;
            if let Some(mismatch) = mismatch {
                self.save(mismatch.into());
            }
            if self.member_end(b'}')? {
                break;
            }
            self.release();
        }
        self.release();
        Ok(())
    }

    fn array(&mut self, target: Target<'_>, type_name: &'static str) -> Result<(), Error> {
        let Target::Seq(seq) = target else {
            self.type_error("array", type_name, self.pos + 1);
            return self.skip_value();
        };
        self.pos += 1;
        let mut len = 0;
        if !self.close_early(b']')? {
            loop {
                match seq.elem_mut(len) {
                    Some(elem) => self.value(elem)?,
                    None => self.skip_value()?,
                }
                len += 1;
                if self.member_end(b']')? {
                    break;
                }
                self.release();
            }
        }
        if len < seq.count() {
            seq.truncate(len);
        }
        self.release();
        Ok(())
    }

    /// Decodes a `,string` field: the value must be a string holding a
    /// literal, or `null`.
    fn quoted(&mut self, dst: &mut dyn Decode) -> Result<(), Error> {
        let c = self.skip_space()?;
        let unquoted = Error::UnquotedStringTag {
            type_name: short_type_name(dst.type_name()),
        };
        if c == b'{' || c == b'[' {
            self.skip_value()?;
            self.save(unquoted);
            return Ok(());
        }
        let item = self.literal_item()?;
        let end = self.pos;
        match item.first() {
            Some(b'n') => self.store(b"null", dst, false, end),
            Some(b'"') => match unquote(&item) {
                Some(text) => self.store(text.as_bytes(), dst, true, end),
                None => {
                    self.save(unquoted);
                    Ok(())
                }
            },
            _ => {
                self.save(unquoted);
                Ok(())
            }
        }
    }

    /// Stores a scalar literal. `item` is the unquoted string contents when
    /// `from_quoted` is set, and `offset` is where the literal ends.
    fn store(
        &mut self,
        item: &[u8],
        dst: &mut dyn Decode,
        from_quoted: bool,
        offset: usize,
    ) -> Result<(), Error> {
        let Some(&first) = item.first() else {
            return Ok(());
        };
        let type_name = dst.type_name();
        match dst.target() {
            Target::Hook(hook) => hook.unmarshal_json(item).map_err(|e| self.hook_error(e)),
            Target::Raw(raw) => {
                raw.set(item);
                Ok(())
            }
            Target::Pointer(ptr) if first == b'n' => {
                if from_quoted && item != b"null" {
                    self.save(string_tag(item, type_name));
                } else {
                    ptr.clear();
                }
                Ok(())
            }
            Target::Pointer(ptr) => self.store(item, ptr.get_or_insert(), from_quoted, offset),
            Target::Text(text) => self.store_text(item, text, from_quoted, offset, type_name),
            target => self.store_plain(item, target, from_quoted, offset, type_name),
        }
    }

    fn store_text(
        &mut self,
        item: &[u8],
        text: &mut dyn UnmarshalText,
        from_quoted: bool,
        offset: usize,
        type_name: &'static str,
    ) -> Result<(), Error> {
        match item[0] {
            b'"' => {
                let s = unquote(item).ok_or_else(|| self.bad_string(item, from_quoted, type_name))?;
                text.unmarshal_text(&s).map_err(|e| self.hook_error(e))
            }
            b'n' if !from_quoted => Ok(()),
            _ if from_quoted => {
                self.save(string_tag(item, type_name));
                Ok(())
            }
            b't' | b'f' => {
                self.type_error("bool", type_name, offset);
                Ok(())
            }
            _ => {
                self.type_error("number", type_name, offset);
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn store_plain(
        &mut self,
        item: &[u8],
        target: Target<'_>,
        from_quoted: bool,
        offset: usize,
        type_name: &'static str,
    ) -> Result<(), Error> {
        match item[0] {
            b'n' => {
                if from_quoted && item != b"null" {
                    self.save(string_tag(item, type_name));
                    return Ok(());
                }
                match target {
                    Target::Any(slot) => *slot = Value::Null,
                    Target::Map(slot) => slot.clear(),
                    Target::Seq(slot) => slot.clear(),
                    _ => {}
                }
            }
            b't' | b'f' => {
                if from_quoted && item != b"true" && item != b"false" {
                    self.save(string_tag(item, type_name));
                    return Ok(());
                }
                let value = item[0] == b't';
                match target {
                    Target::Bool(slot) => *slot = value,
                    Target::Any(slot) => *slot = Value::Boolean(value),
                    _ if from_quoted => self.save(string_tag(item, type_name)),
                    _ => self.type_error("bool", type_name, offset),
                }
            }
            b'"' => {
                let s = unquote(item).ok_or_else(|| self.bad_string(item, from_quoted, type_name))?;
                match target {
                    Target::Str(slot) => *slot = s,
                    Target::Number(slot) => {
                        if !Number::is_valid(&s) {
                            return Err(Error::InvalidNumber {
                                literal: String::from_utf8_lossy(item).into_owned(),
                            });
                        }
                        *slot = Number::from(s);
                    }
                    Target::Any(slot) => *slot = Value::String(s),
                    Target::Seq(slot) => match slot.bytes_mut() {
                        Some(bytes) => match decode_base64(&s) {
                            Ok(decoded) => *bytes = decoded,
                            Err(err) => self.save(err.into()),
                        },
                        None => self.type_error("string", type_name, offset),
                    },
                    _ => self.type_error("string", type_name, offset),
                }
            }
            c => {
                if c != b'-' && !c.is_ascii_digit() {
                    return Err(self.bad_string(item, from_quoted, type_name));
                }
                let s = String::from_utf8_lossy(item);
                match target {
                    Target::Any(slot) if self.use_number => {
                        *slot = Value::RawNumber(Number::from(&*s));
                    }
                    Target::Any(slot) => match parse_f64(&s) {
                        Some(n) => *slot = Value::Number(n),
                        None => self.type_error(format!("number {s}"), "f64", offset),
                    },
                    Target::Int(slot) => {
                        if !s.parse::<i64>().is_ok_and(|n| slot.set_i64(n)) {
                            self.type_error(format!("number {s}"), type_name, offset);
                        }
                    }
                    Target::Uint(slot) => {
                        if !s.parse::<u64>().is_ok_and(|n| slot.set_u64(n)) {
                            self.type_error(format!("number {s}"), type_name, offset);
                        }
                    }
                    Target::Float(slot) => {
                        if !parse_f64(&s).is_some_and(|n| slot.set_f64(n)) {
                            self.type_error(format!("number {s}"), type_name, offset);
                        }
                    }
                    Target::Number(slot) => {
                        if from_quoted && !Number::is_valid(&s) {
                            return Err(string_tag(item, type_name));
                        }
                        *slot = Number::from(&*s);
                    }
                    _ if from_quoted => self.save(string_tag(item, type_name)),
                    _ => self.type_error("number", type_name, offset),
                }
            }
        }
        Ok(())
    }

    /// Builds a dynamic value without recursion, so nesting is bounded only
    /// by the scanner's depth limit.
    fn any(&mut self, slot: &mut Value) -> Result<(), Error> {
        enum Frame {
            Array(Array),
            Object(Map, String),
        }

        let mut stack: Vec<Frame> = Vec::new();
        loop {
            let mut value = match self.skip_space()? {
                b'[' => {
                    self.pos += 1;
                    if !self.close_early(b']')? {
                        stack.push(Frame::Array(Array::new()));
                        continue;
                    }
                    Value::Array(Array::new())
                }
                b'{' => {
                    self.pos += 1;
                    if !self.close_early(b'}')? {
                        let (key, _) = self.object_key()?;
                        stack.push(Frame::Object(Map::new(), key));
                        continue;
                    }
                    Value::Object(Map::new())
                }
                _ => self.literal_value()?,
            };

            loop {
                let Some(frame) = stack.pop() else {
                    *slot = value;
                    return Ok(());
                };
                match frame {
                    Frame::Array(mut items) => {
                        items.push(value);
                        if self.member_end(b']')? {
                            value = Value::Array(items);
                            continue;
                        }
                        stack.push(Frame::Array(items));
                    }
                    Frame::Object(mut map, key) => {
                        map.insert(key, value);
                        if self.member_end(b'}')? {
                            value = Value::Object(map);
                            continue;
                        }
                        let (key, _) = self.object_key()?;
                        stack.push(Frame::Object(map, key));
                    }
                }
                break;
            }
            self.release();
        }
    }

    fn literal_value(&mut self) -> Result<Value, Error> {
        let item = self.literal_item()?;
        let end = self.pos;
        Ok(match item.first() {
            Some(b'n') => Value::Null,
            Some(b't') => Value::Boolean(true),
            Some(b'f') => Value::Boolean(false),
            Some(b'"') => Value::String(unquote(&item).ok_or_else(|| self.out_of_sync())?),
            _ => {
                let s = String::from_utf8_lossy(&item);
                if self.use_number {
                    Value::RawNumber(Number::from(&*s))
                } else if let Some(n) = parse_f64(&s) {
                    Value::Number(n)
                } else {
                    self.type_error(format!("number {s}"), "f64", end);
                    Value::Null
                }
            }
        })
    }

    /// Reads `"key"` and the colon after it, returning the unquoted key and
    /// the offset of its opening quote.
    fn object_key(&mut self) -> Result<(String, usize), Error> {
        self.skip_space()?;
        let start = self.pos;
        let item = self.literal_item()?;
        let key = unquote(&item).ok_or_else(|| self.out_of_sync())?;
        if self.skip_space()? != b':' {
            return Err(self.out_of_sync());
        }
        self.pos += 1;
        Ok((key, start))
    }

    /// Consumes the separator after a member: `true` at `close`, `false` at
    /// a comma.
    fn member_end(&mut self, close: u8) -> Result<bool, Error> {
        match self.skip_space()? {
            b',' => {
                self.pos += 1;
                Ok(false)
            }
            c if c == close => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(self.out_of_sync()),
        }
    }

    /// Consumes `close` if the container is empty.
    fn close_early(&mut self, close: u8) -> Result<bool, Error> {
        if self.skip_space()? == close {
            self.pos += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Copies the bytes of the next value.
    fn capture(&mut self) -> Result<Vec<u8>, Error> {
        self.skip_space()?;
        let start = self.pos;
        self.skip_value()?;
        self.range(start)
    }

    /// Steps over the next value without looking at it.
    fn skip_value(&mut self) -> Result<(), Error> {
        let mut depth = 0usize;
        loop {
            match self.skip_space()? {
                b'{' | b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' | b']' => {
                    depth = depth.checked_sub(1).ok_or_else(|| self.out_of_sync())?;
                    self.pos += 1;
                }
                b',' | b':' => self.pos += 1,
                b'"' => self.skip_string()?,
                _ => self.skip_literal()?,
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    fn literal_item(&mut self) -> Result<Vec<u8>, Error> {
        let start = self.pos;
        if self.byte()? == b'"' {
            self.skip_string()?;
        } else {
            self.skip_literal()?;
        }
        self.range(start)
    }

    fn skip_string(&mut self) -> Result<(), Error> {
        self.pos += 1;
        loop {
            match self.byte()? {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
    }

    fn skip_literal(&mut self) -> Result<(), Error> {
        let start = self.pos;
        while let Some(c) = self.peek()? {
            if !(c.is_ascii_alphanumeric() || matches!(c, b'.' | b'+' | b'-')) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.out_of_sync());
        }
        Ok(())
    }

    fn range(&self, start: usize) -> Result<Vec<u8>, Error> {
        self.stream
            .range(start, self.pos)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| self.out_of_sync())
    }

    /// The byte at the current position, or `None` once the source has
    /// ended cleanly.
    fn peek(&mut self) -> Result<Option<u8>, Error> {
        match self.stream.load(self.pos) {
            Ok(()) => Ok(self.stream.get(self.pos)),
            Err(Error::Eof) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn byte(&mut self) -> Result<u8, Error> {
        self.peek()?
            .ok_or_else(|| SyntaxError::unexpected_end(self.pos).into())
    }

    /// Skips whitespace and returns the next byte without consuming it.
    fn skip_space(&mut self) -> Result<u8, Error> {
        loop {
            let c = self.byte()?;
            if !is_space(c) {
                return Ok(c);
            }
            self.pos += 1;
        }
    }

    /// Lets the stream forget consumed bytes once nothing past the current
    /// position has been loaded.
    fn release(&mut self) {
        if self.pos == self.stream.len() {
            self.stream.release();
        }
    }

    fn save(&mut self, err: Error) {
        self.saved = Some(self.with_context(err));
    }

    fn type_error(&mut self, value: impl Into<String>, type_name: &str, offset: usize) {
        let err = UnmarshalTypeError::new(value, short_type_name(type_name), offset);
        self.save(err.into());
    }

    fn with_context(&self, err: Error) -> Error {
        match err {
            Error::Type(mut err)
                if !self.context.struct_name.is_empty() || !self.context.fields.is_empty() =>
            {
                err.struct_name = self.context.struct_name;
                err.field = self.context.fields.join(".");
                Error::Type(err)
            }
            other => other,
        }
    }

    fn hook_error(&self, err: HookError) -> Error {
        match err.downcast::<UnmarshalTypeError>() {
            Ok(mismatch) => self.with_context(Error::Type(*mismatch)),
            Err(other) => Error::Hook(other),
        }
    }

    fn bad_string(&self, item: &[u8], from_quoted: bool, type_name: &str) -> Error {
        if from_quoted {
            string_tag(item, type_name)
        } else {
            self.out_of_sync()
        }
    }

    fn out_of_sync(&self) -> Error {
        SyntaxError::new("JSON decoder out of sync", self.pos).into()
    }
}

/// Walks `path` from `slot` to the addressed field, allocating settable
/// embedded pointers on the way.
fn resolve<'a>(mut current: &'a mut dyn StructSlot, path: &[Step]) -> Result<Resolved<'a>, Error> {
    let missing = |step: &Step| InvalidTargetError::new(format!("no field {} in {}", step.index, step.embed_name));
    let Some((last, hops)) = path.split_last() else {
        return Err(InvalidTargetError::new("empty field path").into());
    };
    for step in hops {
        let field = current.field_mut(step.index).ok_or_else(|| missing(step))?;
        current = match field.target() {
            Target::Struct(inner) => inner,
            Target::Pointer(ptr) => {
                if ptr.is_none() && !step.settable {
                    return Ok(Resolved::Blocked(step.embed_name));
                }
                match ptr.get_or_insert().target() {
                    Target::Struct(inner) => inner,
                    _ => return Err(missing(step).into()),
                }
            }
            _ => return Err(missing(step).into()),
        };
    }
    current
        .field_mut(last.index)
        .map(Resolved::Slot)
        .ok_or_else(|| missing(last).into())
}

fn string_tag(item: &[u8], type_name: &str) -> Error {
    Error::StringTag {
        item: String::from_utf8_lossy(item).into_owned(),
        type_name: short_type_name(type_name),
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Standard base64 with padding; line breaks are ignored.
fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if text.contains(['\r', '\n']) {
        let joined: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        return STANDARD.decode(joined);
    }
    STANDARD.decode(text)
}
