//! Destination model for the decode engine.
//!
//! A destination tells the engine what it can hold by returning a
//! [`Target`] from [`Decode::target`]. Scalars, strings, options, boxes,
//! vectors, arrays, maps, [`Value`], [`Number`] and [`RawValue`] implement
//! [`Decode`] out of the box; structs get an implementation from
//! [`decode_struct!`](crate::decode_struct).

pub(crate) mod engine;
pub(crate) mod fields;
mod impls;
pub(crate) mod unquote;

use std::any::TypeId;

use crate::{
    Number, RawValue, Value,
    error::{Error, HookError, UnmarshalTypeError},
};

pub use fields::clear_field_cache;

/// A value the decoder can write into.
pub trait Decode: 'static {
    /// Exposes the storage behind `self`.
    fn target(&mut self) -> Target<'_>;

    /// Whether a `,string` tag applies to fields of this type.
    #[doc(hidden)]
    fn quotable() -> bool
    where
        Self: Sized,
    {
        false
    }

    /// Full Rust name of the type, used in error messages.
    #[doc(hidden)]
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The shape of a destination, borrowed from it.
pub enum Target<'a> {
    /// A boolean.
    Bool(&'a mut bool),
    /// A signed integer of any width.
    Int(&'a mut dyn IntSlot),
    /// An unsigned integer of any width.
    Uint(&'a mut dyn UintSlot),
    /// A float of any width.
    Float(&'a mut dyn FloatSlot),
    /// A string.
    Str(&'a mut String),
    /// A number literal.
    Number(&'a mut Number),
    /// Verbatim capture of the value bytes.
    Raw(&'a mut RawValue),
    /// A dynamically typed value.
    Any(&'a mut Value),
    /// An optional value that is allocated on demand and cleared by `null`.
    Pointer(&'a mut dyn PointerSlot),
    /// A struct described by [`StructInfo`].
    Struct(&'a mut dyn StructSlot),
    /// A map keyed by [`MapKey`] types.
    Map(&'a mut dyn MapSlot),
    /// A growable or fixed-size sequence.
    Seq(&'a mut dyn SeqSlot),
    /// A type that decodes the raw bytes of a whole value itself.
    Hook(&'a mut dyn UnmarshalJson),
    /// A type that decodes the contents of a JSON string itself.
    Text(&'a mut dyn UnmarshalText),
}

/// Storage for a signed integer.
pub trait IntSlot {
    /// Stores `v`, returning `false` if it does not fit.
    fn set_i64(&mut self, v: i64) -> bool;
}

/// Storage for an unsigned integer.
pub trait UintSlot {
    /// Stores `v`, returning `false` if it does not fit.
    fn set_u64(&mut self, v: u64) -> bool;
}

/// Storage for a float.
pub trait FloatSlot {
    /// Stores `v`, returning `false` if it overflows the type.
    fn set_f64(&mut self, v: f64) -> bool;
}

/// An absent-or-present slot, such as `Option<T>`.
pub trait PointerSlot {
    /// Whether nothing is stored.
    fn is_none(&self) -> bool;
    /// Drops the stored value.
    fn clear(&mut self);
    /// Returns the stored value, allocating a default one if needed.
    fn get_or_insert(&mut self) -> &mut dyn Decode;
}

/// A struct with a static field description.
pub trait StructSlot {
    /// The field description shared by every value of the type.
    fn info(&self) -> &'static StructInfo;
    /// The field at `index` in [`StructInfo::fields`].
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Decode>;
}

/// An associative container.
pub trait MapSlot {
    /// Removes every entry.
    fn clear(&mut self);
    /// Decodes one entry: `value` fills a fresh element, then the key is
    /// converted and the pair inserted, replacing any earlier duplicate.
    ///
    /// Returns the key conversion error to report later, if the key was
    /// rejected.
    ///
    /// # Errors
    ///
    /// Errors from `value` and from text hooks on the key are returned as
    /// is.
    fn decode_entry(
        &mut self,
        key: &EntryKey<'_>,
        value: &mut dyn FnMut(&mut dyn Decode) -> Result<(), Error>,
    ) -> Result<Option<UnmarshalTypeError>, Error>;
}

/// A sequence of elements.
pub trait SeqSlot {
    /// Number of elements currently held.
    fn count(&self) -> usize;
    /// Element `index`, growing the sequence by one default element when
    /// `index == count()`. `None` when the sequence cannot hold it.
    fn elem_mut(&mut self, index: usize) -> Option<&mut dyn Decode>;
    /// Shrinks to `len` elements; fixed-size sequences reset the tail
    /// instead.
    fn truncate(&mut self, len: usize);
    /// Reaction to `null`: growable sequences empty themselves.
    fn clear(&mut self);
    /// The storage of a `Vec<u8>`, which also accepts base64 text.
    fn bytes_mut(&mut self) -> Option<&mut Vec<u8>> {
        None
    }
}

/// Decodes the raw bytes of a whole JSON value.
///
/// The hook receives `null` too, so it decides what absence means.
pub trait UnmarshalJson {
    /// Consumes the raw bytes of one value.
    ///
    /// # Errors
    ///
    /// The error aborts the decode; an [`UnmarshalTypeError`] gains the
    /// enclosing struct context.
    fn unmarshal_json(&mut self, data: &[u8]) -> Result<(), HookError>;
}

/// Decodes the contents of a JSON string.
pub trait UnmarshalText {
    /// Consumes unquoted, unescaped text.
    ///
    /// # Errors
    ///
    /// The error aborts the decode.
    fn unmarshal_text(&mut self, text: &str) -> Result<(), HookError>;
}

/// An object key on its way to becoming a map key.
#[derive(Debug, Clone, Copy)]
pub struct EntryKey<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> EntryKey<'a> {
    pub(crate) fn new(text: &'a str, offset: usize) -> Self {
        Self { text, offset }
    }

    /// The unquoted key.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Offset just past the key's opening quote.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The type error for a key that does not convert to `K`.
    #[must_use]
    pub fn mismatch<K>(&self) -> UnmarshalTypeError {
        UnmarshalTypeError::new(
            format!("number {}", self.text),
            short_type_name(std::any::type_name::<K>()),
            self.offset,
        )
    }
}

/// Types usable as map keys.
pub trait MapKey: Sized {
    /// Converts an object key.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] for keys outside the type's range, which are reported
    /// after the object is done; anything else aborts the decode.
    fn from_key(key: &EntryKey<'_>) -> Result<Self, Error>;
}

/// A struct type with a static field description.
pub trait DecodeStruct: Decode + Sized {
    /// The description, built once per type.
    fn struct_info() -> &'static StructInfo;
}

/// Static description of a struct destination.
#[derive(Debug)]
pub struct StructInfo {
    /// The struct's name, shown in type errors.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldDef],
    /// Identity of the type, used to detect embedding cycles.
    pub type_id: fn() -> TypeId,
}

/// One declared struct field.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust identifier, used as the JSON name when the tag has none.
    pub ident: &'static str,
    /// The tag, `name,opt,opt` with `-` meaning skip.
    pub tag: Option<&'static str>,
    /// Whether the field is public.
    pub exported: bool,
    /// How the field participates in name resolution.
    pub kind: FieldKind,
}

/// How a field participates in name resolution.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// An ordinary field. The function reports whether `,string` applies.
    Plain(fn() -> bool),
    /// An anonymous struct whose fields are promoted.
    Embedded(fn() -> &'static StructInfo),
    /// An anonymous, optional struct whose fields are promoted; it is
    /// allocated when one of them is set.
    EmbeddedPtr(fn() -> &'static StructInfo),
}

/// Strips module paths from a type name: `alloc::vec::Vec<u8>` becomes
/// `Vec<u8>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = 0;
    let mut chars = full.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment);
            continue;
        }
        out.push(ch);
        if !(ch.is_alphanumeric() || ch == '_') {
            segment = out.len();
        }
    }
    out
}
