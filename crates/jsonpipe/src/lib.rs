//! Incremental JSON decoding from byte sources that deliver data over time.
//!
//! The decoder pulls bytes from any [`std::io::Read`] only as far as the
//! value being decoded needs, validating them as they arrive, so it can sit
//! on a pipe or socket whose writer is still producing. Chunk boundaries are
//! invisible: a value split across any number of reads decodes exactly as if
//! it had arrived in one piece.
//!
//! - [`unmarshal`] decodes exactly one value from a source.
//! - [`Decoder`] reads a sequence of values and exposes a token stream.
//! - [`Encoder`] and [`marshal`] write values through `serde`.
//! - [`valid`], [`compact`] and [`indent`] work on whole buffers.
//!
//! Destinations describe themselves through [`Decode`]. Structs declared
//! with [`decode_struct!`] match object keys to fields by name, falling back
//! to a case-insensitive match, and promote the fields of embedded structs.
//!
//! ```rust
//! use jsonpipe::decode_struct;
//!
//! decode_struct! {
//!     #[derive(Debug, Default)]
//!     pub struct Person {
//!         pub name: String,
//!         pub age: u8 = "years,string",
//!         pub tags: Vec<String>,
//!     }
//! }
//!
//! let src = br#"{"Name": "Ada", "years": "36", "tags": ["math"]}"#;
//! let mut person = Person::default();
//! jsonpipe::unmarshal(&src[..], &mut person).unwrap();
//! assert_eq!(person.name, "Ada");
//! assert_eq!(person.age, 36);
//! assert_eq!(person.tags, ["math"]);
//! ```
//!
//! Values that do not fit their destination are reported after the whole
//! input has been read; the rest of the destination is still filled in.
//!
//! ```rust
//! let mut nums: Vec<u8> = Vec::new();
//! let err = jsonpipe::unmarshal(&b"[1, 300, 3]"[..], &mut nums).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "json: cannot unmarshal number 300 into Go value of type u8"
//! );
//! assert_eq!(nums, [1, 0, 3]);
//! ```

use std::io::Read;

mod buffer;
mod decode;
mod decoder;
mod encoder;
mod error;
mod format;
mod number;
mod options;
mod raw;
mod scanner;
mod stream;
mod value;

#[cfg(test)]
mod tests;

pub use decode::{
    Decode, DecodeStruct, EntryKey, FieldDef, FieldKind, FloatSlot, IntSlot, MapKey, MapSlot,
    PointerSlot, SeqSlot, StructInfo, StructSlot, Target, UintSlot, UnmarshalJson, UnmarshalText,
    clear_field_cache,
};
pub use decoder::{Decoder, Token};
pub use encoder::{Encoder, marshal};
pub use error::{Error, HookError, InvalidTargetError, SyntaxError, UnmarshalTypeError};
pub use format::{compact, indent, valid};
pub use number::Number;
pub use options::{DEFAULT_MAX_DEPTH, DecoderOptions, EncoderOptions, RetryPolicy};
pub use raw::RawValue;
pub use value::{Array, Map, Value};

use crate::{decode::engine::DecodeState, scanner::Scanner, stream::LogicalStream};

/// Decodes the single JSON value held by `source` into `dst`.
///
/// The source is read to the end; anything but whitespace after the value
/// is a syntax error.
///
/// # Errors
///
/// A [`SyntaxError`] anywhere in the input takes precedence over every other
/// error. Otherwise the last value that did not fit its destination is
/// reported as an [`UnmarshalTypeError`] once the input is exhausted, and
/// hook or I/O failures stop the decode where they happen.
pub fn unmarshal<R: Read, T: Decode>(source: R, dst: &mut T) -> Result<(), Error> {
    unmarshal_with(source, dst, DecoderOptions::default())
}

/// [`unmarshal`] with explicit options.
///
/// # Errors
///
/// As for [`unmarshal`].
pub fn unmarshal_with<R: Read, T: Decode>(
    source: R,
    dst: &mut T,
    options: DecoderOptions,
) -> Result<(), Error> {
    let mut stream = LogicalStream::new(source, Scanner::new(options.max_depth), options.retry);
    let mut state = DecodeState::new(&mut stream, 0, options.use_number);
    let result = state.value(dst);
    let (_, saved) = state.finish();
    match result {
        Err(err @ (Error::Syntax(_) | Error::Io(_))) => Err(err),
        Err(err) => {
            // A syntax error later in the input still wins.
            stream.close()?;
            Err(err)
        }
        Ok(()) => {
            stream.close()?;
            saved.map_or(Ok(()), Err)
        }
    }
}

/// Declares a struct and implements [`Decode`] for it.
///
/// Each field may be followed by `as embed` (an anonymous struct whose
/// fields are promoted), `as embed_ptr(Inner)` (an `Option<Inner>` that is
/// allocated when one of its promoted fields is set) and `= "tag"`. A tag is
/// `name,option,...`: the name replaces the field identifier as the JSON key,
/// `-` skips the field and the `string` option reads scalars from inside a
/// JSON string. Only `pub` fields take part, except that the promoted
/// fields of a private embedded struct are still reachable.
///
/// ```rust
/// use jsonpipe::decode_struct;
///
/// decode_struct! {
///     #[derive(Debug, Default)]
///     pub struct Base {
///         pub id: u64,
///     }
/// }
///
/// decode_struct! {
///     #[derive(Debug, Default)]
///     pub struct Post {
///         pub base: Base as embed,
///         pub title: String = "headline",
///         pub draft: bool = "-",
///     }
/// }
///
/// let mut post = Post::default();
/// jsonpipe::unmarshal(&br#"{"id": 7, "headline": "hi", "draft": true}"#[..], &mut post).unwrap();
/// assert_eq!(post.base.id, 7);
/// assert_eq!(post.title, "hi");
/// assert!(!post.draft);
/// ```
#[macro_export]
macro_rules! decode_struct {
    (@tag) => { ::core::option::Option::None };
    (@tag $tag:literal) => { ::core::option::Option::Some($tag) };
    (@kind $ty:ty) => {
        $crate::FieldKind::Plain(<$ty as $crate::Decode>::quotable)
    };
    (@kind $ty:ty, embed) => {
        $crate::FieldKind::Embedded(<$ty as $crate::DecodeStruct>::struct_info)
    };
    (@kind $ty:ty, embed_ptr, $inner:ty) => {
        $crate::FieldKind::EmbeddedPtr(<$inner as $crate::DecodeStruct>::struct_info)
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
                    $(as $kind:ident $(($inner:ty))?)?
                    $(= $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::DecodeStruct for $name {
            fn struct_info() -> &'static $crate::StructInfo {
                static FIELDS: &[$crate::FieldDef] = &[
                    $(
                        $crate::FieldDef {
                            ident: stringify!($field),
                            tag: $crate::decode_struct!(@tag $($tag)?),
                            exported: !stringify!($fvis).is_empty(),
                            kind: $crate::decode_struct!(@kind $ty $(, $kind $(, $inner)?)?),
                        },
                    )*
                ];
                static INFO: $crate::StructInfo = $crate::StructInfo {
                    name: stringify!($name),
                    fields: FIELDS,
                    type_id: ::std::any::TypeId::of::<$name>,
                };
                &INFO
            }
        }

        impl $crate::Decode for $name {
            fn target(&mut self) -> $crate::Target<'_> {
                $crate::Target::Struct(self)
            }
        }

        impl $crate::StructSlot for $name {
            fn info(&self) -> &'static $crate::StructInfo {
                <Self as $crate::DecodeStruct>::struct_info()
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<&mut dyn $crate::Decode> {
                let mut at = 0usize;
                $(
                    if index == at {
                        return ::core::option::Option::Some(&mut self.$field);
                    }
                    at += 1;
                )*
                ::core::option::Option::None
            }
        }
    };
}
