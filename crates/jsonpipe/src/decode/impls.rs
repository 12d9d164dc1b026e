use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
};

use super::{
    Decode, EntryKey, FloatSlot, IntSlot, MapKey, MapSlot, PointerSlot, SeqSlot, Target,
    UintSlot, UnmarshalText,
};
use crate::{
    Number, RawValue, Value,
    error::{Error, UnmarshalTypeError},
};

impl Decode for bool {
    fn target(&mut self) -> Target<'_> {
        Target::Bool(self)
    }

    fn quotable() -> bool {
        true
    }
}

macro_rules! int_slots {
    ($($ty:ty),*) => {$(
        impl IntSlot for $ty {
            fn set_i64(&mut self, v: i64) -> bool {
                <$ty>::try_from(v).map(|v| *self = v).is_ok()
            }
        }

        impl Decode for $ty {
            fn target(&mut self) -> Target<'_> {
                Target::Int(self)
            }

            fn quotable() -> bool {
                true
            }
        }

        impl MapKey for $ty {
            fn from_key(key: &EntryKey<'_>) -> Result<Self, Error> {
                key.text()
                    .parse::<i64>()
                    .ok()
                    .and_then(|n| <$ty>::try_from(n).ok())
                    .ok_or_else(|| key.mismatch::<$ty>().into())
            }
        }
    )*};
}

macro_rules! uint_slots {
    ($($ty:ty),*) => {$(
        impl UintSlot for $ty {
            fn set_u64(&mut self, v: u64) -> bool {
                <$ty>::try_from(v).map(|v| *self = v).is_ok()
            }
        }

        impl Decode for $ty {
            fn target(&mut self) -> Target<'_> {
                Target::Uint(self)
            }

            fn quotable() -> bool {
                true
            }
        }

        impl MapKey for $ty {
            fn from_key(key: &EntryKey<'_>) -> Result<Self, Error> {
                key.text()
                    .parse::<u64>()
                    .ok()
                    .and_then(|n| <$ty>::try_from(n).ok())
                    .ok_or_else(|| key.mismatch::<$ty>().into())
            }
        }
    )*};
}

int_slots!(i8, i16, i32, i64, isize);
uint_slots!(u8, u16, u32, u64, usize);

impl FloatSlot for f64 {
    fn set_f64(&mut self, v: f64) -> bool {
        *self = v;
        true
    }
}

impl FloatSlot for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn set_f64(&mut self, v: f64) -> bool {
        let narrowed = v as f32;
        if narrowed.is_infinite() {
            return false;
        }
        *self = narrowed;
        true
    }
}

impl Decode for f64 {
    fn target(&mut self) -> Target<'_> {
        Target::Float(self)
    }

    fn quotable() -> bool {
        true
    }
}

impl Decode for f32 {
    fn target(&mut self) -> Target<'_> {
        Target::Float(self)
    }

    fn quotable() -> bool {
        true
    }
}

impl Decode for String {
    fn target(&mut self) -> Target<'_> {
        Target::Str(self)
    }

    fn quotable() -> bool {
        true
    }
}

impl Decode for Number {
    fn target(&mut self) -> Target<'_> {
        Target::Number(self)
    }

    fn quotable() -> bool {
        true
    }
}

impl Decode for RawValue {
    fn target(&mut self) -> Target<'_> {
        Target::Raw(self)
    }
}

impl Decode for Value {
    fn target(&mut self) -> Target<'_> {
        Target::Any(self)
    }
}

impl<T: Decode + Default> PointerSlot for Option<T> {
    fn is_none(&self) -> bool {
        Option::is_none(self)
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn get_or_insert(&mut self) -> &mut dyn Decode {
        self.get_or_insert_with(T::default)
    }
}

impl<T: Decode + Default> Decode for Option<T> {
    fn target(&mut self) -> Target<'_> {
        Target::Pointer(self)
    }

    fn quotable() -> bool {
        T::quotable()
    }
}

impl<T: Decode> Decode for Box<T> {
    fn target(&mut self) -> Target<'_> {
        (**self).target()
    }

    fn quotable() -> bool {
        T::quotable()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<T: Decode + Default> SeqSlot for Vec<T> {
    fn count(&self) -> usize {
        self.len()
    }

    fn elem_mut(&mut self, index: usize) -> Option<&mut dyn Decode> {
        if index == self.len() {
            self.push(T::default());
        }
        self.get_mut(index).map(|elem| elem as &mut dyn Decode)
    }

    fn truncate(&mut self, len: usize) {
        Vec::truncate(self, len);
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn bytes_mut(&mut self) -> Option<&mut Vec<u8>> {
        (self as &mut dyn Any).downcast_mut::<Vec<u8>>()
    }
}

impl<T: Decode + Default> Decode for Vec<T> {
    fn target(&mut self) -> Target<'_> {
        Target::Seq(self)
    }
}

impl<T: Decode + Default, const N: usize> SeqSlot for [T; N] {
    fn count(&self) -> usize {
        N
    }

    fn elem_mut(&mut self, index: usize) -> Option<&mut dyn Decode> {
        self.get_mut(index).map(|elem| elem as &mut dyn Decode)
    }

    fn truncate(&mut self, len: usize) {
        for elem in self.iter_mut().skip(len) {
            *elem = T::default();
        }
    }

    fn clear(&mut self) {}
}

impl<T: Decode + Default, const N: usize> Decode for [T; N] {
    fn target(&mut self) -> Target<'_> {
        Target::Seq(self)
    }
}

impl MapKey for String {
    fn from_key(key: &EntryKey<'_>) -> Result<Self, Error> {
        Ok(key.text().to_owned())
    }
}

impl<T: UnmarshalText + Default> MapKey for T {
    fn from_key(key: &EntryKey<'_>) -> Result<Self, Error> {
        let mut out = T::default();
        out.unmarshal_text(key.text()).map_err(Error::Hook)?;
        Ok(out)
    }
}

fn entry<K: MapKey, V: Decode + Default>(
    key: &EntryKey<'_>,
    value: &mut dyn FnMut(&mut dyn Decode) -> Result<(), Error>,
) -> Result<Result<(K, V), UnmarshalTypeError>, Error> {
    let mut elem = V::default();
    value(&mut elem)?;
    match K::from_key(key) {
        Ok(k) => Ok(Ok((k, elem))),
        Err(Error::Type(mismatch)) => Ok(Err(mismatch)),
        Err(err) => Err(err),
    }
}

impl<K, V, S> MapSlot for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash + 'static,
    V: Decode + Default,
    S: BuildHasher + Default + 'static,
{
    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn decode_entry(
        &mut self,
        key: &EntryKey<'_>,
        value: &mut dyn FnMut(&mut dyn Decode) -> Result<(), Error>,
    ) -> Result<Option<UnmarshalTypeError>, Error> {
        Ok(match entry::<K, V>(key, value)? {
            Ok((k, v)) => {
                self.insert(k, v);
                None
            }
            Err(mismatch) => Some(mismatch),
        })
    }
}

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash + 'static,
    V: Decode + Default,
    S: BuildHasher + Default + 'static,
{
    fn target(&mut self) -> Target<'_> {
        Target::Map(self)
    }
}

impl<K, V> MapSlot for BTreeMap<K, V>
where
    K: MapKey + Ord + 'static,
    V: Decode + Default,
{
    fn clear(&mut self) {
        BTreeMap::clear(self);
    }

    fn decode_entry(
        &mut self,
        key: &EntryKey<'_>,
        value: &mut dyn FnMut(&mut dyn Decode) -> Result<(), Error>,
    ) -> Result<Option<UnmarshalTypeError>, Error> {
        Ok(match entry::<K, V>(key, value)? {
            Ok((k, v)) => {
                self.insert(k, v);
                None
            }
            Err(mismatch) => Some(mismatch),
        })
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: MapKey + Ord + 'static,
    V: Decode + Default,
{
    fn target(&mut self) -> Target<'_> {
        Target::Map(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_keys_check_range() {
        let key = EntryKey::new("256", 2);
        let err = u8::from_key(&key).unwrap_err();
        match err {
            Error::Type(mismatch) => {
                assert_eq!(mismatch.value, "number 256");
                assert_eq!(mismatch.type_name, "u8");
                assert_eq!(mismatch.offset, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(i8::from_key(&EntryKey::new("-128", 2)).unwrap(), -128);
        assert!(u64::from_key(&EntryKey::new("-1", 2)).is_err());
    }

    #[test]
    fn fixed_arrays_reset_their_tail() {
        let mut arr = [7, 8, 9];
        SeqSlot::truncate(&mut arr, 1);
        assert_eq!(arr, [7, 0, 0]);
        assert!(SeqSlot::elem_mut(&mut arr, 3).is_none());
    }

    #[test]
    fn byte_vectors_expose_storage() {
        let mut bytes: Vec<u8> = vec![1];
        assert!(bytes.bytes_mut().is_some());
        let mut words: Vec<u16> = vec![1];
        assert!(words.bytes_mut().is_none());
    }

    #[test]
    fn narrow_floats_overflow() {
        let mut f = 0f32;
        assert!(!f.set_f64(1e300));
        assert!(f.set_f64(1.5));
        assert!((f - 1.5).abs() < f32::EPSILON);
    }
}
