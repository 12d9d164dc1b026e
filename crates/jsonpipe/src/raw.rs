use serde::{Serialize, Serializer, ser::Error as _};

/// The exact bytes of one JSON value, captured without interpretation.
///
/// Decoding stores the value verbatim, `null` included. Encoding writes it
/// back in compact form; an empty `RawValue` encodes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawValue(Vec<u8>);

impl RawValue {
    /// Wraps already encoded JSON.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The captured bytes.
    #[must_use]
    pub fn get(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn set(&mut self, bytes: &[u8]) {
        self.0.clear();
        self.0.extend_from_slice(bytes);
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            return serializer.serialize_unit();
        }
        let mut compacted = Vec::with_capacity(self.0.len());
        crate::format::compact(&mut compacted, &self.0).map_err(S::Error::custom)?;
        let text = String::from_utf8(compacted).map_err(S::Error::custom)?;
        let raw = serde_json::value::RawValue::from_string(text).map_err(S::Error::custom)?;
        raw.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_compacted() {
        let raw = RawValue::new(&b"{ \"a\" : [1, 2] }"[..]);
        assert_eq!(serde_json::to_string(&raw).unwrap(), r#"{"a":[1,2]}"#);
        assert_eq!(serde_json::to_string(&RawValue::default()).unwrap(), "null");
    }

    #[test]
    fn rejects_invalid_json() {
        let raw = RawValue::new(&b"{"[..]);
        assert!(serde_json::to_string(&raw).is_err());
    }
}
