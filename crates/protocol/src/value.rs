//! Owned BSER value tree.

/// A fully materialized BSER value.
///
/// Strings are raw bytes: the daemon sends paths, which need not be UTF-8.
/// Object pairs keep the order they were transmitted in, including
/// duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key/value pairs in wire order.
    Object(Vec<(Vec<u8>, Value)>),
    /// Byte string.
    String(Vec<u8>),
    /// Signed integer of any wire width.
    Int(i64),
    /// IEEE-754 double.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// Null.
    Nil,
}

impl Value {
    /// Build a string value from anything byte-like.
    pub fn string(s: impl AsRef<[u8]>) -> Self {
        Self::String(s.as_ref().to_vec())
    }

    /// Build an object from `(key, value)` pairs.
    pub fn object<K: AsRef<[u8]>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_vec(), v))
                .collect(),
        )
    }

    /// Raw bytes if this is a string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// String contents if this is a UTF-8 string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Integer value, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up `key` in an object. The last matching pair wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(pairs) => pairs
                .iter()
                .rev()
                .find(|(k, _)| k.as_slice() == key.as_bytes())
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_last_key_wins() {
        let v = Value::object([("a", Value::Int(1)), ("b", Value::Nil), ("a", Value::Int(2))]);
        assert_eq!(v.get("a"), Some(&Value::Int(2)));
        assert_eq!(v.get("b"), Some(&Value::Nil));
        assert_eq!(v.get("c"), None);
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        let v = Value::String(vec![0xff, 0xfe]);
        assert_eq!(v.as_str(), None);
        assert_eq!(v.as_bytes(), Some(&[0xff, 0xfe][..]));
    }
}
