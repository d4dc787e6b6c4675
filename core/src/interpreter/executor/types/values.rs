//! Runtime value type
//!
//! Every value is a string of bytes. Lists, numbers and dictionaries are
//! interpretations of those bytes owned by the host; the engine itself only
//! ever looks at the byte content.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

/// Immutable, cheaply clonable byte string
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(Rc<[u8]>);

impl Value {
    /// The empty string
    pub fn empty() -> Self {
        Value(Rc::from(&[][..]))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Value(Rc::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Lossy UTF-8 view, for messages and string commands
    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn is(&self, other: &str) -> bool {
        &*self.0 == other.as_bytes()
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::empty()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_str_lossy())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from_bytes(s.as_bytes())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(Rc::from(s.into_bytes()))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value(Rc::from(bytes))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::from(n.to_string())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::from(n.to_string())
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
