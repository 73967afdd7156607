use std::any::Any;
use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;


/// Enumeration of values that can be attached to trails and globals.
///
/// Common scalar types convert into `Value`s with `Into`.
/// Anything else can be carried as an opaque payload with `Value::any`
/// and recovered by reporters with `Value::downcast_ref`.
#[derive(Clone)]
pub enum Value {
    Boolean(bool),
    Float(f64),
    Integer(i64),
    String(String),
    /// Rendered form of an error the trail failed with.
    Error(String),
    Any(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wraps an arbitrary payload.
    pub fn any<T: Any + Send + Sync>(value: T) -> Value {
        Value::Any(Arc::new(value))
    }

    /// Attempt to access an opaque payload as a `T`.
    ///
    /// Returns `None` for scalar values or payloads of a different type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            &Value::Any(ref inner) => inner.downcast_ref::<T>(),
            _ => None
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &Value::Boolean(v) => write!(f, "Boolean({:?})", v),
            &Value::Float(v) => write!(f, "Float({:?})", v),
            &Value::Integer(v) => write!(f, "Integer({:?})", v),
            &Value::String(ref v) => write!(f, "String({:?})", v),
            &Value::Error(ref v) => write!(f, "Error({:?})", v),
            &Value::Any(_) => write!(f, "Any(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &Value::Boolean(v) => write!(f, "{}", v),
            &Value::Float(v) => write!(f, "{}", v),
            &Value::Integer(v) => write!(f, "{}", v),
            &Value::String(ref v) => write!(f, "{}", v),
            &Value::Error(ref v) => write!(f, "{}", v),
            &Value::Any(_) => write!(f, "<opaque>"),
        }
    }
}

impl PartialEq for Value {
    /// Scalars compare by value, opaque payloads by identity.
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (&Value::Boolean(a), &Value::Boolean(b)) => a == b,
            (&Value::Float(a), &Value::Float(b)) => a == b,
            (&Value::Integer(a), &Value::Integer(b)) => a == b,
            (&Value::String(ref a), &Value::String(ref b)) => a == b,
            (&Value::Error(ref a), &Value::Error(ref b)) => a == b,
            (&Value::Any(ref a), &Value::Any(ref b)) => Arc::ptr_eq(a, b),
            _ => false
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Float(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Integer(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Value {
        Value::Integer(i64::from(value))
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Value {
        Value::Integer(i64::from(value))
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Value {
        Value::Integer(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Value {
        Value::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Value {
        Value::Integer(i64::from(value))
    }
}

/// Values above `i64::MAX` saturate.
impl From<u64> for Value {
    fn from(value: u64) -> Value {
        Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Values above `i64::MAX` saturate.
impl From<usize> for Value {
    fn from(value: usize) -> Value {
        Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Value {
        Value::String(String::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}
