use std::collections::HashMap;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use super::super::Value;


/// Map of trail annotations, keyed by annotation name.
pub type TimestampedMap = HashMap<String, Timestamped>;


/// A `Value` together with the time it was recorded.
///
/// Timestamped values are immutable: annotating the same key again
/// replaces the whole entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Timestamped {
    timestamp: SystemTime,
    value: Value,
}

impl Timestamped {
    /// Stamps the value with the current time.
    pub fn new<V: Into<Value>>(value: V) -> Timestamped {
        Timestamped::at(SystemTime::now(), value)
    }

    /// Stamps the value with the given time.
    pub fn at<V: Into<Value>>(timestamp: SystemTime, value: V) -> Timestamped {
        Timestamped {
            timestamp,
            value: value.into(),
        }
    }
}

impl Timestamped {
    /// Access the time the value was recorded.
    pub fn timestamp(&self) -> &SystemTime {
        &self.timestamp
    }

    /// Nanoseconds between the UNIX epoch and the recording time.
    ///
    /// Times before the epoch are reported as `0`.
    pub fn unix_nanos(&self) -> u128 {
        self.timestamp.duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0)
    }

    /// Access the recorded value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}
