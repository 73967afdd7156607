use std::collections::HashMap;
use std::collections::hash_map::Iter;
use std::fmt;

use super::super::Value;
use super::timestamped::Timestamped;


/// An entry in a consolidated `Snapshot`.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    /// A process-wide value set with `put_global`.
    Global(Value),

    /// An annotation recorded on the trail itself.
    Local(Timestamped),
}

impl Entry {
    /// Access the value regardless of where it came from.
    pub fn value(&self) -> &Value {
        match self {
            &Entry::Global(ref value) => value,
            &Entry::Local(ref stamped) => stamped.value(),
        }
    }

    /// Access the timestamp of local entries.
    pub fn timestamped(&self) -> Option<&Timestamped> {
        match self {
            &Entry::Global(_) => None,
            &Entry::Local(ref stamped) => Some(stamped),
        }
    }
}


/// Consolidated view of a trail: globals overlaid by the trail's annotations.
///
/// Snapshots are built when a trail is finalized and handed to every reporter.
/// They are plain values: nothing done to the trail or the globals after the
/// snapshot is taken is reflected in it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot(HashMap<String, Entry>);

impl Snapshot {
    /// Returns a new empty snapshot.
    pub fn new() -> Snapshot {
        Snapshot(HashMap::new())
    }

    pub(crate) fn insert(&mut self, key: String, entry: Entry) {
        self.0.insert(key, entry);
    }
}

impl Snapshot {
    /// Checks if an entry with the given key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Attempt to access an entry by key.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.0.get(key)
    }

    /// Shortcut for `get(key).map(Entry::value)`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).map(Entry::value)
    }

    /// Returns true if the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over all entries, in no particular order.
    pub fn iter(&self) -> Iter<String, Entry> {
        self.0.iter()
    }

    /// Returns the snapshot keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
        keys.sort();
        keys
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Snapshot {
    /// One line per entry, sorted by key.
    ///
    /// Annotations are prefixed by their timestamp in nanoseconds
    /// (`T[<nanos>] key: value`) and globals by `[GLOBAL]`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for key in self.keys() {
            match self.0[key] {
                Entry::Global(ref value) => writeln!(f, "[GLOBAL] {}: {}", key, value)?,
                Entry::Local(ref stamped) => writeln!(
                    f, "T[{}] {}: {}", stamped.unix_nanos(), key, stamped.value()
                )?,
            }
        }
        Ok(())
    }
}
