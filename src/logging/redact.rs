//! Sensitive key redaction.
//!
//! # Responsibilities
//! - Mask the value of every configured key, at any depth
//! - Traverse aliased and self-referential values without looping
//!
//! # Design Decisions
//! - Key comparison is case-insensitive and uses the key's own name only
//! - Copy-on-write: untouched containers come back as the same node
//! - Visited containers are cached by node address; a revisit returns the
//!   cached (possibly in-progress) result instead of descending again
//! - The result is a `Redacted` guard scoped to one record: dropping it
//!   empties the containers it created, so a cloned cycle is freed

use std::collections::{HashMap, HashSet};
use std::ops::Deref;

use crate::logging::value::{LogMap, LogValue, Shared};

/// Replacement written in place of a redacted value.
pub const REDACTED: &str = "[REDACTED]";

/// Lower-cased set of key names to redact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionKeys(HashSet<String>);

impl RedactionKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(keys.into_iter().map(|k| k.as_ref().to_lowercase()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if `key` names a redacted field, ignoring case.
    pub fn matches(&self, key: &str) -> bool {
        self.0.contains(&key.to_lowercase())
    }
}

/// A redacted value together with the containers redaction created for it.
///
/// The created containers are emptied on drop. Untouched input containers are
/// shared with the source and never modified.
#[derive(Debug)]
pub struct Redacted {
    value: LogValue,
    created: Vec<LogValue>,
}

impl Redacted {
    pub fn value(&self) -> &LogValue {
        &self.value
    }

    /// Number of containers cloned during redaction.
    pub fn cloned_nodes(&self) -> usize {
        self.created.len()
    }
}

impl Deref for Redacted {
    type Target = LogValue;

    fn deref(&self) -> &LogValue {
        &self.value
    }
}

impl Drop for Redacted {
    fn drop(&mut self) {
        for node in &self.created {
            match node {
                LogValue::Array(items) => items.write().clear(),
                LogValue::Object(entries) => entries.write().clear(),
                _ => {}
            }
        }
    }
}

/// Returns `value` with every matching key masked.
///
/// With an empty key set the input is returned as-is. The result must not
/// outlive its use: dropping it releases the clones, cycles included.
pub fn redact(value: &LogValue, keys: &RedactionKeys) -> Redacted {
    if keys.is_empty() {
        return Redacted {
            value: value.clone(),
            created: Vec::new(),
        };
    }

    let mut redactor = Redactor {
        keys,
        seen: HashMap::new(),
        created: Vec::new(),
    };
    let value = redactor.visit(value).unwrap_or_else(|| value.clone());
    Redacted {
        value,
        created: redactor.created,
    }
}

struct Redactor<'a> {
    keys: &'a RedactionKeys,
    /// Node address -> replacement; `None` while the node is unchanged.
    seen: HashMap<usize, Option<LogValue>>,
    created: Vec<LogValue>,
}

impl Redactor<'_> {
    /// Returns `Some` only when the value had to change.
    fn visit(&mut self, value: &LogValue) -> Option<LogValue> {
        match value {
            LogValue::Array(node) => self.array(node),
            LogValue::Object(node) => self.object(node),
            _ => None,
        }
    }

    fn array(&mut self, source: &Shared<Vec<LogValue>>) -> Option<LogValue> {
        let addr = source.addr();
        if let Some(cached) = self.seen.get(&addr) {
            return cached.clone();
        }
        self.seen.insert(addr, None);

        let items = source.read();
        let mut clone: Option<Shared<Vec<LogValue>>> = None;

        for (index, item) in items.iter().enumerate() {
            let Some(redacted) = self.visit(item) else {
                continue;
            };
            let target = clone.get_or_insert_with(|| {
                let fresh = Shared::new(items.to_vec());
                self.seen.insert(addr, Some(LogValue::Array(fresh.clone())));
                self.created.push(LogValue::Array(fresh.clone()));
                fresh
            });
            target.write()[index] = redacted;
        }

        clone.map(LogValue::Array)
    }

    fn object(&mut self, source: &Shared<LogMap>) -> Option<LogValue> {
        let addr = source.addr();
        if let Some(cached) = self.seen.get(&addr) {
            return cached.clone();
        }
        self.seen.insert(addr, None);

        let entries = source.read();
        let mut clone: Option<Shared<LogMap>> = None;

        for (key, value) in entries.iter() {
            let replacement = if self.keys.matches(key) {
                LogValue::String(REDACTED.to_string())
            } else {
                match self.visit(value) {
                    Some(redacted) => redacted,
                    None => continue,
                }
            };
            let target = clone.get_or_insert_with(|| {
                let fresh = Shared::new(LogMap::clone(&entries));
                self.seen.insert(addr, Some(LogValue::Object(fresh.clone())));
                self.created.push(LogValue::Object(fresh.clone()));
                fresh
            });
            target.write().insert(key.clone(), replacement);
        }

        clone.map(LogValue::Object)
    }
}
