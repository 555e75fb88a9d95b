//! Access records for task-global variables.
//!
//! Every flow stage carries a map from variable name to what the stage does
//! with it. Maps merge monotonically - flags only ever turn on - and keep
//! insertion order, so the sync stages derived from them come out in a
//! deterministic order.

use indexmap::IndexMap;

/// How one stage (or a range of stages) uses one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAccess {
    pub name: String,
    pub read: bool,
    pub written: bool,
    pub reduced: bool,
    /// The variable was read at an earlier epoch version.
    pub epoch_dependent: bool,
}

impl VariableAccess {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), read: false, written: false, reduced: false, epoch_dependent: false }
    }

    pub fn read(name: impl Into<String>) -> Self {
        Self { read: true, ..Self::new(name) }
    }

    pub fn written(name: impl Into<String>) -> Self {
        Self { written: true, ..Self::new(name) }
    }

    pub fn read_write(name: impl Into<String>) -> Self {
        Self { read: true, written: true, ..Self::new(name) }
    }

    pub fn with_epoch_dependency(mut self) -> Self {
        self.epoch_dependent = true;
        self
    }

    pub fn is_modified(&self) -> bool {
        self.written || self.reduced
    }

    fn absorb(&mut self, other: &VariableAccess) {
        self.read |= other.read;
        self.written |= other.written;
        self.reduced |= other.reduced;
        self.epoch_dependent |= other.epoch_dependent;
    }
}

/// Ordered map of variable accesses, keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessMap {
    entries: IndexMap<String, VariableAccess>,
}

impl AccessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&VariableAccess> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableAccess> {
        self.entries.values()
    }

    /// Merge one access record in, OR-ing flags on an existing entry.
    pub fn record(&mut self, access: &VariableAccess) {
        match self.entries.get_mut(&access.name) {
            Some(existing) => existing.absorb(access),
            None => {
                self.entries.insert(access.name.clone(), access.clone());
            }
        }
    }

    pub fn merge(&mut self, other: &AccessMap) {
        for access in other.iter() {
            self.record(access);
        }
    }

    /// Variables with the write or reduce flag on, in map order.
    pub fn modified(&self) -> impl Iterator<Item = &VariableAccess> {
        self.iter().filter(|a| a.is_modified())
    }

    pub fn epoch_dependent(&self) -> impl Iterator<Item = &VariableAccess> {
        self.iter().filter(|a| a.epoch_dependent)
    }
}

impl FromIterator<VariableAccess> for AccessMap {
    fn from_iter<I: IntoIterator<Item = VariableAccess>>(iter: I) -> Self {
        let mut map = Self::new();
        for access in iter {
            map.record(&access);
        }
        map
    }
}
