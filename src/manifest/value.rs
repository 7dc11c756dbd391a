//! In-memory model of a data file: ordered maps, lists and scalars

/// A value stored in a data file
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    List(Vec<DataValue>),
    Map(DataMap),
}

impl DataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DataMap> {
        match self {
            DataValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Scalars as text: strings unchanged, numbers and booleans formatted
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            DataValue::String(s) => Some(s.clone()),
            DataValue::Integer(i) => Some(i.to_string()),
            DataValue::Decimal(d) => Some(d.to_string()),
            DataValue::Bool(b) => Some(b.to_string()),
            DataValue::Null | DataValue::List(_) | DataValue::Map(_) => None,
        }
    }

    /// A single string or a list of strings, as a vector
    pub fn to_string_list(&self) -> Option<Vec<String>> {
        match self {
            DataValue::List(items) => items.iter().map(DataValue::to_scalar_string).collect(),
            other => other.to_scalar_string().map(|s| vec![s]),
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::String(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Integer(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Decimal(value)
    }
}

impl From<DataMap> for DataValue {
    fn from(value: DataMap) -> Self {
        DataValue::Map(value)
    }
}

impl<T: Into<DataValue>> From<Vec<T>> for DataValue {
    fn from(value: Vec<T>) -> Self {
        DataValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered map with case-insensitive keys.
///
/// Data-file keys are case-insensitive, so inserting `moduleversion` after
/// `ModuleVersion` replaces the value in place and keeps the original key
/// spelling and position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataMap {
    entries: Vec<(String, DataValue)>,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Insert or replace; returns the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<DataValue>,
    ) -> Option<DataValue> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut DataValue> {
        self.position(key).map(move |index| &mut self.entries[index].1)
    }

    /// Remove a key, keeping the order of the others
    pub fn remove(&mut self, key: &str) -> Option<DataValue> {
        self.position(key).map(|index| self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Nested map at `key`, created empty when missing or not a map
    pub fn map_entry(&mut self, key: &str) -> &mut DataMap {
        let is_map = matches!(self.get(key), Some(DataValue::Map(_)));
        if !is_map {
            self.insert(key, DataMap::new());
        }
        match self.get_mut(key) {
            Some(DataValue::Map(map)) => map,
            _ => unreachable!("entry was just made a map"),
        }
    }
}

impl<K: Into<String>, V: Into<DataValue>> FromIterator<(K, V)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = DataMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
