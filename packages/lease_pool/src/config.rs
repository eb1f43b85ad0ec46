use std::collections::BTreeMap;
use std::collections::btree_map;

/// Settings passed to every pooled object when the pool is initialized.
///
/// This is a set of string key-value pairs with unique keys, e.g. the host, port and credentials
/// that a database connection needs in order to connect. The pool does not interpret the
/// contents; it hands the same `Config` to [`Poolable::initialize()`][crate::Poolable::initialize]
/// of each slot.
///
/// Keys are kept in sorted order, so iteration is deterministic.
///
/// # Example
///
/// ```rust
/// use lease_pool::Config;
///
/// let config = Config::new()
///     .with("Host", "db.example.com")
///     .with("Port", "5432");
///
/// assert_eq!(config.get("Port"), Some("5432"));
/// assert_eq!(config.len(), 2);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    entries: BTreeMap<String, String>,
}

impl Config {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any existing value for the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds an entry, returning the value previously stored under the key, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Looks up the value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> ConfigIter<'_> {
        ConfigIter {
            inner: self.entries.iter(),
        }
    }
}

impl From<BTreeMap<String, String>> for Config {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<K, V> FromIterator<(K, V)> for Config
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Config {
    type Item = (&'a str, &'a str);
    type IntoIter = ConfigIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`Config`], in key order.
#[derive(Debug)]
pub struct ConfigIter<'a> {
    inner: btree_map::Iter<'a, String, String>,
}

impl<'a> Iterator for ConfigIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ConfigIter<'_> {}
