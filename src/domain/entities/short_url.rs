//! Short id and insertion outcomes.

use std::fmt;

/// Identifier of a stored URL record.
///
/// Produced by [`crate::domain::hasher::hash`]; the repository never assigns
/// ids any other way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortId(String);

impl ShortId {
    /// Wraps an id without checking its format.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ShortId> for String {
    fn from(id: ShortId) -> Self {
        id.0
    }
}

/// Result of storing a single URL.
///
/// `Duplicate` means the id already existed before the call. The id is valid
/// in both cases; callers decide how to surface the distinction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    Inserted(ShortId),
    Duplicate(ShortId),
}

impl Insertion {
    pub fn id(&self) -> &ShortId {
        match self {
            Self::Inserted(id) | Self::Duplicate(id) => id,
        }
    }

    pub fn into_id(self) -> ShortId {
        match self {
            Self::Inserted(id) | Self::Duplicate(id) => id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Result of storing several URLs at once.
///
/// `ids` follows input order. `inserted` counts the ids that were newly
/// stored; `duplicate` is set when at least one of them already existed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInsertion {
    pub ids: Vec<ShortId>,
    pub inserted: usize,
    pub duplicate: bool,
}

impl BatchInsertion {
    /// Folds single-row outcomes into a batch outcome, preserving order.
    pub fn from_insertions(insertions: impl IntoIterator<Item = Insertion>) -> Self {
        insertions
            .into_iter()
            .fold(Self::default(), |mut batch, insertion| {
                if insertion.is_duplicate() {
                    batch.duplicate = true;
                } else {
                    batch.inserted += 1;
                }
                batch.ids.push(insertion.into_id());
                batch
            })
    }

    /// Number of ids that already existed before the call.
    pub fn duplicates(&self) -> usize {
        self.ids.len() - self.inserted
    }
}
