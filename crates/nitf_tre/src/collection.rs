//! Records attached to the headers of a container

use derive_more::derive::{Deref, IntoIterator};
use indexmap::IndexSet;
use serde::Serialize;

use crate::entry::{Entry, Group};
use crate::types::TreLocation;

/// What is known about the payload of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreContent {
    /// No schema was registered for the tag, the payload is kept as is
    Opaque(Vec<u8>),

    /// Top level entries of a record read with its schema
    Parsed(Group),
}

/// A single tagged record extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tre {
    name: String,
    location: TreLocation,
    content: TreContent,
}

impl Tre {
    /// Create a record holding a payload that was not parsed
    pub fn opaque(name: impl Into<String>, location: TreLocation, data: Vec<u8>) -> Tre {
        Tre {
            name: name.into(),
            location,
            content: TreContent::Opaque(data),
        }
    }

    /// Create a record holding parsed entries
    pub fn parsed(name: impl Into<String>, location: TreLocation, entries: Group) -> Tre {
        Tre {
            name: name.into(),
            location,
            content: TreContent::Parsed(entries),
        }
    }

    /// Tag name without padding
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> TreLocation {
        self.location
    }

    pub fn set_location(&mut self, location: TreLocation) {
        self.location = location;
    }

    pub fn content(&self) -> &TreContent {
        &self.content
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.content, TreContent::Opaque(_))
    }

    /// Payload of an opaque record
    pub fn raw_data(&self) -> Option<&[u8]> {
        match &self.content {
            TreContent::Opaque(data) => Some(data),
            TreContent::Parsed(_) => None,
        }
    }

    /// Top level entries of a parsed record
    pub fn entries(&self) -> Option<&Group> {
        match &self.content {
            TreContent::Opaque(_) => None,
            TreContent::Parsed(entries) => Some(entries),
        }
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries()?.entry(name)
    }

    /// Raw value of a top level field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.entries()?.field(name)
    }

    /// Value of a top level field read as a decimal integer
    pub fn int_value(&self, name: &str) -> Option<i64> {
        self.field(name)?.trim().parse().ok()
    }

    /// Value of a top level field read as a decimal number
    pub fn real_value(&self, name: &str) -> Option<f64> {
        self.field(name)?.trim().parse().ok()
    }
}

/// Records in the order they appear in the container
///
/// Tags may repeat, nothing is deduplicated.
#[derive(Deref, IntoIterator, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct TreCollection(Vec<Tre>);

impl TreCollection {
    pub fn new() -> TreCollection {
        TreCollection::default()
    }

    pub fn add(&mut self, tre: Tre) {
        self.0.push(tre);
    }

    /// Records attached to `location`
    pub fn for_location(&self, location: TreLocation) -> impl Iterator<Item = &Tre> {
        self.0.iter().filter(move |tre| tre.location == location)
    }

    /// Records with the tag `name`
    pub fn with_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tre> + 'a {
        self.0.iter().filter(move |tre| tre.name == name.trim_end_matches(' '))
    }

    /// Distinct tag names in order of first appearance
    pub fn unique_names(&self) -> IndexSet<&str> {
        self.0.iter().map(Tre::name).collect()
    }

    pub fn has_location(&self, location: TreLocation) -> bool {
        self.0.iter().any(|tre| tre.location == location)
    }

    /// Append every record of `other`, keeping its order
    pub fn merge(&mut self, other: TreCollection) {
        self.0.extend(other.0);
    }

    /// Fold the records of an overflow segment back into the segment they belong to
    pub fn reattach(&mut self, overflow: TreCollection, location: TreLocation) {
        self.0.extend(overflow.0.into_iter().map(|mut tre| {
            tre.set_location(location);
            tre
        }));
    }
}

impl FromIterator<Tre> for TreCollection {
    fn from_iter<T: IntoIterator<Item = Tre>>(iter: T) -> Self {
        TreCollection(iter.into_iter().collect())
    }
}

impl Extend<Tre> for TreCollection {
    fn extend<T: IntoIterator<Item = Tre>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}
