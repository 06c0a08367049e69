//! The value tree of a parsed TRE

use derive_more::derive::{Constructor, Deref, IntoIterator};
use serde::{Deserialize, Serialize};

use crate::schema::FieldKind;

/// A named value, or a named list of loop iterations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    /// A single field, `value` holds the bytes of the field one character per byte
    Field {
        name: String,
        value: String,
        kind: FieldKind,
    },

    /// One [`Group`] per iteration of a loop
    Groups { name: String, groups: Vec<Group> },
}

impl Entry {
    pub fn new_field(name: impl Into<String>, value: impl Into<String>, kind: FieldKind) -> Entry {
        Entry::Field {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }

    pub fn new_groups(name: impl Into<String>, groups: Vec<Group>) -> Entry {
        Entry::Groups {
            name: name.into(),
            groups,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Field { name, .. } | Entry::Groups { name, .. } => name,
        }
    }

    /// The value of a field entry
    pub fn value(&self) -> Option<&str> {
        match self {
            Entry::Field { value, .. } => Some(value),
            Entry::Groups { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Entry::Field { kind, .. } => Some(*kind),
            Entry::Groups { .. } => None,
        }
    }

    /// The iterations of a loop entry
    pub fn groups(&self) -> Option<&[Group]> {
        match self {
            Entry::Field { .. } => None,
            Entry::Groups { groups, .. } => Some(groups),
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Entry::Field { .. })
    }
}

/// Entries of one loop iteration, or of the top level of a TRE
#[derive(Constructor, Deref, IntoIterator, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct Group(Vec<Entry>);

impl Group {
    /// First entry called `name`
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.iter().find(|entry| entry.name() == name)
    }

    /// Value of the first field called `name`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.entry(name).and_then(Entry::value)
    }
}

impl FromIterator<Entry> for Group {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Group(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::entry::{Entry, Group};
    use crate::schema::FieldKind;

    fn sample() -> Group {
        Group::new(vec![
            Entry::new_field("COUNT", "02", FieldKind::Integer),
            Entry::new_groups(
                "ITEMS",
                vec![
                    Group::new(vec![Entry::new_field("ITEM", "ab", FieldKind::String)]),
                    Group::new(vec![Entry::new_field("ITEM", "cd", FieldKind::String)]),
                ],
            ),
        ])
    }

    #[test]
    fn lookup_entries() {
        let group = sample();

        assert_eq!(group.field("COUNT"), Some("02"));
        assert_eq!(group.field("ITEMS"), None);
        assert_eq!(group.field("NOPE"), None);

        let items = group.entry("ITEMS").and_then(Entry::groups).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].field("ITEM"), Some("cd"));
        assert!(!group.entry("ITEMS").unwrap().is_field());
        assert_eq!(group.entry("COUNT").unwrap().kind(), Some(FieldKind::Integer));
    }

    #[test]
    fn iterate_group() {
        let names = sample()
            .into_iter()
            .map(|entry| entry.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["COUNT", "ITEMS"]);
    }

    #[test]
    fn serialize_tree() -> serde_json::Result<()> {
        let json = serde_json::to_value(sample())?;
        assert_eq!(
            json,
            serde_json::json!([
                { "name": "COUNT", "value": "02", "kind": "integer" },
                { "name": "ITEMS", "groups": [
                    [ { "name": "ITEM", "value": "ab", "kind": "string" } ],
                    [ { "name": "ITEM", "value": "cd", "kind": "string" } ]
                ] }
            ])
        );

        let back: Group = serde_json::from_value(json)?;
        assert_eq!(back, sample());
        Ok(())
    }
}
