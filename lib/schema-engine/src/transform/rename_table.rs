use std::collections::{BTreeMap, BTreeSet};

/// One original name a public field name maps back to, and the types where it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTarget {
    pub original: String,
    pub types: BTreeSet<String>,
}

/// Public field name → original field name, scoped by the owning type.
///
/// The same public name may come from different original names on different types,
/// so a lookup always needs the type the field is selected on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable {
    entries: BTreeMap<String, Vec<RenameTarget>>,
}

impl RenameTable {
    pub fn insert(&mut self, public: &str, original: &str, type_name: &str) {
        let targets = self.entries.entry(public.to_string()).or_default();

        match targets.iter_mut().find(|t| t.original == original) {
            Some(target) => {
                target.types.insert(type_name.to_string());
            }
            None => targets.push(RenameTarget {
                original: original.to_string(),
                types: BTreeSet::from([type_name.to_string()]),
            }),
        }
    }

    /// The original name of `public` when selected on `type_name`, if it was renamed there.
    pub fn lookup(&self, type_name: &str, public: &str) -> Option<&str> {
        self.entries.get(public).and_then(|targets| {
            targets
                .iter()
                .find(|t| t.types.contains(type_name))
                .map(|t| t.original.as_str())
        })
    }

    pub fn targets(&self, public: &str) -> &[RenameTarget] {
        self.entries.get(public).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RenameTarget)> {
        self.entries
            .iter()
            .flat_map(|(public, targets)| targets.iter().map(move |t| (public.as_str(), t)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Argument renames, keyed by type and *public* field name.
///
/// Kept apart from [`RenameTable`]: an argument rename never implies a field rename
/// and the other way round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentRenameTable {
    entries: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl ArgumentRenameTable {
    pub fn insert(&mut self, type_name: &str, field: &str, public: &str, original: &str) {
        self.entries
            .entry(type_name.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default()
            .insert(public.to_string(), original.to_string());
    }

    pub fn lookup(&self, type_name: &str, field: &str, public: &str) -> Option<&str> {
        self.entries
            .get(type_name)
            .and_then(|fields| fields.get(field))
            .and_then(|arguments| arguments.get(public))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Public type name ↔ original type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRenameTable {
    to_original: BTreeMap<String, String>,
    to_public: BTreeMap<String, String>,
}

impl TypeRenameTable {
    pub fn insert(&mut self, original: &str, public: &str) {
        self.to_original
            .insert(public.to_string(), original.to_string());
        self.to_public
            .insert(original.to_string(), public.to_string());
    }

    pub fn original_of<'a>(&'a self, public: &'a str) -> &'a str {
        self.to_original
            .get(public)
            .map(String::as_str)
            .unwrap_or(public)
    }

    pub fn public_of<'a>(&'a self, original: &'a str) -> &'a str {
        self.to_public
            .get(original)
            .map(String::as_str)
            .unwrap_or(original)
    }

    pub fn len(&self) -> usize {
        self.to_original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_original.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{RenameTable, TypeRenameTable};

    #[test]
    fn lookups_are_scoped_by_type() {
        let mut table = RenameTable::default();
        table.insert("internalID", "id", "Order");
        table.insert("internalID", "_id", "Conversation");
        table.insert("internalID", "id", "Partner");

        assert_eq!(table.lookup("Order", "internalID"), Some("id"));
        assert_eq!(table.lookup("Partner", "internalID"), Some("id"));
        assert_eq!(table.lookup("Conversation", "internalID"), Some("_id"));
        assert_eq!(table.lookup("Artist", "internalID"), None);
        assert_eq!(table.targets("internalID").len(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unknown_type_names_map_to_themselves() {
        let mut table = TypeRenameTable::default();
        table.insert("Order", "Ecommerce_Order");

        assert_eq!(table.original_of("Ecommerce_Order"), "Order");
        assert_eq!(table.public_of("Order"), "Ecommerce_Order");
        assert_eq!(table.original_of("String"), "String");
    }
}
