//! Field Mapping Table
//!
//! The ordered, named schema of the register file built by the config
//! interpreter. Commands look fields up by name or walk the whole table, then
//! translate each field into register reads and writes through the value
//! layer in [`value`].

mod field;
mod value;

pub use field::{
    BitField, BitPosition, ChecksumAlgorithm, ChecksumField, FieldDefinition, FieldKind, Region,
    BITFIELD_MAX_BITS,
};
pub use value::{
    compute_checksum, read_field, stored_checksum, update_checksums, verify_checksum,
    write_field, FieldError, FieldValue,
};

use serde::Serialize;

/// Ordered table of field definitions with unique names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMap {
    fields: Vec<FieldDefinition>,
}

impl FieldMap {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Returns the field back if its name is already taken.
    pub fn insert(&mut self, field: FieldDefinition) -> Result<(), FieldDefinition> {
        if self.contains(&field.name) {
            return Err(field);
        }
        self.fields.push(field);
        Ok(())
    }

    /// Whether a field with this exact name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get a field by name
    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, FieldDefinition> {
        self.fields.iter()
    }

    /// Iterate over the checksum fields in declaration order
    pub fn checksums(&self) -> impl Iterator<Item = (&FieldDefinition, &ChecksumField)> {
        self.fields.iter().filter_map(|f| match &f.kind {
            FieldKind::Checksum(checksum) => Some((f, checksum)),
            _ => None,
        })
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = &'a FieldDefinition;
    type IntoIter = std::slice::Iter<'a, FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytearray(name: &str, position: usize, length: usize) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            kind: FieldKind::ByteArray(Region::new(position, length).unwrap()),
        }
    }

    #[test]
    fn test_insert_keeps_order_and_rejects_duplicates() {
        let mut map = FieldMap::new();
        map.insert(bytearray("b", 0x10, 1)).unwrap();
        map.insert(bytearray("a", 0x11, 1)).unwrap();

        let rejected = map.insert(bytearray("b", 0x20, 2)).unwrap_err();
        assert_eq!(rejected.name, "b");

        let names: Vec<&str> = map.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(map.get("b").unwrap().kind, FieldKind::ByteArray(Region::new(0x10, 1).unwrap()));
    }

    #[test]
    fn test_names_match_exactly() {
        let mut map = FieldMap::new();
        map.insert(bytearray("boot", 0x10, 1)).unwrap();
        assert!(map.get("boo").is_none());
        assert!(map.get("Boot").is_none());
        map.insert(bytearray("boo", 0x11, 1)).unwrap();
        assert_eq!(map.len(), 2);
    }
}
