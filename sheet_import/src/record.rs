//! Runtime record types and the per-row record instantiation.

use std::fmt::{Display, Formatter};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::host::Host;
use crate::schema::{DataRow, Schema};
use crate::value::{TypeTag, Value};

/// The column whose value names a record, if present.
pub const ID_COLUMN: &str = "id";

/// A member of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub tag: TypeTag,
}

/// A loaded record type: a name and its ordered members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    members: Vec<Member>,
}

/// One record instance. Every member always holds a value; unassigned members hold their type's default.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    members: Vec<(Member, Value)>,
}

/// Assigning a member by name failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberError {
    /// The type has no member with that name.
    Missing(String),
    /// The member exists but holds a different type.
    TypeMismatch {
        name: String,
        expected: TypeTag,
        found: TypeTag,
    },
}

impl std::error::Error for MemberError {}

impl Display for MemberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) if name.is_empty() => f.write_str("column has no field name"),
            Self::Missing(name) => write!(f, "no member named `{name}`"),
            Self::TypeMismatch { name, expected, found } => write!(f, "member `{name}` is `{expected}`, not `{found}`"),
        }
    }
}

impl TypeDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<Member>) -> Self {
        Self { name: name.into(), members }
    }

    /// Creates the record type matching a schema: one member per column with a non-blank name.
    #[must_use]
    pub fn from_schema(name: impl Into<String>, schema: &Schema) -> Self {
        let members = schema.entries()
            .iter()
            .filter(|e| !e.name.trim().is_empty())
            .map(|e| Member { name: e.name.clone(), tag: e.tag.clone() })
            .collect();

        Self::new(name, members)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Gets the member with the given name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

impl Record {
    /// Creates a record of the given type with every member at its default value.
    #[must_use]
    pub fn blank(ty: &TypeDescriptor) -> Self {
        Self {
            type_name: ty.name.clone(),
            members: ty.members.iter()
                .map(|m| (m.clone(), m.tag.default_value()))
                .collect(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Assigns a member by name.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), MemberError> {
        let (member, slot) = self.members.iter_mut()
            .find(|(m, _)| m.name == name)
            .ok_or_else(|| MemberError::Missing(name.to_owned()))?;

        let found = value.tag();
        if !found.fits(&member.tag) {
            return Err(MemberError::TypeMismatch {
                name: name.to_owned(),
                expected: member.tag.clone(),
                found,
            });
        }

        *slot = value;
        Ok(())
    }

    /// Gets a member's value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.iter()
            .find(|(m, _)| m.name == name)
            .map(|(_, v)| v)
    }

    /// Iterates the members and their values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(m, v)| (m.name.as_str(), v))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.members.len()))?;
        for (name, value) in self.values() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A record built from a data row, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Instantiated {
    pub record: Record,
    /// The record's name, i.e. the file name without extension.
    pub name: String,
    /// The path the record is persisted at.
    pub path: String,
    /// How many cells could not be assigned.
    pub warnings: usize,
}

/// Builds records of one type from the data rows of one document.
#[derive(Debug)]
pub struct Instantiator<'a> {
    ty: &'a TypeDescriptor,
    schema: &'a Schema,
    output_folder: &'a str,
    asset_extension: &'a str,
    id_column: Option<usize>,
}

impl<'a> Instantiator<'a> {
    #[must_use]
    pub fn new(ty: &'a TypeDescriptor, schema: &'a Schema, output_folder: &'a str, asset_extension: &'a str) -> Self {
        Self {
            ty,
            schema,
            output_folder,
            asset_extension,
            id_column: schema.position(ID_COLUMN),
        }
    }

    /// Gets the name for the record built from `row`.
    ///
    /// This is `<Type>_<id>` when the schema has an `id` column and the row has a value for it,
    /// otherwise `<Type>_<row index>`.
    #[must_use]
    pub fn record_name(&self, row: &DataRow<'_>) -> String {
        let id = self.id_column
            .and_then(|c| row.cells.get(c))
            .map(|id| id.trim())
            .filter(|id| !id.is_empty());

        match id {
            Some(id) => format!("{}_{id}", self.ty.name()),
            None => format!("{}_{}", self.ty.name(), row.index),
        }
    }

    /// Builds the record for a row.
    ///
    /// Cells that fail to convert or name no member are skipped with a warning,
    /// leaving the member at its default. Columns past the end of a short row are not touched.
    #[must_use]
    pub fn build(&self, row: &DataRow<'_>) -> Instantiated {
        let mut record = Record::blank(self.ty);
        let name = self.record_name(row);
        let mut warnings = 0usize;

        for (entry, raw) in self.schema.entries().iter().zip(&row.cells) {
            let result = entry.tag.coerce(raw)
                .map_err(|e| e.to_string())
                .and_then(|value| record.set(&entry.name, value).map_err(|e| e.to_string()));

            if let Err(why) = result {
                log::warn!("{name}: skipped field `{}`: {why}", entry.name);
                warnings += 1;
            }
        }

        let path = format!("{}/{name}.{}", self.output_folder, self.asset_extension);
        Instantiated { record, name, path, warnings }
    }

    /// Builds the record for a row and persists it through the host, overwriting any existing asset.
    ///
    /// Returns the built record info.
    pub fn instantiate<H: Host + ?Sized>(&self, host: &mut H, row: &DataRow<'_>) -> anyhow::Result<Instantiated> {
        let built = self.build(row);
        host.persist_record(&built.record, &built.path)?;
        log::debug!("Persisted {} at {}.", built.name, built.path);
        Ok(built)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{iter_data_rows, parse_document};
    use crate::testing::MemoryHost;

    fn heroes(text: &str) -> (Schema, TypeDescriptor) {
        let schema = parse_document(text).unwrap();
        let ty = TypeDescriptor::from_schema("Hero", &schema);
        (schema, ty)
    }

    #[test]
    fn two_rows_by_id() {
        let text = "int,string\nid,name\n1,Alice\n2,Bob\n";
        let (schema, ty) = heroes(text);
        let inst = Instantiator::new(&ty, &schema, "Assets/Data", "json");

        let built: Vec<_> = iter_data_rows(text).map(|r| inst.build(&r)).collect();
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].name, "Hero_1");
        assert_eq!(built[0].path, "Assets/Data/Hero_1.json");
        assert_eq!(built[0].record.get("id"), Some(&Value::Int(1)));
        assert_eq!(built[0].record.get("name"), Some(&Value::Str("Alice".to_owned())));
        assert_eq!(built[1].name, "Hero_2");
        assert_eq!(built[1].record.get("id"), Some(&Value::Int(2)));
        assert_eq!(built[1].record.get("name"), Some(&Value::Str("Bob".to_owned())));
        assert!(built.iter().all(|b| b.warnings == 0));
    }

    #[test]
    fn names_use_id_value() {
        let text = "string,int\nid,level\nknight,3\n,4\n";
        let (schema, ty) = heroes(text);
        let inst = Instantiator::new(&ty, &schema, "Assets", "json");

        let names: Vec<_> = iter_data_rows(text).map(|r| inst.record_name(&r)).collect();
        assert_eq!(names, ["Hero_knight", "Hero_2"]);
    }

    #[test]
    fn names_fall_back_to_index() {
        let text = "string,int\nname,level\nA,3\n\nB,4\n";
        let (schema, ty) = heroes(text);
        let inst = Instantiator::new(&ty, &schema, "Assets", "json");

        let names: Vec<_> = iter_data_rows(text).map(|r| inst.record_name(&r)).collect();
        assert_eq!(names, ["Hero_1", "Hero_2"]);
    }

    #[test]
    fn short_rows_keep_defaults() {
        let text = "int,string,bool\nid,name,alive\n5\n";
        let (schema, ty) = heroes(text);
        let inst = Instantiator::new(&ty, &schema, "Assets", "json");

        let row = iter_data_rows(text).next().unwrap();
        let built = inst.build(&row);
        assert_eq!(built.warnings, 0);
        assert_eq!(built.record.get("id"), Some(&Value::Int(5)));
        assert_eq!(built.record.get("name"), Some(&Value::Str(String::new())));
        assert_eq!(built.record.get("alive"), Some(&Value::Bool(false)));
    }

    #[test]
    fn bad_cells_do_not_stop_the_row() {
        let text = "int,int,string,string\nid,hp,,name\n1,lots,ignored,Alice\n";
        let (schema, ty) = heroes(text);
        assert_eq!(ty.members().len(), 3);

        let inst = Instantiator::new(&ty, &schema, "Assets", "json");
        let row = iter_data_rows(text).next().unwrap();
        let built = inst.build(&row);

        // "lots" fails to parse, the unnamed column has no member
        assert_eq!(built.warnings, 2);
        assert_eq!(built.record.get("hp"), Some(&Value::Int(0)));
        assert_eq!(built.record.get("name"), Some(&Value::Str("Alice".to_owned())));
    }

    #[test]
    fn set_checks_members() {
        let ty = TypeDescriptor::new("Item", vec![Member { name: "count".to_owned(), tag: TypeTag::Int }]);
        let mut record = Record::blank(&ty);

        assert_eq!(record.set("count", Value::Int(4)), Ok(()));
        assert_eq!(record.set("weight", Value::Int(4)), Err(MemberError::Missing("weight".to_owned())));
        assert!(matches!(record.set("count", Value::Str("x".to_owned())), Err(MemberError::TypeMismatch { .. })));
        assert_eq!(record.get("count"), Some(&Value::Int(4)));
    }

    #[test]
    fn records_serialize_in_member_order() {
        let text = "string,int,float\nname,id,speed\nZed,9,0.5\n";
        let (schema, ty) = heroes(text);
        let inst = Instantiator::new(&ty, &schema, "Assets", "json");
        let row = iter_data_rows(text).next().unwrap();

        let json = serde_json::to_string(&inst.build(&row).record).unwrap();
        assert_eq!(json, r#"{"name":"Zed","id":9,"speed":0.5}"#);
    }

    #[test]
    fn string_cells_are_verbatim() {
        let text = "int,string\nid,name\n 7 , Alice \n";
        let (schema, ty) = heroes(text);
        let inst = Instantiator::new(&ty, &schema, "Assets", "json");

        let built = inst.build(&iter_data_rows(text).next().unwrap());
        assert_eq!(built.name, "Hero_7");
        assert_eq!(built.warnings, 0);
        assert_eq!(built.record.get("id"), Some(&Value::Int(7)));
        assert_eq!(built.record.get("name"), Some(&Value::Str(" Alice ".to_owned())));
    }

    #[test]
    fn instantiate_persists() {
        let text = "int,string\nid,name\n1,Alice\n";
        let (schema, ty) = heroes(text);
        let inst = Instantiator::new(&ty, &schema, "Assets/Data", "json");
        let mut host = MemoryHost::default();

        let row = iter_data_rows(text).next().unwrap();
        let built = inst.instantiate(&mut host, &row).unwrap();
        assert_eq!(host.records.get(&built.path), Some(&built.record));
    }
}
