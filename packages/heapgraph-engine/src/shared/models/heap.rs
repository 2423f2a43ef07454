// Heap snapshot records - instances, classes, fields
//
// The snapshot is immutable for its whole lifetime: a class's instance set
// never changes, and an instance belongs to exactly one class.

use serde::{Deserialize, Serialize};

/// Stable identity of one object or array node in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

/// Stable identity of a class in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u64);

/// One object or array node of the heap graph.
///
/// Field values are not stored inline; they are fetched through the
/// snapshot reader when a traversal actually expands the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// The single class this instance belongs to.
    pub class_id: ClassId,
    /// Shallow size in bytes.
    pub size: u64,
    /// Object-array instances have indexable elements instead of named
    /// fields.
    pub is_array: bool,
    /// Single predecessor on some path towards a GC root, recorded at
    /// capture time for cheap path reconstruction. May be absent or broken
    /// in externally produced snapshots.
    pub nearest_gc_root: Option<InstanceId>,
}

/// Class metadata resolved from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub id: ClassId,
    /// Fully-qualified name, already in source form (`int[]`, not `[I`).
    pub name: String,
    pub super_class: Option<ClassId>,
    /// The class-loader instance, when the snapshot recorded one.
    pub class_loader: Option<InstanceId>,
}

impl ClassDescriptor {
    /// Whether `name` is an array type.
    pub fn is_array_class(&self) -> bool {
        self.name.ends_with("[]")
    }
}

/// Declaring metadata of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub declaring_class: ClassId,
    pub declaring_class_name: String,
    pub name: String,
    pub is_static: bool,
}

impl FieldDescriptor {
    /// `Declaring.Class.fieldName`, the form exclusion policies match on.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_class_name, self.name)
    }

    /// Synthetic descriptor for an array-element edge (`"[i]"`). Element
    /// edges carry no declaring field and are never name-excluded.
    pub fn array_element(declaring_class: ClassId, declaring_class_name: &str, index: usize) -> Self {
        Self {
            declaring_class,
            declaring_class_name: declaring_class_name.to_string(),
            name: format!("[{index}]"),
            is_static: false,
        }
    }
}

/// Primitive field payloads, tagged the way the capture format tags them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

/// Payload of one field slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldData {
    Primitive(PrimitiveValue),
    /// Reference-typed slot; `None` is a null reference.
    Reference(Option<InstanceId>),
}

/// One field slot of an instance (or one static slot of a class).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub field: FieldDescriptor,
    pub data: FieldData,
}

impl FieldValue {
    /// The referenced instance, when this slot is a non-null reference.
    pub fn referenced(&self) -> Option<InstanceId> {
        match self.data {
            FieldData::Reference(target) => target,
            FieldData::Primitive(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qualified_name_joins_declaring_class_and_field() {
        let field = FieldDescriptor {
            declaring_class: ClassId(7),
            declaring_class_name: "java.util.HashMap".to_string(),
            name: "table".to_string(),
            is_static: false,
        };
        assert_eq!(field.qualified_name(), "java.util.HashMap.table");
    }

    #[test]
    fn array_element_descriptor_uses_index_syntax() {
        let field = FieldDescriptor::array_element(ClassId(3), "java.lang.Object[]", 4);
        assert_eq!(field.name, "[4]");
        assert!(!field.is_static);
    }

    #[test]
    fn referenced_ignores_primitives_and_nulls() {
        let field = FieldDescriptor {
            declaring_class: ClassId(1),
            declaring_class_name: "A".to_string(),
            name: "f".to_string(),
            is_static: false,
        };
        let primitive = FieldValue {
            field: field.clone(),
            data: FieldData::Primitive(PrimitiveValue::Int(3)),
        };
        let null_ref = FieldValue {
            field: field.clone(),
            data: FieldData::Reference(None),
        };
        let live_ref = FieldValue {
            field,
            data: FieldData::Reference(Some(InstanceId(9))),
        };
        assert_eq!(primitive.referenced(), None);
        assert_eq!(null_ref.referenced(), None);
        assert_eq!(live_ref.referenced(), Some(InstanceId(9)));
    }
}
