use std::{collections::HashMap, fmt};

pub const SHAPE_FIELD: &str = "SHAPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Double,
    Date,
    Geometry,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Integer => "INTEGER",
            FieldType::Double => "DOUBLE",
            FieldType::Date => "DATE",
            FieldType::Geometry => "GEOMETRY",
        }
    }

    pub fn parse(s: &str) -> Option<FieldType> {
        match s {
            "TEXT" => Some(FieldType::Text),
            "INTEGER" => Some(FieldType::Integer),
            "DOUBLE" => Some(FieldType::Double),
            "DATE" => Some(FieldType::Date),
            "GEOMETRY" => Some(FieldType::Geometry),
            _ => None,
        }
    }

    /// SQLite column affinity used for the data table.
    pub fn column_type(&self) -> &'static str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::Double => "REAL",
            FieldType::Text | FieldType::Date | FieldType::Geometry => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub precision: i32,
    pub scale: i32,
    pub length: i32,
}

impl Field {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        let length = match field_type {
            FieldType::Text => 255,
            FieldType::Date => 8,
            _ => 0,
        };

        Field {
            name: name.to_string(),
            field_type,
            precision: 0,
            scale: 0,
            length,
        }
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    pub fn is_geometry(&self) -> bool {
        self.field_type == FieldType::Geometry
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl FieldValue {
    /// String form used for equality joins and grouping. Null and blank text
    /// have no key.
    pub fn as_key(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Double(d) => Some(d.to_string()),
            FieldValue::Text(s) if s.trim().is_empty() => None,
            FieldValue::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "<null>"),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Double(d) => write!(f, "{}", d),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        FieldValue::Double(d)
    }
}

/// Geometry payload as GeoJSON text. Never inspected, only copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry(pub String);

pub type Attributes = HashMap<String, FieldValue>;

/// A row as the store reads and writes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub attributes: Attributes,
    pub geometry: Option<Geometry>,
}

impl Record {
    pub fn get(&self, field: &str) -> &FieldValue {
        self.attributes.get(field).unwrap_or(&FieldValue::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    FeatureClass,
    Table,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::FeatureClass => "feature_class",
            CollectionKind::Table => "table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub kind: CollectionKind,
    pub dataset: Option<String>,
    pub geometry_type: Option<String>,
    pub spatial_reference: Option<String>,
}
