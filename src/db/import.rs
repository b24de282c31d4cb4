use super::geo_store::GeoStore;
use super::model::{CollectionInfo, Field, FieldType, FieldValue, Geometry, Record};
use crate::error::PipelineError;
use crate::prelude::*;
use anyhow::Context;
use serde_json::{from_str, Value};
use std::path::Path;

pub const DEFAULT_SPATIAL_REFERENCE: &str = "EPSG:4326";

/// Loads a CSV file into a new table. Column types are inferred: a column
/// whose non-empty cells all parse as integers is `Integer`, then `Double`,
/// otherwise `Text`. Empty cells become null.
pub async fn import_csv_table(store: &GeoStore, csv_path: &Path, table: &str) -> Result<CollectionInfo> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("import: opening {}", csv_path.display()))?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("import: row {} of {}", rows.len(), csv_path.display()))?;
        rows.push(row.iter().map(|cell| cell.to_string()).collect());
    }

    let fields: Vec<Field> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| infer_column(name, rows.iter().map(|row| row.get(i).map(String::as_str).unwrap_or(""))))
        .collect();

    let records: Vec<Record> = rows
        .iter()
        .map(|row| {
            let mut record = Record::default();
            for (i, field) in fields.iter().enumerate() {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                record.attributes.insert(field.name.clone(), parse_cell(cell, field.field_type));
            }
            record
        })
        .collect();

    let info = store.create_collection(table, &fields, None, None).await?;
    store.write_records(table, &records).await?;
    tracing::info!("Imported {} rows from {} into {}", records.len(), csv_path.display(), table);

    Ok(info)
}

fn infer_column<'a>(name: &str, cells: impl Iterator<Item = &'a str>) -> Field {
    let mut all_integer = true;
    let mut all_double = true;
    let mut max_len = 0;
    let mut any_value = false;
    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        any_value = true;
        max_len = max_len.max(cell.chars().count());
        all_integer &= cell.parse::<i64>().is_ok();
        all_double &= cell.parse::<f64>().is_ok();
    }

    match (any_value, all_integer, all_double) {
        (true, true, _) => Field::new(name, FieldType::Integer),
        (true, false, true) => Field::new(name, FieldType::Double),
        _ => Field::new(name, FieldType::Text).with_length((max_len as i32).max(255)),
    }
}

fn parse_cell(cell: &str, field_type: FieldType) -> FieldValue {
    let cell = cell.trim();
    if cell.is_empty() {
        return FieldValue::Null;
    }

    match field_type {
        FieldType::Integer => cell.parse().map(FieldValue::Integer).unwrap_or(FieldValue::Null),
        FieldType::Double => cell.parse().map(FieldValue::Double).unwrap_or(FieldValue::Null),
        _ => FieldValue::Text(cell.to_string()),
    }
}

/// Loads a GeoJSON `FeatureCollection` into a new feature class. Properties
/// become fields in first-seen order; a property holding mixed kinds of
/// values is stored as text.
pub async fn import_geojson(store: &GeoStore, geojson_path: &Path, name: &str) -> Result<CollectionInfo> {
    let text = tokio::fs::read_to_string(geojson_path)
        .await
        .with_context(|| format!("import: reading {}", geojson_path.display()))?;
    let (fields, records, geometry_type, spatial_reference) = parse_feature_collection(&text)?;

    let info = store
        .create_collection(name, &fields, Some(&geometry_type), Some(&spatial_reference))
        .await?;
    store.write_records(name, &records).await?;
    tracing::info!("Imported {} features from {} into {}", records.len(), geojson_path.display(), name);

    Ok(info)
}

type ParsedFeatures = (Vec<Field>, Vec<Record>, String, String);

fn parse_feature_collection(text: &str) -> Result<ParsedFeatures> {
    let parsed: Value = from_str(text)?;
    if parsed["type"].as_str() != Some("FeatureCollection") {
        return Err(PipelineError::InvalidDocument("GeoJSON root is not a FeatureCollection".into()).into());
    }

    let features = match parsed["features"].as_array() {
        Some(features) => features,
        None => {
            return Err(PipelineError::InvalidDocument("FeatureCollection has no features array".into()).into())
        }
    };

    let spatial_reference = parsed["crs"]["properties"]["name"]
        .as_str()
        .unwrap_or(DEFAULT_SPATIAL_REFERENCE)
        .to_string();
    let mut geometry_type: Option<String> = None;
    let mut fields: Vec<Field> = Vec::new();
    let mut records = Vec::with_capacity(features.len());
    for (i, feature) in features.iter().enumerate() {
        let geometry = &feature["geometry"];
        if geometry.is_null() {
            tracing::warn!("Feature {} has no geometry", i);
        } else if geometry_type.is_none() {
            geometry_type = geometry["type"].as_str().map(|t| t.to_string());
        }

        let mut record = Record {
            geometry: match geometry.is_null() {
                true => None,
                false => Some(Geometry(geometry.to_string())),
            },
            ..Default::default()
        };

        if let Some(properties) = feature["properties"].as_object() {
            for (key, value) in properties {
                let (field_type, value) = json_to_value(value);
                match fields.iter_mut().find(|f| &f.name == key) {
                    Some(field) => {
                        if let Some(field_type) = field_type {
                            if field.field_type != field_type {
                                field.field_type = FieldType::Text;
                                field.length = 255;
                            }
                        }
                    }
                    None => fields.push(Field::new(key, field_type.unwrap_or(FieldType::Text))),
                }
                record.attributes.insert(key.clone(), value);
            }
        }
        records.push(record);
    }

    for record in &mut records {
        for field in fields.iter().filter(|f| f.field_type == FieldType::Text) {
            if let Some(value) = record.attributes.get_mut(&field.name) {
                if let FieldValue::Integer(_) | FieldValue::Double(_) = value {
                    *value = FieldValue::Text(value.to_string());
                }
            }
        }
    }

    Ok((
        fields,
        records,
        geometry_type.unwrap_or_else(|| "Polygon".to_string()),
        spatial_reference,
    ))
}

fn json_to_value(value: &Value) -> (Option<FieldType>, FieldValue) {
    match value {
        Value::Null => (None, FieldValue::Null),
        Value::Bool(b) => (Some(FieldType::Integer), FieldValue::Integer(*b as i64)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => (Some(FieldType::Integer), FieldValue::Integer(i)),
            None => (Some(FieldType::Double), FieldValue::Double(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => (Some(FieldType::Text), FieldValue::Text(s.clone())),
        other => (Some(FieldType::Text), FieldValue::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_columns_are_typed_from_their_cells() {
        let cells = ["1", "2", ""];
        assert_eq!(infer_column("n", cells.into_iter()).field_type, FieldType::Integer);
        let cells = ["1.5", "2"];
        assert_eq!(infer_column("d", cells.into_iter()).field_type, FieldType::Double);
        let cells = ["IRQ", ""];
        assert_eq!(infer_column("c", cells.into_iter()).field_type, FieldType::Text);
        let cells = ["", ""];
        assert_eq!(infer_column("e", cells.into_iter()).field_type, FieldType::Text);
        assert_eq!(parse_cell("", FieldType::Text), FieldValue::Null);
    }

    #[test]
    fn feature_collection_properties_become_fields() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"ISO_CC": "IRQ", "POP": 45},
                 "geometry": {"type": "Polygon", "coordinates": [[[40,30],[45,30],[45,35],[40,30]]]}},
                {"type": "Feature", "properties": {"ISO_CC": "SYR", "POP": "unknown"},
                 "geometry": {"type": "Polygon", "coordinates": [[[36,33],[41,33],[41,37],[36,33]]]}}
            ]
        }"#;
        let (fields, records, geometry_type, spatial_reference) = parse_feature_collection(text).unwrap();

        assert_eq!(geometry_type, "Polygon");
        assert_eq!(spatial_reference, DEFAULT_SPATIAL_REFERENCE);
        assert_eq!(fields[0].name, "ISO_CC");
        assert_eq!(fields[1].field_type, FieldType::Text);
        assert_eq!(records[0].get("POP"), &FieldValue::Text("45".into()));
        assert!(records[1].geometry.as_ref().unwrap().0.contains("Polygon"));
    }

    #[test]
    fn non_feature_collections_are_rejected() {
        let err = parse_feature_collection(r#"{"type": "Feature"}"#).unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
    }

    #[tokio::test]
    async fn csv_import_creates_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("orgs.csv");
        std::fs::write(&csv_path, "entity_name,country_aor,source_link\nGroup A,IRQ,l\nGroup A,,l\n").unwrap();
        let store = GeoStore::open(&dir.path().join("gdb.sqlite")).await.unwrap();

        import_csv_table(&store, &csv_path, "orgs").await.unwrap();
        let fields = vec!["entity_name".to_string(), "country_aor".to_string()];
        let records = store.read_records("orgs", &fields).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("country_aor"), &FieldValue::Text("IRQ".into()));
        assert_eq!(records[1].get("country_aor"), &FieldValue::Null);
    }
}
