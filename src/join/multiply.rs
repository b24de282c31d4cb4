use crate::db::model::{Field, Record};
use std::collections::{HashMap, HashSet};

/// Reference feature: attributes plus the geometry that gets replicated.
pub type GeoRecord = Record;
/// Row of the attribute table; its geometry, if any, is ignored.
pub type AttributeRecord = Record;
/// Reference attributes, attribute-table attributes and reference geometry.
pub type JoinedRecord = Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSchema {
    /// Every attribute field of the joined output, reference fields first.
    pub output: Vec<Field>,
    /// Attribute-table fields the reference schema lacks.
    pub added: Vec<Field>,
}

/// Reference fields keep their definitions; attribute-table fields are added
/// only when the reference has no field of that name. Names compare without
/// case, as store columns do.
pub fn merge_schema(geo_fields: &[Field], attr_fields: &[Field]) -> MergedSchema {
    let mut output: Vec<Field> = geo_fields.iter().filter(|f| !f.is_geometry()).cloned().collect();
    let mut existing: HashSet<String> = geo_fields.iter().map(|f| f.name.to_lowercase()).collect();
    let added: Vec<Field> = attr_fields
        .iter()
        .filter(|f| !f.is_geometry() && existing.insert(f.name.to_lowercase()))
        .cloned()
        .collect();
    output.extend(added.iter().cloned());

    MergedSchema { output, added }
}

/// Inner equi-join of reference records and attribute records on their
/// country-code fields. Output follows reference order, then attribute
/// insertion order within each code. Records with a null or blank code never
/// join.
pub fn multiply(
    geo_records: &[GeoRecord],
    geo_join_field: &str,
    attr_records: &[AttributeRecord],
    attr_join_field: &str,
) -> Vec<JoinedRecord> {
    let mut by_code: HashMap<String, Vec<&AttributeRecord>> = HashMap::new();
    for attr in attr_records {
        let code = match attr.get(attr_join_field).as_key() {
            Some(code) => code,
            None => continue,
        };
        by_code.entry(code).or_default().push(attr);
    }

    let mut joined = Vec::new();
    for geo in geo_records {
        let code = match geo.get(geo_join_field).as_key() {
            Some(code) => code,
            None => continue,
        };
        let matches = match by_code.get(&code) {
            Some(matches) => matches,
            None => continue,
        };

        let geo_names: HashSet<String> = geo.attributes.keys().map(|k| k.to_lowercase()).collect();
        for attr in matches {
            let mut attributes = geo.attributes.clone();
            for (name, value) in &attr.attributes {
                if !geo_names.contains(&name.to_lowercase()) {
                    attributes.insert(name.clone(), value.clone());
                }
            }
            joined.push(JoinedRecord {
                attributes,
                geometry: geo.geometry.clone(),
            });
        }
    }
    tracing::debug!(
        "Multiplied {} reference records by {} attribute records into {}",
        geo_records.len(),
        attr_records.len(),
        joined.len()
    );

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::model::{FieldType, FieldValue, Geometry};

    fn geo(code: &str, geometry: &str) -> GeoRecord {
        let mut record = Record::default();
        record.attributes.insert("ISO_CC".into(), code.into());
        record.attributes.insert("NAME".into(), format!("name of {}", code).into());
        record.geometry = Some(Geometry(geometry.to_string()));
        record
    }

    fn attr(code: Option<&str>, org: &str) -> AttributeRecord {
        let mut record = Record::default();
        record.attributes.insert(
            "country_aor".into(),
            code.map(FieldValue::from).unwrap_or(FieldValue::Null),
        );
        record.attributes.insert("org".into(), org.into());
        record
    }

    fn orgs(joined: &[JoinedRecord]) -> Vec<String> {
        joined.iter().map(|r| r.get("org").to_string()).collect()
    }

    #[test]
    fn replicates_geometry_for_every_match() {
        let geos = vec![geo("IRQ", "G1")];
        let attrs = vec![attr(Some("IRQ"), "Group A"), attr(Some("IRQ"), "Group B")];
        let joined = multiply(&geos, "ISO_CC", &attrs, "country_aor");

        assert_eq!(joined.len(), 2);
        assert!(joined.iter().all(|r| r.geometry == Some(Geometry("G1".into()))));
        assert_eq!(orgs(&joined), vec!["Group A", "Group B"]);
        assert_eq!(joined[0].get("NAME"), &FieldValue::Text("name of IRQ".into()));
    }

    #[test]
    fn preserves_outer_and_inner_order() {
        let geos = vec![geo("SYR", "G2"), geo("FRA", "G3"), geo("IRQ", "G1")];
        let attrs = vec![
            attr(Some("IRQ"), "A"),
            attr(Some("SYR"), "B"),
            attr(Some("IRQ"), "C"),
            attr(Some("SYR"), "D"),
        ];
        let joined = multiply(&geos, "ISO_CC", &attrs, "country_aor");

        assert_eq!(orgs(&joined), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn row_count_is_sum_of_matches() {
        let geos = vec![geo("IRQ", "G1"), geo("SYR", "G2"), geo("IRQ", "G1b")];
        let attrs = vec![attr(Some("IRQ"), "A"), attr(Some("IRQ"), "B"), attr(Some("SYR"), "C")];
        assert_eq!(multiply(&geos, "ISO_CC", &attrs, "country_aor").len(), 2 + 1 + 2);
    }

    #[test]
    fn empty_or_unmatched_inputs_give_empty_output() {
        let geos = vec![geo("IRQ", "G1")];
        assert!(multiply(&geos, "ISO_CC", &[], "country_aor").is_empty());

        let attrs = vec![attr(Some("PER"), "A"), attr(None, "B"), attr(Some(""), "C")];
        assert!(multiply(&geos, "ISO_CC", &attrs, "country_aor").is_empty());
    }

    #[test]
    fn null_codes_never_join() {
        let geos = vec![geo("IRQ", "G1")];
        let attrs = vec![attr(None, "A"), attr(Some("IRQ"), "B")];
        assert_eq!(orgs(&multiply(&geos, "ISO_CC", &attrs, "country_aor")), vec!["B"]);
    }

    #[test]
    fn reference_fields_are_never_overwritten() {
        let geos = vec![geo("IRQ", "G1")];
        let mut colliding = attr(Some("IRQ"), "A");
        colliding.attributes.insert("NAME".into(), "from table".into());
        let joined = multiply(&geos, "ISO_CC", &[colliding], "country_aor");

        assert_eq!(joined[0].get("NAME"), &FieldValue::Text("name of IRQ".into()));
        assert_eq!(joined[0].get("country_aor"), &FieldValue::Text("IRQ".into()));
    }

    #[test]
    fn fields_differing_only_in_case_are_not_duplicated() {
        let geos = vec![geo("IRQ", "G1")];
        let mut colliding = attr(Some("IRQ"), "A");
        colliding.attributes.insert("name".into(), "from table".into());
        let joined = multiply(&geos, "ISO_CC", &[colliding], "country_aor");

        assert_eq!(joined[0].get("NAME"), &FieldValue::Text("name of IRQ".into()));
        assert_eq!(joined[0].get("name"), &FieldValue::Null);
        assert_eq!(joined[0].get("org"), &FieldValue::Text("A".into()));
    }

    #[test]
    fn merge_schema_adds_only_new_fields() {
        let geo_fields = vec![
            Field::new("ISO_CC", FieldType::Text),
            Field::new("NAME", FieldType::Text),
            Field::new("SHAPE", FieldType::Geometry),
        ];
        let attr_fields = vec![
            Field::new("entity_name", FieldType::Text),
            Field::new("NAME", FieldType::Integer),
            Field::new("iso_cc", FieldType::Text),
            Field::new("country_aor", FieldType::Text),
        ];
        let merged = merge_schema(&geo_fields, &attr_fields);

        let added: Vec<&str> = merged.added.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(added, vec!["entity_name", "country_aor"]);
        let output: Vec<&str> = merged.output.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(output, vec!["ISO_CC", "NAME", "entity_name", "country_aor"]);
        assert_eq!(merged.output[1].field_type, FieldType::Text);
    }
}
