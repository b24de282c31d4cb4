use crate::prelude::*;
use crate::region::{matcher::CountryMatch, resolver::resolve};
use crate::scrape::aor_page::EntityAorText;
use anyhow::Context;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub entity_name: String,
    pub country_codes: Vec<CountryMatch>,
    pub source_link: String,
}

impl ResolvedEntity {
    pub fn is_unresolved(&self) -> bool {
        self.country_codes == [CountryMatch::NoMatch]
    }
}

/// One row of the flat export; `country_aor` is empty for unresolved entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub entity_name: String,
    pub country_aor: String,
    pub source_link: String,
}

/// Resolves every entity, keeping input order. Entities are independent, so
/// resolution runs on the rayon pool.
pub fn build(entities: &[EntityAorText]) -> Vec<ResolvedEntity> {
    entities
        .par_iter()
        .map(|entity| ResolvedEntity {
            entity_name: entity.entity_name.clone(),
            country_codes: resolve(&entity.raw_text),
            source_link: entity.source_link.clone(),
        })
        .collect()
}

/// One row per (entity, country). Unresolved entities keep a single row.
pub fn explode(resolved: &[ResolvedEntity]) -> Vec<(String, CountryMatch, String)> {
    resolved
        .iter()
        .flat_map(|entity| {
            entity
                .country_codes
                .iter()
                .map(|code| (entity.entity_name.clone(), *code, entity.source_link.clone()))
        })
        .collect()
}

pub fn no_match_count(resolved: &[ResolvedEntity]) -> usize {
    resolved.iter().filter(|entity| entity.is_unresolved()).count()
}

pub fn to_export_rows(rows: &[(String, CountryMatch, String)]) -> Vec<ExportRow> {
    rows.iter()
        .map(|(entity_name, code, source_link)| ExportRow {
            entity_name: entity_name.clone(),
            country_aor: code.export_code().to_string(),
            source_link: source_link.clone(),
        })
        .collect()
}

pub fn export_csv(rows: &[ExportRow], csv_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("export: creating {}", csv_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::info!("Exported {} rows to {}", rows.len(), csv_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::matcher::CountryCode;

    fn entity(name: &str, raw_text: &str) -> EntityAorText {
        EntityAorText {
            entity_name: name.to_string(),
            raw_text: raw_text.to_string(),
            source_link: "link".to_string(),
        }
    }

    #[test]
    fn build_keeps_input_order() {
        let entities = vec![
            entity("Group B", "Mali"),
            entity("Group A", "areas of operation – Iraq, Syria and Iraq"),
            entity("Group C", "worldwide"),
        ];
        let resolved = build(&entities);

        let names: Vec<&str> = resolved.iter().map(|r| r.entity_name.as_str()).collect();
        assert_eq!(names, vec!["Group B", "Group A", "Group C"]);
        assert_eq!(
            resolved[1].country_codes,
            vec![
                CountryMatch::Country(CountryCode("IRQ")),
                CountryMatch::Country(CountryCode("SYR"))
            ]
        );
        assert!(resolved[2].is_unresolved());
        assert_eq!(no_match_count(&resolved), 1);
    }

    #[test]
    fn explode_yields_one_row_per_country() {
        let resolved = build(&[entity("Group A", "areas of operation – Iraq, Syria and Iraq")]);
        let rows = explode(&resolved);

        assert_eq!(
            rows,
            vec![
                ("Group A".to_string(), CountryMatch::Country(CountryCode("IRQ")), "link".to_string()),
                ("Group A".to_string(), CountryMatch::Country(CountryCode("SYR")), "link".to_string()),
            ]
        );
    }

    #[test]
    fn unresolved_entities_are_not_dropped() {
        let resolved = build(&[entity("Group C", "unknown"), entity("Group D", "Kenya Somalia Ethiopia")]);
        let rows = explode(&resolved);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].1, CountryMatch::NoMatch);
        assert!(rows[1..].iter().all(|(name, _, link)| name == "Group D" && link == "link"));
    }

    #[test]
    fn export_writes_empty_code_for_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let resolved = build(&[entity("Group A", "Iraq"), entity("Group C", "unknown")]);
        export_csv(&to_export_rows(&explode(&resolved)), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "entity_name,country_aor,source_link\nGroup A,IRQ,link\nGroup C,,link\n"
        );
    }
}
