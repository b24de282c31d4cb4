use super::multiply::JoinedRecord;
use crate::db::model::FieldValue;
use crate::error::PipelineError;
use crate::prelude::*;
use itertools::Itertools;
use std::collections::BTreeMap;

pub const GROUP_INDEX_FIELD: &str = "group_index";

/// Turns a group value into a collection-safe name.
pub fn sanitize_name(name: &str) -> String {
    name.replace(' ', "_")
        .replace('\'', "_")
        .replace('(', "")
        .replace(')', "")
        .replace('-', "_")
        .replace('/', "_")
        .replace('’', "_")
        .replace('–', "_")
        .replace(',', "")
}

/// Sorted distinct group values. A value's position is its group index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupIndex {
    values: Vec<String>,
}

impl GroupIndex {
    pub fn from_values<I: IntoIterator<Item = String>>(values: I) -> GroupIndex {
        GroupIndex {
            values: values.into_iter().sorted().dedup().collect(),
        }
    }

    /// Index over the non-null values of `field`.
    pub fn from_records(records: &[JoinedRecord], field: &str) -> GroupIndex {
        GroupIndex::from_values(records.iter().filter_map(|r| r.get(field).as_key()))
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.values.binary_search_by(|v| v.as_str().cmp(value)).ok()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputGroup {
    pub index: usize,
    pub key: String,
    pub name: String,
    pub records: Vec<JoinedRecord>,
}

fn group_position(
    record: &JoinedRecord,
    record_index: usize,
    field: &str,
    index: &GroupIndex,
) -> Result<(usize, String)> {
    let value = record.get(field).as_key();
    let position = value.as_deref().and_then(|v| index.position(v));
    match position {
        Some(position) => Ok((position, value.unwrap_or_default())),
        None => {
            let err = PipelineError::JoinIntegrityViolation {
                stage: "partition",
                record_index,
                value,
            };
            tracing::error!("{}", err);
            Err(err.into())
        }
    }
}

/// Splits records into one group per distinct value of `field`, keyed by the
/// sanitized value. Every record lands in exactly one group.
pub fn partition(joined: &[JoinedRecord], field: &str) -> Result<BTreeMap<String, OutputGroup>> {
    let index = GroupIndex::from_records(joined, field);
    partition_with_index(joined, field, &index)
}

/// Like [`partition`], against an index computed elsewhere. A record whose
/// value is missing from the index fails the whole partition.
pub fn partition_with_index(
    joined: &[JoinedRecord],
    field: &str,
    index: &GroupIndex,
) -> Result<BTreeMap<String, OutputGroup>> {
    let mut groups: Vec<Option<OutputGroup>> = vec![None; index.len()];
    for (record_index, record) in joined.iter().enumerate() {
        let (position, key) = group_position(record, record_index, field, index)?;
        groups[position]
            .get_or_insert_with(|| OutputGroup {
                index: position,
                name: sanitize_name(&key),
                key,
                records: Vec::new(),
            })
            .records
            .push(record.clone());
    }

    let mut partitions = BTreeMap::new();
    for group in groups.into_iter().flatten() {
        if group.name.is_empty() || partitions.contains_key(&group.name) {
            let err = PipelineError::PartitionName {
                value: group.key.clone(),
                name: group.name.clone(),
            };
            tracing::error!("{}", err);
            return Err(err.into());
        }
        partitions.insert(group.name.clone(), group);
    }
    tracing::debug!("Partitioned {} records into {} groups", joined.len(), partitions.len());

    Ok(partitions)
}

/// Writes each record's group index into `GROUP_INDEX_FIELD`.
pub fn assign_group_index(joined: &mut [JoinedRecord], field: &str, index: &GroupIndex) -> Result<()> {
    for (record_index, record) in joined.iter_mut().enumerate() {
        let (position, _) = group_position(record, record_index, field, index)?;
        record
            .attributes
            .insert(GROUP_INDEX_FIELD.to_string(), FieldValue::Integer(position as i64));
    }

    Ok(())
}
