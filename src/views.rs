// 🗂️ Registry Views - Per-name tables derived from the final registry
// Pure functions of the registry; rebuilt every run.

use crate::assigner::NameRecord;
use crate::error::NamingResult;
use crate::identity::{AssemblyVersion, IdentityResolver};
use crate::legacy::{split_name, LegacyRegistry};
use crate::rules::ClassLabel;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Accepted flag and synonym for one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneNameRow {
    pub name: String,
    pub accepted: String,
    pub synonym: String,
}

/// Default gene id per assembly version for one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultNameRow {
    pub name: String,
    pub sort_order: u64,
    pub family: String,
    pub v3_id: String,
    pub v4_id: String,
    pub v5_id: String,
    pub all_ids: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRow {
    pub class: ClassLabel,
    pub family: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryViews {
    pub gene_names: Vec<GeneNameRow>,
    pub default_names: Vec<DefaultNameRow>,
    pub families: Vec<FamilyRow>,
}

impl RegistryViews {
    pub fn build(records: &[NameRecord], legacy: &LegacyRegistry, resolver: &IdentityResolver) -> NamingResult<Self> {
        let by_name = group_by_name(records);

        Ok(RegistryViews {
            gene_names: gene_names(&by_name, legacy, resolver),
            default_names: default_names(&by_name)?,
            families: families(records),
        })
    }
}

fn group_by_name(records: &[NameRecord]) -> IndexMap<&str, Vec<&NameRecord>> {
    let mut by_name: IndexMap<&str, Vec<&NameRecord>> = IndexMap::new();
    for record in records {
        by_name.entry(record.name.as_str()).or_default().push(record);
    }
    by_name
}

/// Legacy names keep their flags. New names are unaccepted, with any
/// legacy names of their genes' clusters as synonyms.
fn gene_names(
    by_name: &IndexMap<&str, Vec<&NameRecord>>,
    legacy: &LegacyRegistry,
    resolver: &IdentityResolver,
) -> Vec<GeneNameRow> {
    by_name
        .iter()
        .map(|(name, rows)| match legacy.get(name) {
            Some(old) => GeneNameRow {
                name: name.to_string(),
                accepted: old.accepted.clone(),
                synonym: old.synonym.clone(),
            },
            None => {
                let mut old_names: IndexSet<&str> = IndexSet::new();
                for row in rows {
                    let cluster = resolver.resolve(&row.gene_id);
                    for old in legacy.for_cluster(&cluster) {
                        old_names.insert(old.name.as_str());
                    }
                }
                GeneNameRow {
                    name: name.to_string(),
                    accepted: "no".to_string(),
                    synonym: old_names.into_iter().collect::<Vec<_>>().join(" "),
                }
            }
        })
        .collect()
}

fn default_names(by_name: &IndexMap<&str, Vec<&NameRecord>>) -> NamingResult<Vec<DefaultNameRow>> {
    let mut sorted_families: Vec<&str> = by_name
        .values()
        .flatten()
        .map(|r| r.family.as_str())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();
    sorted_families.sort_unstable();

    let mut rows = Vec::with_capacity(by_name.len());
    for (name, records) in by_name {
        let family = records[0].family.as_str();
        let (_, suffix) = split_name(name)?;
        let family_index = sorted_families.iter().position(|f| *f == family).unwrap_or(0) as u64;

        let first_of = |version: AssemblyVersion| {
            records
                .iter()
                .map(|r| r.gene_id.as_str())
                .find(|id| AssemblyVersion::from_identifier(id) == Some(version))
                .unwrap_or("")
                .to_string()
        };

        rows.push(DefaultNameRow {
            name: name.to_string(),
            sort_order: family_index * 10000 + suffix as u64,
            family: family.to_string(),
            v3_id: first_of(AssemblyVersion::V3),
            v4_id: first_of(AssemblyVersion::V4),
            v5_id: first_of(AssemblyVersion::V5),
            all_ids: records.iter().map(|r| r.gene_id.as_str()).collect::<Vec<_>>().join(" "),
        });
    }
    Ok(rows)
}

fn families(records: &[NameRecord]) -> Vec<FamilyRow> {
    let mut seen: IndexMap<&str, ClassLabel> = IndexMap::new();
    for record in records {
        seen.entry(record.family.as_str()).or_insert(record.class_label);
    }
    seen.into_iter()
        .map(|(family, class)| FamilyRow {
            class,
            family: family.to_string(),
        })
        .collect()
}
