//! Directory layout, file set and basic platform metadata.

use crate::features::{to_set, FirmwareProfile};
use crate::similarity::{set_similarity, WeightedMean};
use serde::Serialize;

const DIRECTORY_WEIGHT: f64 = 0.5;
const FILE_SET_WEIGHT: f64 = 0.4;
const BASIC_INFO_WEIGHT: f64 = 0.1;

#[derive(Debug, Serialize)]
pub(super) struct StructureComparison {
    pub similarity: f64,
    directory_similarity: f64,
    file_set_similarity: f64,
    basic_info_similarity: f64,
}

fn list_similarity(a: Option<&Vec<String>>, b: Option<&Vec<String>>) -> f64 {
    let a = to_set(a).unwrap_or_default();
    let b = to_set(b).unwrap_or_default();
    set_similarity(&a, &b)
}

/// Fraction of architecture, filesystem and OS fields that are set and equal.
fn basic_info_similarity(p1: &FirmwareProfile, p2: &FirmwareProfile) -> f64 {
    let fields1 = p1.basic_info();
    let fields2 = p2.basic_info();
    let matches = fields1
        .iter()
        .zip(fields2.iter())
        .filter(|(a, b)| matches!((a, b), (Some(a), Some(b)) if !a.is_empty() && a == b))
        .count();
    matches as f64 / fields1.len() as f64
}

pub(super) fn compare(p1: &FirmwareProfile, p2: &FirmwareProfile) -> StructureComparison {
    let directory_similarity = list_similarity(
        p1.directory_structure_info.as_ref(),
        p2.directory_structure_info.as_ref(),
    );
    let file_set_similarity = list_similarity(p1.file_set.as_ref(), p2.file_set.as_ref());
    let basic_info_similarity = basic_info_similarity(p1, p2);

    let mut mean = WeightedMean::new();
    mean.add(directory_similarity, DIRECTORY_WEIGHT);
    mean.add(file_set_similarity, FILE_SET_WEIGHT);
    mean.add(basic_info_similarity, BASIC_INFO_WEIGHT);

    StructureComparison {
        similarity: mean.value(),
        directory_similarity,
        file_set_similarity,
        basic_info_similarity,
    }
}
