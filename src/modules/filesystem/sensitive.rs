//! Sensitive resources: network indicators, configuration files, CA
//! material, key pairs and scanner findings.

use super::optional_list_similarity;
use crate::features::{is_truthy, FirmwareProfile, KeyMaterial};
use crate::similarity::{set_similarity, WeightedMean};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

const IP_WEIGHT: f64 = 0.1;
const URL_WEIGHT: f64 = 0.1;
const EMAIL_WEIGHT: f64 = 0.1;
const CONFIG_FILE_WEIGHT: f64 = 0.15;
const KEY_WEIGHT: f64 = 0.15;
const HASH_WEIGHT: f64 = 0.1;
const FILE_HASH_WEIGHT: f64 = 0.1;
const FILE_INFO_WEIGHT: f64 = 0.2;

/// Scanner finding categories, in report order.
pub(super) const FILE_INFO_CATEGORIES: [&str; 10] = [
    "password files",
    "SSL related files",
    "SSH related files",
    "files",
    "database related files",
    "shell scripts",
    "other .bin files",
    "patterns in files",
    "web servers",
    "important binaries",
];

#[derive(Debug, Default, Serialize)]
pub(super) struct SensitiveComparison {
    pub similarity: f64,
    ip_similarity: Option<f64>,
    url_similarity: Option<f64>,
    email_similarity: Option<f64>,
    config_file_similarity: Option<f64>,
    key_similarity: Option<f64>,
    hash_similarity: Option<f64>,
    public_private_keys: Option<KeyPairComparison>,
    file_info_similarity: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub(super) struct KeyPairComparison {
    avg_file_hash_similarity: f64,
    avg_private_key_similarity: f64,
    avg_public_key_similarity: f64,
    detailed_results: Vec<KeyFileResult>,
}

#[derive(Debug, Serialize)]
struct KeyFileResult {
    key: String,
    file_hash_similarity: f64,
    private_key_similarity: f64,
    public_key_similarity: f64,
}

/// CA filename and hash-value similarity.
fn ca_similarity(p1: &FirmwareProfile, p2: &FirmwareProfile) -> Option<(f64, f64)> {
    if p1.ca_file_hashes.is_none() && p2.ca_file_hashes.is_none() {
        return None;
    }
    let empty = IndexMap::new();
    let ca1 = p1.ca_file_hashes.as_ref().unwrap_or(&empty);
    let ca2 = p2.ca_file_hashes.as_ref().unwrap_or(&empty);
    if ca1.is_empty() && ca2.is_empty() {
        return Some((0.0, 0.0));
    }
    let keys1: HashSet<&String> = ca1.keys().collect();
    let keys2: HashSet<&String> = ca2.keys().collect();
    let hashes1: HashSet<&String> = ca1.values().collect();
    let hashes2: HashSet<&String> = ca2.values().collect();
    Some((set_similarity(&keys1, &keys2), set_similarity(&hashes1, &hashes2)))
}

fn part_matches(a: Option<&Value>, b: Option<&Value>, require_truthy: bool) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a == b && (!require_truthy || is_truthy(a)) => 1.0,
        _ => 0.0,
    }
}

fn key_pair_similarity(p1: &FirmwareProfile, p2: &FirmwareProfile) -> Option<KeyPairComparison> {
    if p1.public_private_key.is_none() && p2.public_private_key.is_none() {
        return None;
    }
    let empty = IndexMap::new();
    let keys1 = p1.public_private_key.as_ref().unwrap_or(&empty);
    let keys2 = p2.public_private_key.as_ref().unwrap_or(&empty);

    if !keys1.is_empty() && keys1 == keys2 {
        return Some(KeyPairComparison {
            avg_file_hash_similarity: 1.0,
            avg_private_key_similarity: 1.0,
            avg_public_key_similarity: 1.0,
            detailed_results: Vec::new(),
        });
    }
    if keys1.is_empty() || keys2.is_empty() {
        return Some(KeyPairComparison::default());
    }

    let total = keys1.keys().chain(keys2.keys()).collect::<HashSet<_>>().len() as f64;
    let mut detailed_results = Vec::new();
    for (name, entries1) in keys1 {
        let Some(entries2) = keys2.get(name) else {
            continue;
        };
        let (file_hash, private_key, public_key) = if entries1 == entries2 {
            (1.0, 1.0, 1.0)
        } else {
            match (KeyMaterial::from_entries(entries1), KeyMaterial::from_entries(entries2)) {
                (Some(k1), Some(k2)) => (
                    part_matches(k1.file_hash.as_ref(), k2.file_hash.as_ref(), false),
                    part_matches(k1.private_key.as_ref(), k2.private_key.as_ref(), true),
                    part_matches(k1.public_key.as_ref(), k2.public_key.as_ref(), true),
                ),
                _ => (0.0, 0.0, 0.0),
            }
        };
        detailed_results.push(KeyFileResult {
            key: name.clone(),
            file_hash_similarity: file_hash,
            private_key_similarity: private_key,
            public_key_similarity: public_key,
        });
    }

    let avg = |f: fn(&KeyFileResult) -> f64| detailed_results.iter().map(f).sum::<f64>() / total;
    Some(KeyPairComparison {
        avg_file_hash_similarity: avg(|r| r.file_hash_similarity),
        avg_private_key_similarity: avg(|r| r.private_key_similarity),
        avg_public_key_similarity: avg(|r| r.public_key_similarity),
        detailed_results,
    })
}

fn value_token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn newline_set(text: &str) -> HashSet<String> {
    text.split('\n').map(str::to_string).collect()
}

fn category_similarity(c1: &Value, c2: &Value) -> f64 {
    match (c1, c2) {
        (Value::Object(m1), Value::Object(m2)) => {
            let keys1: HashSet<&String> = m1.keys().collect();
            let keys2: HashSet<&String> = m2.keys().collect();
            let keys_similarity = set_similarity(&keys1, &keys2);

            let value_scores: Vec<f64> = m1
                .iter()
                .filter_map(|(key, v1)| match (v1, m2.get(key)?) {
                    (Value::String(s1), Value::String(s2)) => (!s1.is_empty() && !s2.is_empty())
                        .then(|| set_similarity(&newline_set(s1), &newline_set(s2))),
                    (Value::Array(a1), Value::Array(a2)) => {
                        let set1: HashSet<String> = a1.iter().map(value_token).collect();
                        let set2: HashSet<String> = a2.iter().map(value_token).collect();
                        Some(set_similarity(&set1, &set2))
                    }
                    _ => None,
                })
                .collect();
            let values_similarity = if value_scores.is_empty() {
                0.0
            } else {
                value_scores.iter().sum::<f64>() / value_scores.len() as f64
            };
            (keys_similarity + values_similarity) / 2.0
        }
        _ => {
            let as_set = |v: &Value| match v {
                Value::String(s) => newline_set(s),
                _ => HashSet::new(),
            };
            set_similarity(&as_set(c1), &as_set(c2))
        }
    }
}

fn file_info_similarity(p1: &FirmwareProfile, p2: &FirmwareProfile) -> Option<f64> {
    if p1.file_info.is_none() && p2.file_info.is_none() {
        return None;
    }
    let (Some(info1), Some(info2)) = (p1.file_info.as_ref(), p2.file_info.as_ref()) else {
        return Some(0.0);
    };
    if info1.is_empty() || info2.is_empty() {
        return Some(0.0);
    }

    let null = Value::Null;
    let scores: Vec<f64> = FILE_INFO_CATEGORIES
        .iter()
        .filter_map(|category| {
            let c1 = info1.get(*category).unwrap_or(&null);
            let c2 = info2.get(*category).unwrap_or(&null);
            (is_truthy(c1) || is_truthy(c2)).then(|| category_similarity(c1, c2))
        })
        .collect();
    Some(if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    })
}

pub(super) fn compare(p1: &FirmwareProfile, p2: &FirmwareProfile) -> SensitiveComparison {
    let ip_similarity = optional_list_similarity(p1.ip_addresses.as_ref(), p2.ip_addresses.as_ref());
    let url_similarity = optional_list_similarity(p1.urls.as_ref(), p2.urls.as_ref());
    let email_similarity = optional_list_similarity(p1.emails.as_ref(), p2.emails.as_ref());
    let config_file_similarity = optional_list_similarity(
        p1.configuration_file_info.as_ref(),
        p2.configuration_file_info.as_ref(),
    );
    let ca = ca_similarity(p1, p2);
    let public_private_keys = key_pair_similarity(p1, p2);
    let file_info_similarity = file_info_similarity(p1, p2);

    let mut mean = WeightedMean::new();
    mean.add_optional(ip_similarity, IP_WEIGHT);
    mean.add_optional(url_similarity, URL_WEIGHT);
    mean.add_optional(email_similarity, EMAIL_WEIGHT);
    mean.add_optional(config_file_similarity, CONFIG_FILE_WEIGHT);
    mean.add_optional(ca.map(|(keys, _)| keys), KEY_WEIGHT);
    mean.add_optional(ca.map(|(_, hashes)| hashes), HASH_WEIGHT);
    mean.add_optional(
        public_private_keys.as_ref().map(|k| k.avg_file_hash_similarity),
        FILE_HASH_WEIGHT,
    );
    mean.add_optional(file_info_similarity, FILE_INFO_WEIGHT);

    SensitiveComparison {
        similarity: mean.value(),
        ip_similarity,
        url_similarity,
        email_similarity,
        config_file_similarity,
        key_similarity: ca.map(|(keys, _)| keys),
        hash_similarity: ca.map(|(_, hashes)| hashes),
        public_private_keys,
        file_info_similarity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(value: Value) -> FirmwareProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_only_present_terms_weigh() {
        let p1 = profile(json!({"urls": ["http://a"], "emails": ["x@y"]}));
        let p2 = profile(json!({"urls": ["http://a"], "emails": ["z@y"]}));
        let result = compare(&p1, &p2);
        // url 1.0 and email 0.0 with equal weights
        assert!((result.similarity - 0.5).abs() < 1e-12);
        assert!(result.ip_similarity.is_none());
    }

    #[test]
    fn test_empty_ca_maps_score_zero_but_count() {
        let p1 = profile(json!({"ca_file_hashes": {}, "urls": ["u"]}));
        let p2 = profile(json!({"ca_file_hashes": {}, "urls": ["u"]}));
        let result = compare(&p1, &p2);
        assert_eq!(result.key_similarity, Some(0.0));
        let expected = URL_WEIGHT / (URL_WEIGHT + KEY_WEIGHT + HASH_WEIGHT);
        assert!((result.similarity - expected).abs() < 1e-12);
    }

    #[test]
    fn test_key_pairs_per_component() {
        let p1 = profile(json!({"public_private_key": {
            "server.pem": [{"file_hash": "h1"}, {"private_key": "k"}, {"public_key": "p"}],
            "only_here.pem": [{"file_hash": "h9"}, {"private_key": ""}, {"public_key": ""}]
        }}));
        let p2 = profile(json!({"public_private_key": {
            "server.pem": [{"file_hash": "h1"}, {"private_key": "other"}, {"public_key": "p"}]
        }}));
        let keys = key_pair_similarity(&p1, &p2).unwrap();
        assert!((keys.avg_file_hash_similarity - 0.5).abs() < 1e-12);
        assert_eq!(keys.avg_private_key_similarity, 0.0);
        assert!((keys.avg_public_key_similarity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_identical_key_maps() {
        let p = profile(json!({"public_private_key": {"a": [{}, {}, {}]}}));
        let keys = key_pair_similarity(&p, &p).unwrap();
        assert_eq!(keys.avg_file_hash_similarity, 1.0);
    }

    #[test]
    fn test_file_info_categories() {
        let p1 = profile(json!({"file_info": {
            "shell scripts": "a.sh\nb.sh",
            "password files": {"/etc/passwd": "root\nadmin", "/etc/shadow": ["x"]},
            "web servers": ""
        }}));
        let p2 = profile(json!({"file_info": {
            "shell scripts": "a.sh\nb.sh",
            "password files": {"/etc/passwd": "root\nadmin"}
        }}));
        let score = file_info_similarity(&p1, &p2).unwrap();
        // shell scripts 1.0; password files: keys 1 of 2, values 1.0
        let keys = set_similarity(
            &["/etc/passwd", "/etc/shadow"].into_iter().collect::<HashSet<_>>(),
            &["/etc/passwd"].into_iter().collect::<HashSet<_>>(),
        );
        let expected = (1.0 + (keys + 1.0) / 2.0) / 2.0;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_file_info_one_side_missing() {
        let p1 = profile(json!({"file_info": {"files": "x"}}));
        let p2 = profile(json!({}));
        assert_eq!(file_info_similarity(&p1, &p2), Some(0.0));
    }
}
