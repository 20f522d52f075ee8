use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage value attached when no sample lines up with a server.
pub const MISSING_STORAGE: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMetadata {
    pub name: String,
    pub engine: String,
    pub version: String,
    /// Server folder. Opaque to the pipeline, but unique per server.
    pub location: String,
    pub players: u32,
    pub last_played: DateTime<Utc>,
}

/// Size of one server folder in gigabytes, kept as the decimal string the backend produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSample {
    pub location: String,
    pub size_gb: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    #[serde(flatten)]
    pub meta: ServerMetadata,
    pub storage: String,
}

impl DisplayRecord {
    pub fn storage_gb(&self) -> f64 {
        parse_gb(&self.storage)
    }

    fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.meta.name.to_lowercase().contains(needle)
            || self.meta.engine.to_lowercase().contains(needle)
            || self.meta.version.to_lowercase().contains(needle)
    }
}

/// Leading decimal of a size string ("1.25", "1.25 GB"). Anything unparsable counts as zero.
pub fn parse_gb(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+'))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().unwrap_or(0.0)
}

/// Joins metadata with storage by position: record `i` takes `storage[i]`, or
/// [`MISSING_STORAGE`] once the storage list runs out. Never fails on a length mismatch.
pub fn aggregate<S: AsRef<str>>(meta: &[ServerMetadata], storage: &[S]) -> Vec<DisplayRecord> {
    meta.iter()
        .enumerate()
        .map(|(i, m)| DisplayRecord {
            meta: m.clone(),
            storage: storage
                .get(i)
                .map(|s| s.as_ref().to_string())
                .unwrap_or_else(|| MISSING_STORAGE.to_string()),
        })
        .collect()
}

/// Joins metadata with storage on the server location, so the two lists may come back in any
/// order. Servers without a sample get [`MISSING_STORAGE`], same as the positional join.
pub fn aggregate_by_location(
    meta: &[ServerMetadata],
    samples: &[StorageSample],
) -> Vec<DisplayRecord> {
    let by_location: HashMap<&str, &str> = samples
        .iter()
        .map(|s| (s.location.as_str(), s.size_gb.as_str()))
        .collect();

    meta.iter()
        .map(|m| DisplayRecord {
            meta: m.clone(),
            storage: by_location
                .get(m.location.as_str())
                .map(|s| (*s).to_string())
                .unwrap_or_else(|| MISSING_STORAGE.to_string()),
        })
        .collect()
}

/// Most recently played first (stable for ties), then keeps records whose name, engine or
/// version contains `query`, case-insensitively.
pub fn filter_sort(records: &[DisplayRecord], query: &str) -> Vec<DisplayRecord> {
    let needle = query.to_lowercase();
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.meta.last_played.cmp(&a.meta.last_played));
    sorted.retain(|r| r.matches(&needle));
    sorted
}

pub fn total_storage_gb(samples: &[StorageSample]) -> f64 {
    samples.iter().map(|s| parse_gb(&s.size_gb)).sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn server(name: &str, engine: &str, version: &str, t: i64) -> ServerMetadata {
        ServerMetadata {
            name: name.to_string(),
            engine: engine.to_string(),
            version: version.to_string(),
            location: format!("/srv/{}", name),
            players: 0,
            last_played: Utc.timestamp_opt(t, 0).unwrap(),
        }
    }

    fn fleet() -> Vec<DisplayRecord> {
        let meta = vec![
            server("Survival", "Vanilla", "1.21.10", 40),
            server("creative-build", "Paper", "1.20.4", 10),
            server("Modpack", "Forge", "1.20.1", 30),
            server("Skyblock", "Fabric", "1.21.1", 30),
            server("lobby", "Paper", "1.21.10", 50),
        ];
        aggregate(&meta, &["1.0", "2.0", "3.0", "4.0", "5.0"])
    }

    #[test]
    fn aggregate_keeps_metadata_length_and_positions() {
        let meta = vec![server("a", "Vanilla", "1", 1), server("b", "Vanilla", "1", 2)];
        let storage = vec!["1.50".to_string(), "2.25".to_string()];
        let records = aggregate(&meta, &storage);
        assert_eq!(records.len(), meta.len());
        assert_eq!(records[0].storage, "1.50");
        assert_eq!(records[1].storage, "2.25");
        assert_eq!(records[1].meta, meta[1]);
    }

    // Missing samples must degrade to a silent zero, not an error or a marker.
    #[test]
    fn aggregate_short_storage_defaults_to_zero() {
        let meta = vec![
            server("a", "Vanilla", "1", 1),
            server("b", "Vanilla", "1", 2),
            server("c", "Vanilla", "1", 3),
        ];
        let records = aggregate(&meta, &["7.00"]);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].storage, "7.00");
        assert_eq!(records[1].storage, MISSING_STORAGE);
        assert_eq!(records[2].storage, MISSING_STORAGE);
        assert_eq!(records[2].storage_gb(), 0.0);
    }

    #[test]
    fn aggregate_tolerates_absent_inputs() {
        let none: [&str; 0] = [];
        assert!(aggregate(&[], &none).is_empty());
        assert!(aggregate(&[], &["1.0", "2.0"]).is_empty());
        let meta = vec![server("a", "Vanilla", "1", 1)];
        assert_eq!(aggregate(&meta, &none)[0].storage, MISSING_STORAGE);
    }

    #[test]
    fn keyed_join_survives_reordered_storage() {
        let meta = vec![server("a", "Vanilla", "1", 1), server("b", "Vanilla", "1", 2)];
        let samples = vec![
            StorageSample { location: "/srv/b".into(), size_gb: "2.00".into() },
            StorageSample { location: "/srv/a".into(), size_gb: "1.00".into() },
        ];
        let records = aggregate_by_location(&meta, &samples);
        assert_eq!(records[0].storage, "1.00");
        assert_eq!(records[1].storage, "2.00");

        let partial = aggregate_by_location(&meta, &samples[..1]);
        assert_eq!(partial[0].storage, MISSING_STORAGE);
        assert_eq!(partial[1].storage, "2.00");
    }

    #[test]
    fn sorts_by_recency_then_input_order() {
        let meta = vec![server("A", "x", "1", 5), server("B", "x", "1", 1), server("C", "x", "1", 3)];
        let out = filter_sort(&aggregate(&meta, &["1.0", "2.0", "3.0"]), "");
        let names: Vec<_> = out.iter().map(|r| r.meta.name.as_str()).collect();
        assert_eq!(names, ["A", "C", "B"]);
        assert_eq!(out[1].storage, "3.0");

        let ties = filter_sort(&fleet(), "");
        let names: Vec<_> = ties.iter().map(|r| r.meta.name.as_str()).collect();
        assert_eq!(names, ["lobby", "Survival", "Modpack", "Skyblock", "creative-build"]);
    }

    #[test]
    fn query_matches_name_engine_or_version_case_insensitively() {
        let records = fleet();
        for query in ["", "PAPER", "1.21", "sky", "forge", "zzz", "Build", "1.20.4"] {
            let out = filter_sort(&records, query);
            let needle = query.to_lowercase();
            for r in &out {
                assert!(
                    r.meta.name.to_lowercase().contains(&needle)
                        || r.meta.engine.to_lowercase().contains(&needle)
                        || r.meta.version.to_lowercase().contains(&needle),
                    "{} leaked through {:?}",
                    r.meta.name,
                    query
                );
            }
            assert!(out
                .windows(2)
                .all(|w| w[0].meta.last_played >= w[1].meta.last_played));
            assert_eq!(filter_sort(&out, query), out);
        }
        assert_eq!(filter_sort(&records, "paper").len(), 2);
        assert_eq!(filter_sort(&records, "").len(), records.len());
        assert!(filter_sort(&records, "zzz").is_empty());
        assert!(filter_sort(&[], "anything").is_empty());
    }

    #[test]
    fn parses_sizes_with_or_without_unit() {
        assert_eq!(parse_gb("1.25"), 1.25);
        assert_eq!(parse_gb(" 3.50 GB"), 3.5);
        assert_eq!(parse_gb("GB"), 0.0);
        assert_eq!(parse_gb(""), 0.0);
        let samples = vec![
            StorageSample { location: "a".into(), size_gb: "1.25".into() },
            StorageSample { location: "b".into(), size_gb: "0.75".into() },
        ];
        assert_eq!(total_storage_gb(&samples), 2.0);
    }
}
