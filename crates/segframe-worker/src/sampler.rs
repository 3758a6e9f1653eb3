//! Catalog parsing and label-filtered sampling.
//!
//! The catalog is an AudioSet-style segment list:
//!
//! ```text
//! # Segments csv created Sun Mar  5 10:54:31 2017
//! # num_ytids=22160, num_segs=22160, num_unique_labels=527, num_positive_labels=52882
//! # YTID, start_seconds, end_seconds, positive_labels
//! --PJHxphWEs, 30.000, 40.000, "/m/09x0r,/t/dd00088"
//! ```
//!
//! The label column is last and may itself contain commas, so rows are split
//! into exactly as many fields as the header names.

use std::path::Path;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{info, warn};

use segframe_models::{CatalogEntry, SegmentDescriptor};

use crate::error::{WorkerError, WorkerResult};

/// Label selected when none is given (AudioSet "Speech").
pub const DEFAULT_LABEL: &str = "/m/09x0r";

const ID_COLUMN: &str = "YTID";
const START_COLUMN: &str = "start_seconds";
const END_COLUMN: &str = "end_seconds";
const LABEL_COLUMN: &str = "positive_labels";

/// Column positions resolved from the header comment.
#[derive(Debug, Clone, PartialEq)]
struct Columns {
    count: usize,
    id: usize,
    start: usize,
    end: usize,
    labels: usize,
}

impl Columns {
    fn from_header(line: &str) -> WorkerResult<Self> {
        let names: Vec<String> = line
            .trim_start_matches(|c: char| c == '#' || c == ' ')
            .split(',')
            .map(|n| n.trim().to_string())
            .collect();
        let find = |name: &str| {
            names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| WorkerError::catalog(format!("header has no '{}' column", name)))
        };

        let columns = Self {
            count: names.len(),
            id: find(ID_COLUMN)?,
            start: find(START_COLUMN)?,
            end: find(END_COLUMN)?,
            labels: find(LABEL_COLUMN)?,
        };
        // Rows are split into `count` fields, so only the last one may hold commas.
        if columns.labels + 1 != columns.count {
            return Err(WorkerError::catalog(format!(
                "'{}' must be the last header column",
                LABEL_COLUMN
            )));
        }
        Ok(columns)
    }
}

fn is_header(line: &str) -> bool {
    line.starts_with('#') && line.contains(ID_COLUMN) && line.contains(LABEL_COLUMN)
}

fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
        .trim()
}

fn split_labels(field: &str) -> Vec<String> {
    field
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Catalog rows carrying a target label.
#[derive(Debug, Clone, Default)]
pub struct MetadataSampler {
    label: String,
    entries: Vec<CatalogEntry>,
}

impl MetadataSampler {
    /// Read and parse a catalog file.
    pub async fn load(path: impl AsRef<Path>, label: &str) -> WorkerResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            WorkerError::catalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        let sampler = Self::parse(&content, label)?;
        info!(
            catalog = %path.display(),
            label = label,
            matches = sampler.len(),
            "Loaded catalog"
        );
        Ok(sampler)
    }

    /// Parse catalog text, keeping rows whose label set contains `label`.
    pub fn parse(content: &str, label: &str) -> WorkerResult<Self> {
        let mut columns = None;
        let mut entries = Vec::new();

        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if columns.is_none() && is_header(line) {
                    columns = Some(Columns::from_header(line)?);
                }
                continue;
            }

            let Some(cols) = &columns else {
                return Err(WorkerError::catalog(
                    "data row found before the header line",
                ));
            };

            let fields: Vec<&str> = line.splitn(cols.count, ',').map(unquote).collect();
            if fields.len() < cols.count {
                warn!(line = line_no + 1, "Skipping catalog row with too few fields");
                continue;
            }

            let labels = split_labels(fields[cols.labels]);
            if !labels.iter().any(|l| l == label) {
                continue;
            }

            let (Ok(start_seconds), Ok(end_seconds)) =
                (fields[cols.start].parse::<f64>(), fields[cols.end].parse::<f64>())
            else {
                warn!(line = line_no + 1, "Skipping catalog row with unparsable times");
                continue;
            };

            entries.push(CatalogEntry {
                id: fields[cols.id].to_string(),
                start_seconds,
                end_seconds,
                labels,
            });
        }

        if columns.is_none() {
            return Err(WorkerError::catalog(format!(
                "no header line naming {} and {}",
                ID_COLUMN, LABEL_COLUMN
            )));
        }

        Ok(Self {
            label: label.to_string(),
            entries,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Matching rows in file order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Uniform sample of `n` distinct rows; all rows when fewer match.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<CatalogEntry> {
        if self.entries.len() < n {
            warn!(
                requested = n,
                available = self.entries.len(),
                label = %self.label,
                "Fewer matching catalog rows than requested, using all of them"
            );
        }
        self.entries.choose_multiple(rng, n).cloned().collect()
    }

    /// Sample rows and number them `0..` as descriptors.
    ///
    /// Rows that do not form a valid window are dropped with a warning, so
    /// indices stay contiguous.
    pub fn sample_descriptors<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Vec<SegmentDescriptor> {
        let mut descriptors = Vec::new();
        for entry in self.sample(n, rng) {
            match entry.to_descriptor(descriptors.len() as u64) {
                Ok(d) => descriptors.push(d),
                Err(e) => warn!(source_id = %entry.id, "Skipping catalog row: {}", e),
            }
        }
        descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CATALOG: &str = r#"# Segments csv created Sun Mar  5 10:54:31 2017
# num_ytids=4, num_segs=4, num_unique_labels=3, num_positive_labels=6
# YTID, start_seconds, end_seconds, positive_labels
--PJHxphWEs, 30.000, 40.000, "/m/09x0r,/t/dd00088"
--ZhevVpy1s, 50.000, 60.000, "/m/012xff"
--aE2O5G5WE, 0.000, 10.000, "/m/03fwl,/m/04rlf,/m/09x0r"
--aO5cdqSAg, 30.000, 40.000, "/t/dd00003,/t/dd00005"
"#;

    #[test]
    fn test_parse_keeps_exact_label_matches() {
        let sampler = MetadataSampler::parse(CATALOG, DEFAULT_LABEL).unwrap();
        let ids: Vec<_> = sampler.entries().iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, ["--PJHxphWEs", "--aE2O5G5WE"]);
        assert_eq!(sampler.entries()[0].start_seconds, 30.0);
        assert_eq!(sampler.entries()[0].labels, ["/m/09x0r", "/t/dd00088"]);
    }

    #[test]
    fn test_parse_does_not_match_label_prefixes() {
        let sampler = MetadataSampler::parse(CATALOG, "/m/09x").unwrap();
        assert!(sampler.is_empty());
    }

    #[test]
    fn test_parse_requires_header() {
        let err = MetadataSampler::parse("abc, 1, 2, \"/m/09x0r\"\n", DEFAULT_LABEL).unwrap_err();
        assert!(matches!(err, WorkerError::Catalog(_)));

        let err = MetadataSampler::parse("# just a comment\n", DEFAULT_LABEL).unwrap_err();
        assert!(matches!(err, WorkerError::Catalog(_)));
    }

    #[test]
    fn test_parse_rejects_label_column_before_others() {
        let content = "# YTID, positive_labels, start_seconds, end_seconds\n\
                       abc, \"/m/09x0r,/t/dd00088\", 30.0, 40.0\n";
        let err = MetadataSampler::parse(content, DEFAULT_LABEL).unwrap_err();
        assert!(matches!(err, WorkerError::Catalog(msg) if msg.contains(LABEL_COLUMN)));
    }

    #[test]
    fn test_parse_accepts_reordered_leading_columns() {
        let content = "# start_seconds, end_seconds, YTID, positive_labels\n\
                       30.0, 40.0, abc, \"/m/09x0r,/t/dd00088\"\n";
        let sampler = MetadataSampler::parse(content, DEFAULT_LABEL).unwrap();
        assert_eq!(sampler.entries()[0].id, "abc");
        assert_eq!(sampler.entries()[0].end_seconds, 40.0);
    }

    #[test]
    fn test_parse_skips_bad_rows() {
        let content = "# YTID, start_seconds, end_seconds, positive_labels\n\
                       bad, x, 10, \"/m/09x0r\"\n\
                       short, 1\n\
                       good, 1.5, 11.5, \"/m/09x0r\"\n";
        let sampler = MetadataSampler::parse(content, DEFAULT_LABEL).unwrap();
        assert_eq!(sampler.len(), 1);
        assert_eq!(sampler.entries()[0].id, "good");
    }

    #[test]
    fn test_sample_is_distinct_and_capped() {
        let sampler = MetadataSampler::parse(CATALOG, DEFAULT_LABEL).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let one = sampler.sample(1, &mut rng);
        assert_eq!(one.len(), 1);

        let all = sampler.sample(10, &mut rng);
        assert_eq!(all.len(), 2);
        assert_ne!(all[0].id, all[1].id);
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let sampler = MetadataSampler::parse(CATALOG, DEFAULT_LABEL).unwrap();
        let a = sampler.sample(1, &mut StdRng::seed_from_u64(42));
        let b = sampler.sample(1, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_descriptors_are_numbered_from_zero() {
        let sampler = MetadataSampler::parse(CATALOG, DEFAULT_LABEL).unwrap();
        let descriptors = sampler.sample_descriptors(2, &mut StdRng::seed_from_u64(1));

        let indices: Vec<_> = descriptors.iter().map(|d| d.sequence_index()).collect();
        assert_eq!(indices, [0, 1]);
        assert!(descriptors.iter().all(|d| d.window_duration() == 10.0));
    }
}
