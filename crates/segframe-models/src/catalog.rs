//! Catalog entries loaded by the metadata sampler.

use serde::{Deserialize, Serialize};

use crate::segment::{DescriptorError, SegmentDescriptor};

/// One labelled window from the metadata catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Source identifier (YouTube video id)
    pub id: String,
    /// Window start in seconds
    pub start_seconds: f64,
    /// Window end in seconds
    pub end_seconds: f64,
    /// Label identifiers attached to the window
    pub labels: Vec<String>,
}

impl CatalogEntry {
    /// Window length in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// True when `label` is one of the entry's labels.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Turn the entry into a descriptor named by `sequence_index`.
    pub fn to_descriptor(&self, sequence_index: u64) -> Result<SegmentDescriptor, DescriptorError> {
        SegmentDescriptor::new(
            self.id.clone(),
            self.start_seconds,
            self.duration(),
            sequence_index,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            id: "--PJHxphWEs".to_string(),
            start_seconds: 30.0,
            end_seconds: 40.0,
            labels: vec!["/m/09x0r".to_string(), "/t/dd00088".to_string()],
        }
    }

    #[test]
    fn test_has_label_is_exact() {
        let e = entry();
        assert!(e.has_label("/m/09x0r"));
        assert!(!e.has_label("/m/09x"));
    }

    #[test]
    fn test_to_descriptor() {
        let d = entry().to_descriptor(7).unwrap();
        assert_eq!(d.source_id(), "--PJHxphWEs");
        assert_eq!(d.window_duration(), 10.0);
        assert_eq!(d.sequence_index(), 7);
    }

    #[test]
    fn test_to_descriptor_rejects_inverted_window() {
        let mut e = entry();
        e.end_seconds = 20.0;
        assert!(matches!(
            e.to_descriptor(0),
            Err(DescriptorError::InvalidDuration(_))
        ));
    }
}
