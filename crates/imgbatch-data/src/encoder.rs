use std::collections::HashMap;

use crate::error::{DataError, DataResult};

/// Width of the Amazon-from-space label vector.
pub const N_LABELS: usize = 17;

/// Number of weather labels; they occupy the first columns of the label vector.
pub const N_CLOUDS: usize = 4;

/// Weather labels followed by land-cover labels.
pub const PLANET_LABELS: [&str; N_LABELS] = [
    "clear",
    "cloudy",
    "haze",
    "partly_cloudy",
    "agriculture",
    "artisinal_mine",
    "bare_ground",
    "blooming",
    "blow_down",
    "conventional_mine",
    "cultivation",
    "habitation",
    "primary",
    "road",
    "selective_logging",
    "slash_burn",
    "water",
];

/// Turns a row's tag string into a fixed-width label vector.
pub trait TagEncoder {
    /// Width of every vector returned by [`encode`](TagEncoder::encode).
    fn n_labels(&self) -> usize;

    fn encode(&self, tags: &str) -> DataResult<Vec<u8>>;
}

/// Multi-hot encoder over a fixed, ordered vocabulary.
#[derive(Debug, Clone)]
pub struct MultiHotEncoder {
    labels: Vec<String>,
    label_to_idx: HashMap<String, usize>,
}

impl MultiHotEncoder {
    /// Build from an ordered vocabulary. Duplicates keep their first position.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut ordered: Vec<String> = Vec::with_capacity(labels.len());
        let mut label_to_idx = HashMap::new();
        for label in labels {
            let label = label.as_ref().to_string();
            if !label_to_idx.contains_key(&label) {
                label_to_idx.insert(label.clone(), ordered.len());
                ordered.push(label);
            }
        }
        MultiHotEncoder {
            labels: ordered,
            label_to_idx,
        }
    }

    /// The 17 Amazon-from-space labels, weather labels first.
    pub fn planet() -> Self {
        Self::new(&PLANET_LABELS)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.label_to_idx.get(label).copied()
    }

    /// Names of the set positions of an encoded vector.
    pub fn decode(&self, encoded: &[u8]) -> Vec<&str> {
        encoded
            .iter()
            .zip(&self.labels)
            .filter(|&(&v, _)| v != 0)
            .map(|(_, l)| l.as_str())
            .collect()
    }
}

impl TagEncoder for MultiHotEncoder {
    fn n_labels(&self) -> usize {
        self.labels.len()
    }

    fn encode(&self, tags: &str) -> DataResult<Vec<u8>> {
        let mut out = vec![0u8; self.labels.len()];
        for tag in tags.split_whitespace() {
            let idx = self
                .index_of(tag)
                .ok_or_else(|| DataError::UnknownTag(tag.to_string()))?;
            out[idx] = 1;
        }
        Ok(out)
    }
}

/// Adapts a closure into a [`TagEncoder`] of a declared width.
pub struct FnEncoder<F> {
    n_labels: usize,
    f: F,
}

impl<F> FnEncoder<F>
where
    F: Fn(&str) -> DataResult<Vec<u8>>,
{
    pub fn new(n_labels: usize, f: F) -> Self {
        FnEncoder { n_labels, f }
    }
}

impl<F> TagEncoder for FnEncoder<F>
where
    F: Fn(&str) -> DataResult<Vec<u8>>,
{
    fn n_labels(&self) -> usize {
        self.n_labels
    }

    fn encode(&self, tags: &str) -> DataResult<Vec<u8>> {
        (self.f)(tags)
    }
}
