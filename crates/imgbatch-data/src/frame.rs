use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// One row of the label table: an image reference and its space separated tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub image_name: String,
    pub tags: String,
}

impl TagRecord {
    pub fn new(image_name: impl Into<String>, tags: impl Into<String>) -> Self {
        TagRecord {
            image_name: image_name.into(),
            tags: tags.into(),
        }
    }
}

/// Read-only, ordered table of [`TagRecord`]s.
///
/// Row positions are stable; generators address rows by position only.
#[derive(Debug, Clone, Default)]
pub struct TagFrame {
    records: Vec<TagRecord>,
}

impl TagFrame {
    pub fn from_records(records: Vec<TagRecord>) -> Self {
        TagFrame { records }
    }

    /// Parse a CSV table with a header row.
    ///
    /// The header must contain `image_name` and `tags`; other columns are ignored.
    pub fn from_reader<R: Read>(reader: R) -> DataResult<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let records = rdr
            .deserialize()
            .collect::<Result<Vec<TagRecord>, csv::Error>>()?;
        Ok(TagFrame { records })
    }

    /// Read a CSV table from disk. See [`TagFrame::from_reader`].
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> DataResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let frame = Self::from_reader(file)?;
        log::info!(
            "loaded {} rows from {}",
            frame.len(),
            path.as_ref().display()
        );
        Ok(frame)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TagRecord> {
        self.records.get(index)
    }

    fn row(&self, index: usize) -> DataResult<&TagRecord> {
        self.records.get(index).ok_or(DataError::Tensor(
            imgbatch_core::TensorError::IndexOutOfBounds {
                index,
                axis: 0,
                size: self.records.len(),
            },
        ))
    }

    pub fn image_name(&self, index: usize) -> DataResult<&str> {
        Ok(&self.row(index)?.image_name)
    }

    pub fn tags(&self, index: usize) -> DataResult<&str> {
        Ok(&self.row(index)?.tags)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagRecord> {
        self.records.iter()
    }
}

impl FromIterator<TagRecord> for TagFrame {
    fn from_iter<I: IntoIterator<Item = TagRecord>>(iter: I) -> Self {
        TagFrame::from_records(iter.into_iter().collect())
    }
}
