use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

pub use crate::config::*;

/// A builder for assembling a dataset keyed by client identifier.
///
/// The same client identifier may show up several times in the raw data (two
/// rows of the spreadsheet, two scanned folders). There is no way to tell which
/// record is the right one, so all the records sharing that identifier are
/// dropped when the dataset is built.
///
/// ```
/// use form_accuracy::builder::DatasetBuilder;
///
/// let mut builder: DatasetBuilder<Vec<Option<String>>> = DatasetBuilder::new("ground truth");
/// builder.add("123", vec![Some("yes".to_string())]);
/// builder.add("456", vec![Some("no".to_string())]);
/// builder.add("123", vec![Some("no".to_string())]);
///
/// let dataset = builder.build();
/// assert_eq!(dataset.len(), 1);
/// assert!(dataset.contains_key("456"));
/// ```
pub struct DatasetBuilder<T> {
    source: String,
    records: BTreeMap<Identifier, T>,
    duplicates: BTreeSet<Identifier>,
}

impl<T> DatasetBuilder<T> {
    /// `source` is only used to name the origin of the data in the logs.
    pub fn new(source: &str) -> DatasetBuilder<T> {
        DatasetBuilder {
            source: source.to_string(),
            records: BTreeMap::new(),
            duplicates: BTreeSet::new(),
        }
    }

    /// Adds a record.
    ///
    /// Returns false if the identifier had already been seen, in which case
    /// the identifier is now excluded from the dataset.
    pub fn add(&mut self, id: &str, record: T) -> bool {
        if self.duplicates.contains(id) {
            debug!("{}: client id {} seen again", self.source, id);
            return false;
        }
        if self.records.remove(id).is_some() {
            warn!(
                "{}: duplicate client id {}, all its records are dropped",
                self.source, id
            );
            self.duplicates.insert(id.to_string());
            return false;
        }
        self.records.insert(id.to_string(), record);
        true
    }

    /// The identifiers that were seen more than once so far.
    pub fn duplicates(&self) -> &BTreeSet<Identifier> {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn build(self) -> BTreeMap<Identifier, T> {
        if !self.duplicates.is_empty() {
            warn!(
                "{}: {} client ids dropped because of duplicates: {:?}",
                self.source,
                self.duplicates.len(),
                self.duplicates
            );
        }
        self.records
    }
}
