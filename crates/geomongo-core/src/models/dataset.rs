use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Datasets imported when nothing else is configured
pub const DEFAULT_DATASETS: [&str; 3] = ["points", "linestrings", "polygons"];

/// A named dataset: where its shapefile lives and which collection receives it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub collection: String,
}

impl DatasetDescriptor {
    /// Describe the dataset `name` stored under `data_dir`.
    ///
    /// The same string names the shapefile and the destination collection.
    pub fn new(name: impl Into<String>, data_dir: impl AsRef<Path>) -> Self {
        let name = name.into();
        Self {
            path: data_dir.as_ref().join(&name),
            collection: name.clone(),
            name,
        }
    }

    /// Describe every name in `names` under the same directory
    pub fn all<I, S>(names: I, data_dir: impl AsRef<Path>) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|name| Self::new(name, data_dir.as_ref()))
            .collect()
    }
}
