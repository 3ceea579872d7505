use crate::Error;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    path::Path,
};

/// Name of the single-file weights of a checkpoint
pub const SINGLE_FILE: &str = "model.safetensors";

/// Name of the index listing the shards of a sharded checkpoint
pub const INDEX_FILE: &str = "model.safetensors.index.json";

/// Deserialized `model.safetensors.index.json`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IndexFile {
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,

    /// tensor name -> shard file name
    weight_map: HashMap<String, String>,
}

impl IndexFile {
    pub fn from_path<P>(value: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(value)?;

        Ok(serde_json::from_reader(&mut file)?)
    }
}

impl IndexFile {
    /// Returns the distinct shard file names, sorted
    pub fn shards(&self) -> Vec<&str> {
        self.weight_map
            .values()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Total byte size of all shards, if the index declares it
    pub fn total_size(&self) -> Option<u64> {
        self.metadata.get("total_size").and_then(|v| v.as_u64())
    }

    /// Number of tensors listed in the index
    pub fn num_tensors(&self) -> usize {
        self.weight_map.len()
    }
}
