//! JSON-lines storage implementation
//!
//! This module provides a file-backed implementation of the PolicyStore
//! trait: `<root>/policies.jsonl`, one serialized policy per line.

use crate::model::Policy;
use crate::storage::traits::{PolicyIndex, PolicyStore, StorageError, StorageResult};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const DATA_FILE: &str = "policies.jsonl";

/// JSON-lines policy repository
///
/// Every upsert rewrites the whole file. The new content is written to a
/// temporary file and renamed over the old one, so a batch is either fully
/// visible or not at all.
#[derive(Debug, Clone)]
pub struct JsonlRepository {
    root: PathBuf,
    data_path: PathBuf,
    default_site: String,
}

impl JsonlRepository {
    /// Opens (creating the directory if needed) a repository under `root`
    ///
    /// # Arguments
    ///
    /// * `root` - Directory holding `policies.jsonl`
    /// * `default_site` - Site used in keys of policies without one
    pub fn open(root: impl Into<PathBuf>, default_site: impl Into<String>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let data_path = root.join(DATA_FILE);

        Ok(Self {
            root,
            data_path,
            default_site: default_site.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    fn write(&self, index: &PolicyIndex) -> StorageResult<()> {
        let tmp_path = self.data_path.with_extension("jsonl.tmp");

        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for policy in index.values() {
                serde_json::to_writer(&mut writer, policy)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.data_path)?;
        Ok(())
    }
}

impl PolicyStore for JsonlRepository {
    fn default_site(&self) -> &str {
        &self.default_site
    }

    fn load_index(&self) -> StorageResult<PolicyIndex> {
        let mut index = PolicyIndex::new();

        let file = match File::open(&self.data_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(index),
            Err(e) => return Err(e.into()),
        };

        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let policy: Policy =
                serde_json::from_str(line).map_err(|source| StorageError::Decode {
                    line: number + 1,
                    source,
                })?;
            index.insert(self.key_for(&policy), policy);
        }

        Ok(index)
    }

    fn upsert_many(&mut self, policies: &[Policy]) -> StorageResult<PolicyIndex> {
        let mut index = self.load_index()?;
        for policy in policies {
            index.insert(self.key_for(policy), policy.clone());
        }

        self.write(&index)?;
        tracing::debug!(
            "Wrote {} policies to {}",
            index.len(),
            self.data_path.display()
        );

        Ok(index)
    }
}
