use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Class id to human-readable name table supplied with a detection model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNames {
    names: BTreeMap<u32, String>,
}

impl ClassNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Upper-cased label for a class id. Ids missing from the table fall
    /// back to their decimal form.
    pub fn label(&self, id: u32) -> String {
        match self.get(id) {
            Some(name) => name.to_uppercase(),
            None => id.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Load a names file. Each non-empty line is either `id: name` or a bare
    /// `name`, in which case it takes the next free position.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open names file: {:?}", path))?;
        let reader = BufReader::new(file);

        let mut names = ClassNames::new();
        let mut next_id = 0u32;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line
                .with_context(|| format!("Failed to read line {} from {:?}", line_num + 1, path))?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, name) = match line.split_once(':') {
                Some((id, name)) => {
                    let id = id.trim().parse::<u32>().with_context(|| {
                        format!("Invalid class id at line {}: '{}'", line_num + 1, id.trim())
                    })?;
                    (id, name.trim())
                }
                None => (next_id, line),
            };

            if name.is_empty() {
                warn!(line = line_num + 1, "Skipping class entry without a name");
                continue;
            }

            names.insert(id, name);
            next_id = id.saturating_add(1);
        }

        info!(classes = names.len(), path = ?path, "Loaded class names");
        Ok(names)
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for ClassNames {
    fn from_iter<T: IntoIterator<Item = (u32, S)>>(iter: T) -> Self {
        let mut names = ClassNames::new();
        for (id, name) in iter {
            names.insert(id, name);
        }
        names
    }
}
