//! Static species list files.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load an allow-list of species labels.
///
/// One `Genus species_Common Name` label per line, the same format the
/// classifier emits. Blank lines and lines starting with `#` are skipped.
pub fn load_species_list(path: &Path) -> Result<HashSet<String>> {
    let read_error = |source| Error::SpeciesListRead {
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(path).map_err(read_error)?);
    let mut species = HashSet::new();

    for line in reader.lines() {
        let line = line.map_err(read_error)?;
        let label = line.trim();
        if label.is_empty() || label.starts_with('#') {
            continue;
        }
        species.insert(label.to_string());
    }

    Ok(species)
}
