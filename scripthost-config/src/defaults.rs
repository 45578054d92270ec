//! Default values for serde.

use std::path::PathBuf;

pub fn bool_true() -> bool {
    true
}

/// `<data dir>/scripthost/scripts`, or `./scripts` without a data dir.
pub fn scripts_folder() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("scripthost").join("scripts"))
        .unwrap_or_else(|| PathBuf::from("scripts"))
}
