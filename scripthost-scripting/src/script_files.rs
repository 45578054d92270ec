//! Script file helpers: link files, hidden folders and new-file creation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::provider::ScriptProvider;
use crate::registry::ProviderRegistry;

/// Suffix of files whose content is the path of the real script.
pub const LINK_EXTENSION: &str = ".link";

/// Marker file that hides its folder from script listings.
pub const HIDDEN_MARKER_FILE: &str = ".hidden";

/// Whether `path` is an existing file owned by a registered provider.
pub fn is_script_file(path: &Path, providers: &ProviderRegistry) -> bool {
    path.is_file() && providers.handles(path)
}

/// Whether `path` is an existing `.link` file.
pub fn is_linked_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().ends_with(LINK_EXTENSION))
            .unwrap_or(false)
}

/// Read the target path stored in a link file.
pub fn resolve_link_file(path: &Path) -> io::Result<PathBuf> {
    let content = fs::read_to_string(path)?;
    let target = content.trim_end_matches(['\r', '\n']);
    if target.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("link file {} is empty", path.display()),
        ));
    }
    Ok(PathBuf::from(target))
}

/// Write a link file pointing at the absolute path of `target`.
pub fn write_link_file(link: &Path, target: &Path) -> io::Result<()> {
    let absolute = std::path::absolute(target)?;
    fs::write(link, absolute.to_string_lossy().as_bytes())
}

/// Whether `dir` contains the hidden marker.
pub fn is_hidden_folder(dir: &Path) -> bool {
    dir.join(HIDDEN_MARKER_FILE).exists()
}

/// Script and link files under `dir`, sorted, skipping hidden folders.
pub fn list_scripts(dir: &Path, providers: &ProviderRegistry) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if dir.is_dir() {
        collect_scripts(dir, providers, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn collect_scripts(
    dir: &Path,
    providers: &ProviderRegistry,
    found: &mut Vec<PathBuf>,
) -> io::Result<()> {
    if is_hidden_folder(dir) {
        log::trace!("Skipping hidden folder {}", dir.display());
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_scripts(&path, providers, found)?;
        } else if is_linked_file(&path) || is_script_file(&path, providers) {
            found.push(path);
        }
    }
    Ok(())
}

/// Create a new script in `dir` from the provider's template.
///
/// The provider's default extension is appended when `name` has none of the
/// provider's extensions. Existing files are never overwritten.
pub fn create_new_script(
    dir: &Path,
    name: &str,
    provider: &dyn ScriptProvider,
) -> io::Result<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "script name is empty",
        ));
    }

    let lower = name.to_lowercase();
    let extensions = provider.supported_extensions();
    let has_extension = extensions.iter().any(|ext| lower.ends_with(&ext.to_lowercase()));
    let file_name = match extensions.first() {
        Some(ext) if !has_extension => format!("{name}{ext}"),
        _ => name.to_string(),
    };

    let path = dir.join(file_name);
    if path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, provider.new_file_template())?;
    log::info!("Created new script {}", path.display());
    Ok(path)
}
