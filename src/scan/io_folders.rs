// Scanned folders are named after the client: <anything>_id_<client id>.

use std::collections::{BTreeMap, BTreeSet};

use form_accuracy::builder::DatasetBuilder;
use form_accuracy::{normalize_identifier, Identifier};

use crate::scan::io_common::{list_subdirectories, simplify_file_name};
use crate::scan::*;

const ID_MARKER: &str = "_id_";

/// The client id encoded in the name of a scanned folder.
pub fn folder_client_id(name: &str) -> Option<Identifier> {
    let (_, raw) = name.rsplit_once(ID_MARKER)?;
    match normalize_identifier(Some(raw)) {
        Some(id) if !id.is_empty() => Some(id),
        _ => None,
    }
}

/// Indexes the sub-folders of all the given directories by client id.
///
/// Folders that do not follow the naming scheme are ignored. A client id found
/// in several folders is dropped.
pub fn index_folders(sources: &[PathBuf]) -> ScanResult<BTreeMap<Identifier, PathBuf>> {
    let mut builder: DatasetBuilder<PathBuf> = DatasetBuilder::new("scanned folders");
    for source in sources.iter() {
        for folder in list_subdirectories(source)? {
            let name = simplify_file_name(&folder);
            match folder_client_id(&name) {
                Some(id) => {
                    builder.add(&id, folder);
                }
                None => debug!("index_folders: {:?}: no client id in the name", folder),
            }
        }
    }
    let index = builder.build();
    info!(
        "Indexed {} scanned folders from {} directories",
        index.len(),
        sources.len()
    );
    Ok(index)
}

/// Copies the folder of every requested client into `destination`.
///
/// Returns the client ids that have no folder.
pub fn copy_subset(
    ids: &BTreeSet<Identifier>,
    index: &BTreeMap<Identifier, PathBuf>,
    destination: &Path,
) -> ScanResult<Vec<Identifier>> {
    fs::create_dir_all(destination).context(CopyingFolderSnafu {
        path: destination.display().to_string(),
    })?;
    let mut missing: Vec<Identifier> = Vec::new();
    for id in ids.iter() {
        match index.get(id) {
            Some(folder) => {
                let target = destination.join(simplify_file_name(folder));
                debug!("copy_subset: {:?} -> {:?}", folder, target);
                copy_dir(folder, &target)?;
            }
            None => {
                warn!("No scanned folder for client id {}", id);
                missing.push(id.clone());
            }
        }
    }
    info!(
        "Copied {} folders to {:?}",
        ids.len() - missing.len(),
        destination
    );
    Ok(missing)
}

fn copy_dir(from: &Path, to: &Path) -> ScanResult<()> {
    let path = from.display().to_string();
    fs::create_dir_all(to).context(CopyingFolderSnafu { path: path.clone() })?;
    for entry in fs::read_dir(from).context(CopyingFolderSnafu { path: path.clone() })? {
        let entry = entry.context(CopyingFolderSnafu { path: path.clone() })?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        if src.is_dir() {
            copy_dir(&src, &dst)?;
        } else {
            fs::copy(&src, &dst).context(CopyingFolderSnafu {
                path: src.display().to_string(),
            })?;
        }
    }
    Ok(())
}
