//! Output folder normalization and creation.

use crate::host::Host;

/// The implicit first segment of every project path.
pub const ROOT_FOLDER: &str = "Assets";

/// Prefixes `folder` with [`ROOT_FOLDER`] unless it already starts with it,
/// dropping empty segments.
///
/// # Examples
///
/// ```
/// use sheet_import::folders::normalize;
///
/// assert_eq!(normalize("DataSO"), "Assets/DataSO");
/// assert_eq!(normalize("Assets/Data//Heroes/"), "Assets/Data/Heroes");
/// assert_eq!(normalize(""), "Assets");
/// ```
#[must_use]
pub fn normalize(folder: &str) -> String {
    let mut segments = folder.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .peekable();

    if segments.peek() == Some(&ROOT_FOLDER) {
        segments.next();
    }

    std::iter::once(ROOT_FOLDER)
        .chain(segments)
        .collect::<Vec<_>>()
        .join("/")
}

/// Ensures every folder along `folder` exists, creating missing ones segment by segment.
///
/// Existing folders are left untouched, so calling this again with the same path creates nothing.
/// Returns the normalized path.
pub fn ensure<H: Host + ?Sized>(host: &mut H, folder: &str) -> anyhow::Result<String> {
    let normalized = normalize(folder);
    let mut parent = ROOT_FOLDER.to_owned();

    for segment in normalized.split('/').skip(1) {
        let full = format!("{parent}/{segment}");
        if !host.folder_exists(&full) {
            log::debug!("Creating folder {full}.");
            host.create_folder(&parent, segment)?;
        }

        parent = full;
    }

    Ok(normalized)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::MemoryHost;

    #[test]
    fn root_marker_is_skipped() {
        assert_eq!(normalize("Assets"), "Assets");
        assert_eq!(normalize("/Assets/Data"), "Assets/Data");
        assert_eq!(normalize("Data/Assets"), "Assets/Data/Assets");
    }

    #[test]
    fn creates_each_segment_once() {
        let mut host = MemoryHost::default();

        assert_eq!(ensure(&mut host, "Data/Heroes").unwrap(), "Assets/Data/Heroes");
        assert_eq!(host.created_folders, ["Assets/Data", "Assets/Data/Heroes"]);

        assert_eq!(ensure(&mut host, "Assets/Data/Heroes").unwrap(), "Assets/Data/Heroes");
        assert_eq!(host.created_folders.len(), 2);
    }

    #[test]
    fn existing_parents_are_kept() {
        let mut host = MemoryHost::default();
        host.folders.insert("Assets/Data".to_owned());

        ensure(&mut host, "Data/Heroes/Stats").unwrap();
        assert_eq!(host.created_folders, ["Assets/Data/Heroes", "Assets/Data/Heroes/Stats"]);
    }
}
