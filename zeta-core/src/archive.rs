//! Archive ingestion: ZIP files turned into in-memory storage layers.
//!
//! Entry names can be rewritten or dropped on the way in, either with a
//! [`FilenameMap`] from the session config or with a caller-supplied closure.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::error::{ZetaError, ZetaResult};
use crate::fs::{MemoryStorage, StorageOptions};

/// Rewrites archive entry names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilenameMap {
    /// Keep only entries under this directory and strip it (case-insensitive).
    Prefix(String),
    /// Keep only the listed entries, renamed to the mapped value.
    Table(HashMap<String, String>),
}

impl FilenameMap {
    /// Mapped name for an entry, or None to drop it.
    pub fn apply(&self, name: &str) -> Option<String> {
        match self {
            FilenameMap::Prefix(prefix) if prefix.is_empty() => Some(name.to_string()),
            FilenameMap::Prefix(prefix) => {
                let mut cmp = prefix.to_ascii_lowercase();
                if !cmp.ends_with('/') {
                    cmp.push('/');
                }
                if name.to_ascii_lowercase().starts_with(&cmp) {
                    Some(name[cmp.len()..].to_string()).filter(|s| !s.is_empty())
                } else {
                    None
                }
            }
            FilenameMap::Table(table) => table.get(name).cloned(),
        }
    }
}

/// How one archive becomes a storage layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOptions {
    #[serde(default)]
    pub filename_map: Option<FilenameMap>,
    /// Keep only mapped names with one of these extensions (case-insensitive).
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    #[serde(flatten)]
    pub storage: StorageOptions,
}

impl ArchiveOptions {
    pub fn with_filename_map(mut self, map: FilenameMap) -> Self {
        self.filename_map = Some(map);
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Whether a mapped name passes the extension filter.
    pub fn accepts(&self, name: &str) -> bool {
        let Some(extensions) = &self.extensions else {
            return true;
        };
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Load an archive using the name mapping and extension filter in `options`.
pub fn load_archive<R: Read + Seek>(reader: R, options: &ArchiveOptions) -> ZetaResult<MemoryStorage> {
    load_archive_with(reader, options.storage, |name| {
        let key = match &options.filename_map {
            Some(map) => map.apply(name)?,
            None => name.to_string(),
        };
        options.accepts(&key).then_some(key)
    })
}

/// Load an archive, passing every file entry name through `remap`.
///
/// Directory entries are skipped, as is anything still inside a
/// subdirectory after remapping. The whole archive is decoded before a
/// provider is returned, so a corrupt archive never yields partial storage.
pub fn load_archive_with<R, F>(
    reader: R,
    storage: StorageOptions,
    mut remap: F,
) -> ZetaResult<MemoryStorage>
where
    R: Read + Seek,
    F: FnMut(&str) -> Option<String>,
{
    let mut archive = ZipArchive::new(reader).map_err(ZetaError::Zip)?;
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(ZetaError::Zip)?;
        if file.is_dir() || file.name().ends_with('/') {
            continue;
        }

        let name = file.name().to_string();
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;

        let Some(key) = remap(&name) else {
            debug!("Dropped archive entry {}", name);
            continue;
        };
        if key.contains('/') {
            warn!("Skipped file inside subdirectory: {} -> {}", name, key);
            continue;
        }
        files.push((key, content));
    }

    MemoryStorage::with_files(files, storage)
}

/// Load an archive from a file path.
pub fn load_archive_from_path(path: &Path, options: &ArchiveOptions) -> ZetaResult<MemoryStorage> {
    let file = std::fs::File::open(path)?;
    load_archive(std::io::BufReader::new(file), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::StorageProvider;
    use std::io::{Cursor, Write};

    fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            for (name, data) in entries {
                if name.ends_with('/') {
                    zip.add_directory::<_, ()>(*name, Default::default())
                        .unwrap();
                } else {
                    zip.start_file::<_, ()>(*name, Default::default()).unwrap();
                    zip.write_all(data).unwrap();
                }
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_load_archive() {
        let zip_data = create_test_zip(&[
            ("zzt.exe", b"MZ"),
            ("TOWN.ZZT", b"town"),
            ("docs/", b""),
            ("docs/readme.txt", b"skip me"),
        ]);
        let fs = load_archive(Cursor::new(zip_data), &ArchiveOptions::default()).unwrap();

        assert_eq!(fs.get("ZZT.EXE"), Some(b"MZ".to_vec()));
        assert_eq!(fs.get("town.zzt"), Some(b"town".to_vec()));
        let mut files = fs.list();
        files.sort();
        assert_eq!(files, vec!["TOWN.ZZT", "ZZT.EXE"]);
    }

    #[test]
    fn test_prefix_map_flattens_directory() {
        let zip_data = create_test_zip(&[
            ("Game/TOWN.ZZT", b"town"),
            ("Game/sub/deep.zzt", b"deep"),
            ("other/X.ZZT", b"x"),
        ]);
        let options =
            ArchiveOptions::default().with_filename_map(FilenameMap::Prefix("game".to_string()));
        let fs = load_archive(Cursor::new(zip_data), &options).unwrap();

        assert_eq!(fs.list(), vec!["TOWN.ZZT"]);
    }

    #[test]
    fn test_table_map_renames_and_drops() {
        let zip_data = create_test_zip(&[("a.bin", b"a"), ("b.bin", b"b")]);
        let table = [("a.bin".to_string(), "ZZT.EXE".to_string())]
            .into_iter()
            .collect();
        let options = ArchiveOptions::default().with_filename_map(FilenameMap::Table(table));
        let fs = load_archive(Cursor::new(zip_data), &options).unwrap();

        assert_eq!(fs.list(), vec!["ZZT.EXE"]);
        assert_eq!(fs.get("ZZT.EXE"), Some(b"a".to_vec()));
    }

    #[test]
    fn test_closure_remap() {
        let zip_data = create_test_zip(&[("one.zzt", b"1"), ("two.txt", b"2")]);
        let fs = load_archive_with(Cursor::new(zip_data), StorageOptions::readonly(), |name| {
            name.ends_with(".zzt").then(|| name.to_string())
        })
        .unwrap();

        assert_eq!(fs.list(), vec!["ONE.ZZT"]);
        assert!(!fs.can_set("ONE.ZZT"));
    }

    #[test]
    fn test_long_names_get_aliases() {
        let zip_data = create_test_zip(&[("DungeonOfDoom.zzt", b"d")]);
        let options = ArchiveOptions {
            storage: StorageOptions::default().with_83_names(),
            ..ArchiveOptions::default()
        };
        let fs = load_archive(Cursor::new(zip_data), &options).unwrap();

        assert_eq!(fs.list(), vec!["DUNGEON~1.ZZT"]);
        assert_eq!(fs.get("DUNGEON~1.ZZT"), Some(b"d".to_vec()));
    }

    #[test]
    fn test_extension_filter_after_map() {
        let zip_data = create_test_zip(&[
            ("game/TOWN.ZZT", b"town"),
            ("game/ZZT.EXE", b"MZ"),
            ("game/readme.txt", b"text"),
            ("game/LICENSE", b"gpl"),
        ]);
        let options = ArchiveOptions::default()
            .with_filename_map(FilenameMap::Prefix("game".to_string()))
            .with_extensions(["zzt", ".exe"]);
        let fs = load_archive(Cursor::new(zip_data), &options).unwrap();

        let mut files = fs.list();
        files.sort();
        assert_eq!(files, vec!["TOWN.ZZT", "ZZT.EXE"]);
    }

    #[test]
    fn test_malformed_archive_fails() {
        let result = load_archive(Cursor::new(b"not a zip".to_vec()), &ArchiveOptions::default());
        assert!(matches!(result, Err(ZetaError::Zip(_))));
    }

    #[test]
    fn test_options_from_json() {
        let options: ArchiveOptions =
            serde_json::from_str(r#"{ "filenameMap": "zzt/", "extensions": ["ZZT"], "readonly": true }"#)
                .unwrap();
        assert_eq!(options.filename_map, Some(FilenameMap::Prefix("zzt/".to_string())));
        assert_eq!(options.extensions, Some(vec!["ZZT".to_string()]));
        assert!(options.storage.readonly);
    }
}
