use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::media::Media;

/// Default file name of the album membership record
pub const ALBUMS_INFO_FILENAME: &str = "albums-info.json";

/// Placed file (relative to ALL_PHOTOS, "/"-separated) -> album names.
pub fn build_albums_info(
    media: &[Media],
    assignments: &[Option<PathBuf>],
    all_photos: &Path,
) -> BTreeMap<String, Vec<String>> {
    let mut info = BTreeMap::new();

    for (m, dest) in media.iter().zip(assignments.iter()) {
        let Some(dest) = dest else { continue };
        let albums: Vec<String> = m.albums().into_iter().map(str::to_string).collect();
        if albums.is_empty() {
            continue;
        }
        let relative = dest
            .strip_prefix(all_photos)
            .unwrap_or(dest)
            .to_string_lossy()
            .replace('\\', "/");
        info.insert(relative, albums);
    }

    info
}

/// Write the whole record in one go, replacing any previous file.
pub fn write_albums_info(
    media: &[Media],
    assignments: &[Option<PathBuf>],
    all_photos: &Path,
    album_json_path: &Path,
) -> anyhow::Result<usize> {
    let info = build_albums_info(media, assignments, all_photos);

    let mut writer = BufWriter::new(File::create(album_json_path)?);
    serde_json::to_writer_pretty(&mut writer, &info)?;
    writer.flush()?;

    log::info!(
        "Recorded album membership of {} file(s) in {}",
        info.len(),
        album_json_path.display()
    );
    Ok(info.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::GroupingKey;

    #[test]
    fn test_only_album_members_recorded() {
        let root = Path::new("/out/ALL_PHOTOS");
        let mut in_albums = Media::new(GroupingKey::Primary, PathBuf::from("in/a.jpg"), 1);
        in_albums
            .files
            .insert(GroupingKey::Named("Trip".into()), PathBuf::from("Trip/a.jpg"));
        in_albums
            .files
            .insert(GroupingKey::Named("Best".into()), PathBuf::from("Best/a.jpg"));
        let loose = Media::new(GroupingKey::Primary, PathBuf::from("in/b.jpg"), 1);

        let info = build_albums_info(
            &[in_albums, loose],
            &[Some(root.join("2020/a.jpg")), Some(root.join("b.jpg"))],
            root,
        );
        assert_eq!(info.len(), 1);
        assert_eq!(info["2020/a.jpg"], vec!["Best", "Trip"]);
    }

    #[test]
    fn test_written_as_flat_object() {
        let dir = tempfile::tempdir().unwrap();
        let m = Media::new(GroupingKey::Named("Trip".into()), PathBuf::from("Trip/a.jpg"), 1);
        let path = dir.path().join(ALBUMS_INFO_FILENAME);
        let count = write_albums_info(
            &[m],
            &[Some(dir.path().join("a.jpg"))],
            dir.path(),
            &path,
        )
        .unwrap();
        assert_eq!(count, 1);

        let parsed: BTreeMap<String, Vec<String>> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed["a.jpg"], vec!["Trip"]);
    }
}
