use chrono::NaiveDateTime;
use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::DateExtractor;
use crate::media::DateTaken;

/// Larger files are skipped; EXIF lives in the first bytes anyway.
const MAX_EXIF_FILE_SIZE: u64 = 32 * 1024 * 1024;

/// EXIF datetimes have no timezone info - they are local time as-is.
fn date_from_exif(exif: &exif::Exif) -> Option<NaiveDateTime> {
    let tags = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

    for tag in &tags {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
            let val = field.display_value().to_string();
            if let Some(dt) = parse_exif_datetime(&val) {
                return Some(dt);
            }
        }
    }

    None
}

fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .replace('-', ":")
        .replace('/', ":")
        .replace('\\', ":")
        .replace('.', ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(d) = chrono::NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    None
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
}

/// Reads the capture time embedded in the image itself.
pub struct ExifExtractor;

impl DateExtractor for ExifExtractor {
    fn name(&self) -> &'static str {
        "exif"
    }

    fn extract(&self, path: &Path) -> Option<DateTaken> {
        if !is_image(path) {
            return None;
        }
        let file = File::open(path).ok()?;
        if file.metadata().ok()?.len() > MAX_EXIF_FILE_SIZE {
            return None;
        }
        let exif = match Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(exif) => exif,
            Err(e) => {
                log::debug!("No EXIF in {}: {}", path.display(), e);
                return None;
            }
        };
        let date = date_from_exif(&exif)?;
        Some(DateTaken { date, accuracy: 1 })
    }
}
