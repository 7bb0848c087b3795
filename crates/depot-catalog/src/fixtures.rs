//! Record builders shared by the backend tests.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use depot_types::{CollectionId, ContentHash, RelativePath, Version};

use crate::record::{ArtifactRecord, ReleaseRecord};

pub(crate) fn at(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, secs).unwrap()
}

pub(crate) fn artifact(collection: &str, path: &str, fill: u8) -> ArtifactRecord {
    let path = RelativePath::new(path).unwrap();
    ArtifactRecord {
        collection: CollectionId::new(collection).unwrap(),
        name: path.file_name().to_string(),
        storage_path: PathBuf::from(format!("/srv/games/{collection}/{path}")),
        path,
        size: 42,
        hash: ContentHash::from_digest([fill; 32]),
        uploaded_at: at(0),
        modified_at: at(0),
    }
}

pub(crate) fn release(version: &str, uploaded_secs: u32) -> ReleaseRecord {
    ReleaseRecord {
        version: Version::new(version).unwrap(),
        name: "client.exe".into(),
        size: 1024,
        hash: ContentHash::from_digest([uploaded_secs as u8; 32]),
        uploaded_at: at(uploaded_secs),
        storage_path: PathBuf::from(format!("/srv/client/{version}/client.exe")),
        release_notes: None,
    }
}
