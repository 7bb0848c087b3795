use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use depot_types::{CollectionId, RelativePath, Version, RESERVED_COLLECTION};

/// Top-level storage area. Each area has its own archive namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Area {
    /// Mutable game files, keyed by collection and relative path.
    Games,
    /// Immutable client releases, keyed by version.
    Client,
}

impl Area {
    /// Directory name of this area under the store root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Area::Games => "games",
            Area::Client => "client",
        }
    }
}

/// Address of a live blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobLocation {
    area: Area,
    collection: String,
    path: RelativePath,
}

impl BlobLocation {
    /// Location of a game artifact.
    pub fn artifact(collection: &CollectionId, path: &RelativePath) -> Self {
        Self {
            area: Area::Games,
            collection: collection.as_str().to_string(),
            path: path.clone(),
        }
    }

    /// Location of a client release binary: the version is the collection.
    pub fn release(version: &Version, file_name: &RelativePath) -> Self {
        Self {
            area: Area::Client,
            collection: version.as_str().to_string(),
            path: file_name.clone(),
        }
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    /// `{root}/{area}/{collection}/{path}`
    pub fn live_path(&self, root: &Path) -> PathBuf {
        let mut out = root.join(self.area.dir_name()).join(&self.collection);
        out.extend(self.path.components());
        out
    }

    /// `{root}/{area}/deprecated/{collection}/{stamp}/{path}`
    pub fn archive_path(&self, root: &Path, stamp: &str) -> PathBuf {
        let mut out = root
            .join(self.area.dir_name())
            .join(RESERVED_COLLECTION)
            .join(&self.collection)
            .join(stamp);
        out.extend(self.path.components());
        out
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.area.dir_name(), self.collection, self.path)
    }
}

/// A blob that was moved out of its live location into the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivedBlob {
    /// Where the blob lived before it was archived.
    pub origin: BlobLocation,
    /// Name of the timestamp directory it was filed under.
    pub stamp: String,
    /// Resolved archive path.
    pub path: PathBuf,
}

/// Render an archive timestamp directory name, e.g. `20240611T153000123Z`.
pub fn archive_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S%3fZ").to_string()
}

/// Candidate timestamp directory names: the bare stamp, then `-1`, `-2`, …
pub(crate) fn stamp_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((1u32..).map(move |n| format!("{base}-{n}")))
}
