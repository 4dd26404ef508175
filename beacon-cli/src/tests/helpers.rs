//! Test helpers for seeding databases and profile document files.

use camino::Utf8PathBuf;
use tempfile::TempDir;

pub(super) const PROFILE_DOCUMENTS: &str = r#"[
  {"id": "u-ada", "email": "ada@example.com", "lastLat": 51.5, "lastLng": -0.1, "interests": ["music"]},
  {"email": "grace@example.com", "lastLat": 51.51, "lastLng": -0.1,
   "tags": ["music"], "profileType": "creator", "verified": true},
  {"email": "linus@example.com", "lastLat": 51.7, "lastLng": -0.1, "profileType": "organizer"}
]"#;

/// Temporary directory holding a database path and a profile document file.
pub(super) struct Workspace {
    _dir: TempDir,
    pub(super) database: Utf8PathBuf,
    pub(super) profiles: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let profiles = root.join("profiles.json");
        std::fs::write(&profiles, PROFILE_DOCUMENTS).expect("write profile documents");
        Self {
            _dir: dir,
            database: root.join("beacon.sqlite"),
            profiles,
        }
    }

    pub(super) fn write_profiles(&self, contents: &str) {
        std::fs::write(&self.profiles, contents).expect("write profile documents");
    }
}
