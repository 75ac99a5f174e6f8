use chrono::{DateTime, Utc};
use esync_domain::{Manifest, ManifestEntry};
use esync_drive::FileMeta;

/// True if the tenant's Drive tree has diverged from its stored manifest
/// and therefore needs a fresh sync. Fails toward `true`: an absent
/// checksum (Drive omits `md5Checksum` for some file types) is treated as
/// "changed" rather than "unchanged", and any mismatch in the file id set
/// itself is conclusive.
pub fn needs_update(current: &[FileMeta], manifest: &Manifest) -> bool {
    if current.len() != manifest.files.len() {
        return true;
    }

    for file in current {
        let Some(entry) = manifest.files.get(&file.id) else {
            return true;
        };
        if entry.name != file.name || entry.folder_path != file.folder_path {
            return true;
        }
        if file.modified_time != entry.modified_time {
            return true;
        }
        if file.size != entry.size {
            return true;
        }
        match (&file.checksum, &entry.checksum) {
            (Some(a), Some(b)) if a == b => {}
            _ => return true,
        }
    }

    false
}

pub fn build_manifest(current: &[FileMeta], now: DateTime<Utc>) -> Manifest {
    let mut files = std::collections::HashMap::with_capacity(current.len());
    for file in current {
        files.insert(
            file.id.clone(),
            ManifestEntry {
                modified_time: file.modified_time,
                size: file.size,
                checksum: file.checksum.clone(),
                name: file.name.clone(),
                folder_path: file.folder_path.clone(),
            },
        );
    }
    let files_count = files.len();
    Manifest {
        files,
        last_checked: Some(now),
        last_updated: Some(now),
        files_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn file(id: &str, name: &str, checksum: Option<&str>) -> FileMeta {
        FileMeta {
            id: id.into(),
            name: name.into(),
            folder_path: "".into(),
            web_view_link: "".into(),
            mime_type: "image/jpeg".into(),
            modified_time: None,
            size: Some(10),
            checksum: checksum.map(str::to_string),
        }
    }

    #[test]
    fn absent_checksum_is_treated_as_changed() {
        let current = vec![file("f1", "a.jpg", None)];
        let mut files = HashMap::new();
        files.insert(
            "f1".to_string(),
            ManifestEntry {
                modified_time: None,
                size: Some(10),
                checksum: None,
                name: "a.jpg".into(),
                folder_path: "".into(),
            },
        );
        let manifest = Manifest {
            files,
            last_checked: Some(Utc::now()),
            last_updated: Some(Utc::now()),
            files_count: 1,
        };
        assert!(needs_update(&current, &manifest));
    }

    #[test]
    fn identical_state_does_not_need_update() {
        let current = vec![file("f1", "a.jpg", Some("abc"))];
        let manifest = build_manifest(&current, Utc::now());
        assert!(!needs_update(&current, &manifest));
    }

    #[test]
    fn new_file_triggers_update() {
        let current = vec![file("f1", "a.jpg", Some("abc")), file("f2", "b.jpg", Some("def"))];
        let manifest = build_manifest(&current[..1], Utc::now());
        assert!(needs_update(&current, &manifest));
    }
}
