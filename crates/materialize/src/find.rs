// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Find: stat a path without following symlinks and build its observed
//! state, mirroring `findFile`/`Lstat` in the original task's `Find`.

use std::fs;
use std::io;
use std::path::Path;

#[cfg(target_family = "unix")]
use std::os::unix::fs::{MetadataExt, PermissionsExt};

use crate::principals::{group_name_for_gid, owner_name_for_uid};
use crate::spec::{ObjectType, ObservedFile};

/// Observes the current state of `path`, or `None` if nothing is there.
///
/// Runs synchronously: callers that need this off the async runtime thread
/// should route it through [`task_executor::Executor::spawn_blocking`],
/// since every step here is blocking filesystem I/O.
pub fn find(path: &Path) -> Result<Option<ObservedFile>, String> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(format!("failed to stat {}: {err}", path.display())),
    };

    let file_type = metadata.file_type();

    #[cfg(target_family = "unix")]
    let (mode, owner, group) = {
        let mode = metadata.permissions().mode() & 0o7777;
        let owner = owner_name_for_uid(metadata.uid());
        let group = group_name_for_gid(metadata.gid());
        (mode, owner, group)
    };

    let (object_type, symlink_target, contents) = if file_type.is_symlink() {
        let target = fs::read_link(path)
            .map_err(|err| format!("failed to read symlink target of {}: {err}", path.display()))?;
        (ObjectType::Symlink, Some(target), None)
    } else if file_type.is_dir() {
        (ObjectType::Directory, None, None)
    } else {
        let contents = fs::read(path)
            .map_err(|err| format!("failed to read contents of {}: {err}", path.display()))?;
        (ObjectType::File, None, Some(contents))
    };

    Ok(Some(ObservedFile {
        object_type,
        mode,
        owner,
        group,
        symlink_target,
        contents,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn absent_path_observes_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        assert_eq!(find(&path).unwrap(), None);
    }

    #[test]
    fn observes_a_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"hello").unwrap();

        let observed = find(&path).unwrap().unwrap();
        assert_eq!(observed.object_type, ObjectType::File);
        assert_eq!(observed.contents, Some(b"hello".to_vec()));
    }

    #[test]
    fn observes_a_symlink_without_following_it() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::write(&target, b"hi").unwrap();
        let link = dir.path().join("link");
        symlink(&target, &link).unwrap();

        let observed = find(&link).unwrap().unwrap();
        assert_eq!(observed.object_type, ObjectType::Symlink);
        assert_eq!(observed.symlink_target, Some(target));
    }

    #[test]
    fn observes_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let observed = find(dir.path()).unwrap().unwrap();
        assert_eq!(observed.object_type, ObjectType::Directory);
    }
}
