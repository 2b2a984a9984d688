// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Apply: make the filesystem match a desired [`FileSpec`], given the
//! change set [`crate::diff::diff`] produced. Mirrors `RenderLocal`.

use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;
use std::process::Command;

use crate::diff::symlink_repoint_is_refused;
use crate::principals::{resolve_gid, resolve_uid};
use crate::spec::{Change, FileSpec, ObjectType, ObservedFile};

const PARENT_DIR_MODE: u32 = 0o755;

/// Applies `desired` to the local filesystem, given the observed state and
/// the change set already computed for it. Returns whether anything was
/// actually changed, so the caller can decide whether to run
/// `on_change_execute`.
pub fn apply(
    desired: &FileSpec,
    change: &Change,
    observed: Option<&ObservedFile>,
) -> Result<bool, String> {
    if symlink_repoint_is_refused(desired, observed) {
        return Err(format!(
            "refusing to repoint existing symlink at {}: already points elsewhere",
            desired.path.display()
        ));
    }

    if change.is_empty() {
        return Ok(false);
    }

    let mut changed = false;

    match desired.object_type {
        ObjectType::Symlink => {
            if change.symlink {
                let target = desired.symlink_target.as_deref().ok_or_else(|| {
                    format!("symlink {} has no target", desired.path.display())
                })?;
                symlink(target, &desired.path).map_err(|err| {
                    format!(
                        "error creating symlink {} -> {}: {err}",
                        desired.path.display(),
                        target.display()
                    )
                })?;
                changed = true;
            }
        }
        ObjectType::Directory => {
            if observed.is_none() {
                if let Some(parent) = desired.path.parent() {
                    create_dir_all_with_mode(parent, PARENT_DIR_MODE).map_err(|err| {
                        format!("error creating parent directories {}: {err}", parent.display())
                    })?;
                }
                let mode = desired.effective_mode().unwrap_or(PARENT_DIR_MODE);
                create_dir_all_with_mode(&desired.path, mode).map_err(|err| {
                    format!("error creating directory {}: {err}", desired.path.display())
                })?;
                changed = true;
            }
        }
        ObjectType::File => {
            if change.contents {
                let contents = desired
                    .contents
                    .as_ref()
                    .ok_or_else(|| format!("file {} has no contents", desired.path.display()))?;
                if let Some(parent) = desired.path.parent() {
                    create_dir_all_with_mode(parent, PARENT_DIR_MODE).map_err(|err| {
                        format!("error creating parent directories {}: {err}", parent.display())
                    })?;
                }
                write_atomically(&desired.path, contents.as_slice(), desired.effective_mode())
                    .map_err(|err| format!("error writing {}: {err}", desired.path.display()))?;
                changed = true;
            }
        }
    }

    if change.mode {
        if let Some(mode) = desired.effective_mode() {
            ensure_mode(&desired.path, mode)
                .map_err(|err| format!("error changing mode on {}: {err}", desired.path.display()))?;
            changed = true;
        }
    }

    if change.owner || change.group {
        ensure_owner(desired).map_err(|err| {
            format!("error changing owner/group on {}: {err}", desired.path.display())
        })?;
        changed = true;
    }

    if changed {
        if let Some(argv) = &desired.on_change_execute {
            run_on_change(argv)?;
        }
    }

    Ok(changed)
}

fn create_dir_all_with_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Writes via a temp file in the same directory and renames over the
/// target, so a reader of `path` never observes a partial write.
fn write_atomically(path: &Path, contents: &[u8], mode: Option<u32>) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = parent.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("materialize")
    ));
    fs::write(&tmp, contents)?;
    if let Some(mode) = mode {
        fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))?;
    }
    fs::rename(&tmp, path)
}

fn ensure_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

fn ensure_owner(desired: &FileSpec) -> Result<(), String> {
    let uid = desired.owner.as_ref().map(resolve_uid).transpose()?;
    let gid = desired.group.as_ref().map(resolve_gid).transpose()?;

    std::os::unix::fs::chown(&desired.path, uid, gid).map_err(|err| err.to_string())
}

fn run_on_change(argv: &[String]) -> Result<(), String> {
    let Some((program, args)) = argv.split_first() else {
        return Err("on_change_execute is empty".to_string());
    };
    let human = argv.join(" ");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| format!("error executing command {human:?}: {err}"))?;
    if !output.status.success() {
        return Err(format!(
            "error executing command {human:?}: exited with {}\nOutput: {}{}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::find::find;
    use crate::spec::Contents;

    #[test]
    fn creates_a_file_with_requested_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let mut desired = FileSpec::file(&path, Contents::from_bytes(b"hi".to_vec()));
        desired.mode = Some(0o600);

        let observed = find(&path).unwrap();
        let change = diff(&desired, observed.as_ref());
        let changed = apply(&desired, &change, observed.as_ref()).unwrap();
        assert!(changed);

        let contents = fs::read(&path).unwrap();
        assert_eq!(contents, b"hi");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn second_apply_with_no_diff_reports_no_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let desired = FileSpec::file(&path, Contents::from_bytes(b"hi".to_vec()));

        let observed = find(&path).unwrap();
        let change = diff(&desired, observed.as_ref());
        apply(&desired, &change, observed.as_ref()).unwrap();

        let observed2 = find(&path).unwrap();
        let change2 = diff(&desired, observed2.as_ref());
        let changed2 = apply(&desired, &change2, observed2.as_ref()).unwrap();
        assert!(!changed2);
    }

    #[test]
    fn creates_a_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::write(&target, b"hi").unwrap();
        let link = dir.path().join("link");

        let desired = FileSpec::symlink(&link, &target);
        let observed = find(&link).unwrap();
        let change = diff(&desired, observed.as_ref());
        apply(&desired, &change, observed.as_ref()).unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), target);
    }

    #[test]
    fn repointing_an_existing_symlink_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let old_target = dir.path().join("old");
        let new_target = dir.path().join("new");
        fs::write(&old_target, b"a").unwrap();
        fs::write(&new_target, b"b").unwrap();
        let link = dir.path().join("link");
        symlink(&old_target, &link).unwrap();

        let desired = FileSpec::symlink(&link, &new_target);
        let observed = find(&link).unwrap();
        let change = diff(&desired, observed.as_ref());
        let result = apply(&desired, &change, observed.as_ref());
        assert!(result.is_err());
    }

    #[test]
    fn on_change_execute_runs_once_then_not_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let marker = dir.path().join("ran");

        let mut desired = FileSpec::file(&path, Contents::from_bytes(b"hi".to_vec()));
        desired.on_change_execute = Some(vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            format!("echo x >> {}", marker.display()),
        ]);

        let observed = find(&path).unwrap();
        let change = diff(&desired, observed.as_ref());
        apply(&desired, &change, observed.as_ref()).unwrap();
        assert_eq!(fs::read_to_string(&marker).unwrap(), "x\n");

        let observed2 = find(&path).unwrap();
        let change2 = diff(&desired, observed2.as_ref());
        apply(&desired, &change2, observed2.as_ref()).unwrap();
        assert_eq!(fs::read_to_string(&marker).unwrap(), "x\n");
    }
}
