// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The desired and observed shapes of a materialized filesystem object,
//! and the diff between them.

use std::path::PathBuf;

/// What kind of filesystem object a path should be.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectType {
    File,
    Directory,
    Symlink,
}

/// An opaque source of bytes for a `File` object's contents.
///
/// Kept as an owned buffer rather than a path or stream: the materializer
/// never needs to re-read a source after diffing, and tests construct specs
/// inline without touching disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contents(pub Vec<u8>);

impl Contents {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Contents {
        Contents(bytes.into())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// An owner or group reference: either a name to resolve, or a numeric id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Principal {
    Name(String),
    Id(u32),
}

impl Principal {
    pub fn name(name: impl Into<String>) -> Principal {
        Principal::Name(name.into())
    }

    pub fn id(id: u32) -> Principal {
        Principal::Id(id)
    }
}

/// The desired state of a filesystem object, as declared by a task.
#[derive(Clone, Debug)]
pub struct FileSpec {
    pub path: PathBuf,
    pub object_type: ObjectType,
    pub contents: Option<Contents>,
    pub mode: Option<u32>,
    pub owner: Option<Principal>,
    pub group: Option<Principal>,
    pub symlink_target: Option<PathBuf>,
    pub if_not_exists: bool,
    pub on_change_execute: Option<Vec<String>>,
}

impl FileSpec {
    pub fn file(path: impl Into<PathBuf>, contents: Contents) -> FileSpec {
        FileSpec {
            path: path.into(),
            object_type: ObjectType::File,
            contents: Some(contents),
            mode: None,
            owner: None,
            group: None,
            symlink_target: None,
            if_not_exists: false,
            on_change_execute: None,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> FileSpec {
        FileSpec {
            path: path.into(),
            object_type: ObjectType::Directory,
            contents: None,
            mode: None,
            owner: None,
            group: None,
            symlink_target: None,
            if_not_exists: false,
            on_change_execute: None,
        }
    }

    pub fn symlink(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> FileSpec {
        FileSpec {
            path: path.into(),
            object_type: ObjectType::Symlink,
            contents: None,
            mode: None,
            owner: None,
            group: None,
            symlink_target: Some(target.into()),
            if_not_exists: false,
            on_change_execute: None,
        }
    }

    /// The mode to apply: the caller's choice, or `0644`/`0755` for files and
    /// directories respectively. Symlinks carry no mode of their own.
    pub fn effective_mode(&self) -> Option<u32> {
        match self.object_type {
            ObjectType::Symlink => None,
            ObjectType::File => Some(self.mode.unwrap_or(0o644)),
            ObjectType::Directory => Some(self.mode.unwrap_or(0o755)),
        }
    }
}

/// What Find observed at `path`: either nothing, or a concrete object with
/// its resolved owner/group names (falling back to the decimal uid/gid when
/// no name is registered on the system).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ObservedFile {
    pub object_type: ObjectType,
    pub mode: u32,
    pub owner: String,
    pub group: String,
    pub symlink_target: Option<PathBuf>,
    pub contents: Option<Vec<u8>>,
}

/// The fields diff() found to differ between observed and desired state.
/// Restricted to the fields the original object materializer tracks -
/// `path` and `type` are never part of a diff, they select which object is
/// being compared.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Change {
    pub contents: bool,
    pub mode: bool,
    pub owner: bool,
    pub group: bool,
    pub symlink: bool,
}

impl Change {
    pub fn is_empty(&self) -> bool {
        !self.contents && !self.mode && !self.owner && !self.group && !self.symlink
    }
}
