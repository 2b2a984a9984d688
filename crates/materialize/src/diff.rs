// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Diff: compare desired to observed state, producing the restricted
//! change set the apply step acts on.

use crate::principals::{group_matches, owner_matches};
use crate::spec::{Change, FileSpec, ObjectType, ObservedFile};

/// Computes the change set for `desired` given what Find observed.
///
/// `observed = None` means the path does not exist yet: every applicable
/// field of `desired` is reported as changed so apply creates it outright.
pub fn diff(desired: &FileSpec, observed: Option<&ObservedFile>) -> Change {
    let Some(observed) = observed else {
        return Change {
            contents: desired.object_type == ObjectType::File,
            mode: desired.effective_mode().is_some(),
            owner: desired.owner.is_some(),
            group: desired.group.is_some(),
            symlink: desired.object_type == ObjectType::Symlink,
        };
    };

    let mut change = Change::default();

    match desired.object_type {
        ObjectType::Symlink => {
            // Re-pointing an existing symlink is out of scope; a mismatch here
            // surfaces as an apply-time error rather than a silent no-op.
            if observed.object_type != ObjectType::Symlink
                || observed.symlink_target.as_deref() != desired.symlink_target.as_deref()
            {
                change.symlink = true;
            }
        }
        // A directory's only state worth diffing is its mode, handled below;
        // apply() itself decides whether the directory needs creating by
        // checking whether anything was observed at all.
        ObjectType::Directory => {}
        ObjectType::File => {
            if observed.object_type != ObjectType::File {
                change.contents = true;
            } else if let Some(contents) = &desired.contents {
                if observed.contents.as_deref() != Some(contents.as_slice()) {
                    change.contents = true;
                }
            }
        }
    }

    if let Some(mode) = desired.effective_mode() {
        if observed.mode != mode {
            change.mode = true;
        }
    }

    if let Some(owner) = &desired.owner {
        if !owner_matches(owner, &observed.owner) {
            change.owner = true;
        }
    }

    if let Some(group) = &desired.group {
        if !group_matches(group, &observed.group) {
            change.group = true;
        }
    }

    change
}

/// Whether an existing symlink that mismatches desired state should be
/// treated as a hard error rather than something apply can fix, per the
/// "fail if target exists" rule preserved from the original task.
pub fn symlink_repoint_is_refused(desired: &FileSpec, observed: Option<&ObservedFile>) -> bool {
    desired.object_type == ObjectType::Symlink
        && matches!(observed, Some(o) if o.object_type == ObjectType::Symlink)
        && observed.unwrap().symlink_target.as_deref() != desired.symlink_target.as_deref()
}
