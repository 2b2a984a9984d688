// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Dependency declaration for a file task: mirrors `File.GetDependencies`
//! in the original task system.

use crate::spec::{FileSpec, Principal};

/// The identity of another task in the surrounding task graph, as far as a
/// file task's dependency declaration needs to know about it.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TaskId {
    /// A task that creates the named user or group account.
    PrincipalCreation(String),
    /// A task that mounts a disk somewhere in the filesystem.
    DiskMount,
}

/// Computes the tasks a file task must wait on: the owner-creation task (if
/// the owner is a name rather than a bare numeric id), and every disk-mount
/// task, coarsely but correctly treating all mounts as relevant regardless
/// of whether they actually cover this path.
pub fn dependencies_of<'a>(spec: &FileSpec, known_tasks: impl IntoIterator<Item = &'a TaskId>) -> Vec<TaskId> {
    let mut deps = Vec::new();

    if let Some(Principal::Name(name)) = &spec.owner {
        deps.push(TaskId::PrincipalCreation(name.clone()));
    }

    for task in known_tasks {
        if *task == TaskId::DiskMount {
            deps.push(task.clone());
        }
    }

    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Contents;

    #[test]
    fn depends_on_named_owners_creation_task() {
        let mut spec = FileSpec::file("/x", Contents::from_bytes(b"hi".to_vec()));
        spec.owner = Some(Principal::name("ubuntu"));
        let deps = dependencies_of(&spec, &[]);
        assert_eq!(deps, vec![TaskId::PrincipalCreation("ubuntu".to_string())]);
    }

    #[test]
    fn numeric_owner_adds_no_creation_dependency() {
        let mut spec = FileSpec::file("/x", Contents::from_bytes(b"hi".to_vec()));
        spec.owner = Some(Principal::id(0));
        let deps = dependencies_of(&spec, &[]);
        assert!(deps.is_empty());
    }

    #[test]
    fn depends_on_every_disk_mount_task_regardless_of_path() {
        let spec = FileSpec::file("/x", Contents::from_bytes(b"hi".to_vec()));
        let known = vec![TaskId::DiskMount, TaskId::DiskMount];
        let deps = dependencies_of(&spec, &known);
        assert_eq!(deps.len(), 2);
    }
}
