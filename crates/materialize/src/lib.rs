// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The declarative file materialization task: find/diff/apply convergence
//! of one filesystem object against a desired specification (§4.5 of the
//! design), plus the alternate cloud-init script-rendering path.

#[cfg(unix)]
pub mod apply;
pub mod cloudinit;
pub mod deps;
pub mod diff;
#[cfg(unix)]
pub mod find;
#[cfg(unix)]
pub mod principals;
pub mod spec;

pub use deps::{dependencies_of, TaskId};
pub use spec::{Change, Contents, FileSpec, ObjectType, ObservedFile, Principal};

/// Runs find/diff/apply against the local filesystem for one [`FileSpec`],
/// off the calling task via `executor` since every step here is blocking
/// I/O. Returns whether anything was changed.
#[cfg(unix)]
pub async fn materialize(
    executor: &task_executor::Executor,
    desired: FileSpec,
) -> Result<bool, String> {
    executor
        .spawn_blocking(move || materialize_sync(&desired))
        .await?
}

#[cfg(unix)]
fn materialize_sync(desired: &FileSpec) -> Result<bool, String> {
    let observed = find::find(&desired.path)?;

    if desired.if_not_exists && observed.is_some() {
        log::debug!(
            "{} exists and if_not_exists is set; skipping",
            desired.path.display()
        );
        return Ok(false);
    }

    let change = diff::diff(desired, observed.as_ref());
    if change.is_empty() {
        return Ok(false);
    }

    apply::apply(desired, &change, observed.as_ref())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn materializes_a_new_file_then_converges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let executor = task_executor::Executor::new();

        let spec = FileSpec::file(&path, Contents::from_bytes(b"hi".to_vec()));
        assert!(materialize(&executor, spec.clone()).await.unwrap());
        assert!(!materialize(&executor, spec).await.unwrap());
    }

    #[tokio::test]
    async fn if_not_exists_skips_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"preexisting").unwrap();
        let executor = task_executor::Executor::new();

        let mut spec = FileSpec::file(&path, Contents::from_bytes(b"new".to_vec()));
        spec.if_not_exists = true;
        assert!(!materialize(&executor, spec).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"preexisting");
    }
}
