// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The `materialize` subcommand: read a declared file spec from JSON and
//! either apply it to the local filesystem or render it as a cloud-init
//! script, per the alternate render target (§6).

use std::path::PathBuf;

use materialize::{Contents, FileSpec, ObjectType, Principal};
use serde::Deserialize;

#[derive(Deserialize)]
struct FileSpecDto {
    path: PathBuf,
    #[serde(rename = "type")]
    object_type: String,
    contents: Option<String>,
    mode: Option<String>,
    owner: Option<String>,
    group: Option<String>,
    symlink_target: Option<PathBuf>,
    #[serde(default)]
    if_not_exists: bool,
    #[serde(default)]
    on_change_execute: Option<Vec<String>>,
}

fn parse_mode(mode: &str) -> Result<u32, String> {
    u32::from_str_radix(mode, 8).map_err(|e| format!("invalid octal mode {mode:?}: {e}"))
}

fn parse_principal(value: &str) -> Principal {
    match value.parse::<u32>() {
        Ok(id) => Principal::id(id),
        Err(_) => Principal::name(value),
    }
}

fn to_file_spec(dto: FileSpecDto) -> Result<FileSpec, String> {
    let object_type = match dto.object_type.as_str() {
        "file" => ObjectType::File,
        "directory" => ObjectType::Directory,
        "symlink" => ObjectType::Symlink,
        other => return Err(format!("unrecognized file type: {other}")),
    };

    let mut spec = match object_type {
        ObjectType::File => FileSpec::file(
            dto.path,
            Contents::from_bytes(dto.contents.unwrap_or_default().into_bytes()),
        ),
        ObjectType::Directory => FileSpec::directory(dto.path),
        ObjectType::Symlink => {
            let target = dto
                .symlink_target
                .ok_or_else(|| "symlink spec is missing symlink_target".to_string())?;
            FileSpec::symlink(dto.path, target)
        }
    };

    spec.mode = dto.mode.as_deref().map(parse_mode).transpose()?;
    spec.owner = dto.owner.as_deref().map(parse_principal);
    spec.group = dto.group.as_deref().map(parse_principal);
    spec.if_not_exists = dto.if_not_exists;
    spec.on_change_execute = dto.on_change_execute;

    Ok(spec)
}

pub async fn run(spec_path: &str, cloud_init: bool) -> Result<(), String> {
    let json = std::fs::read_to_string(spec_path)
        .map_err(|e| format!("failed to read file spec {spec_path}: {e}"))?;
    let dto: FileSpecDto =
        serde_json::from_str(&json).map_err(|e| format!("invalid file spec: {e}"))?;
    let spec = to_file_spec(dto)?;

    if cloud_init {
        let script = materialize::cloudinit::render(&spec)?;
        print!("{}", script.to_script());
        return Ok(());
    }

    let executor = task_executor::Executor::new();
    let changed = materialize::materialize(&executor, spec).await?;
    if changed {
        println!("applied");
    } else {
        println!("already converged");
    }
    Ok(())
}
