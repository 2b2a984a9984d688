// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The alternate render target: rather than touching the local filesystem,
//! emit the shell commands that would do so. Mirrors `RenderCloudInit`.

use std::fmt::Write as _;

use base64::Engine;

use crate::spec::{FileSpec, ObjectType};

/// One command an `EmittedScript` carries, tagged the way the original
/// cloud-init target distinguishes a per-boot step from one that should
/// only ever run the first time an image is materialized.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cadence {
    Always,
    Once,
}

#[derive(Clone, Debug)]
pub struct Command {
    pub cadence: Cadence,
    pub argv: Vec<String>,
}

/// The shell-script form of applying a [`FileSpec`], for environments (cloud
/// provider user-data, machine images) where a script is handed off instead
/// of executed locally.
#[derive(Clone, Debug, Default)]
pub struct EmittedScript {
    pub commands: Vec<Command>,
}

impl EmittedScript {
    fn push(&mut self, cadence: Cadence, argv: Vec<String>) {
        self.commands.push(Command { cadence, argv });
    }

    /// Renders every command as one shell line, in order. Embedded file
    /// contents are base64-encoded so arbitrary binary payloads survive
    /// quoting.
    pub fn to_script(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            let _ = writeln!(out, "{}", shell_quote_argv(&command.argv));
        }
        out
    }
}

fn shell_quote_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| format!("'{}'", arg.replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders `desired` as cloud-init script commands instead of applying it
/// directly. Unlike [`crate::apply::apply`] this never consults observed
/// state - the script runs once against a fresh image, so it always emits
/// the full set of commands `desired` implies.
pub fn render(desired: &FileSpec) -> Result<EmittedScript, String> {
    let mut script = EmittedScript::default();
    let mode = desired.effective_mode();

    match desired.object_type {
        ObjectType::Symlink => {
            let target = desired
                .symlink_target
                .as_ref()
                .ok_or_else(|| format!("symlink {} has no target", desired.path.display()))?;
            script.push(
                Cadence::Always,
                vec![
                    "ln".to_string(),
                    "-s".to_string(),
                    target.display().to_string(),
                    desired.path.display().to_string(),
                ],
            );
        }
        ObjectType::Directory => {
            let parent = desired
                .path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "/".to_string());
            script.push(
                Cadence::Once,
                vec![
                    "mkdir".to_string(),
                    "-p".to_string(),
                    "-m".to_string(),
                    format_mode(0o755),
                    parent,
                ],
            );
            script.push(
                Cadence::Once,
                vec![
                    "mkdir".to_string(),
                    "-m".to_string(),
                    format_mode(mode.unwrap_or(0o755)),
                    desired.path.display().to_string(),
                ],
            );
        }
        ObjectType::File => {
            let contents = desired
                .contents
                .as_ref()
                .ok_or_else(|| format!("file {} has no contents", desired.path.display()))?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(contents.as_slice());
            script.push(
                Cadence::Once,
                vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    format!(
                        "mkdir -p -m {} $(dirname {}) && echo {} | base64 -d > {} && chmod {} {}",
                        format_mode(0o755),
                        desired.path.display(),
                        encoded,
                        desired.path.display(),
                        format_mode(mode.unwrap_or(0o644)),
                        desired.path.display(),
                    ),
                ],
            );
        }
    }

    if desired.owner.is_some() || desired.group.is_some() {
        let owner = display_principal(desired.owner.as_ref());
        let group = display_principal(desired.group.as_ref());
        script.push(
            Cadence::Always,
            vec![
                "chown".to_string(),
                format!("{owner}:{group}"),
                desired.path.display().to_string(),
            ],
        );
    }

    if let Some(argv) = &desired.on_change_execute {
        script.push(Cadence::Always, argv.clone());
    }

    Ok(script)
}

fn display_principal(principal: Option<&crate::spec::Principal>) -> String {
    match principal {
        Some(crate::spec::Principal::Name(name)) => name.clone(),
        Some(crate::spec::Principal::Id(id)) => id.to_string(),
        None => String::new(),
    }
}

fn format_mode(mode: u32) -> String {
    format!("{mode:04o}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Contents;

    #[test]
    fn symlink_renders_an_ln_command() {
        let desired = FileSpec::symlink("/etc/x", "/etc/x.real");
        let script = render(&desired).unwrap();
        assert_eq!(script.commands.len(), 1);
        assert!(script.to_script().contains("ln"));
        assert!(script.to_script().contains("/etc/x.real"));
    }

    #[test]
    fn directory_emits_parent_then_leaf_mkdir() {
        let desired = FileSpec::directory("/mnt/data");
        let script = render(&desired).unwrap();
        assert_eq!(script.commands.len(), 2);
        assert!(script.commands[0].argv.contains(&"/mnt".to_string()));
        assert!(script.commands[1].argv.contains(&"/mnt/data".to_string()));
    }

    #[test]
    fn file_round_trips_through_base64() {
        let desired = FileSpec::file("/etc/f", Contents::from_bytes(b"hello world".to_vec()));
        let script = render(&desired).unwrap();
        assert_eq!(
            base64::engine::general_purpose::STANDARD.encode(b"hello world"),
            "aGVsbG8gd29ybGQ="
        );
        let text = script.to_script();
        assert!(text.contains("base64 -d"));
    }

    #[test]
    fn owner_and_on_change_execute_are_appended() {
        let mut desired = FileSpec::file("/etc/f", Contents::from_bytes(b"x".to_vec()));
        desired.owner = Some(crate::spec::Principal::name("root"));
        desired.on_change_execute = Some(vec!["systemctl".to_string(), "restart".to_string(), "foo".to_string()]);
        let script = render(&desired).unwrap();
        let text = script.to_script();
        assert!(text.contains("chown"));
        assert!(text.contains("systemctl"));
    }
}
