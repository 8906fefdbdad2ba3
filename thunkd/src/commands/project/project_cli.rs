use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;
use tokio::fs;

use crate::{
    commands::project::{clean, modular},
    error::{CliError, ErrorKind},
    utils::{
        client::ProjectClient,
        console::console_info,
        user::{get_credentials_for_profile, prompt_user_for_input},
    },
};

const PARTIAL_SUFFIX: &str = ".thunkd-partial";

#[derive(Clone, Copy, Debug, Default)]
pub struct PullOptions {
    pub clean: bool,
    pub modular: bool,
    pub assume_yes: bool,
}

// The shape `pull` writes: the project sits under `data.project`.
#[derive(Deserialize)]
struct PulledDocument<'a> {
    #[serde(borrow)]
    data: PulledData<'a>,
}

#[derive(Deserialize)]
struct PulledData<'a> {
    #[serde(borrow)]
    project: &'a RawValue,
}

pub async fn pull(
    project_id: String,
    path: PathBuf,
    options: PullOptions,
    profile: &str,
    endpoint: Option<String>,
) -> Result<(), CliError> {
    debug!("pulling project {project_id} into {path:?} with {options:?}");
    let credentials = get_credentials_for_profile(profile).await?;
    let client = ProjectClient::new(&credentials, endpoint)?;
    let body = client.fetch_project(&project_id).await?;

    if !options.clean && !options.modular {
        write_file_atomically(&path, &body).await?;
        console_info!("Pulled project {} into {:?}", project_id, path);
        return Ok(());
    }

    let mut project: Value = serde_json::from_slice(&body).map_err(|e| {
        CliError::new(
            ErrorKind::Network,
            format!("malformed project from the service: {e}"),
        )
    })?;
    if options.clean {
        clean::to_clean_project(&mut project);
        debug!("cleaned project {project_id}");
    }

    if options.modular {
        let modular_project = modular::to_modular_project(project)?;
        if !confirm_replace_directory(&path, options.assume_yes).await? {
            console_info!("Nothing was written");
            return Ok(());
        }
        write_directory_atomically(&path, &modular_project).await?;
    } else {
        write_file_atomically(&path, &modular::dump_json(&project)?).await?;
    }
    console_info!("Pulled project {} into {:?}", project_id, path);
    Ok(())
}

pub async fn push(
    project_id: String,
    path: PathBuf,
    modular: bool,
    profile: &str,
    endpoint: Option<String>,
) -> Result<(), CliError> {
    debug!("pushing {path:?} to project {project_id}, modular: {modular}");
    // The local side is read first so that a bad path never costs a request.
    let content = if modular {
        let modular_project = modular::read_modular_project(&path).await?;
        let project = modular::from_modular_project(modular_project)?;
        let inner = project.pointer("/data/project").unwrap_or(&project);
        let text = serde_json::to_string(inner).map_err(|e| {
            CliError::new(
                ErrorKind::LocalIo,
                format!("failed to serialize project: {e}"),
            )
        })?;
        RawValue::from_string(text).map_err(|e| {
            CliError::new(
                ErrorKind::LocalIo,
                format!("failed to serialize project: {e}"),
            )
        })?
    } else {
        let bytes = fs::read(&path).await.map_err(|e| {
            CliError::new(ErrorKind::LocalIo, format!("failed to read {path:?}: {e}"))
        })?;
        project_content(&path, &bytes)?
    };

    let credentials = get_credentials_for_profile(profile).await?;
    let client = ProjectClient::new(&credentials, endpoint)?;
    let hash = client.update_project(&project_id, &content).await?;
    debug!("project {project_id} now has hash {hash}");
    console_info!("Pushed {:?} to project {}", path, project_id);
    Ok(())
}

/// The content to upload for a local file: `data.project` of a pulled
/// document, or the whole document otherwise. Bytes are passed through
/// untouched.
fn project_content(path: &Path, bytes: &[u8]) -> Result<Box<RawValue>, CliError> {
    let text = std::str::from_utf8(bytes).map_err(|_| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("{path:?} is not valid UTF-8"),
        )
    })?;
    let whole: &RawValue = serde_json::from_str(text).map_err(|e| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("{path:?} is not valid JSON: {e}"),
        )
    })?;
    let content = match serde_json::from_str::<PulledDocument>(text) {
        Ok(document) => document.data.project,
        Err(_) => {
            debug!("{path:?} has no data.project member, pushing the whole document");
            whole
        }
    };
    Ok(content.to_owned())
}

async fn write_file_atomically(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    ensure_parent_dir(path).await?;
    let partial = partial_path(path);
    if let Err(e) = fs::write(&partial, contents).await {
        let _ = fs::remove_file(&partial).await;
        return Err(CliError::new(
            ErrorKind::LocalIo,
            format!("failed to write {path:?}: {e}"),
        ));
    }
    if let Err(e) = fs::rename(&partial, path).await {
        let _ = fs::remove_file(&partial).await;
        return Err(CliError::new(
            ErrorKind::LocalIo,
            format!("failed to write {path:?}: {e}"),
        ));
    }
    Ok(())
}

// Files are staged in a sibling directory which replaces `path` once complete.
async fn write_directory_atomically(
    path: &Path,
    modular_project: &modular::ModularProject,
) -> Result<(), CliError> {
    ensure_parent_dir(path).await?;
    let partial = partial_path(path);
    if fs::try_exists(&partial).await.unwrap_or(false) {
        fs::remove_dir_all(&partial).await?;
    }
    if let Err(e) = modular::write_modular_project(&partial, modular_project).await {
        let _ = fs::remove_dir_all(&partial).await;
        return Err(e);
    }
    if fs::try_exists(path).await.unwrap_or(false) {
        fs::remove_dir_all(path).await.map_err(|e| {
            CliError::new(
                ErrorKind::LocalIo,
                format!("failed to clear {path:?}: {e}"),
            )
        })?;
    }
    fs::rename(&partial, path).await.map_err(|e| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("failed to move the project into {path:?}: {e}"),
        )
    })
}

async fn confirm_replace_directory(path: &Path, assume_yes: bool) -> Result<bool, CliError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(true);
    }
    let mut entries = fs::read_dir(path).await.map_err(|e| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("{path:?} exists and is not a readable directory: {e}"),
        )
    })?;
    let mut existing = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        existing.push(entry.path());
    }
    if existing.is_empty() || assume_yes {
        return Ok(true);
    }

    console_info!("After this operation, the following files will be permanently deleted.");
    for file in &existing {
        console_info!("\t{}", file.display());
    }
    let answer = prompt_user_for_input("Do you want to continue? (y/n)", "n").await?;
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

async fn ensure_parent_dir(path: &Path) -> Result<(), CliError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await.map_err(|e| {
                CliError::new(
                    ErrorKind::LocalIo,
                    format!("failed to create directory {parent:?}: {e}"),
                )
            })
        }
        _ => Ok(()),
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("project"));
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{partial_path, project_content};
    use crate::error::ErrorKind;

    #[test]
    fn pulled_document_pushes_its_project_verbatim() {
        let file = br#"{"data": {"project": {"b": 1,  "a": [1, 2]}, "user": {"id": "u"}}}"#;
        let content = project_content(Path::new("p.json"), file).expect("valid file");
        assert_eq!(r#"{"b": 1,  "a": [1, 2]}"#, content.get());
    }

    #[test]
    fn bare_project_is_pushed_whole() {
        let file = br#"{"components": {}, "blockly": {}}"#;
        let content = project_content(Path::new("p.json"), file).expect("valid file");
        assert_eq!(r#"{"components": {}, "blockly": {}}"#, content.get());
    }

    #[test]
    fn invalid_json_is_a_file_error() {
        let err = project_content(Path::new("p.json"), b"{not json")
            .err()
            .expect("should fail");
        assert_eq!(ErrorKind::LocalIo, err.kind());
    }

    #[test]
    fn partial_path_is_a_sibling() {
        assert_eq!(
            Path::new("out/proj.json.thunkd-partial"),
            partial_path(Path::new("out/proj.json"))
        );
    }
}
