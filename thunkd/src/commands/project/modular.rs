use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::fs;

use crate::error::{CliError, ErrorKind};

pub const META_FILE_NAME: &str = "meta.json";

lazy_static! {
    static ref REGEX_INVALID_SCREEN_NAME: Regex =
        Regex::new(r"[^\w\- ]").expect("Unable to compile screen name regex");
}

/// One file of a modular project.
#[derive(Clone, Debug, PartialEq)]
pub enum ModularFile {
    Json(Value),
    Xml(String),
}

/// File name to content. `meta.json` holds everything that is not a screen.
pub type ModularProject = BTreeMap<String, ModularFile>;

/// Splits a pulled project into `meta.json`, one `<name>.<id>.json` per
/// screen and one `<name>.<id>.xml` per screen with blocks.
pub fn to_modular_project(mut project: Value) -> Result<ModularProject, CliError> {
    let mut modular_project = ModularProject::new();
    let mut screen_id_to_name: HashMap<String, String> = HashMap::new();

    let iproject = inner_project_mut(&mut project)?;

    for screen in screens_mut(iproject) {
        let screen_id = screen.get("id").map(value_to_key).ok_or_else(|| {
            CliError::new(ErrorKind::LocalIo, "encountered a screen without an id")
        })?;
        let screen_name = screen
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if REGEX_INVALID_SCREEN_NAME.is_match(&screen_name) {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!(
                    "invalid screen name {screen_name:?} (id {screen_id}); screen names cannot contain special characters besides '-' and '_'"
                ),
            ));
        }
        if screen_id.is_empty() || REGEX_INVALID_SCREEN_NAME.is_match(&screen_id) {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!(
                    "invalid screen id {screen_id:?} (screen {screen_name:?}); it cannot be used in a file name"
                ),
            ));
        }

        let stub = json!({ "id": screen.get("id").cloned().unwrap_or(Value::Null) });
        let full_screen = std::mem::replace(screen, stub);
        modular_project.insert(
            format!("{screen_name}.{screen_id}.json"),
            ModularFile::Json(full_screen),
        );
        screen_id_to_name.insert(screen_id, screen_name);
    }

    if let Some(blockly) = iproject.get_mut("blockly").and_then(Value::as_object_mut) {
        for (screen_id, blocks) in blockly.iter_mut() {
            let Some(xml) = blocks.get_mut("xml") else {
                continue;
            };
            // Blocks of deleted screens stay where they are.
            let Some(screen_name) = screen_id_to_name.get(screen_id) else {
                debug!("leaving blocks of unknown screen {screen_id} in {META_FILE_NAME}");
                continue;
            };
            let text = match std::mem::replace(xml, Value::String(String::new())) {
                Value::String(text) => text,
                other => other.to_string(),
            };
            modular_project.insert(
                format!("{screen_name}.{screen_id}.xml"),
                ModularFile::Xml(text),
            );
        }
    }

    modular_project.insert(META_FILE_NAME.to_string(), ModularFile::Json(project));
    Ok(modular_project)
}

/// Reverses `to_modular_project`.
pub fn from_modular_project(mut modular_project: ModularProject) -> Result<Value, CliError> {
    let mut project = match modular_project.remove(META_FILE_NAME) {
        Some(ModularFile::Json(meta)) => meta,
        _ => {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!("the modular project has no {META_FILE_NAME}"),
            ))
        }
    };
    let iproject = inner_project_mut(&mut project)?;

    for (name, file) in modular_project {
        let screen_id = screen_id_from_file_name(&name);
        match file {
            ModularFile::Json(data) => {
                let screen = screens_mut(iproject)
                    .into_iter()
                    .find(|screen| screen.get("id").map(value_to_key).as_deref() == Some(screen_id))
                    .ok_or_else(|| {
                        CliError::new(
                            ErrorKind::LocalIo,
                            format!("{name} does not belong to any screen of the project"),
                        )
                    })?;
                merge_screen(screen, data);
            }
            ModularFile::Xml(text) => {
                let blocks = ensure_object(iproject, "blockly")?
                    .entry(screen_id.to_string())
                    .or_insert_with(|| json!({}));
                match blocks.as_object_mut() {
                    Some(blocks) => {
                        blocks.insert("xml".to_string(), Value::String(text));
                    }
                    None => {
                        return Err(CliError::new(
                            ErrorKind::LocalIo,
                            format!("blocks of screen {screen_id} are not an object"),
                        ))
                    }
                }
            }
        }
    }

    Ok(project)
}

pub async fn read_modular_project(project_path: &Path) -> Result<ModularProject, CliError> {
    let mut modular_project = ModularProject::new();
    let mut entries = fs::read_dir(project_path).await.map_err(|e| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("failed to read directory {project_path:?}: {e}"),
        )
    })?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            info!("skipping {path:?}, its name is not valid UTF-8");
            continue;
        };
        let contents = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ModularFile::Json(read_json_file(&path).await?),
            Some("xml") => ModularFile::Xml(fs::read_to_string(&path).await.map_err(|e| {
                CliError::new(ErrorKind::LocalIo, format!("failed to read {path:?}: {e}"))
            })?),
            _ => {
                info!("skipping {path:?}, not part of a modular project");
                continue;
            }
        };
        modular_project.insert(name, contents);
    }
    Ok(modular_project)
}

pub async fn write_modular_project(
    project_path: &Path,
    modular_project: &ModularProject,
) -> Result<(), CliError> {
    fs::create_dir_all(project_path).await.map_err(|e| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("failed to create directory {project_path:?}: {e}"),
        )
    })?;
    for (name, file) in modular_project {
        let contents = match file {
            ModularFile::Json(value) => dump_json(value)?,
            ModularFile::Xml(text) => text.clone().into_bytes(),
        };
        let path = project_path.join(name);
        fs::write(&path, contents).await.map_err(|e| {
            CliError::new(ErrorKind::LocalIo, format!("failed to write {path:?}: {e}"))
        })?;
    }
    Ok(())
}

/// Pretty prints with a 4 space indent.
pub fn dump_json(value: &Value) -> Result<Vec<u8>, CliError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer).map_err(|e| {
        CliError::new(ErrorKind::LocalIo, format!("failed to serialize project: {e}"))
    })?;
    out.push(b'\n');
    Ok(out)
}

async fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let bytes = fs::read(path).await.map_err(|e| {
        CliError::new(ErrorKind::LocalIo, format!("failed to read {path:?}: {e}"))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("{path:?} is not valid JSON: {e}"),
        )
    })
}

fn inner_project_mut(project: &mut Value) -> Result<&mut Value, CliError> {
    project.pointer_mut("/data/project").ok_or_else(|| {
        CliError::new(
            ErrorKind::LocalIo,
            "the project document has no data.project member",
        )
    })
}

// Top level children are screens, except navigators, whose children are.
fn screens_mut(iproject: &mut Value) -> Vec<&mut Value> {
    let mut screens = Vec::new();
    let Some(children) = iproject
        .pointer_mut("/components/children")
        .and_then(Value::as_array_mut)
    else {
        return screens;
    };
    for child in children.iter_mut() {
        if is_navigator(child) {
            if let Some(nested) = child.get_mut("children").and_then(Value::as_array_mut) {
                screens.extend(nested.iter_mut());
            }
        } else {
            screens.push(child);
        }
    }
    screens
}

// Screen stubs in meta.json carry only an id, so no type.
fn is_navigator(child: &Value) -> bool {
    child
        .get("type")
        .and_then(Value::as_str)
        .map(|t| t.contains("Navigator"))
        .unwrap_or(false)
}

// Keys from the screen file win and keep their order.
fn merge_screen(stub: &mut Value, data: Value) {
    let stub_fields = match std::mem::take(stub) {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    let mut merged = data;
    if let Value::Object(fields) = &mut merged {
        for (key, value) in stub_fields {
            fields.entry(key).or_insert(value);
        }
    }
    *stub = merged;
}

fn ensure_object<'a>(
    parent: &'a mut Value,
    key: &str,
) -> Result<&'a mut Map<String, Value>, CliError> {
    let object = parent
        .as_object_mut()
        .ok_or_else(|| CliError::new(ErrorKind::LocalIo, "data.project is not an object"))?;
    object
        .entry(key.to_string())
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| {
            CliError::new(
                ErrorKind::LocalIo,
                format!("data.project.{key} is not an object"),
            )
        })
}

// `<name>.<id>.json` -> `<id>`
fn screen_id_from_file_name(name: &str) -> &str {
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
    stem.rsplit('.').next().unwrap_or(stem)
}

fn value_to_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
