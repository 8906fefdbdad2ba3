use serde_json::Value;

// Fields that belong to the account or the current session rather than to
// the project itself, relative to the document root.
const DIRTY_PATHS: &[&[&str]] = &[
    &["data", "user"],
    &["data", "project", "id"],
    &["data", "project", "blocklyStringLength"],
    &["data", "project", "componentStringLength"],
    &["data", "project", "createdAt"],
    &["data", "project", "email"],
    &["data", "project", "hash"],
    &["data", "project", "isArchiveProjectFileUsed"],
    &["data", "project", "isHiddenFromPublicGallery"],
    &["data", "project", "isLegacy"],
    &["data", "project", "isOwner"],
    &["data", "project", "isPublic"],
    &["data", "project", "isQRCodeScanned"],
    &["data", "project", "isLiveTesting"],
    &["data", "project", "settings", "packageName"],
    &["data", "project", "projectSettings", "packageName"],
    &["data", "project", "storageSize"],
    &["data", "project", "webAppSettings"],
    &["data", "project", "webCompanionSettings"],
    &["data", "project", "frontendProperties"],
    &["data", "project", "appId"],
    &["data", "project", "readOnly"],
    &["data", "project", "shares"],
    &["data", "project", "versions"],
    &["data", "project", "projectSnapshotsMetaData"],
    &["data", "project", "projectSnapshotParentId"],
    &["data", "project", "projectSnapshotParent"],
    &["data", "project", "updatedAt"],
    &["data", "project", "username"],
];

// Generated from the blocks on every save, per screen.
const DIRTY_BLOCKLY_FIELDS: &[&str] = &["code", "appVariableDefCode"];

/// Strips volatile and account specific fields from a pulled project, so
/// that two pulls of an unchanged project produce the same file.
pub fn to_clean_project(project: &mut Value) {
    for path in DIRTY_PATHS {
        delete_path_if_exists(project, path);
    }

    if let Some(blockly) = project
        .pointer_mut("/data/project/blockly")
        .and_then(Value::as_object_mut)
    {
        for screen_blocks in blockly.values_mut() {
            for field in DIRTY_BLOCKLY_FIELDS {
                delete_path_if_exists(screen_blocks, &[*field]);
            }
        }
    }
}

fn delete_path_if_exists(value: &mut Value, path: &[&str]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = value;
    for key in parents {
        match current.get_mut(*key) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(object) = current.as_object_mut() {
        // `shift_remove` keeps the order of the remaining keys.
        object.shift_remove(*last);
    }
}
