use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use home::home_dir;
use log::debug;

use tokio::fs::{self, File};

use crate::{
    config::{Credentials, CREDENTIALS_TOKEN_KEY, ENV_VAR_NAME_THUNKD_CONFIG_DIR},
    error::{CliError, ErrorKind},
};

use super::messages::{failed_to_get_profile, missing_credentials_file};

pub static CREDENTIALS_DEFAULT_PROFILE_NAME: &str = "default";

pub static BASE_DIR: &str = ".thunkd";
pub static CREDENTIALS_FILE_PATH: &str = "credentials";

// Validate the credentials file exists; if it doesn't, make it
pub async fn create_necessary_files() -> Result<(), CliError> {
    let config_dir = get_thunkd_config_dir()?;
    fs::create_dir_all(&config_dir).await.map_err(|e| {
        CliError::new(
            ErrorKind::LocalIo,
            format!("failed to create directory {config_dir:?}: {e}"),
        )
    })?;

    validate_exist_or_create_ini(&get_credentials_file_path()?).await
}

async fn validate_exist_or_create_ini(path: &Path) -> Result<(), CliError> {
    if !path.exists() {
        create_file(path).await?;
        set_file_read_write(path).await?;
    }
    Ok(())
}

async fn create_file(path: &Path) -> Result<(), CliError> {
    match File::create(path).await {
        Ok(_) => {
            debug!("created file {:?}", path);
            Ok(())
        }
        Err(e) => Err(CliError::new(
            ErrorKind::LocalIo,
            format!("failed to create file {path:?}, error: {e}"),
        )),
    }
}

// Read ini files

/// Loads the credentials file without creating it. A missing file means
/// nothing was ever `set`.
pub async fn read_credentials_ini() -> Result<Ini, CliError> {
    let path = get_credentials_file_path()?;
    if !fs::try_exists(&path).await.unwrap_or(false) {
        return Err(CliError::new(
            ErrorKind::Configuration,
            missing_credentials_file(&path),
        ));
    }
    read_ini_with_custom_default(
        &path,
        Some(CREDENTIALS_DEFAULT_PROFILE_NAME),
        ErrorKind::Configuration,
    )
}

/// Loads the credentials file, creating it first when needed.
pub async fn read_or_create_credentials_ini() -> Result<Ini, CliError> {
    create_necessary_files().await?;
    read_ini_with_custom_default(
        &get_credentials_file_path()?,
        Some(CREDENTIALS_DEFAULT_PROFILE_NAME),
        ErrorKind::LocalIo,
    )
}

fn read_ini_with_custom_default(
    path: &Path,
    default_section_overide: Option<&str>,
    error_kind: ErrorKind,
) -> Result<Ini, CliError> {
    // Profile names are case sensitive.
    let mut config = Ini::new_cs();
    // Tokens may contain `#` and `;`, so nothing in the file is a comment.
    config.set_comment_symbols(&[]);
    config.set_inline_comment_symbols(Some(&[] as &[char]));
    if let Some(new_default) = default_section_overide {
        config.set_default_section(new_default)
    }
    match config.load(path) {
        Ok(_) => Ok(config),
        Err(e) => Err(CliError::new(
            error_kind,
            format!("failed to read file {path:?}: {e}"),
        )),
    }
}

// Get file paths
pub fn get_credentials_file_path() -> Result<PathBuf, CliError> {
    Ok(get_thunkd_config_dir()?.join(CREDENTIALS_FILE_PATH))
}

pub fn get_thunkd_config_dir() -> Result<PathBuf, CliError> {
    if let Ok(val) = std::env::var(ENV_VAR_NAME_THUNKD_CONFIG_DIR) {
        return Ok(PathBuf::from(val));
    }
    // If the env var isn't set we default to ~/.thunkd
    let home = home_dir()
        .ok_or_else(|| CliError::new(ErrorKind::Configuration, "could not find home dir"))?;
    Ok(home.join(BASE_DIR))
}

#[cfg(unix)]
async fn set_file_read_write(path: &Path) -> Result<(), CliError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = match fs::metadata(path).await {
        Ok(p) => p,
        Err(e) => {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!("failed to get file permissions {e}"),
            ))
        }
    }
    .permissions();
    perms.set_mode(0o600);
    match fs::set_permissions(path, perms).await {
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::new(
            ErrorKind::LocalIo,
            format!("failed to set file permissions {e}"),
        )),
    }
}

#[cfg(windows)]
async fn set_file_read_write(path: &Path) -> Result<(), CliError> {
    let mut perms = match fs::metadata(path).await {
        Ok(p) => p,
        Err(e) => {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!("failed to get file permissions {e}"),
            ))
        }
    }
    .permissions();
    perms.set_readonly(false);
    match fs::set_permissions(path, perms).await {
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::new(
            ErrorKind::LocalIo,
            format!("failed to set file permissions {e}"),
        )),
    }
}

pub trait IniHelpers {
    fn get_credentials_for_profile(&self, profile: &str) -> Result<Credentials, CliError>;

    fn set_credentials_for_profile(&mut self, profile: &str, credentials: &Credentials);

    fn write_self_to_the_credentials_file(&self) -> Result<(), CliError>;

    fn get_ini_value_required(&self, profile: &str, key: &str) -> Result<String, CliError>;
}

impl IniHelpers for Ini {
    fn get_credentials_for_profile(&self, profile: &str) -> Result<Credentials, CliError> {
        let token = self.get_ini_value_required(profile, CREDENTIALS_TOKEN_KEY)?;
        Ok(Credentials::new(decode_ini_value(&token)))
    }

    fn set_credentials_for_profile(&mut self, profile: &str, credentials: &Credentials) {
        self.set(
            profile,
            CREDENTIALS_TOKEN_KEY,
            Some(encode_ini_value(&credentials.token)),
        );
    }

    fn write_self_to_the_credentials_file(&self) -> Result<(), CliError> {
        let file_path = get_credentials_file_path()?;
        self.write(&file_path).map_err(|e| {
            log::debug!("writing {file_path:?} failed: {e:?}");
            CliError::new(
                ErrorKind::LocalIo,
                format!("failed to write to credentials file {file_path:?}: {e}"),
            )
        })
    }

    fn get_ini_value_required(&self, profile: &str, key: &str) -> Result<String, CliError> {
        self.get(profile, key)
            .filter(|value| !decode_ini_value(value).is_empty())
            .ok_or_else(|| {
                CliError::new(ErrorKind::Configuration, failed_to_get_profile(profile))
            })
    }
}

// INI values lose surrounding whitespace, so stored values are written as
// JSON string literals. Unquoted values from hand-edited files are kept as is.
fn encode_ini_value(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn decode_ini_value(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        if let Ok(value) = serde_json::from_str::<String>(raw) {
            return value;
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::{decode_ini_value, encode_ini_value};

    #[test]
    fn stored_values_keep_every_character() {
        for token in ["abc#def", "abc;def", "  padded  ", "\"quoted\"", "x=y==", ""] {
            assert_eq!(token, decode_ini_value(&encode_ini_value(token)));
        }
    }

    #[test]
    fn hand_written_values_are_read_as_is() {
        assert_eq!("plain-token", decode_ini_value("plain-token"));
        assert_eq!("\"", decode_ini_value("\""));
    }
}
