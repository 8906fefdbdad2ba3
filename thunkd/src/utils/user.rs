use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use log::debug;

use crate::config::{Credentials, CREDENTIALS_TOKEN_KEY};

use crate::error::{CliError, ErrorKind};

use super::file::{
    read_credentials_ini, read_or_create_credentials_ini, IniHelpers,
    CREDENTIALS_DEFAULT_PROFILE_NAME,
};
use super::messages::failed_to_get_profile;

pub async fn update_credentials(profile: &str, credentials: &Credentials) -> Result<(), CliError> {
    let mut credentials_ini = read_or_create_credentials_ini().await?;
    credentials_ini.set_credentials_for_profile(profile, credentials);
    credentials_ini.write_self_to_the_credentials_file()?;
    debug!("stored {CREDENTIALS_TOKEN_KEY} for profile {profile}");
    Ok(())
}

pub async fn get_credentials_for_profile(profile: &str) -> Result<Credentials, CliError> {
    // Order of credentials lookup
    // 1. the user supplied profile
    // 2. the default profile
    let credentials_ini = read_credentials_ini().await?;
    if let Ok(creds) = credentials_ini.get_credentials_for_profile(profile) {
        return Ok(creds);
    }

    if profile != CREDENTIALS_DEFAULT_PROFILE_NAME {
        if let Ok(creds) =
            credentials_ini.get_credentials_for_profile(CREDENTIALS_DEFAULT_PROFILE_NAME)
        {
            log::debug!(
                "Failed to find credentials for profile {profile}, falling back to default credentials"
            );
            return Ok(creds);
        }
    }

    Err(CliError::new(
        ErrorKind::Configuration,
        failed_to_get_profile(profile),
    ))
}

pub async fn prompt_user_for_input(prompt: &str, default_value: &str) -> Result<String, CliError> {
    let mut stdout = io::stdout();

    let formatted_prompt = if default_value.is_empty() {
        format!("{prompt}: ")
    } else {
        format!("{prompt} [{default_value}]: ")
    };

    match stdout.write(formatted_prompt.as_bytes()).await {
        Ok(_) => debug!("wrote prompt '{}' to stdout", formatted_prompt),
        Err(e) => {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!("failed to write prompt to stdout: {e}"),
            ))
        }
    };
    match stdout.flush().await {
        Ok(_) => debug!("flushed stdout"),
        Err(e) => {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!("failed to flush stdout: {e}"),
            ))
        }
    };
    let stdin = io::stdin();
    let mut buffer = String::new();
    let mut reader = BufReader::new(stdin);
    match reader.read_line(&mut buffer).await {
        Ok(_) => debug!("read line from stdin"),
        Err(e) => {
            return Err(CliError::new(
                ErrorKind::LocalIo,
                format!("failed to read line from stdin: {e}"),
            ))
        }
    };

    let input = buffer.as_str().trim().to_string();
    if input.is_empty() {
        return Ok(default_value.to_string());
    }
    Ok(input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use tempdir::TempDir;
    use uuid::Uuid;

    use crate::{config::Credentials, error::ErrorKind};

    use super::{get_credentials_for_profile, update_credentials};

    // Every test points THUNKD_CONFIG_DIR somewhere new, so they all live in
    // one test function to keep them from racing on the env var.
    fn initialize_test_setup() -> TempDir {
        let test_config_dir = TempDir::new(&format!("thunkd-{}", Uuid::new_v4()))
            .expect("Unable to create temp dir");
        let test_config_dir_path = fs::canonicalize(test_config_dir.path())
            .expect("Unable to canonicalize path")
            .into_os_string()
            .into_string()
            .expect("Unable to convert canonical path to string");
        std::env::set_var("THUNKD_CONFIG_DIR", test_config_dir_path);
        test_config_dir
    }

    #[tokio::test]
    async fn set_and_read_back_credentials() {
        let _dir = initialize_test_setup();
        match get_credentials_for_profile("default").await {
            Ok(_) => panic!("nothing was set yet"),
            Err(e) => assert_eq!(ErrorKind::Configuration, e.kind()),
        }

        update_credentials("default", &Credentials::new("first-token"))
            .await
            .expect("Couldn't store credentials");
        update_credentials("default", &Credentials::new("second-token"))
            .await
            .expect("Couldn't store credentials");
        update_credentials("work", &Credentials::new("work-token"))
            .await
            .expect("Couldn't store credentials");

        match get_credentials_for_profile("default").await {
            Ok(creds) => assert_eq!(creds.token, "second-token"),
            Err(e) => panic!("Whoa there! We failed to get any credentials, {e:?}"),
        }
        match get_credentials_for_profile("work").await {
            Ok(creds) => assert_eq!(creds.token, "work-token"),
            Err(e) => panic!("Whoa there! We failed to get any credentials, {e:?}"),
        }
        match get_credentials_for_profile("unknown-profile-falls-back").await {
            Ok(creds) => assert_eq!(creds.token, "second-token"),
            Err(e) => panic!("Whoa there! We failed to get any credentials, {e:?}"),
        }

        for token in ["abc#def", "abc;def", "  padded token ", "x=y==", "[not-a-section]"] {
            update_credentials("default", &Credentials::new(token))
                .await
                .expect("Couldn't store credentials");
            match get_credentials_for_profile("default").await {
                Ok(creds) => assert_eq!(creds.token, token),
                Err(e) => panic!("Whoa there! We failed to get any credentials, {e:?}"),
            }
        }

        // An empty token is stored, but there is nothing to send.
        update_credentials("work", &Credentials::new(""))
            .await
            .expect("Couldn't store credentials");
        match get_credentials_for_profile("work").await {
            Ok(creds) => assert_eq!(creds.token, "[not-a-section]"),
            Err(e) => panic!("Whoa there! We failed to get any credentials, {e:?}"),
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let path = crate::utils::file::get_credentials_file_path().unwrap();
            let mode = fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(0o600, mode & 0o777);
        }
    }
}
