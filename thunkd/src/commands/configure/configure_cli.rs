use log::debug;
use thunkd_cli_opts::Setting;

use crate::{
    config::Credentials,
    error::CliError,
    utils::{console::console_info, file::get_credentials_file_path, user::update_credentials},
};

pub async fn set_setting(profile: &str, setting: Setting, value: String) -> Result<(), CliError> {
    match setting {
        Setting::ThunkToken => {
            update_credentials(profile, &Credentials::new(value)).await?;
            debug!("credentials file: {:?}", get_credentials_file_path()?);
            console_info!("Stored {} for profile '{}'", setting.key(), profile);
        }
    }
    Ok(())
}

