use std::path::Path;

pub fn failed_to_get_profile(profile: &str) -> String {
    format!("failed to get credentials for profile {profile}, please run 'thunkd set thunk_token <value> --profile {profile}'")
}

pub fn missing_credentials_file(path: &Path) -> String {
    format!("no credentials found at {path:?}, please run 'thunkd set thunk_token <value>'")
}
