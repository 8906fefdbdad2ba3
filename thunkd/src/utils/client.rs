use std::{future::Future, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{
    header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT},
    Client, Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::{
    config::{resolve_endpoint, Credentials, CREDENTIALS_TOKEN_KEY},
    error::{CliError, ErrorKind},
};

const PROJECT_QUERY: &str = include_str!("../commands/project/project_query.graphql");
const GRAPHQL_PATH: &str = "/graphql";
const UPDATE_CONTENT_PATH: &str = "/project/updatecontent";

// How much of an unexpected response body ends up in an error message.
const BODY_EXCERPT_LEN: usize = 200;

const AUTHENTICATION_ERROR_CODES: &[&str] = &["UNAUTHENTICATED", "FORBIDDEN"];

const AUTHENTICATION_ERROR_PHRASES: &[&str] = &[
    "authenticat",
    "unauthorized",
    "logged in",
    "log in",
    "login",
    "invalid token",
    "expired token",
    "token expired",
    "token has expired",
];

/// Talks to the project service on behalf of one session token.
pub struct ProjectClient {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectQuery<'a> {
    operation_name: &'a str,
    variables: ProjectQueryVariables<'a>,
    query: &'a str,
}

#[derive(Serialize)]
struct ProjectQueryVariables<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct UpdateContentRequest<'a> {
    #[serde(rename = "projectOrModuleId")]
    project_or_module_id: &'a str,
    #[serde(rename = "checkHash")]
    check_hash: bool,
    projectnewcontent: &'a RawValue,
}

#[derive(Deserialize, Debug)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize, Debug)]
struct GraphQlData {
    project: Option<Box<RawValue>>,
}

#[derive(Deserialize, Debug)]
struct GraphQlError {
    #[serde(default)]
    message: String,
    extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Deserialize, Debug)]
struct GraphQlErrorExtensions {
    code: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UpdateContentResponse {
    hash: Option<serde_json::Value>,
}

impl ProjectClient {
    pub fn new(credentials: &Credentials, endpoint: Option<String>) -> Result<Self, CliError> {
        let cookie = HeaderValue::from_str(&format!(
            "{CREDENTIALS_TOKEN_KEY}={}",
            credentials.token
        ))
        .map_err(|_| {
            CliError::new(
                ErrorKind::Configuration,
                format!("the stored {CREDENTIALS_TOKEN_KEY} cannot be sent as a cookie"),
            )
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("thunkd/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                CliError::new(
                    ErrorKind::Network,
                    format!("failed to build http client: {e}"),
                )
            })?;

        Ok(ProjectClient {
            client,
            endpoint: resolve_endpoint(endpoint),
        })
    }

    /// Fetches the project document and returns the response body untouched.
    pub async fn fetch_project(&self, project_id: &str) -> Result<Vec<u8>, CliError> {
        let url = format!("{}{}", self.endpoint, GRAPHQL_PATH);
        let body = ProjectQuery {
            operation_name: "Project",
            variables: ProjectQueryVariables { id: project_id },
            query: PROJECT_QUERY,
        };

        let response = interact_with_service(
            &format!("pulling project {project_id}..."),
            self.client.post(url).json(&body).send(),
        )
        .await?;
        let body = read_body(response).await?;
        check_project_response(project_id, &body)?;
        Ok(body)
    }

    /// Replaces the stored content of a project. Returns the hash the service
    /// assigned to the new content.
    pub async fn update_project(
        &self,
        project_id: &str,
        content: &RawValue,
    ) -> Result<String, CliError> {
        let url = format!("{}{}", self.endpoint, UPDATE_CONTENT_PATH);
        let body = UpdateContentRequest {
            project_or_module_id: project_id,
            check_hash: false,
            projectnewcontent: content,
        };

        let response = interact_with_service(
            &format!("pushing project {project_id}..."),
            self.client.post(url).json(&body).send(),
        )
        .await?;
        let body = read_body(response).await?;
        check_update_response(project_id, &body)
    }
}

pub async fn interact_with_service<FutureT>(
    debug_note: &str,
    interaction: FutureT,
) -> Result<Response, CliError>
where
    FutureT: Future<Output = Result<Response, reqwest::Error>>,
{
    log::debug!("{}", debug_note);

    // Hidden automatically when stderr is not a terminal.
    let spinner = ProgressBar::new_spinner().with_message(debug_note.to_string());
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").expect("invalid template"));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = interaction.await;
    spinner.finish_and_clear();

    let response = result.map_err(Into::<CliError>::into)?;
    log::debug!("response status {}", response.status());
    Ok(response)
}

async fn read_body(response: Response) -> Result<Vec<u8>, CliError> {
    let status = response.status();
    let body = response.bytes().await.map_err(Into::<CliError>::into)?;
    check_status(status, &body)?;
    Ok(body.to_vec())
}

fn check_status(status: StatusCode, body: &[u8]) -> Result<(), CliError> {
    if status.is_success() {
        return Ok(());
    }
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Authentication,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        _ => ErrorKind::Remote,
    };
    let msg = match kind {
        ErrorKind::Authentication => format!(
            "the service rejected the {CREDENTIALS_TOKEN_KEY} ({status}); it might have expired, set it again"
        ),
        _ => format!("the service answered {status}: {}", excerpt(body)),
    };
    Err(CliError::new(kind, msg))
}

fn check_project_response(project_id: &str, body: &[u8]) -> Result<(), CliError> {
    let response: GraphQlResponse = serde_json::from_slice(body).map_err(|e| {
        CliError::new(
            ErrorKind::Network,
            format!("malformed response from the service ({e}): {}", excerpt(body)),
        )
    })?;

    if !response.errors.is_empty() {
        log::debug!("graphql errors: {:?}", response.errors);
        if response.errors.iter().any(GraphQlError::is_authentication) {
            return Err(CliError::new(
                ErrorKind::Authentication,
                format!("the service rejected the {CREDENTIALS_TOKEN_KEY}; it might have expired, set it again"),
            ));
        }
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(CliError::new(
            ErrorKind::NotFound,
            format!(
                "failed to pull project {project_id}, check that the project id is valid: {}",
                messages.join("; ")
            ),
        ));
    }

    // A `null` project deserializes to `None`.
    if response.data.and_then(|data| data.project).is_none() {
        return Err(CliError::new(
            ErrorKind::NotFound,
            format!("project {project_id} does not exist or is not accessible with this token"),
        ));
    }
    Ok(())
}

fn check_update_response(project_id: &str, body: &[u8]) -> Result<String, CliError> {
    let hash = serde_json::from_slice::<UpdateContentResponse>(body)
        .ok()
        .and_then(|response| response.hash)
        .filter(|hash| !hash.is_null());
    match hash {
        Some(serde_json::Value::String(hash)) => Ok(hash),
        Some(other) => Ok(other.to_string()),
        None => Err(CliError::new(
            ErrorKind::Remote,
            format!(
                "the service did not accept project {project_id}; check the project id and the {CREDENTIALS_TOKEN_KEY}: {}",
                excerpt(body)
            ),
        )),
    }
}

impl GraphQlError {
    fn is_authentication(&self) -> bool {
        // A code, when present, decides on its own.
        if let Some(code) = self.extensions.as_ref().and_then(|e| e.code.as_deref()) {
            return AUTHENTICATION_ERROR_CODES.contains(&code);
        }
        let message = self.message.to_lowercase();
        AUTHENTICATION_ERROR_PHRASES
            .iter()
            .any(|phrase| message.contains(phrase))
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{check_project_response, check_status, check_update_response, excerpt};
    use crate::error::ErrorKind;

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(check_status(StatusCode::OK, b"").is_ok());
        let kind = |status| check_status(status, b"nope").err().map(|e| e.kind());
        assert_eq!(Some(ErrorKind::Authentication), kind(StatusCode::UNAUTHORIZED));
        assert_eq!(Some(ErrorKind::Authentication), kind(StatusCode::FORBIDDEN));
        assert_eq!(Some(ErrorKind::NotFound), kind(StatusCode::NOT_FOUND));
        assert_eq!(
            Some(ErrorKind::Remote),
            kind(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn project_response_with_project_is_accepted() {
        let body = br#"{"data":{"project":{"id":"p1","components":{}},"user":{"id":"u"}}}"#;
        assert!(check_project_response("p1", body).is_ok());
    }

    #[test]
    fn null_project_is_not_found() {
        let body = br#"{"data":{"project":null}}"#;
        let err = check_project_response("p1", body).err().expect("should fail");
        assert_eq!(ErrorKind::NotFound, err.kind());
    }

    #[test]
    fn unauthenticated_graphql_error_is_authentication() {
        let body = br#"{"errors":[{"message":"You must be logged in","extensions":{"code":"UNAUTHENTICATED"}}],"data":null}"#;
        let err = check_project_response("p1", body).err().expect("should fail");
        assert_eq!(ErrorKind::Authentication, err.kind());
    }

    #[test]
    fn login_messages_without_a_code_are_authentication() {
        for message in ["Login required", "Token has expired", "Please log in again"] {
            let body = format!(r#"{{"errors":[{{"message":"{message}"}}],"data":null}}"#);
            let err = check_project_response("p1", body.as_bytes())
                .err()
                .expect("should fail");
            assert_eq!(ErrorKind::Authentication, err.kind(), "{message}");
        }
    }

    #[test]
    fn token_in_an_unrelated_message_is_not_authentication() {
        let body = br#"{"errors":[{"message":"Syntax Error: Unexpected token <EOF>"}],"data":null}"#;
        let err = check_project_response("p1", body).err().expect("should fail");
        assert_eq!(ErrorKind::NotFound, err.kind());
    }

    #[test]
    fn error_code_outranks_the_message() {
        let body = br#"{"errors":[{"message":"login lookup failed","extensions":{"code":"BAD_USER_INPUT"}}],"data":null}"#;
        let err = check_project_response("p1", body).err().expect("should fail");
        assert_eq!(ErrorKind::NotFound, err.kind());
    }

    #[test]
    fn other_graphql_error_is_not_found() {
        let body = br#"{"errors":[{"message":"Cast to ObjectId failed"}],"data":{"project":null}}"#;
        let err = check_project_response("p1", body).err().expect("should fail");
        assert_eq!(ErrorKind::NotFound, err.kind());
        assert!(err.msg.contains("Cast to ObjectId failed"));
    }

    #[test]
    fn html_instead_of_json_is_a_network_error() {
        let err = check_project_response("p1", b"<html>bad gateway</html>")
            .err()
            .expect("should fail");
        assert_eq!(ErrorKind::Network, err.kind());
    }

    #[test]
    fn update_response_needs_a_hash() {
        assert_eq!(
            "abc",
            check_update_response("p1", br#"{"hash":"abc"}"#).ok().unwrap()
        );
        let err = check_update_response("p1", br#"{"message":"nope"}"#)
            .err()
            .expect("should fail");
        assert_eq!(ErrorKind::Remote, err.kind());
    }

    #[test]
    fn excerpt_is_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(203, excerpt(long.as_bytes()).len());
        assert_eq!("short", excerpt(b"  short \n"));
    }
}
