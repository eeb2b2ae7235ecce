use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, IntoUrl, Method};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use url::Url;

use crate::api::endpoints::BaseUriError;
use crate::config::Config;
use crate::types::{
    AuditDeployRequest, Branch, Commit, CreateDeployRequest, CreateEnvironmentRequest,
    CreateProjectRequest, CreateServerRequest, CreateUserRequest, Deploy, Environment,
    LoginRequest, LoginResponse, Options, Page, Pagination, Project, RefreshTokenRequest, Server,
    SetAuthorizedRequest, Tag, UpdateEnvironmentRequest, UpdateProjectRequest,
    UpdateServerRequest, UpdateUserRequest, User, UserInfo, VersionResponse,
};
use crate::USER_AGENT;

pub mod endpoints;

type Result<T> = std::result::Result<T, YemaApiError>;

pub struct YemaApi {
    config: Config,
    client: Client,
    request_timeout: Option<u64>,
}

/// Yema API error type
#[derive(ThisError, Debug)]
pub enum YemaApiError {
    #[error("Error invoking REST endpoint")]
    ReqwestError {
        #[from]
        source: reqwest::Error,
    },
    #[error(transparent)]
    BaseUri(#[from] BaseUriError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl YemaApiError {
    /// Application error code of the failed call, if the server replied with
    /// one.
    pub fn code(&self) -> Option<i64> {
        match self {
            YemaApiError::Response(ResponseError { code, .. }) => Some(*code),
            _ => None,
        }
    }
}

/// Non-successful request response.
///
/// The console replies `200 OK` with a non-zero envelope code for application
/// failures, so `code` is the envelope code when one was present and the HTTP
/// status otherwise.
#[derive(ThisError, Debug)]
#[error("API request error ({code}): {message}")]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    pub mode: ErrorMode,
}

/// How a failed call should be surfaced to the end user.
///
/// A display policy forwarded to UI layers on [`ResponseError`], not an
/// error-handling contract. The transport itself only varies the log level:
/// suppressed failures are logged at debug instead of error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Blocking dialog.
    Modal,
    /// Transient notification.
    #[default]
    Message,
    /// No user-visible alert.
    None,
}

/// Response envelope shared by every REST route.
#[derive(Deserialize)]
struct Envelope {
    code: i64,
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

impl YemaApi {
    /// Create a console API client from the given configuration and request
    /// timeout. Credentials obtained later through [`Self::login`] or
    /// [`Self::refresh_token`] update the held configuration; it is the duty
    /// of the calling code to save any changes.
    pub fn new(config: Config, request_timeout: Option<u64>) -> Result<Self> {
        let client = build_client(&config, request_timeout)?;
        Ok(Self { config, client, request_timeout })
    }

    async fn get<T: DeserializeOwned, U: IntoUrl>(&self, path: U) -> Result<T> {
        self.send_request(Method::GET, path, None::<()>, ErrorMode::default()).await
    }

    async fn delete<T: DeserializeOwned, U: IntoUrl>(&self, path: U) -> Result<T> {
        self.send_request(Method::DELETE, path, None::<()>, ErrorMode::default()).await
    }

    async fn post<T: DeserializeOwned, S: Serialize, U: IntoUrl>(
        &self,
        path: U,
        s: S,
    ) -> Result<T> {
        self.send_request(Method::POST, path, Some(s), ErrorMode::default()).await
    }

    async fn put<T: DeserializeOwned, S: Serialize, U: IntoUrl>(&self, path: U, s: S) -> Result<T> {
        self.send_request(Method::PUT, path, Some(s), ErrorMode::default()).await
    }

    async fn send_request<T: DeserializeOwned, B: Serialize, U: IntoUrl>(
        &self,
        method: Method,
        path: U,
        body: Option<B>,
        mode: ErrorMode,
    ) -> Result<T> {
        let result = self.send_request_raw(method, path, body, mode).await?;
        serde_json::from_value::<T>(result).map_err(|e| YemaApiError::Other(e.into()))
    }

    /// Send a request and unwrap the `{code, message, result}` envelope.
    async fn send_request_raw<B: Serialize, U: IntoUrl>(
        &self,
        method: Method,
        path: U,
        body: Option<B>,
        mode: ErrorMode,
    ) -> Result<serde_json::Value> {
        let mut request = self.client.request(method, path);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status_code = response.status();
        let body = response.text().await?;

        if !status_code.is_success() {
            let err = ResponseError { code: i64::from(status_code.as_u16()), message: body, mode };
            log_response_error(&err);
            return Err(err.into());
        }

        let envelope =
            serde_json::from_str::<Envelope>(&body).map_err(|e| YemaApiError::Other(e.into()))?;
        if envelope.code != 0 {
            let err = ResponseError { code: envelope.code, message: envelope.message, mode };
            log_response_error(&err);
            return Err(err.into());
        }

        Ok(envelope.result)
    }

    /// Get the console version.
    pub async fn version(&self) -> Result<String> {
        Ok(self
            .get::<VersionResponse, _>(endpoints::version(&self.config.connection.uri)?)
            .await?
            .version)
    }

    /// Log in with account credentials.
    ///
    /// The returned token pair is stored on the held configuration and
    /// applied to subsequent requests; it is the duty of the calling code to
    /// save any changes.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        remember: bool,
        mode: ErrorMode,
    ) -> Result<LoginResponse> {
        let url = endpoints::login(&self.config.connection.uri)?;
        let body = LoginRequest { email, password, remember };
        let response: LoginResponse =
            self.send_request(Method::POST, url, Some(body), mode).await?;
        self.store_tokens(&response)?;
        Ok(response)
    }

    /// Exchange the stored refresh token for a new token pair.
    pub async fn refresh_token(&mut self) -> Result<LoginResponse> {
        let refresh_token = self
            .config
            .auth_info
            .refresh_token()
            .ok_or_else(|| anyhow!("no refresh token available"))?
            .to_owned();

        let url = endpoints::refresh_token(&self.config.connection.uri)?;
        let body = RefreshTokenRequest { refresh_token: &refresh_token };
        let response: LoginResponse = self.post(url, body).await?;
        self.store_tokens(&response)?;
        Ok(response)
    }

    /// Log out the current session.
    pub async fn logout(&self) -> Result<()> {
        let url = endpoints::logout(&self.config.connection.uri)?;
        self.send_request_raw(Method::POST, url, None::<()>, ErrorMode::default()).await?;
        Ok(())
    }

    /// Get information about the authenticated user.
    pub async fn user_info(&self) -> Result<UserInfo> {
        let url = endpoints::user_info(&self.config.connection.uri)?;
        self.send_request(Method::GET, url, None::<()>, ErrorMode::None).await
    }

    /// Get a page of user accounts.
    ///
    /// The keyword filter does not require an exact match, it is equivalent
    /// to filtering with [`str::contains`] on the username.
    pub async fn get_users(
        &self,
        pagination: Pagination,
        keyword: Option<&str>,
    ) -> Result<Page<User>> {
        let mut url = endpoints::users(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        if let Some(keyword) = keyword {
            url.query_pairs_mut().append_pair("keyword", keyword);
        }
        self.get(url).await
    }

    /// Create a new user account.
    pub async fn create_user(&self, user: &CreateUserRequest) -> Result<()> {
        let url = endpoints::users(&self.config.connection.uri)?;
        let _: IgnoredAny = self.post(url, user).await?;
        Ok(())
    }

    /// Update an existing user account.
    pub async fn update_user(&self, user: &UpdateUserRequest) -> Result<()> {
        let url = endpoints::users(&self.config.connection.uri)?;
        let _: IgnoredAny = self.put(url, user).await?;
        Ok(())
    }

    /// Delete a user account.
    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        let url = endpoints::user(&self.config.connection.uri, user_id)?;
        let _: IgnoredAny = self.delete(url).await?;
        Ok(())
    }

    /// Get users as selector options.
    pub async fn user_options(&self, pagination: Pagination) -> Result<Options> {
        let mut url = endpoints::user_options(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        self.get(url).await
    }

    /// Get a page of servers.
    pub async fn get_servers(&self, pagination: Pagination) -> Result<Page<Server>> {
        let mut url = endpoints::servers(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        self.get(url).await
    }

    /// Register a new server.
    pub async fn create_server(&self, server: &CreateServerRequest) -> Result<()> {
        let url = endpoints::servers(&self.config.connection.uri)?;
        let _: IgnoredAny = self.post(url, server).await?;
        Ok(())
    }

    /// Update an existing server.
    pub async fn update_server(&self, server: &UpdateServerRequest) -> Result<()> {
        let url = endpoints::servers(&self.config.connection.uri)?;
        let _: IgnoredAny = self.put(url, server).await?;
        Ok(())
    }

    /// Delete a server.
    pub async fn delete_server(&self, server_id: i64) -> Result<()> {
        let url = endpoints::server(&self.config.connection.uri, server_id)?;
        let _: IgnoredAny = self.delete(url).await?;
        Ok(())
    }

    /// Probe the SSH connection of a server.
    ///
    /// Failed probes are expected while a server is being set up, so they
    /// are never surfaced to the user.
    pub async fn check_server(&self, server_id: i64) -> Result<()> {
        let url = endpoints::server_check(&self.config.connection.uri, server_id)?;
        self.send_request_raw(Method::POST, url, None::<()>, ErrorMode::None).await?;
        Ok(())
    }

    /// Install the console's public key on a server for password-less
    /// logins.
    pub async fn set_authorized(&self, request: &SetAuthorizedRequest<'_>) -> Result<()> {
        let url = endpoints::server_set_authorized(&self.config.connection.uri)?;
        self.send_request_raw(Method::POST, url, Some(request), ErrorMode::None).await?;
        Ok(())
    }

    /// Build the WebSocket URL for a server's interactive terminal.
    ///
    /// Only the connection address is produced; establishing and maintaining
    /// the socket is the caller's responsibility.
    pub fn server_terminal_url(&self, server_id: i64) -> Result<Url> {
        Ok(endpoints::server_terminal(&self.config.connection.uri, server_id)?)
    }

    /// Get a page of projects.
    ///
    /// If an environment is passed, only projects of that environment will
    /// be returned.
    pub async fn get_projects(
        &self,
        pagination: Pagination,
        environment_id: Option<i64>,
    ) -> Result<Page<Project>> {
        let mut url = endpoints::projects(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        if let Some(environment_id) = environment_id {
            url.query_pairs_mut().append_pair("environment_id", &environment_id.to_string());
        }
        self.get(url).await
    }

    /// Create a new project.
    pub async fn create_project(&self, project: &CreateProjectRequest) -> Result<()> {
        let url = endpoints::projects(&self.config.connection.uri)?;
        let _: IgnoredAny = self.post(url, project).await?;
        Ok(())
    }

    /// Update an existing project.
    pub async fn update_project(&self, project: &UpdateProjectRequest) -> Result<()> {
        let url = endpoints::projects(&self.config.connection.uri)?;
        let _: IgnoredAny = self.put(url, project).await?;
        Ok(())
    }

    /// Delete a project.
    pub async fn delete_project(&self, project_id: i64) -> Result<()> {
        let url = endpoints::project(&self.config.connection.uri, project_id)?;
        let _: IgnoredAny = self.delete(url).await?;
        Ok(())
    }

    /// Get a project with its attached servers.
    pub async fn project_detail(&self, project_id: i64) -> Result<Project> {
        let url = endpoints::project(&self.config.connection.uri, project_id)?;
        self.get(url).await
    }

    /// Get projects as selector options.
    pub async fn project_options(&self, pagination: Pagination) -> Result<Options> {
        let mut url = endpoints::project_options(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        self.get(url).await
    }

    /// List the branches of a project's repository.
    pub async fn project_branches(&self, project_id: i64) -> Result<Vec<Branch>> {
        let url = endpoints::project_branches(&self.config.connection.uri, project_id)?;
        self.get(url).await
    }

    /// List the tags of a project's repository.
    pub async fn project_tags(&self, project_id: i64) -> Result<Vec<Tag>> {
        let url = endpoints::project_tags(&self.config.connection.uri, project_id)?;
        self.get(url).await
    }

    /// List the commits on a branch of a project's repository.
    pub async fn project_commits(&self, project_id: i64, branch: &str) -> Result<Vec<Commit>> {
        let url = endpoints::project_commits(&self.config.connection.uri, project_id, branch)?;
        self.get(url).await
    }

    /// Get a page of environments.
    pub async fn get_environments(&self, pagination: Pagination) -> Result<Page<Environment>> {
        let mut url = endpoints::environments(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        self.get(url).await
    }

    /// Create a new environment.
    pub async fn create_environment(&self, environment: &CreateEnvironmentRequest) -> Result<()> {
        let url = endpoints::environments(&self.config.connection.uri)?;
        let _: IgnoredAny = self.post(url, environment).await?;
        Ok(())
    }

    /// Update an existing environment.
    pub async fn update_environment(&self, environment: &UpdateEnvironmentRequest) -> Result<()> {
        let url = endpoints::environments(&self.config.connection.uri)?;
        let _: IgnoredAny = self.put(url, environment).await?;
        Ok(())
    }

    /// Delete an environment.
    pub async fn delete_environment(&self, environment_id: i64) -> Result<()> {
        let url = endpoints::environment(&self.config.connection.uri, environment_id)?;
        let _: IgnoredAny = self.delete(url).await?;
        Ok(())
    }

    /// Get environments as selector options.
    pub async fn environment_options(&self, pagination: Pagination) -> Result<Options> {
        let mut url = endpoints::environment_options(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        self.get(url).await
    }

    /// Get a page of deployments.
    pub async fn get_deploys(&self, pagination: Pagination) -> Result<Page<Deploy>> {
        let mut url = endpoints::deploys(&self.config.connection.uri)?;
        append_pagination(&mut url, pagination);
        self.get(url).await
    }

    /// Create a new deployment.
    pub async fn create_deploy(&self, deploy: &CreateDeployRequest) -> Result<()> {
        let url = endpoints::deploys(&self.config.connection.uri)?;
        let _: IgnoredAny = self.post(url, deploy).await?;
        Ok(())
    }

    /// Delete a deployment.
    pub async fn delete_deploy(&self, deploy_id: i64) -> Result<()> {
        let url = endpoints::deploy(&self.config.connection.uri, deploy_id)?;
        let _: IgnoredAny = self.delete(url).await?;
        Ok(())
    }

    /// Get a single deployment.
    ///
    /// `suppress_alert` hides the failure from the user, for callers polling
    /// a deployment that may already be gone.
    pub async fn deploy_detail(&self, deploy_id: i64, suppress_alert: bool) -> Result<Deploy> {
        let url = endpoints::deploy(&self.config.connection.uri, deploy_id)?;
        let mode = if suppress_alert { ErrorMode::None } else { ErrorMode::default() };
        self.send_request(Method::GET, url, None::<()>, mode).await
    }

    /// Start releasing an audited deployment.
    pub async fn start_deploy(&self, deploy_id: i64, suppress_alert: bool) -> Result<Deploy> {
        let url = endpoints::deploy_release(&self.config.connection.uri, deploy_id)?;
        let mode = if suppress_alert { ErrorMode::None } else { ErrorMode::default() };
        self.send_request(Method::GET, url, None::<()>, mode).await
    }

    /// Abort a running release.
    pub async fn stop_release(&self, deploy_id: i64) -> Result<()> {
        let url = endpoints::deploy_stop_release(&self.config.connection.uri, deploy_id)?;
        self.send_request_raw(Method::GET, url, None::<()>, ErrorMode::default()).await?;
        Ok(())
    }

    /// Roll a released deployment back to the previous version.
    pub async fn rollback_deploy(&self, deploy_id: i64) -> Result<()> {
        let url = endpoints::deploy_rollback(&self.config.connection.uri, deploy_id)?;
        self.send_request_raw(Method::GET, url, None::<()>, ErrorMode::default()).await?;
        Ok(())
    }

    /// Approve or reject a deployment waiting for audit.
    pub async fn audit_deploy(&self, deploy_id: i64, audit: bool) -> Result<()> {
        let url = endpoints::deploy_audit(&self.config.connection.uri, deploy_id)?;
        let body = AuditDeployRequest { audit };
        self.send_request_raw(Method::POST, url, Some(body), ErrorMode::default()).await?;
        Ok(())
    }

    /// Build the WebSocket URL for a deployment's console output stream.
    ///
    /// Only the connection address is produced; establishing and maintaining
    /// the socket is the caller's responsibility.
    pub fn deploy_console_url(&self, deploy_id: i64) -> Result<Url> {
        Ok(endpoints::deploy_console(&self.config.connection.uri, deploy_id)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn store_tokens(&mut self, response: &LoginResponse) -> Result<()> {
        self.config.auth_info.set_tokens(response.token.clone(), response.refresh_token.clone());

        // Rebuild the transport so the new bearer token lands in the default
        // headers.
        self.client = build_client(&self.config, self.request_timeout)?;

        Ok(())
    }
}

fn build_client(config: &Config, request_timeout: Option<u64>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = config.auth_info.token() {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("auth token is not a valid header value")?;
        headers.insert("Authorization", value);
    }
    headers.insert("Accept", HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(request_timeout.unwrap_or(u64::MAX)))
        .danger_accept_invalid_certs(config.ignore_certs())
        .default_headers(headers)
        .build()?;

    Ok(client)
}

fn append_pagination(url: &mut Url, pagination: Pagination) {
    url.query_pairs_mut()
        .append_pair("page", &pagination.page.to_string())
        .append_pair("page_size", &pagination.page_size.to_string());
}

fn log_response_error(err: &ResponseError) {
    // Display suppression only affects how loudly the failure is reported.
    match err.mode {
        ErrorMode::None => log::debug!("{err}"),
        _ => log::error!("{err}"),
    }
}
