use serde::{Deserialize, Serialize};

/// Response body for `/version`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Enablement state shared by most console records.
///
/// Numeric on the wire: `1` is enabled, `2` is disabled.
#[derive(Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug, Default)]
#[serde(try_from = "i64", into = "i64")]
pub enum Status {
    #[default]
    Enabled,
    Disabled,
}

impl Status {
    pub fn is_enabled(self) -> bool {
        self == Status::Enabled
    }
}

impl TryFrom<i64> for Status {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Status::Enabled),
            2 => Ok(Status::Disabled),
            _ => Err(format!("invalid status value: {value}")),
        }
    }
}

impl From<Status> for i64 {
    fn from(status: Status) -> Self {
        match status {
            Status::Enabled => 1,
            Status::Disabled => 2,
        }
    }
}

/// Pagination query parameters shared by all list calls.
#[derive(Debug, Copy, Clone)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination { page: 1, page_size: 10 }
    }
}

/// Paginated list result, as returned inside the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: i64,
    pub items: Vec<T>,
}

/// One selectable entry in an options response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OptionItem {
    pub text: String,
    pub value: i64,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<serde_json::Value>,
}

/// Response body for the `*/options` routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct Options {
    pub total: i64,
    pub options: Vec<OptionItem>,
}

/// Request body for `/login`.
#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub remember: bool,
}

/// Response body for `/login` and `/refresh_token`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoginResponse {
    pub user_id: i64,
    pub token: String,
    pub token_expire: i64,
    pub refresh_token: String,
    pub refresh_token_expire: i64,
}

/// Request body for `/refresh_token`.
#[derive(Serialize, Debug)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Space membership entry in the user info response.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SpaceItem {
    pub space_name: String,
    pub space_id: i64,
    pub status: Status,
    pub role: String,
}

/// Response body for `/user_info`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserInfo {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: Status,
    pub current_space_id: i64,
    pub spaces: Vec<SpaceItem>,
}

/// Request body for `POST /user`.
#[derive(Serialize, Debug)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub status: Status,
}

/// Request body for `PUT /user`.
#[derive(Serialize, Debug)]
pub struct UpdateUserRequest {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Omitted leaves the current password unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub status: Status,
}

/// User list entry.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub status: Status,
    pub created_at: String,
}

/// Request body for `POST /server`.
#[derive(Serialize, Debug)]
pub struct CreateServerRequest {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub description: String,
}

/// Request body for `PUT /server`.
#[derive(Serialize, Debug)]
pub struct UpdateServerRequest {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub description: String,
}

/// Request body for `/server/set_authorized`.
#[derive(Serialize, Debug)]
pub struct SetAuthorizedRequest<'a> {
    pub id: i64,
    /// Login password, used once to install the console's public key.
    pub password: &'a str,
}

/// Server list entry.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub status: Status,
    pub description: String,
}

/// Version control system backing a project repository.
#[derive(Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    Git,
    Svn,
}

/// Reference selection mode used when creating a deployment.
#[derive(Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "lowercase")]
pub enum RepoMode {
    Branch,
    Tag,
}

/// Request body for `POST /project`.
#[derive(Serialize, Debug)]
pub struct CreateProjectRequest {
    pub name: String,
    pub environment_id: i64,
    pub repo_url: String,
    pub repo_mode: RepoMode,
    pub repo_type: RepoType,
    pub task_audit: bool,
    pub description: String,
    pub target_root: String,
    pub target_releases: String,
    pub keep_version_num: u32,
    pub excludes: String,
    pub is_include: bool,
    pub task_vars: String,
    pub prev_deploy: String,
    pub post_deploy: String,
    pub prev_release: String,
    pub post_release: String,
    pub server_ids: Vec<i64>,
}

/// Request body for `PUT /project`.
#[derive(Serialize, Debug)]
pub struct UpdateProjectRequest {
    pub id: i64,
    pub name: String,
    pub environment_id: i64,
    pub repo_url: String,
    pub repo_mode: RepoMode,
    pub repo_type: RepoType,
    pub task_audit: bool,
    pub description: String,
    pub target_root: String,
    pub target_releases: String,
    pub keep_version_num: u32,
    pub excludes: String,
    pub is_include: bool,
    pub task_vars: String,
    pub prev_deploy: String,
    pub post_deploy: String,
    pub prev_release: String,
    pub post_release: String,
    pub server_ids: Vec<i64>,
}

/// Project list entry and detail response.
///
/// The detail route attaches the project's servers; list entries leave the
/// field empty.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub environment_id: i64,
    pub repo_url: String,
    pub repo_mode: RepoMode,
    pub repo_type: RepoType,
    pub task_audit: bool,
    pub description: String,
    pub target_root: String,
    pub target_releases: String,
    pub keep_version_num: u32,
    pub excludes: String,
    pub is_include: bool,
    pub task_vars: String,
    pub prev_deploy: String,
    pub post_deploy: String,
    pub prev_release: String,
    pub post_release: String,
    pub status: Status,
    #[serde(default)]
    pub servers: Vec<Server>,
}

/// Branch entry for `/project/{id}/branches`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Branch {
    pub name: String,
}

/// Tag entry for `/project/{id}/tags`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Tag {
    pub name: String,
}

/// Commit entry for `/project/{id}/commits`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Commit {
    pub id: String,
    pub author: String,
    pub message: String,
    pub timestamp: i64,
}

/// Request body for `POST /environment`.
#[derive(Serialize, Debug)]
pub struct CreateEnvironmentRequest {
    pub name: String,
    pub description: String,
    pub status: Status,
}

/// Request body for `PUT /environment`.
#[derive(Serialize, Debug)]
pub struct UpdateEnvironmentRequest {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: Status,
}

/// Environment list entry.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Environment {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: Status,
}

/// Lifecycle state of a deployment task.
#[derive(Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(try_from = "i64", into = "i64")]
pub enum DeployStatus {
    WaitingAudit,
    AuditRejected,
    Pending,
    Releasing,
    Released,
    Failed,
}

impl TryFrom<i64> for DeployStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DeployStatus::WaitingAudit),
            2 => Ok(DeployStatus::AuditRejected),
            3 => Ok(DeployStatus::Pending),
            4 => Ok(DeployStatus::Releasing),
            5 => Ok(DeployStatus::Released),
            6 => Ok(DeployStatus::Failed),
            _ => Err(format!("invalid deploy status value: {value}")),
        }
    }
}

impl From<DeployStatus> for i64 {
    fn from(status: DeployStatus) -> Self {
        match status {
            DeployStatus::WaitingAudit => 1,
            DeployStatus::AuditRejected => 2,
            DeployStatus::Pending => 3,
            DeployStatus::Releasing => 4,
            DeployStatus::Released => 5,
            DeployStatus::Failed => 6,
        }
    }
}

/// Request body for `POST /deploy`.
#[derive(Serialize, Debug)]
pub struct CreateDeployRequest {
    pub project_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    pub description: String,
    pub server_ids: Vec<i64>,
}

/// Request body for `/deploy/{id}/audit`.
#[derive(Serialize, Debug)]
pub struct AuditDeployRequest {
    pub audit: bool,
}

/// Deployment list entry and detail response.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Deploy {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub branch: String,
    pub tag: String,
    pub commit_id: String,
    pub status: DeployStatus,
    pub description: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_value() {
        let json = serde_json::to_string(&Status::Disabled).unwrap();
        assert_eq!(json, "2");
        assert_eq!(serde_json::from_str::<Status>("1").unwrap(), Status::Enabled);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(serde_json::from_str::<Status>("7").is_err());
    }

    #[test]
    fn deploy_create_omits_unset_reference() {
        let req = CreateDeployRequest {
            project_id: 3,
            name: "v1.2.0".into(),
            tag: None,
            branch: Some("main".into()),
            commit_id: None,
            description: String::new(),
            server_ids: vec![1, 2],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["branch"], "main");
        assert!(value.get("tag").is_none());
        assert!(value.get("commit_id").is_none());
    }

    #[test]
    fn update_user_keeps_password_out_when_unchanged() {
        let req = UpdateUserRequest {
            id: 9,
            username: "sam".into(),
            email: "sam@example.org".into(),
            password: None,
            status: Status::Enabled,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("password").is_none());
    }
}
