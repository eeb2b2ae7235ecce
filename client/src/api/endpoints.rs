/// API endpoint paths
use thiserror::Error as ThisError;
use url::{ParseError, Position, Url};

const API_PATH: &str = "api/";

// Wrapping the parse error keeps the user's broken base URI in context; a
// bare ParseError can be as terse as "empty host".
#[derive(Debug, ThisError)]
#[error("invalid API URL")]
pub struct BaseUriError(#[from] pub ParseError);

/// GET /version
pub fn version(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("version")?)
}

/// POST /login
pub fn login(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("login")?)
}

/// POST /logout
pub fn logout(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("logout")?)
}

/// POST /refresh_token
pub fn refresh_token(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("refresh_token")?)
}

/// GET /user_info
pub fn user_info(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("user_info")?)
}

/// GET/POST/PUT /user
pub fn users(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("user")?)
}

/// DELETE /user/<user_id>
pub fn user(api_uri: &str, user_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;

    // Unwrap is okay because get_api_path only returns URLs that can be base URLs.
    url.path_segments_mut().unwrap().pop_if_empty().extend(["user", &user_id.to_string()]);

    Ok(url)
}

/// GET /user/options
pub fn user_options(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("user/options")?)
}

/// GET/POST/PUT /server
pub fn servers(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("server")?)
}

/// DELETE /server/<server_id>
pub fn server(api_uri: &str, server_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut().unwrap().pop_if_empty().extend(["server", &server_id.to_string()]);
    Ok(url)
}

/// POST /server/<server_id>/check
pub fn server_check(api_uri: &str, server_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["server", &server_id.to_string(), "check"]);
    Ok(url)
}

/// POST /server/set_authorized
pub fn server_set_authorized(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("server/set_authorized")?)
}

/// WS /server/<server_id>/terminal
pub fn server_terminal(api_uri: &str, server_id: i64) -> Result<Url, BaseUriError> {
    websocket_url(api_uri, ["server", &server_id.to_string(), "terminal"])
}

/// GET/POST/PUT /project
pub fn projects(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("project")?)
}

/// GET/DELETE /project/<project_id>
pub fn project(api_uri: &str, project_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut().unwrap().pop_if_empty().extend(["project", &project_id.to_string()]);
    Ok(url)
}

/// GET /project/options
pub fn project_options(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("project/options")?)
}

/// GET /project/<project_id>/branches
pub fn project_branches(api_uri: &str, project_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["project", &project_id.to_string(), "branches"]);
    Ok(url)
}

/// GET /project/<project_id>/tags
pub fn project_tags(api_uri: &str, project_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["project", &project_id.to_string(), "tags"]);
    Ok(url)
}

/// GET /project/<project_id>/commits?branch=<branch>
pub fn project_commits(api_uri: &str, project_id: i64, branch: &str) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["project", &project_id.to_string(), "commits"]);
    url.query_pairs_mut().append_pair("branch", branch);
    Ok(url)
}

/// GET/POST/PUT /environment
pub fn environments(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("environment")?)
}

/// DELETE /environment/<environment_id>
pub fn environment(api_uri: &str, environment_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["environment", &environment_id.to_string()]);
    Ok(url)
}

/// GET /environment/options
pub fn environment_options(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("environment/options")?)
}

/// GET/POST /deploy
pub fn deploys(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(get_api_path(api_uri)?.join("deploy")?)
}

/// GET/DELETE /deploy/<deploy_id>
pub fn deploy(api_uri: &str, deploy_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut().unwrap().pop_if_empty().extend(["deploy", &deploy_id.to_string()]);
    Ok(url)
}

/// GET /deploy/<deploy_id>/release
pub fn deploy_release(api_uri: &str, deploy_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["deploy", &deploy_id.to_string(), "release"]);
    Ok(url)
}

/// GET /deploy/<deploy_id>/stop_release
pub fn deploy_stop_release(api_uri: &str, deploy_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["deploy", &deploy_id.to_string(), "stop_release"]);
    Ok(url)
}

/// GET /deploy/<deploy_id>/rollback
pub fn deploy_rollback(api_uri: &str, deploy_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["deploy", &deploy_id.to_string(), "rollback"]);
    Ok(url)
}

/// POST /deploy/<deploy_id>/audit
pub fn deploy_audit(api_uri: &str, deploy_id: i64) -> Result<Url, BaseUriError> {
    let mut url = get_api_path(api_uri)?;
    url.path_segments_mut()
        .unwrap()
        .pop_if_empty()
        .extend(["deploy", &deploy_id.to_string(), "audit"]);
    Ok(url)
}

/// WS /deploy/<deploy_id>/console
pub fn deploy_console(api_uri: &str, deploy_id: i64) -> Result<Url, BaseUriError> {
    websocket_url(api_uri, ["deploy", &deploy_id.to_string(), "console"])
}

fn parse_base_url(api_uri: &str) -> Result<Url, BaseUriError> {
    let mut url = Url::parse(api_uri)?;

    // Ensure the path can be a base and ends with a slash so it can be safely
    // joined to. If we don't do this, https://example.com/a and https://example.com/a/ are different.
    url.path_segments_mut()
        .map_err(|_| ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push("");

    // Ensure there are no extra bits.
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

fn get_api_path(api_uri: &str) -> Result<Url, BaseUriError> {
    Ok(parse_base_url(api_uri)?.join(API_PATH)?)
}

// WebSocket routes reuse the configured authority and path prefix, so the
// swap is host + prefix + path with the scheme mapped to its ws equivalent.
fn websocket_url<'a>(
    api_uri: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, BaseUriError> {
    let http = get_api_path(api_uri)?;
    let scheme = if http.scheme() == "https" { "wss" } else { "ws" };

    let mut url = Url::parse(&format!("{scheme}://{}", &http[Position::BeforeHost..]))?;
    url.path_segments_mut().unwrap().pop_if_empty().extend(segments);

    Ok(url)
}

#[cfg(test)]
mod test {
    use super::*;

    const API_URI: &str = "https://example.com/a";

    #[test]
    fn get_api_path_returns_api_base() {
        assert_eq!(get_api_path("https://example.com/").unwrap().as_str(), "https://example.com/api/",);
        assert_eq!(
            get_api_path("https://example.com/a").unwrap().as_str(),
            "https://example.com/a/api/",
        );

        // Maybe an error should be reported in this case instead of stripping the
        // extras.
        assert_eq!(
            get_api_path("https://example.com/search?q=invalid#search").unwrap().as_str(),
            "https://example.com/search/api/",
        );
    }

    #[test]
    fn login_is_correct() {
        assert_eq!(login(API_URI).unwrap().as_str(), format!("{API_URI}/{API_PATH}login"),);
    }

    #[test]
    fn user_is_correct() {
        assert_eq!(user(API_URI, 7).unwrap().as_str(), format!("{API_URI}/{API_PATH}user/7"),);
    }

    #[test]
    fn user_options_is_correct() {
        assert_eq!(
            user_options(API_URI).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}user/options"),
        );
    }

    #[test]
    fn server_check_is_correct() {
        assert_eq!(
            server_check(API_URI, 42).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}server/42/check"),
        );
    }

    #[test]
    fn server_set_authorized_is_correct() {
        assert_eq!(
            server_set_authorized(API_URI).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}server/set_authorized"),
        );
    }

    #[test]
    fn project_routes_are_correct() {
        assert_eq!(projects(API_URI).unwrap().as_str(), format!("{API_URI}/{API_PATH}project"),);
        assert_eq!(
            project(API_URI, 3).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}project/3"),
        );
        assert_eq!(
            project_branches(API_URI, 3).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}project/3/branches"),
        );
        assert_eq!(
            project_tags(API_URI, 3).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}project/3/tags"),
        );
    }

    #[test]
    fn project_commits_carries_branch_query() {
        assert_eq!(
            project_commits(API_URI, 3, "main").unwrap().as_str(),
            format!("{API_URI}/{API_PATH}project/3/commits?branch=main"),
        );
    }

    #[test]
    fn deploy_routes_are_correct() {
        assert_eq!(
            deploy_release(API_URI, 9).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}deploy/9/release"),
        );
        assert_eq!(
            deploy_audit(API_URI, 9).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}deploy/9/audit"),
        );
        assert_eq!(
            deploy_stop_release(API_URI, 9).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}deploy/9/stop_release"),
        );
        assert_eq!(
            deploy_rollback(API_URI, 9).unwrap().as_str(),
            format!("{API_URI}/{API_PATH}deploy/9/rollback"),
        );
    }

    #[test]
    fn server_terminal_maps_scheme() {
        // TLS bases map to wss, plain HTTP to ws.
        assert_eq!(
            server_terminal(API_URI, 42).unwrap().as_str(),
            "wss://example.com/a/api/server/42/terminal",
        );
        assert_eq!(
            server_terminal("http://localhost:8989", 42).unwrap().as_str(),
            "ws://localhost:8989/api/server/42/terminal",
        );
    }

    #[test]
    fn deploy_console_is_correct() {
        assert_eq!(
            deploy_console("http://localhost:8989", 9).unwrap().as_str(),
            "ws://localhost:8989/api/deploy/9/console",
        );
    }

    #[test]
    fn websocket_url_keeps_path_prefix_without_double_slashes() {
        assert_eq!(
            deploy_console("http://example.com/console/", 9).unwrap().as_str(),
            "ws://example.com/console/api/deploy/9/console",
        );
    }
}
