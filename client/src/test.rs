//! Module containing useful doc / unit test utilities.

/// enables logging statically for any test module this module it is imported
/// into
pub mod logging {
    use lazy_static::lazy_static;

    lazy_static! {
        static ref _LOGGER_INIT: bool = {
            env_logger::init();
            true
        };
    }
}

pub mod mockito {
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockBuilder, MockServer, Request, Respond, ResponseTemplate};

    use crate::api::{YemaApi, YemaApiError};
    use crate::config::{AuthInfo, Config, ConnectionInfo};

    pub const DUMMY_TOKEN: &str = "DUMMY_TOKEN";
    pub const DUMMY_REFRESH_TOKEN: &str = "DUMMY_REFRESH_TOKEN";

    /// Wrap a result payload in the console's response envelope.
    pub fn envelope(result: Value) -> Value {
        json!({"code": 0, "message": "success", "result": result})
    }

    /// Wrap an error code and message in the console's response envelope.
    pub fn error_envelope(code: i64, message: &str) -> Value {
        json!({"code": code, "message": message, "result": null})
    }

    pub struct ResponderFn<F>(F)
    where
        F: Fn(&Request) -> ResponseTemplate + Send + Sync;

    impl<F> Respond for ResponderFn<F>
    where
        F: Fn(&Request) -> ResponseTemplate + Send + Sync,
    {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            self.0(request)
        }
    }

    pub trait MockResponderExt {
        fn respond_with_fn<F>(self, function: F) -> Mock
        where
            F: Fn(&Request) -> ResponseTemplate + Send + Sync + 'static;
    }

    impl MockResponderExt for MockBuilder {
        fn respond_with_fn<F>(self, function: F) -> Mock
        where
            F: Fn(&Request) -> ResponseTemplate + Send + Sync + 'static,
        {
            self.respond_with(ResponderFn(function))
        }
    }

    pub async fn build_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;

        // Version endpoint, reachable without credentials.
        Mock::given(method("GET"))
            .and(path("api/version"))
            .respond_with_fn(|_| {
                ResponseTemplate::new(200)
                    .set_body_json(envelope(json!({"version": "1.0.0"})))
            })
            .mount(&mock_server)
            .await;

        // Login endpoint issuing the dummy token pair.
        Mock::given(method("POST"))
            .and(path("api/login"))
            .respond_with_fn(|_| {
                ResponseTemplate::new(200).set_body_json(envelope(json!({
                    "user_id": 1,
                    "token": DUMMY_TOKEN,
                    "token_expire": 3600,
                    "refresh_token": DUMMY_REFRESH_TOKEN,
                    "refresh_token_expire": 7200,
                })))
            })
            .mount(&mock_server)
            .await;

        // Refresh endpoint re-issuing the same pair.
        Mock::given(method("POST"))
            .and(path("api/refresh_token"))
            .respond_with_fn(|_| {
                ResponseTemplate::new(200).set_body_json(envelope(json!({
                    "user_id": 1,
                    "token": DUMMY_TOKEN,
                    "token_expire": 3600,
                    "refresh_token": DUMMY_REFRESH_TOKEN,
                    "refresh_token_expire": 7200,
                })))
            })
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn build_authenticated_auth_info() -> AuthInfo {
        AuthInfo::new(Some(DUMMY_TOKEN.into()), Some(DUMMY_REFRESH_TOKEN.into()))
    }

    pub fn build_yema_api(mock_server: &MockServer) -> Result<YemaApi, YemaApiError> {
        let mut config = Config::default();
        config.connection = ConnectionInfo { uri: mock_server.uri() };
        config.auth_info = build_authenticated_auth_info();
        YemaApi::new(config, None)
    }

    pub fn build_unauthenticated_yema_api(
        mock_server: &MockServer,
    ) -> Result<YemaApi, YemaApiError> {
        let mut config = Config::default();
        config.connection = ConnectionInfo { uri: mock_server.uri() };
        YemaApi::new(config, None)
    }
}
