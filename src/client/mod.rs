//! Async client for the identity platform REST APIs.
//!
//! The access management API (`json/...`) stores realm configuration such as
//! the Base URL Source service, the identity management API (`openidm/...`)
//! stores managed objects such as service accounts. Both are reached through
//! the [`IdentityApi`] trait so the provider can be exercised against the
//! in-memory [`fixture::Client`].
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

mod config;
mod error;
mod models;

#[cfg(any(test, feature = "test-fixture"))]
pub mod fixture;

pub use self::config::{
    realm_segments, ClientOptions, ClientOptionsBuilder, Credentials, DEFAULT_COOKIE_NAME,
};
pub use self::error::{check_status, decode, inspect, ClientError};
pub use self::models::{
    BaseUrlSource, BaseUrlSourceKind, ServiceAccount, UnknownBaseUrlSource, BASE_URL_SOURCE_ID,
};

/// String to set as the user agent in HTTP request.
static CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// API version of the realm configuration endpoints.
const CONFIG_API_VERSION: &str = "protocol=1.0,resource=1.0";

/// API version of the authentication endpoint.
const AUTHENTICATE_API_VERSION: &str = "protocol=1.0,resource=2.0";

/// Interface to the identity platform APIs.
///
/// Enables implementation of API clients across different transports.
#[async_trait::async_trait]
pub trait IdentityApi: Send + Sync {
    /// Fetch the Base URL Source service of the configured realm.
    async fn get_base_url_source(&self) -> Result<BaseUrlSource, ClientError>;

    /// Create the Base URL Source service, returning the stored object if any.
    async fn create_base_url_source(
        &self,
        source: &BaseUrlSource,
    ) -> Result<Option<BaseUrlSource>, ClientError>;

    /// Replace the Base URL Source service, returning the stored object if any.
    async fn update_base_url_source(
        &self,
        source: &BaseUrlSource,
    ) -> Result<Option<BaseUrlSource>, ClientError>;

    /// Delete the Base URL Source service.
    async fn delete_base_url_source(&self) -> Result<(), ClientError>;

    /// Fetch a service account by id.
    async fn read_service_account(&self, id: &str) -> Result<ServiceAccount, ClientError>;

    /// Create a service account, returning it with its assigned id.
    async fn create_service_account(
        &self,
        account: &ServiceAccount,
    ) -> Result<ServiceAccount, ClientError>;

    /// Replace a service account.
    async fn update_service_account(
        &self,
        id: &str,
        account: &ServiceAccount,
    ) -> Result<ServiceAccount, ClientError>;

    /// Delete a service account.
    async fn delete_service_account(&self, id: &str) -> Result<(), ClientError>;
}

/// Identity platform API client for the HTTP(S) protocol.
pub struct HttpClient {
    /// Low-level [`Client`](reqwest::Client) to perform HTTP requests with.
    client: ReqwestClient,

    options: ClientOptions,

    /// Session token obtained with [`Credentials::Session`].
    session: Mutex<Option<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateResponse {
    token_id: String,
}

/// A request, kept around so it can be sent again after re-authenticating.
struct ApiRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl ApiRequest {
    fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    fn json<T: serde::Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        let body = serde_json::to_vec(body).map_err(|error| ClientError::InvalidResponse {
            reason: format!("unable to encode request: {error}"),
            body: String::new(),
        })?;
        self.body = Some(body);
        Ok(self)
    }
}

impl HttpClient {
    /// Initialise a client with [`ClientOptions`].
    pub fn with<O>(options: O) -> Result<HttpClient, ClientError>
    where
        O: Into<ClientOptions>,
    {
        let options = options.into();
        let client = ReqwestClient::builder()
            .connect_timeout(options.timeout_connect)
            .timeout(options.timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()?;
        Ok(HttpClient {
            client,
            options,
            session: Mutex::new(None),
        })
    }

    /// Options the client was created with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn am_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut path = vec!["json".to_string()];
        path.extend(self.options.realm_segments());
        path.extend(segments.iter().map(|segment| segment.to_string()));
        extend_url(&self.options.host, &path)
    }

    fn base_url_source_url(&self) -> Result<Url, ClientError> {
        self.am_url(&["realm-config", "services", BASE_URL_SOURCE_ID])
    }

    fn service_account_url(&self, id: Option<&str>) -> Result<Url, ClientError> {
        let mut path = vec!["managed".to_string(), "svcacct".to_string()];
        if let Some(id) = id {
            path.push(id.to_string());
        }
        extend_url(&self.options.idm_host, &path)
    }

    /// Log in with the session credentials and return the session token.
    #[instrument(skip(self))]
    async fn authenticate(&self) -> Result<String, ClientError> {
        let (username, password) = match &self.options.credentials {
            Credentials::Session { username, password } => (username, password),
            Credentials::AccessToken(_) => {
                return Err(ClientError::Authentication(
                    "session login requires a username and password".to_string(),
                ))
            }
        };
        let url = extend_url(
            &self.options.host,
            &["json", "realms", "root", "authenticate"].map(String::from),
        )?;
        debug!(%url, %username, "Authenticating to the identity platform");
        let response = self
            .client
            .post(url)
            .header("Accept-API-Version", AUTHENTICATE_API_VERSION)
            .header("X-OpenAM-Username", username.as_str())
            .header("X-OpenAM-Password", password.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Authentication(format!(
                "status: {}, body: {}",
                status.as_u16(),
                text
            )));
        }
        match decode::<AuthenticateResponse>(&text)? {
            Some(response) => Ok(response.token_id),
            None => Err(ClientError::EmptyResponse),
        }
    }

    /// Return the cached session token, logging in if needed.
    async fn session_token(&self) -> Result<String, ClientError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *session = Some(token.clone());
        Ok(token)
    }

    async fn invalidate_session(&self) {
        self.session.lock().await.take();
    }

    async fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let builder = match &self.options.credentials {
            Credentials::AccessToken(token) => {
                builder.header(AUTHORIZATION, format!("Bearer {token}"))
            }
            Credentials::Session { .. } => {
                let token = self.session_token().await?;
                builder.header(COOKIE, format!("{}={}", self.options.cookie_name, token))
            }
        };
        Ok(builder)
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }
        let builder = self.authorize(builder).await?;
        Ok(builder.send().await?)
    }

    /// Send a request, logging in again once if the session expired.
    async fn send(&self, request: ApiRequest) -> Result<Response, ClientError> {
        debug!(method = %request.method, url = %request.url, "Sending identity platform request");
        let response = self.send_once(&request).await?;
        let session = matches!(self.options.credentials, Credentials::Session { .. });
        if response.status() != StatusCode::UNAUTHORIZED || !session {
            return Ok(response);
        }
        warn!(url = %request.url, "Session rejected, authenticating again");
        self.invalidate_session().await;
        self.send_once(&request).await
    }
}

fn extend_url(base: &Url, segments: &[String]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait::async_trait]
impl IdentityApi for HttpClient {
    async fn get_base_url_source(&self) -> Result<BaseUrlSource, ClientError> {
        let request = ApiRequest::new(Method::GET, self.base_url_source_url()?)
            .header("Accept-API-Version", CONFIG_API_VERSION);
        let response = self.send(request).await?;
        match inspect(response).await? {
            None => Err(ClientError::EmptyResponse),
            Some(source) => Ok(source),
        }
    }

    async fn create_base_url_source(
        &self,
        source: &BaseUrlSource,
    ) -> Result<Option<BaseUrlSource>, ClientError> {
        let mut url = self.base_url_source_url()?;
        url.set_query(Some("_action=create"));
        let request = ApiRequest::new(Method::POST, url)
            .header("Accept-API-Version", CONFIG_API_VERSION)
            .json(source)?;
        let response = self.send(request).await?;
        inspect(response).await
    }

    async fn update_base_url_source(
        &self,
        source: &BaseUrlSource,
    ) -> Result<Option<BaseUrlSource>, ClientError> {
        let request = ApiRequest::new(Method::PUT, self.base_url_source_url()?)
            .header("Accept-API-Version", CONFIG_API_VERSION)
            .json(source)?;
        let response = self.send(request).await?;
        inspect(response).await
    }

    async fn delete_base_url_source(&self) -> Result<(), ClientError> {
        let request = ApiRequest::new(Method::DELETE, self.base_url_source_url()?)
            .header("Accept-API-Version", CONFIG_API_VERSION);
        let response = self.send(request).await?;
        inspect::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn read_service_account(&self, id: &str) -> Result<ServiceAccount, ClientError> {
        let request = ApiRequest::new(Method::GET, self.service_account_url(Some(id))?);
        let response = self.send(request).await?;
        match inspect(response).await? {
            None => Err(ClientError::EmptyResponse),
            Some(account) => Ok(account),
        }
    }

    async fn create_service_account(
        &self,
        account: &ServiceAccount,
    ) -> Result<ServiceAccount, ClientError> {
        let mut url = self.service_account_url(None)?;
        url.set_query(Some("_action=create"));
        let request = ApiRequest::new(Method::POST, url).json(account)?;
        let response = self.send(request).await?;
        match inspect(response).await? {
            None => Err(ClientError::EmptyResponse),
            Some(account) => Ok(account),
        }
    }

    async fn update_service_account(
        &self,
        id: &str,
        account: &ServiceAccount,
    ) -> Result<ServiceAccount, ClientError> {
        let request = ApiRequest::new(Method::PUT, self.service_account_url(Some(id))?)
            .header("If-Match", "*")
            .json(account)?;
        let response = self.send(request).await?;
        match inspect(response).await? {
            None => Err(ClientError::EmptyResponse),
            Some(account) => Ok(account),
        }
    }

    async fn delete_service_account(&self, id: &str) -> Result<(), ClientError> {
        let request = ApiRequest::new(Method::DELETE, self.service_account_url(Some(id))?);
        let response = self.send(request).await?;
        inspect::<serde_json::Value>(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    const BASE_URL_PATH: &str = "/am/json/realms/root/realms/alpha/realm-config/services/baseurl";
    const AUTHENTICATE_PATH: &str = "/am/json/realms/root/authenticate";
    const REMOTE_BASE_URL_SOURCE: &str =
        r#"{"_id":"","source":"REQUEST_VALUES","contextPath":"/openam","fixedValue":null}"#;
    const REMOTE_ACCOUNT: &str =
        r#"{"_id":"svc-1","name":"ci","scopes":["fr:am:*"],"accountStatus":"Active"}"#;

    /// A request received by [`StubServer`].
    #[derive(Clone, Debug)]
    struct Recorded {
        method: String,
        path: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Recorded {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// HTTP/1.1 server on a loopback port, one request per connection.
    struct StubServer {
        address: SocketAddr,
        requests: Arc<std::sync::Mutex<Vec<Recorded>>>,
    }

    impl StubServer {
        async fn start<F>(handler: F) -> Self
        where
            F: Fn(&Recorded) -> (StatusCode, String) + Send + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = listener.local_addr().unwrap();
            let requests: Arc<std::sync::Mutex<Vec<Recorded>>> = Arc::default();
            let log = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let mut stream = BufReader::new(stream);
                    let Ok(request) = read_request(&mut stream).await else {
                        continue;
                    };
                    log.lock().unwrap().push(request.clone());
                    let (status, body) = handler(&request);
                    let _ = write_response(stream.get_mut(), status, &body).await;
                }
            });
            Self { address, requests }
        }

        fn client(&self, realm: &str, credentials: Credentials) -> HttpClient {
            let options = ClientOptions::host(format!("http://{}/am", self.address))
                .realm(realm)
                .credentials(credentials)
                .client()
                .unwrap();
            HttpClient {
                client: ReqwestClient::builder().no_proxy().build().unwrap(),
                options,
                session: Mutex::new(None),
            }
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(stream: &mut BufReader<TcpStream>) -> std::io::Result<Recorded> {
        let mut line = String::new();
        stream.read_line(&mut line).await?;
        let mut start = line.split_whitespace();
        let method = start.next().unwrap_or_default().to_string();
        let path = start.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        loop {
            line.clear();
            stream.read_line(&mut line).await?;
            let header = line.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let mut request = Recorded {
            method,
            path,
            headers,
            body: String::new(),
        };
        let length = request
            .header("content-length")
            .and_then(|length| length.parse().ok())
            .unwrap_or(0);
        let mut body = vec![0; length];
        stream.read_exact(&mut body).await?;
        request.body = String::from_utf8_lossy(&body).into_owned();
        Ok(request)
    }

    async fn write_response(
        stream: &mut TcpStream,
        status: StatusCode,
        body: &str,
    ) -> std::io::Result<()> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            body.len()
        );
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(body.as_bytes()).await?;
        stream.shutdown().await
    }

    fn session() -> Credentials {
        Credentials::Session {
            username: "amadmin".into(),
            password: "p4ssw0rd".into(),
        }
    }

    fn client(realm: &str) -> HttpClient {
        let options = ClientOptions::host("https://id.example.com/am")
            .realm(realm)
            .credentials(Credentials::AccessToken("token".into()))
            .client()
            .unwrap();
        HttpClient::with(options).unwrap()
    }

    #[test]
    fn base_url_source_url_in_root_realm() {
        let url = client("/").base_url_source_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://id.example.com/am/json/realms/root/realm-config/services/baseurl"
        );
    }

    #[test]
    fn base_url_source_url_in_sub_realm() {
        let url = client("/alpha").base_url_source_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://id.example.com/am/json/realms/root/realms/alpha/realm-config/services/baseurl"
        );
    }

    #[test]
    fn service_account_urls() {
        let client = client("/");
        assert_eq!(
            client.service_account_url(None).unwrap().as_str(),
            "https://id.example.com/openidm/managed/svcacct"
        );
        assert_eq!(
            client.service_account_url(Some("a b")).unwrap().as_str(),
            "https://id.example.com/openidm/managed/svcacct/a%20b"
        );
    }

    #[tokio::test]
    async fn access_token_cannot_log_in() {
        let error = client("/").authenticate().await.unwrap_err();
        assert!(matches!(error, ClientError::Authentication(_)));
    }

    #[tokio::test]
    async fn expired_session_logs_in_again() {
        let logins = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&logins);
        let server = StubServer::start(move |request| {
            if request.path == AUTHENTICATE_PATH {
                let login = counter.fetch_add(1, Ordering::SeqCst) + 1;
                return (StatusCode::OK, format!(r#"{{"tokenId":"tok{login}"}}"#));
            }
            match (request.header("cookie"), request.method.as_str()) {
                (Some("iPlanetDirectoryPro=tok2"), "GET") => {
                    (StatusCode::OK, REMOTE_BASE_URL_SOURCE.to_string())
                }
                (Some("iPlanetDirectoryPro=tok2"), _) => {
                    (StatusCode::CONFLICT, r#"{"code":409}"#.to_string())
                }
                _ => (StatusCode::UNAUTHORIZED, r#"{"code":401}"#.to_string()),
            }
        })
        .await;
        let client = server.client("/alpha", session());

        let source = client.get_base_url_source().await.unwrap();
        assert_eq!(source.source, "REQUEST_VALUES");
        assert_eq!(source.context_path, "/openam");
        let error = client.create_base_url_source(&source).await.unwrap_err();
        assert!(error.is_conflict());
        assert_eq!(logins.load(Ordering::SeqCst), 2);

        let requests = server.requests();
        let seen: Vec<_> = requests
            .iter()
            .map(|request| (request.method.as_str(), request.path.as_str()))
            .collect();
        let create_path = format!("{BASE_URL_PATH}?_action=create");
        assert_eq!(
            seen,
            vec![
                ("POST", AUTHENTICATE_PATH),
                ("GET", BASE_URL_PATH),
                ("POST", AUTHENTICATE_PATH),
                ("GET", BASE_URL_PATH),
                ("POST", create_path.as_str()),
            ]
        );

        let login = &requests[0];
        assert_eq!(login.header("x-openam-username"), Some("amadmin"));
        assert_eq!(login.header("x-openam-password"), Some("p4ssw0rd"));
        assert_eq!(
            login.header("accept-api-version"),
            Some(AUTHENTICATE_API_VERSION)
        );
        assert_eq!(login.body, "{}");
        assert_eq!(login.header("cookie"), None);

        assert_eq!(
            requests[1].header("cookie"),
            Some("iPlanetDirectoryPro=tok1")
        );
        assert_eq!(
            requests[3].header("cookie"),
            Some("iPlanetDirectoryPro=tok2")
        );
        assert_eq!(
            requests[4].header("cookie"),
            Some("iPlanetDirectoryPro=tok2")
        );
        assert_eq!(
            requests[4].header("accept-api-version"),
            Some(CONFIG_API_VERSION)
        );
        let body: serde_json::Value = serde_json::from_str(&requests[4].body).unwrap();
        assert_eq!(body["source"], "REQUEST_VALUES");
        assert_eq!(body["extensionClassName"], "");
    }

    #[tokio::test]
    async fn session_is_reused_between_requests() {
        let server = StubServer::start(|request| {
            if request.path == AUTHENTICATE_PATH {
                return (StatusCode::OK, r#"{"tokenId":"tok1"}"#.to_string());
            }
            (StatusCode::NO_CONTENT, String::new())
        })
        .await;
        let client = server.client("/alpha", session());

        client.delete_base_url_source().await.unwrap();
        client.delete_base_url_source().await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].path, AUTHENTICATE_PATH);
        assert_eq!(requests[2].method, "DELETE");
        assert_eq!(
            requests[2].header("cookie"),
            Some("iPlanetDirectoryPro=tok1")
        );
    }

    #[tokio::test]
    async fn rejected_login_is_authentication_error() {
        let server =
            StubServer::start(|_| (StatusCode::UNAUTHORIZED, r#"{"code":401}"#.to_string())).await;
        let client = server.client("/", session());

        let error = client.get_base_url_source().await.unwrap_err();
        assert!(matches!(error, ClientError::Authentication(_)));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn access_token_is_sent_as_bearer() {
        let server = StubServer::start(|_| (StatusCode::OK, REMOTE_ACCOUNT.to_string())).await;
        let client = server.client("/", Credentials::AccessToken("eyJ0".into()));

        let account = client.read_service_account("svc-1").await.unwrap();
        assert_eq!(account.id, "svc-1");
        assert_eq!(account.scopes, vec!["fr:am:*"]);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/openidm/managed/svcacct/svc-1");
        assert_eq!(requests[0].header("authorization"), Some("Bearer eyJ0"));
        assert_eq!(requests[0].header("cookie"), None);
    }

    #[tokio::test]
    async fn access_token_rejection_is_not_retried() {
        let server =
            StubServer::start(|_| (StatusCode::UNAUTHORIZED, r#"{"code":401}"#.to_string())).await;
        let client = server.client("/", Credentials::AccessToken("eyJ0".into()));

        let error = client.read_service_account("svc-1").await.unwrap_err();
        assert!(matches!(error, ClientError::Authentication(_)));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn update_service_account_matches_any_revision() {
        let server = StubServer::start(|_| (StatusCode::OK, REMOTE_ACCOUNT.to_string())).await;
        let client = server.client("/", Credentials::AccessToken("eyJ0".into()));
        let account = ServiceAccount {
            name: "ci".into(),
            account_status: "Active".into(),
            ..Default::default()
        };

        let updated = client
            .update_service_account("svc-1", &account)
            .await
            .unwrap();
        assert_eq!(updated.id, "svc-1");

        let request = &server.requests()[0];
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/openidm/managed/svcacct/svc-1");
        assert_eq!(request.header("if-match"), Some("*"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["name"], "ci");
        assert_eq!(body["accountStatus"], "Active");
        assert!(body.get("_id").is_none());
    }

    #[tokio::test]
    async fn create_service_account_uses_create_action() {
        let server = StubServer::start(|_| (StatusCode::CREATED, REMOTE_ACCOUNT.to_string())).await;
        let client = server.client("/", Credentials::AccessToken("eyJ0".into()));

        let created = client
            .create_service_account(&ServiceAccount::default())
            .await
            .unwrap();
        assert_eq!(created.id, "svc-1");

        let request = &server.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/openidm/managed/svcacct?_action=create");
        assert_eq!(request.header("if-match"), None);
    }
}
