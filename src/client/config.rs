//! Configuration options for identity platform API clients.
use std::fmt;
use std::time::Duration;

use reqwest::Url;

use super::ClientError;

/// Session cookie used by the platform unless configured otherwise.
pub const DEFAULT_COOKIE_NAME: &str = "iPlanetDirectoryPro";

/// How the client authenticates its requests.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Log in with a username and password and reuse the session token.
    Session {
        /// Name of the administrative user.
        username: String,
        /// Password of the administrative user.
        password: String,
    },

    /// Send a pre-issued OAuth2 bearer token with every request.
    AccessToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session { username, .. } => f
                .debug_struct("Session")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::AccessToken(_) => f.debug_tuple("AccessToken").field(&"<redacted>").finish(),
        }
    }
}

/// Options to initialise clients with.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Base URL of the access management API, with trailing slash.
    pub host: Url,

    /// Base URL of the identity management API, with trailing slash.
    pub idm_host: Url,

    /// Realm the managed configuration lives in.
    pub realm: String,

    /// Credentials used to authenticate requests.
    pub credentials: Credentials,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Timeout for requests made by the client.
    pub timeout: Duration,

    /// Timeout for new connections initialised by the client.
    pub timeout_connect: Duration,
}

impl ClientOptions {
    /// Define options for API clients.
    pub fn host<S>(host: S) -> ClientOptionsBuilder
    where
        S: Into<String>,
    {
        ClientOptionsBuilder {
            host: host.into(),
            idm_host: None,
            realm: "/".to_string(),
            credentials: Credentials::Session {
                username: String::new(),
                password: String::new(),
            },
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            timeout: Duration::from_secs(30),
            timeout_connect: Duration::from_secs(5),
        }
    }

    /// Path segments addressing the configured realm.
    pub fn realm_segments(&self) -> Vec<String> {
        realm_segments(&self.realm)
    }
}

/// Incrementally build [`ClientOptions`] objects.
#[derive(Clone, Debug)]
pub struct ClientOptionsBuilder {
    host: String,
    idm_host: Option<String>,
    realm: String,
    credentials: Credentials,
    cookie_name: String,
    timeout: Duration,
    timeout_connect: Duration,
}

impl ClientOptionsBuilder {
    /// Use a specific identity management host instead of deriving it.
    pub fn idm_host<S>(mut self, idm_host: S) -> Self
    where
        S: Into<String>,
    {
        self.idm_host = Some(idm_host.into());
        self
    }

    /// Set the realm.
    pub fn realm<S>(mut self, realm: S) -> Self
    where
        S: Into<String>,
    {
        self.realm = realm.into();
        self
    }

    /// Set the credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the session cookie name.
    pub fn cookie_name<S>(mut self, cookie_name: S) -> Self
    where
        S: Into<String>,
    {
        self.cookie_name = cookie_name.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn timeout_connect(mut self, timeout: Duration) -> Self {
        self.timeout_connect = timeout;
        self
    }

    /// All options are set, get a usable options object.
    pub fn client(self) -> Result<ClientOptions, ClientError> {
        let host = parse_base(&self.host)?;
        let idm_host = match &self.idm_host {
            Some(idm_host) => parse_base(idm_host)?,
            None => derive_idm_host(&host)?,
        };
        Ok(ClientOptions {
            host,
            idm_host,
            realm: self.realm,
            credentials: self.credentials,
            cookie_name: self.cookie_name,
            timeout: self.timeout,
            timeout_connect: self.timeout_connect,
        })
    }
}

/// Map a realm name onto the `realms/<name>` path segments of the API.
///
/// The root realm can be spelled `""`, `"/"`, `"root"` or `"/root"`; every
/// sub-realm appends another `realms/<name>` pair.
///
/// ```
/// use terraform_provider_fram::client::realm_segments;
///
/// assert_eq!(realm_segments("/"), vec!["realms", "root"]);
/// assert_eq!(
///     realm_segments("/alpha/sub"),
///     vec!["realms", "root", "realms", "alpha", "realms", "sub"],
/// );
/// ```
pub fn realm_segments(realm: &str) -> Vec<String> {
    let mut parts = realm.split('/').filter(|part| !part.is_empty()).peekable();
    if parts.peek() == Some(&"root") {
        parts.next();
    }
    let mut segments = vec!["realms".to_string(), "root".to_string()];
    for part in parts {
        segments.push("realms".to_string());
        segments.push(part.to_string());
    }
    segments
}

fn parse_base(address: &str) -> Result<Url, ClientError> {
    let mut address = address.trim().to_string();
    if !address.ends_with('/') {
        address.push('/');
    }
    let url = Url::parse(&address)
        .map_err(|error| ClientError::InvalidUrl(format!("{address}: {error}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ClientError::InvalidUrl(format!(
            "{address}: unsupported scheme '{scheme}'"
        ))),
    }
}

fn derive_idm_host(host: &Url) -> Result<Url, ClientError> {
    host.join("/openidm/")
        .map_err(|error| ClientError::InvalidUrl(format!("{host}: {error}")))
}
