//! Credential variants supplied at connect time
//!
//! Credentials are held in memory for the lifetime of a session and never
//! persisted. `Debug` impls redact secrets so credential material cannot
//! leak through logging.

use serde::{Deserialize, Serialize};

/// Credentials for one `connect` call
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum Credentials {
    /// No credentials; the file-system sandbox is its own trust boundary
    None,
    /// Database username/password
    Database(DatabaseCredentials),
    /// HTTP authentication variant
    Http(HttpCredentials),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => write!(f, "Credentials::None"),
            Credentials::Database(c) => write!(f, "Credentials::Database({:?})", c),
            Credentials::Http(c) => write!(f, "Credentials::Http({:?})", c),
        }
    }
}

/// Database authentication method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseAuthMethod {
    /// Cleartext password over the (optionally TLS) channel
    Password,
    /// SCRAM-SHA-256 challenge/response
    ScramSha256,
    /// Legacy MD5 challenge/response
    Md5,
}

/// Database credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    /// Role name
    pub username: String,
    /// Secret
    pub password: String,
    /// Handshake method the backend client should use
    pub auth_method: DatabaseAuthMethod,
}

impl std::fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

/// HTTP authentication variant
///
/// Each tag carries only the fields its scheme needs; headers are derived
/// from the tag at request time, never cached.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HttpCredentials {
    /// Anonymous access
    None,
    /// Static API key sent as `X-API-Key`
    ApiKey {
        /// Key material
        key: String,
    },
    /// Bearer token sent as `Authorization: Bearer <token>`
    BearerToken {
        /// Token material
        token: String,
    },
    /// RFC 7617 basic auth
    BasicAuth {
        /// User name
        username: String,
        /// Secret
        password: String,
    },
    /// OAuth2 access token, sent like a bearer token
    #[serde(rename = "oauth2")]
    OAuth2 {
        /// Access token material
        access_token: String,
    },
}

impl std::fmt::Debug for HttpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpCredentials::None => write!(f, "HttpCredentials::None"),
            HttpCredentials::ApiKey { .. } => write!(f, "HttpCredentials::ApiKey {{ key: *** }}"),
            HttpCredentials::BearerToken { .. } => {
                write!(f, "HttpCredentials::BearerToken {{ token: *** }}")
            }
            HttpCredentials::BasicAuth { username, .. } => write!(
                f,
                "HttpCredentials::BasicAuth {{ username: {:?}, password: *** }}",
                username
            ),
            HttpCredentials::OAuth2 { .. } => {
                write!(f, "HttpCredentials::OAuth2 {{ access_token: *** }}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::Database(DatabaseCredentials {
            username: "cnc_operator".to_string(),
            password: "hunter2".to_string(),
            auth_method: DatabaseAuthMethod::ScramSha256,
        });
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("cnc_operator"));
        assert!(!rendered.contains("hunter2"));

        let creds = HttpCredentials::BearerToken {
            token: "secret-token".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("secret-token"));
    }

    #[test]
    fn http_credentials_serde_tags() {
        let creds = HttpCredentials::ApiKey {
            key: "k".to_string(),
        };
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json["type"], "api_key");

        let back: HttpCredentials =
            serde_json::from_value(serde_json::json!({"type": "none"})).unwrap();
        assert!(matches!(back, HttpCredentials::None));
    }
}
