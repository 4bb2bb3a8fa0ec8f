use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_NETWORK_FAILURES, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS,
    CLIENT_TOKEN_REFRESHES, CLIENT_UNAUTHORIZED,
};
use crate::token::{TokenPair, TokenStore};
use crate::types::{
    ChatRequest, ChatResponse, DiaryParams, GoogleAuthRequest, NewSessionResponse, TokenResponse,
};

/// Default base URL for a locally running Otters backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Otters personal-assistant API.
///
/// The client owns the outbound HTTP surface: it attaches the bearer token
/// from the shared [`TokenStore`] when one is present, classifies failures
/// into the crate's [`Error`] taxonomy, and performs at most one token
/// refresh when an authenticated request comes back unauthorized.
#[derive(Debug, Clone)]
pub struct Otters {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
    tokens: Arc<TokenStore>,
}

impl Otters {
    /// Create a new client against the default base URL.
    pub fn new(tokens: Arc<TokenStore>) -> Result<Self> {
        Self::with_options(tokens, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        tokens: Arc<TokenStore>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = match base_url {
            Some(mut url) => {
                Url::parse(&url)?;
                if !url.ends_with('/') {
                    url.push('/');
                }
                url
            }
            None => DEFAULT_BASE_URL.to_string(),
        };

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
            tokens,
        })
    }

    /// The token store this client reads credentials from.
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Create the headers for an API request.
    ///
    /// The Authorization header is attached only when the store holds a
    /// token; without one the request still goes out and the server rejects
    /// it with an auth error.
    fn request_headers(&self, authed: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if authed && let Some(token) = self.tokens.access_token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::validation(
                    "stored access token is not a valid header value",
                    Some("access_token".to_string()),
                )
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        // FastAPI reports errors as {"detail": "..."}.
        #[derive(serde::Deserialize)]
        struct ErrorResponse {
            detail: Option<serde_json::Value>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.detail)
            .map(|detail| match detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or(error_body);

        classify_status(status_code, message)
    }

    /// Send a POST and classify the outcome.
    ///
    /// Every round trip in the client goes through here, so the request
    /// counters and duration moments see refreshes too.
    async fn dispatch<B, T>(&self, url: &str, headers: HeaderMap, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                CLIENT_NETWORK_FAILURES.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            if err.is_unauthorized() {
                CLIENT_UNAUTHORIZED.click();
            }
            return Err(err);
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, authed: bool) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let headers = self.request_headers(authed)?;
        self.dispatch(&url, headers, body).await
    }

    /// Send an authenticated request, refreshing the token pair at most once
    /// if the first attempt is rejected as unauthorized.
    ///
    /// A failed refresh surfaces the original auth error, not the refresh
    /// error: the caller cares that its request was unauthorized.
    async fn post_authed<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.post_json(path, body, true).await {
            Err(err) if err.is_unauthorized() => {
                let Some(refresh_token) = self.tokens.refresh_token() else {
                    return Err(err);
                };
                match self.refresh_with(&refresh_token).await {
                    Ok(_) => self.post_json(path, body, true).await,
                    Err(_) => Err(err),
                }
            }
            other => other,
        }
    }

    /// Create a new chat session, returning its identifier.
    pub async fn create_session(&self) -> Result<String> {
        let response: NewSessionResponse =
            self.post_authed("api/chat/new-session", &json!({})).await?;
        Ok(response.session_id)
    }

    /// Send a chat message, optionally scoped to a session.
    pub async fn send_chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse> {
        let request = ChatRequest::new(message, session_id.map(String::from));
        self.post_authed("api/chat", &request).await
    }

    /// Save a diary entry.
    pub async fn create_diary(&self, entry: &DiaryParams) -> Result<()> {
        // The response body shape is server-defined; only success matters.
        let _: serde_json::Value = self.post_authed("api/diary", entry).await?;
        Ok(())
    }

    /// Exchange a Google-issued credential for an Otters token pair.
    ///
    /// On success the pair is written to the token store, making every
    /// subsequent authenticated call pick it up.
    pub async fn login_google(&self, credential: &str) -> Result<TokenPair> {
        let request = GoogleAuthRequest::new(credential);
        let response: TokenResponse = self.post_json("api/auth/google", &request, false).await?;
        let pair = TokenPair::new(response.access_token, response.refresh_token);
        self.tokens.set(pair.clone())?;
        Ok(pair)
    }

    /// Exchange the stored refresh token for a fresh token pair.
    pub async fn refresh_tokens(&self) -> Result<TokenPair> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            return Err(Error::validation(
                "no refresh token stored",
                Some("refresh_token".to_string()),
            ));
        };
        self.refresh_with(&refresh_token).await
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<TokenPair> {
        CLIENT_TOKEN_REFRESHES.click();
        let url = format!("{}api/auth/refresh", self.base_url);
        let mut headers = self.request_headers(false)?;
        // The refresh endpoint authenticates with the refresh token itself.
        let value = HeaderValue::from_str(&format!("Bearer {refresh_token}")).map_err(|_| {
            Error::validation(
                "stored refresh token is not a valid header value",
                Some("refresh_token".to_string()),
            )
        })?;
        headers.insert(header::AUTHORIZATION, value);

        let parsed: TokenResponse = self.dispatch(&url, headers, &json!({})).await?;
        let pair = TokenPair::new(parsed.access_token, parsed.refresh_token);
        self.tokens.set(pair.clone())?;
        Ok(pair)
    }

    /// Drop the stored token pair.
    ///
    /// Purely local, like the original client: the server keeps no session
    /// state worth revoking.
    pub fn logout(&self) -> Result<()> {
        self.tokens.clear()
    }
}

/// Map an HTTP status code onto the error taxonomy.
fn classify_status(status_code: u16, message: String) -> Error {
    match status_code {
        401 | 403 => Error::unauthorized(message),
        500..=599 => Error::server(status_code, message),
        _ => Error::client(status_code, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_store(store: TokenStore) -> Otters {
        Otters::new(Arc::new(store)).unwrap()
    }

    #[test]
    fn client_creation() {
        let client = client_with_store(TokenStore::in_memory());
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = Otters::with_options(
            Arc::new(TokenStore::in_memory()),
            Some("https://otters.example.com/".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://otters.example.com/");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = Otters::with_options(
            Arc::new(TokenStore::in_memory()),
            Some("https://otters.example.com".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(client.base_url, "https://otters.example.com/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = Otters::with_options(
            Arc::new(TokenStore::in_memory()),
            Some("not a url".to_string()),
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "url");
    }

    #[test]
    fn no_token_means_no_auth_header() {
        let client = client_with_store(TokenStore::in_memory());
        let headers = client.request_headers(true).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn stored_token_becomes_bearer_header() {
        let store = TokenStore::in_memory();
        store
            .set(crate::token::TokenPair::new("abc123", "refresh"))
            .unwrap();
        let client = client_with_store(store);
        let headers = client.request_headers(true).unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer abc123"
        );
    }

    #[test]
    fn unauthenticated_requests_never_attach_token() {
        let store = TokenStore::in_memory();
        store
            .set(crate::token::TokenPair::new("abc123", "refresh"))
            .unwrap();
        let client = client_with_store(store);
        let headers = client.request_headers(false).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn status_classification() {
        assert!(classify_status(401, "x".to_string()).is_unauthorized());
        assert!(classify_status(403, "x".to_string()).is_unauthorized());
        assert!(classify_status(500, "x".to_string()).is_server_error());
        assert!(classify_status(503, "x".to_string()).is_server_error());
        assert!(classify_status(404, "x".to_string()).is_client_error());
        assert!(classify_status(422, "x".to_string()).is_client_error());
    }

    mod refresh {
        //! The refresh policy against a scripted local server: at most one
        //! refresh per request, the retry carrying the new token, and a
        //! failed refresh surfacing the original auth error.

        use std::sync::Mutex;

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        use super::*;

        /// One scripted exchange: the status and JSON body to answer with.
        struct ScriptedResponse {
            status: u16,
            body: &'static str,
        }

        /// Requests the server saw: path and Authorization header.
        type RequestLog = Arc<Mutex<Vec<(String, Option<String>)>>>;

        /// Serves the scripted responses in order, one connection per
        /// request, recording each request's path and bearer header.
        async fn scripted_server(responses: Vec<ScriptedResponse>) -> (String, RequestLog) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
            let server_log = Arc::clone(&log);
            tokio::spawn(async move {
                for response in responses {
                    let Ok((mut stream, _)) = listener.accept().await else {
                        return;
                    };
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    let (path, bearer) = loop {
                        let n = match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        let text = String::from_utf8_lossy(&buf).into_owned();
                        let Some(header_end) = text.find("\r\n\r\n") else {
                            continue;
                        };
                        let head = &text[..header_end];
                        let content_length = head
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                if name.eq_ignore_ascii_case("content-length") {
                                    value.trim().parse::<usize>().ok()
                                } else {
                                    None
                                }
                            })
                            .unwrap_or(0);
                        if buf.len() < header_end + 4 + content_length {
                            continue;
                        }
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("")
                            .to_string();
                        let bearer = head.lines().find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            if name.eq_ignore_ascii_case("authorization") {
                                Some(value.trim().to_string())
                            } else {
                                None
                            }
                        });
                        break (path, bearer);
                    };
                    server_log.lock().unwrap().push((path, bearer));
                    let reason = match response.status {
                        200 => "OK",
                        401 => "Unauthorized",
                        _ => "Error",
                    };
                    let reply = format!(
                        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        response.status,
                        reason,
                        response.body.len(),
                        response.body,
                    );
                    let _ = stream.write_all(reply.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });
            (format!("http://{addr}/"), log)
        }

        fn authed_client(base_url: String, pair: TokenPair) -> Otters {
            let store = TokenStore::in_memory();
            store.set(pair).unwrap();
            Otters::with_options(Arc::new(store), Some(base_url), None).unwrap()
        }

        #[tokio::test]
        async fn unauthorized_triggers_one_refresh_then_retry() {
            let (base_url, log) = scripted_server(vec![
                ScriptedResponse {
                    status: 401,
                    body: "{\"detail\":\"token expired\"}",
                },
                ScriptedResponse {
                    status: 200,
                    body: "{\"access_token\":\"fresh\",\"refresh_token\":\"r-2\"}",
                },
                ScriptedResponse {
                    status: 200,
                    body: "{\"session_id\":\"s-9\"}",
                },
            ])
            .await;
            let client = authed_client(base_url, TokenPair::new("stale", "r-1"));

            let session_id = client.create_session().await.unwrap();
            assert_eq!(session_id, "s-9");

            let requests = log.lock().unwrap().clone();
            assert_eq!(
                requests,
                vec![
                    (
                        "/api/chat/new-session".to_string(),
                        Some("Bearer stale".to_string())
                    ),
                    (
                        "/api/auth/refresh".to_string(),
                        Some("Bearer r-1".to_string())
                    ),
                    (
                        "/api/chat/new-session".to_string(),
                        Some("Bearer fresh".to_string())
                    ),
                ]
            );
            // The new pair is now the stored one.
            assert_eq!(client.tokens().get(), Some(TokenPair::new("fresh", "r-2")));
        }

        #[tokio::test]
        async fn failed_refresh_surfaces_the_original_error() {
            let (base_url, log) = scripted_server(vec![
                ScriptedResponse {
                    status: 401,
                    body: "{\"detail\":\"token expired\"}",
                },
                ScriptedResponse {
                    status: 401,
                    body: "{\"detail\":\"refresh token expired\"}",
                },
            ])
            .await;
            let client = authed_client(base_url, TokenPair::new("stale", "r-1"));

            let err = client.create_session().await.unwrap_err();
            assert!(err.is_unauthorized());
            assert_eq!(err.to_string(), "Unauthorized: token expired");
            assert_eq!(log.lock().unwrap().len(), 2);
            // The failed refresh wrote nothing to the store.
            assert_eq!(client.tokens().get(), Some(TokenPair::new("stale", "r-1")));
        }

        #[tokio::test]
        async fn refresh_happens_at_most_once_per_request() {
            let (base_url, log) = scripted_server(vec![
                ScriptedResponse {
                    status: 401,
                    body: "{\"detail\":\"token expired\"}",
                },
                ScriptedResponse {
                    status: 200,
                    body: "{\"access_token\":\"fresh\",\"refresh_token\":\"r-2\"}",
                },
                ScriptedResponse {
                    status: 401,
                    body: "{\"detail\":\"still not welcome\"}",
                },
            ])
            .await;
            let client = authed_client(base_url, TokenPair::new("stale", "r-1"));

            let err = client.create_session().await.unwrap_err();
            assert!(err.is_unauthorized());
            let paths: Vec<String> = log
                .lock()
                .unwrap()
                .iter()
                .map(|(path, _)| path.clone())
                .collect();
            // The retry's rejection is final; no second refresh.
            assert_eq!(
                paths,
                vec!["/api/chat/new-session", "/api/auth/refresh", "/api/chat/new-session"]
            );
        }

        #[tokio::test]
        async fn empty_store_skips_refresh() {
            let (base_url, log) = scripted_server(vec![ScriptedResponse {
                status: 401,
                body: "{\"detail\":\"missing token\"}",
            }])
            .await;
            let client = Otters::with_options(
                Arc::new(TokenStore::in_memory()),
                Some(base_url),
                None,
            )
            .unwrap();

            let err = client.create_session().await.unwrap_err();
            assert!(err.is_unauthorized());
            let requests = log.lock().unwrap().clone();
            assert_eq!(requests, vec![("/api/chat/new-session".to_string(), None)]);
        }
    }
}
