//! Dispatcher for Netease Cloud Music API calls.
//!
//! [`NeteaseClient::invoke`] looks a route up and takes one of two paths:
//!
//! - **generic**: resolve URL and body from the endpoint definition, merge
//!   endpoint options with the session, hand the result to the
//!   [`Transport`], fold response cookies into the session, and normalize the
//!   not-logged-in sentinel;
//! - **adapter**: the handful of routes whose reply is reshaped or scraped
//!   from HTML (see [`adapter`](crate::adapter)).
//!
//! With `strict = true` a `301` envelope becomes
//! [`NeteaseError::NotLoggedIn`]; otherwise it is returned as data.

use crate::adapter;
use crate::catalog::Catalog;
use crate::endpoint::Endpoint;
use crate::envelope;
use crate::error::{NeteaseError, Result};
use crate::options::merge_options;
use crate::query::Query;
use crate::session::Session;
use crate::transport::{ApiRequest, HttpTransport, Transport};
use serde_json::Value;
use std::sync::Arc;

/// Async client for the Netease Cloud Music API.
///
/// Cloning is cheap; clones share the catalog, session and transport, so a
/// single client can serve concurrent tasks.
#[derive(Clone)]
pub struct NeteaseClient {
    catalog: Arc<Catalog>,
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
}

impl NeteaseClient {
    /// Create a client with the built-in catalog, loading the session from
    /// `~/.config/ncm-api/session.json`.
    pub fn new() -> Result<Self> {
        Self::with_session(Session::load()?)
    }

    /// Create a client with an explicit [`Session`] and the HTTP transport.
    pub fn with_session(session: Session) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?, session))
    }

    /// Create a client over any [`Transport`] (useful for testing).
    pub fn with_transport(transport: impl Transport + 'static, session: Session) -> Self {
        Self {
            catalog: Arc::new(Catalog::builtin()),
            session: Arc::new(session),
            transport: Arc::new(transport),
        }
    }

    /// Replace the endpoint catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// The shared session; clones of this client see the same one.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Endpoint definitions served by [`invoke`](Self::invoke).
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Invoke `route` with `query`.
    ///
    /// # Errors
    ///
    /// - [`NeteaseError::UnknownRoute`]: no endpoint or adapter for `route`
    /// - [`NeteaseError::MissingParameter`] / [`NeteaseError::InvalidParameter`]:
    ///   the query does not satisfy the endpoint's rules
    /// - [`NeteaseError::Http`] / [`NeteaseError::Json`]: could not talk to
    ///   upstream or its reply was malformed
    /// - [`NeteaseError::NotLoggedIn`]: `strict` and the reply was `301`
    #[tracing::instrument(skip(self, query), fields(keys = query.len()))]
    pub async fn invoke(&self, route: &str, query: &Query, strict: bool) -> Result<Value> {
        let envelope = match route {
            adapter::CHECK_MUSIC => self.check_music(query).await?,
            adapter::LOGIN => self.login(query).await?,
            adapter::LOGIN_STATUS => self.login_status().await,
            adapter::RELATED_PLAYLIST => self.related_playlist(query).await?,
            _ => {
                let endpoint = self.endpoint(route)?;
                self.request(endpoint, query).await?
            }
        };
        if strict && envelope::is_not_logged_in(&envelope) {
            tracing::debug!(route, "upstream reports not logged in");
            return Err(NeteaseError::NotLoggedIn {
                route: route.to_owned(),
            });
        }
        Ok(envelope)
    }

    pub(crate) fn endpoint(&self, route: &str) -> Result<&Endpoint> {
        self.catalog
            .get(route)
            .ok_or_else(|| NeteaseError::UnknownRoute(route.to_owned()))
    }

    /// Resolve `endpoint` against `query` without sending anything.
    ///
    /// Reads (but never writes) the session to merge cookies and network
    /// settings.
    pub fn prepare(&self, endpoint: &Endpoint, query: &Query) -> Result<ApiRequest> {
        let url = endpoint.resolve_url(query)?;
        let body = endpoint.resolve_body(query)?;
        let options = merge_options(endpoint.options(), &self.session.snapshot());
        Ok(ApiRequest {
            method: endpoint.method().clone(),
            url,
            body,
            options,
        })
    }

    /// Generic path: prepare, send, fold cookies, normalize the envelope.
    pub async fn request(&self, endpoint: &Endpoint, query: &Query) -> Result<Value> {
        let request = self.prepare(endpoint, query)?;
        tracing::debug!(
            route = endpoint.route(),
            url = %request.url,
            crypto = %request.options.crypto,
            fields = request.body.len(),
            "resolved request"
        );
        let response = self.transport.send(request).await?;
        self.session.store_cookies(response.cookies);
        let mut body = response.body;
        envelope::normalize_not_logged_in(&mut body);
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::endpoint::Crypto;
    use crate::transport::{ApiResponse, PageRequest, PageResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// In-memory transport: replays scripted replies and records requests.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        replies: Mutex<VecDeque<ApiResponse>>,
        pages: Mutex<VecDeque<Result<PageResponse>>>,
        pub sent: Mutex<Vec<ApiRequest>>,
        pub fetched: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedTransport {
        pub fn reply(self, body: Value) -> Self {
            self.reply_with_cookies(body, &[])
        }

        pub fn reply_with_cookies(self, body: Value, cookies: &[(&str, &str)]) -> Self {
            self.replies.lock().unwrap().push_back(ApiResponse {
                body,
                cookies: owned_pairs(cookies),
            });
            self
        }

        pub fn page(self, page: Result<String>) -> Self {
            let page = page.map(|text| PageResponse {
                text,
                cookies: Vec::new(),
            });
            self.pages.lock().unwrap().push_back(page);
            self
        }

        pub fn page_with_cookies(self, text: &str, cookies: &[(&str, &str)]) -> Self {
            self.pages.lock().unwrap().push_back(Ok(PageResponse {
                text: text.to_owned(),
                cookies: owned_pairs(cookies),
            }));
            self
        }
    }

    fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[async_trait]
    impl Transport for Arc<ScriptedTransport> {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.sent.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| NeteaseError::Other("no scripted reply".into()))
        }

        async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse> {
            self.fetched.lock().unwrap().push(request);
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(NeteaseError::Other("no scripted page".into())))
        }
    }

    pub(crate) fn client(script: ScriptedTransport) -> (NeteaseClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(script);
        let client = NeteaseClient::with_transport(transport.clone(), Session::new());
        (client, transport)
    }

    #[tokio::test]
    async fn generic_path_sends_resolved_request() {
        let (client, transport) = client(ScriptedTransport::default().reply(json!({ "code": 200 })));
        client.session().set_cookie("MUSIC_U", "u");
        let q = Query::new().with("id", "123").with("like", true);
        let reply = client.invoke("/like", &q, true).await.unwrap();
        assert_eq!(reply["code"], 200);

        let sent = transport.sent.lock().unwrap();
        let req = &sent[0];
        assert_eq!(req.url, "https://music.163.com/api/radio/like");
        assert_eq!(
            Value::Object(req.body.clone()),
            json!({ "alg": "itembased", "trackId": "123", "like": true, "time": "3" })
        );
        assert_eq!(req.options.crypto, Crypto::Weapi);
        assert_eq!(req.options.cookies["os"], "pc");
        assert_eq!(req.options.cookies["MUSIC_U"], "u");
    }

    #[tokio::test]
    async fn unknown_route_is_configuration_error() {
        let (client, transport) = client(ScriptedTransport::default());
        let err = client.invoke("/no/such/route", &Query::new(), true).await.unwrap_err();
        assert!(matches!(err, NeteaseError::UnknownRoute(ref r) if r == "/no/such/route"));
        assert!(err.is_configuration());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_parameter_fails_before_sending() {
        let (client, transport) = client(ScriptedTransport::default());
        let q = Query::new().with("size", 1024);
        let err = client.invoke("/cloud/upload/check", &q, true).await.unwrap_err();
        assert!(matches!(err, NeteaseError::MissingParameter(ref n) if n == "md5"));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn not_logged_in_strict_and_lenient() {
        let (client, _) = client(
            ScriptedTransport::default()
                .reply(json!({ "code": 301, "msg": "need login" }))
                .reply(json!({ "code": 301, "msg": "need login" })),
        );
        let err = client.invoke("/personal_fm", &Query::new(), true).await.unwrap_err();
        assert!(matches!(err, NeteaseError::NotLoggedIn { ref route } if route == "/personal_fm"));

        let reply = client.invoke("/personal_fm", &Query::new(), false).await.unwrap();
        assert_eq!(reply["code"], 301);
        assert_eq!(reply["msg"], envelope::NOT_LOGGED_IN_MSG);
    }

    #[tokio::test]
    async fn other_failures_are_returned_as_data() {
        let (client, _) = client(ScriptedTransport::default().reply(json!({ "code": 404, "msg": "gone" })));
        let reply = client.invoke("/personal_fm", &Query::new(), true).await.unwrap();
        assert_eq!(reply["code"], 404);
        assert_eq!(reply["msg"], "gone");
    }

    #[tokio::test]
    async fn response_cookies_fold_into_session_for_next_call() {
        let (client, transport) = client(
            ScriptedTransport::default()
                .reply_with_cookies(json!({ "code": 200 }), &[("MUSIC_U", "fresh"), ("__csrf", "c")])
                .reply(json!({ "code": 200 })),
        );
        client.invoke("/personal_fm", &Query::new(), true).await.unwrap();
        assert_eq!(client.session().cookie("MUSIC_U").as_deref(), Some("fresh"));

        client.invoke("/personal_fm", &Query::new(), true).await.unwrap();
        let sent = transport.sent.lock().unwrap();
        assert!(!sent[0].options.cookies.contains_key("MUSIC_U"));
        assert_eq!(sent[1].options.cookies["MUSIC_U"], "fresh");
        assert_eq!(sent[1].options.cookies["__csrf"], "c");
    }

    #[tokio::test]
    async fn session_mutators_apply_to_next_call() {
        let (client, transport) = client(ScriptedTransport::default().reply(json!({ "code": 200 })));
        client.session().set_proxy(Some("http://127.0.0.1:8888".into()));
        client.session().set_real_ip(Some("116.25.146.177".into()));
        client.session().set_use_http(true);
        client.invoke("/personal_fm", &Query::new(), true).await.unwrap();
        let sent = transport.sent.lock().unwrap();
        let opts = &sent[0].options;
        assert_eq!(opts.proxy.as_deref(), Some("http://127.0.0.1:8888"));
        assert_eq!(opts.real_ip.as_deref(), Some("116.25.146.177"));
        assert!(opts.use_http);
    }

    #[tokio::test]
    async fn dynamic_url_uses_query() {
        let (client, transport) = client(ScriptedTransport::default().reply(json!({ "code": 200 })));
        let q = Query::new().with("t", 1).with("type", 1).with("id", 5436712);
        client.invoke("/resource/like", &q, true).await.unwrap();
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].url, "https://music.163.com/weapi/resource/like");
        assert_eq!(sent[0].body["threadId"], "R_MV_5_5436712");
    }

    #[tokio::test]
    async fn transport_failure_is_an_error_not_an_envelope() {
        let (client, _) = client(ScriptedTransport::default());
        let err = client.invoke("/personal_fm", &Query::new(), false).await.unwrap_err();
        assert!(!err.is_configuration());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_keep_every_cookie() {
        let mut script = ScriptedTransport::default();
        for i in 0..32 {
            let name = format!("c{i}");
            script = script.reply_with_cookies(json!({ "code": 200 }), &[(name.as_str(), "v")]);
        }
        let (client, _) = client(script);
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move {
                    client.invoke("/personal_fm", &Query::new(), true).await
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert_eq!(client.session().cookies().len(), 32);
    }
}
