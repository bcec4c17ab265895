//! HTTP transport and wire encoding.
//!
//! [`Transport`] is the seam between the request engine and the network. The
//! engine hands over a fully resolved [`ApiRequest`]; the transport applies
//! the crypto scheme, sends it, and returns the JSON envelope plus any cookies
//! the response set.
//!
//! # Wire encoding
//!
//! | Scheme     | URL                                    | Form body                  |
//! |------------|----------------------------------------|----------------------------|
//! | `weapi`    | `…/weapi/…` (api segment rewritten)    | `params=…&encSecKey=…`     |
//! | `eapi`     | `…/eapi/…` (api segment rewritten)     | `params=…`                 |
//! | `linuxapi` | `https://music.163.com/api/linux/forward` | `eparams=…`             |
//!
//! weapi bodies carry `csrf_token` (from the `__csrf` cookie). eapi bodies
//! carry a `header` object built from the cookies, which also replaces the
//! `Cookie` header.

use crate::crypto::{eapi_decrypt, eapi_encrypt, linuxapi_encrypt, weapi_encrypt};
use crate::endpoint::{Crypto, UserAgent};
use crate::error::Result;
use crate::options::RequestOptions;
use crate::rule::Body;
use crate::session::NetworkSettings;
use async_trait::async_trait;
use rand::Rng;
use rand::seq::IndexedRandom;
use regex::Regex;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{Client, Method, Proxy};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;

const LINUX_FORWARD_URL: &str = "https://music.163.com/api/linux/forward";
const LINUX_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/60.0.3112.90 Safari/537.36";

const PC_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:80.0) Gecko/20100101 Firefox/80.0",
];
const MOBILE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 13_5_1 like Mac OS X) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/13.1.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 9; PCT-AL10) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/70.0.3538.64 HuaweiBrowser/10.0.3.311 Mobile Safari/537.36",
];

static API_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w*api").expect("valid api segment regex"));

/// A resolved call, ready to be encrypted and sent.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Body,
    pub options: RequestOptions,
}

/// Parsed upstream reply.
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub body: Value,
    /// `Set-Cookie` name/value pairs, in header order.
    pub cookies: Vec<(String, String)>,
}

/// A plain GET of an HTML page (used by the scraping adapters).
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: String,
    pub cookies: BTreeMap<String, String>,
    pub user_agent: Option<UserAgent>,
    pub network: NetworkSettings,
}

/// Fetched HTML page.
#[derive(Debug, Clone, Default)]
pub struct PageResponse {
    pub text: String,
    /// `Set-Cookie` name/value pairs, in header order.
    pub cookies: Vec<(String, String)>,
}

/// Network boundary used by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Encrypt and send an API call, returning the JSON envelope.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;

    /// Fetch an HTML page as text, with the cookies it sets.
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse>;
}

/// reqwest-backed [`Transport`].
///
/// Holds one default client and, when a proxy is configured, a cached client
/// built for that proxy.
pub struct HttpTransport {
    http: Client,
    proxied: Mutex<Option<(String, Client)>>,
}

impl HttpTransport {
    /// Direct client with a 30 second timeout.
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: Self::builder().build()?,
            proxied: Mutex::new(None),
        })
    }

    fn builder() -> reqwest::ClientBuilder {
        Client::builder().timeout(Duration::from_secs(30))
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client> {
        let Some(proxy) = proxy else {
            return Ok(self.http.clone());
        };
        let mut cached = self.proxied.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((url, client)) = cached.as_ref() {
            if url == proxy {
                return Ok(client.clone());
            }
        }
        tracing::debug!(proxy, "building proxied HTTP client");
        let client = Self::builder().proxy(Proxy::all(proxy)?).build()?;
        *cached = Some((proxy.to_owned(), client.clone()));
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let crypto = request.options.crypto;
        let client = self.client_for(request.options.proxy.as_deref())?;
        let wire = WireRequest::encode(request);
        tracing::debug!(url = %wire.url, %crypto, "sending api request");

        let mut req = client
            .request(wire.method.clone(), &wire.url)
            .header("User-Agent", &wire.user_agent);
        for (name, value) in wire.headers() {
            req = req.header(name, value);
        }

        let resp = req.body(wire.form).send().await?;
        let status = resp.status().as_u16();
        let cookies = set_cookies(resp.headers());
        let bytes = resp.bytes().await?;

        let mut body: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) if crypto == Crypto::Eapi => serde_json::from_slice(&eapi_decrypt(&bytes)?)?,
            Err(e) => return Err(e.into()),
        };
        if let Some(obj) = body.as_object_mut() {
            obj.entry("code").or_insert_with(|| status.into());
        }
        Ok(ApiResponse { body, cookies })
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse> {
        let client = self.client_for(request.network.proxy.as_deref())?;
        let url = downgrade(&request.url, request.network.use_http);
        let mut req = client
            .get(&url)
            .header("User-Agent", choose_user_agent(request.user_agent))
            .header("Referer", "https://music.163.com");
        if !request.cookies.is_empty() {
            req = req.header("Cookie", cookie_header(&request.cookies));
        }
        if let Some(ip) = &request.network.real_ip {
            req = req.header("X-Real-IP", ip);
        }
        let resp = req.send().await?.error_for_status()?;
        let cookies = set_cookies(resp.headers());
        let text = resp.text().await?;
        Ok(PageResponse { text, cookies })
    }
}

/// An [`ApiRequest`] after the crypto scheme has been applied.
#[derive(Debug)]
pub(crate) struct WireRequest {
    pub method: Method,
    pub url: String,
    pub user_agent: String,
    pub cookie: String,
    pub real_ip: Option<String>,
    /// The JSON object that was encrypted into `form`.
    pub plain: Value,
    pub form: String,
}

impl WireRequest {
    pub fn encode(request: ApiRequest) -> Self {
        let ApiRequest {
            method,
            url,
            mut body,
            options,
        } = request;
        let mut user_agent = choose_user_agent(options.user_agent).to_owned();
        let mut cookie = cookie_header(&options.cookies);

        let (url, plain, form) = match options.crypto {
            Crypto::Weapi => {
                let csrf = options.cookies.get("__csrf").cloned().unwrap_or_default();
                body.insert("csrf_token".into(), csrf.into());
                let plain = Value::Object(body);
                let payload = weapi_encrypt(&plain.to_string());
                let form = format!(
                    "params={}&encSecKey={}",
                    urlencoding::encode(&payload.params),
                    payload.enc_sec_key,
                );
                (rewrite_api_segment(&url, "weapi"), plain, form)
            }
            Crypto::Linuxapi => {
                let plain = json!({
                    "method": method.as_str(),
                    "url": rewrite_api_segment(&url, "api"),
                    "params": body,
                });
                user_agent = LINUX_USER_AGENT.to_owned();
                let form = format!("eparams={}", linuxapi_encrypt(&plain.to_string()));
                (LINUX_FORWARD_URL.to_owned(), plain, form)
            }
            Crypto::Eapi => {
                let header = eapi_header(&options.cookies);
                cookie = cookie_header(
                    &header
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                        .collect(),
                );
                body.insert("header".into(), Value::Object(header));
                let plain = Value::Object(body);
                let path = options
                    .url_override
                    .clone()
                    .unwrap_or_else(|| signed_path(&url));
                let form = format!("params={}", eapi_encrypt(&path, &plain.to_string()));
                (rewrite_api_segment(&url, "eapi"), plain, form)
            }
        };

        Self {
            method,
            url: downgrade(&url, options.use_http),
            user_agent,
            cookie,
            real_ip: options.real_ip,
            plain,
            form,
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if self.method == Method::POST {
            headers.push(("Content-Type", "application/x-www-form-urlencoded".to_owned()));
        }
        if self.url.contains("music.163.com") {
            headers.push(("Referer", "https://music.163.com".to_owned()));
        }
        if let Some(ip) = &self.real_ip {
            headers.push(("X-Real-IP", ip.clone()));
        }
        headers.push(("Cookie", self.cookie.clone()));
        headers
    }
}

/// Device header embedded in eapi payloads. Absent cookie fields are omitted.
fn eapi_header(cookies: &BTreeMap<String, String>) -> Map<String, Value> {
    let now = chrono::Utc::now();
    let get = |name: &str| cookies.get(name).cloned();
    let request_id = format!(
        "{}_{:04}",
        now.timestamp_millis(),
        rand::rng().random_range(0..1000)
    );
    let fields = [
        ("osver", get("osver")),
        ("deviceId", get("deviceId")),
        ("appver", get("appver").or_else(|| Some("8.0.0".into()))),
        ("versioncode", get("versioncode").or_else(|| Some("140".into()))),
        ("mobilename", get("mobilename")),
        ("buildver", get("buildver").or_else(|| Some(now.timestamp().to_string()))),
        ("resolution", get("resolution").or_else(|| Some("1920x1080".into()))),
        ("__csrf", Some(get("__csrf").unwrap_or_default())),
        ("os", get("os").or_else(|| Some("android".into()))),
        ("channel", get("channel")),
        ("requestId", Some(request_id)),
        ("MUSIC_U", get("MUSIC_U")),
        ("MUSIC_A", get("MUSIC_A")),
    ];
    fields
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_owned(), Value::String(v))))
        .collect()
}

/// Replace the first `…api` path segment (e.g. `api`, `eapi`, `weapi`).
fn rewrite_api_segment(url: &str, scheme: &str) -> String {
    API_SEGMENT.replace(url, scheme).into_owned()
}

/// The `/api/…` path to sign when an eapi endpoint declares none.
fn signed_path(url: &str) -> String {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = after_scheme
        .find('/')
        .map_or("/", |i| &after_scheme[i..]);
    let path = path.split('?').next().unwrap_or(path);
    rewrite_api_segment(path, "api")
}

fn downgrade(url: &str, use_http: bool) -> String {
    match url.strip_prefix("https://") {
        Some(rest) if use_http => format!("http://{rest}"),
        _ => url.to_owned(),
    }
}

fn choose_user_agent(hint: Option<UserAgent>) -> &'static str {
    let mut rng = rand::rng();
    let pick = match hint {
        Some(UserAgent::Pc) => PC_USER_AGENTS.choose(&mut rng),
        Some(UserAgent::Mobile) => MOBILE_USER_AGENTS.choose(&mut rng),
        None if rng.random_bool(0.5) => PC_USER_AGENTS.choose(&mut rng),
        None => MOBILE_USER_AGENTS.choose(&mut rng),
    };
    pick.copied().unwrap_or(LINUX_USER_AGENT)
}

/// `name=value; name=value` with both sides percent-encoded.
fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn set_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(parse_set_cookie)
        .collect()
}

/// Extract the name/value pair from a `Set-Cookie` header value.
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_owned(), value.trim().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::md5_hex;

    fn request(crypto: Crypto, url: &str) -> ApiRequest {
        let mut body = Body::new();
        body.insert("id".into(), json!("1"));
        ApiRequest {
            method: Method::POST,
            url: url.to_owned(),
            body,
            options: RequestOptions {
                crypto,
                cookies: BTreeMap::from([
                    ("__csrf".to_owned(), "tok".to_owned()),
                    ("MUSIC_U".to_owned(), "u".to_owned()),
                    ("os".to_owned(), "pc".to_owned()),
                ]),
                user_agent: Some(UserAgent::Pc),
                url_override: None,
                proxy: None,
                real_ip: None,
                use_http: false,
            },
        }
    }

    #[test]
    fn weapi_rewrites_url_and_adds_csrf() {
        let wire = WireRequest::encode(request(Crypto::Weapi, "https://music.163.com/api/radio/like"));
        assert_eq!(wire.url, "https://music.163.com/weapi/radio/like");
        assert_eq!(wire.plain["csrf_token"], "tok");
        assert_eq!(wire.plain["id"], "1");
        assert!(wire.form.starts_with("params="));
        assert!(wire.form.contains("&encSecKey="));
        assert!(wire.cookie.contains("MUSIC_U=u"));
        assert!(PC_USER_AGENTS.contains(&wire.user_agent.as_str()));
    }

    #[test]
    fn weapi_without_csrf_cookie_sends_empty_token() {
        let mut req = request(Crypto::Weapi, "https://music.163.com/weapi/x");
        req.options.cookies.clear();
        let wire = WireRequest::encode(req);
        assert_eq!(wire.plain["csrf_token"], "");
    }

    #[test]
    fn linuxapi_forwards_through_linux_endpoint() {
        let wire = WireRequest::encode(request(
            Crypto::Linuxapi,
            "https://music.163.com/weapi/v6/playlist/detail",
        ));
        assert_eq!(wire.url, LINUX_FORWARD_URL);
        assert_eq!(wire.user_agent, LINUX_USER_AGENT);
        assert_eq!(wire.plain["method"], "POST");
        assert_eq!(wire.plain["url"], "https://music.163.com/api/v6/playlist/detail");
        assert_eq!(wire.plain["params"]["id"], "1");
        assert!(wire.form.starts_with("eparams="));
    }

    #[test]
    fn eapi_moves_cookies_into_header() {
        let mut req = request(
            Crypto::Eapi,
            "https://interface3.music.163.com/eapi/song/enhance/player/url",
        );
        req.options.url_override = Some("/api/song/enhance/player/url".into());
        let wire = WireRequest::encode(req);
        assert_eq!(
            wire.url,
            "https://interface3.music.163.com/eapi/song/enhance/player/url"
        );
        let header = &wire.plain["header"];
        assert_eq!(header["os"], "pc");
        assert_eq!(header["appver"], "8.0.0");
        assert_eq!(header["__csrf"], "tok");
        assert_eq!(header["MUSIC_U"], "u");
        assert!(header.get("deviceId").is_none());
        assert!(wire.cookie.contains("appver=8.0.0"));
        assert!(wire.cookie.contains("MUSIC_U=u"));

        let raw = hex::decode(wire.form.trim_start_matches("params=")).unwrap();
        let plain = String::from_utf8(eapi_decrypt(&raw).unwrap()).unwrap();
        let parts: Vec<&str> = plain.split("-36cd479b6b5-").collect();
        assert_eq!(parts[0], "/api/song/enhance/player/url");
        assert_eq!(parts[1], wire.plain.to_string());
        let digest = md5_hex(
            format!("nobody{}use{}md5forencrypt", parts[0], parts[1]).as_bytes(),
        );
        assert_eq!(parts[2], digest);
    }

    #[test]
    fn eapi_derives_signed_path_from_url() {
        assert_eq!(
            signed_path("https://interface.music.163.com/eapi/cloud/lyric/get?x=1"),
            "/api/cloud/lyric/get"
        );
        assert_eq!(signed_path("https://music.163.com/weapi/v1/radio/get"), "/api/v1/radio/get");
    }

    #[test]
    fn http_downgrade_and_real_ip() {
        let mut req = request(Crypto::Weapi, "https://music.163.com/api/x");
        req.options.use_http = true;
        req.options.real_ip = Some("116.25.146.177".into());
        let wire = WireRequest::encode(req);
        assert_eq!(wire.url, "http://music.163.com/weapi/x");
        let headers = wire.headers();
        assert!(headers.contains(&("X-Real-IP", "116.25.146.177".to_owned())));
        assert!(headers.iter().any(|(k, _)| *k == "Referer"));
        assert!(headers.iter().any(|(k, _)| *k == "Content-Type"));
    }

    #[test]
    fn api_segment_rewrite_hits_first_match_only() {
        assert_eq!(
            rewrite_api_segment("https://interface.music.163.com/eapi/api/x", "weapi"),
            "https://interface.music.163.com/weapi/api/x"
        );
    }

    #[test]
    fn cookie_header_encodes_pairs() {
        let cookies = BTreeMap::from([
            ("a".to_owned(), "1".to_owned()),
            ("b c".to_owned(), "x;y".to_owned()),
        ]);
        assert_eq!(cookie_header(&cookies), "a=1; b%20c=x%3By");
    }

    #[test]
    fn parses_set_cookie_values() {
        assert_eq!(
            parse_set_cookie("MUSIC_U=abc; Max-Age=1296000; Domain=.music.163.com; Path=/"),
            Some(("MUSIC_U".to_owned(), "abc".to_owned()))
        );
        assert_eq!(
            parse_set_cookie("__csrf=; Path=/"),
            Some(("__csrf".to_owned(), String::new()))
        );
        assert_eq!(parse_set_cookie("garbage"), None);
        assert_eq!(parse_set_cookie("=v"), None);
    }

    #[test]
    fn user_agent_follows_hint() {
        for _ in 0..8 {
            assert!(MOBILE_USER_AGENTS.contains(&choose_user_agent(Some(UserAgent::Mobile))));
            let any = choose_user_agent(None);
            assert!(PC_USER_AGENTS.contains(&any) || MOBILE_USER_AGENTS.contains(&any));
        }
    }
}
