//! Declarative endpoint definitions.
//!
//! An [`Endpoint`] pairs a route with everything needed to turn a caller
//! [`Query`] into a request: URL strategy, parameter rules or a whole-body
//! strategy, and the transport options (crypto scheme, static cookies,
//! user-agent hint, signed-path override).
//!
//! ```
//! use ncm_api::endpoint::Endpoint;
//! use ncm_api::rule::ParamRule;
//!
//! let like = Endpoint::post("/like", "https://music.163.com/api/radio/like")
//!     .rule(ParamRule::constant("alg", "itembased"))
//!     .rule(ParamRule::required("trackId").from("id"))
//!     .rule(ParamRule::required("like"))
//!     .rule(ParamRule::constant("time", "3"))
//!     .weapi()
//!     .cookie("os", "pc");
//! assert_eq!(like.route(), "/like");
//! ```

use crate::error::Result;
use crate::query::Query;
use crate::rule::{self, Body, ParamRule};
use reqwest::Method;
use std::collections::BTreeMap;
use std::fmt;

/// Request signing/encryption scheme selected per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crypto {
    /// Web client: AES-CBC twice plus RSA, form fields `params`/`encSecKey`.
    Weapi,
    /// Mobile client: signed AES-ECB payload in `params`.
    Eapi,
    /// Linux desktop forwarder: AES-ECB payload in `eparams`.
    Linuxapi,
}

impl Crypto {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weapi => "weapi",
            Self::Eapi => "eapi",
            Self::Linuxapi => "linuxapi",
        }
    }
}

impl fmt::Display for Crypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical user-agent class; the transport picks a concrete string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAgent {
    /// Desktop browser.
    Pc,
    /// Mobile browser.
    Mobile,
}

/// Where the request URL comes from.
#[derive(Debug, Clone)]
pub enum UrlStrategy {
    Fixed(String),
    /// Path-embedded ids or flag-dependent paths (`like`/`unlike`).
    Dynamic(fn(&Query) -> Result<String>),
}

impl UrlStrategy {
    pub fn resolve(&self, query: &Query) -> Result<String> {
        match self {
            Self::Fixed(url) => Ok(url.clone()),
            Self::Dynamic(f) => f(query),
        }
    }
}

/// Builds the whole body from the query, bypassing per-rule resolution.
pub type BodyStrategy = fn(&Query) -> Result<Body>;

/// Transport options declared by an endpoint.
#[derive(Debug, Clone)]
pub struct EndpointOptions {
    pub crypto: Crypto,
    pub cookies: BTreeMap<String, String>,
    pub user_agent: Option<UserAgent>,
    /// Path signed into eapi payloads when it differs from the HTTP URL.
    pub url_override: Option<String>,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            crypto: Crypto::Weapi,
            cookies: BTreeMap::new(),
            user_agent: None,
            url_override: None,
        }
    }
}

/// Immutable description of one remote operation.
#[derive(Debug, Clone)]
pub struct Endpoint {
    route: String,
    method: Method,
    url: UrlStrategy,
    rules: Vec<ParamRule>,
    body: Option<BodyStrategy>,
    options: EndpointOptions,
}

impl Endpoint {
    pub fn new(route: impl Into<String>, method: Method, url: UrlStrategy) -> Self {
        Self {
            route: route.into(),
            method,
            url,
            rules: Vec::new(),
            body: None,
            options: EndpointOptions::default(),
        }
    }

    /// POST to a fixed URL.
    pub fn post(route: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(route, Method::POST, UrlStrategy::Fixed(url.into()))
    }

    /// POST to a URL computed from the query.
    pub fn post_dynamic(route: impl Into<String>, url: fn(&Query) -> Result<String>) -> Self {
        Self::new(route, Method::POST, UrlStrategy::Dynamic(url))
    }

    /// Append a body rule; rules resolve in declaration order.
    #[must_use]
    pub fn rule(mut self, rule: ParamRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Build the whole body with `strategy`, ignoring the rules.
    #[must_use]
    pub fn body_with(mut self, strategy: BodyStrategy) -> Self {
        self.body = Some(strategy);
        self
    }

    /// Use the web client scheme (the default).
    #[must_use]
    pub fn weapi(mut self) -> Self {
        self.options.crypto = Crypto::Weapi;
        self
    }

    /// Send through the Linux desktop forwarder.
    #[must_use]
    pub fn linuxapi(mut self) -> Self {
        self.options.crypto = Crypto::Linuxapi;
        self
    }

    /// Use eapi, signing `signed_path` (e.g. `/api/song/enhance/player/url`).
    #[must_use]
    pub fn eapi(mut self, signed_path: impl Into<String>) -> Self {
        self.options.crypto = Crypto::Eapi;
        self.options.url_override = Some(signed_path.into());
        self
    }

    /// Static cookie sent with every call; a session cookie of the same name wins.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.cookies.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn user_agent(mut self, ua: UserAgent) -> Self {
        self.options.user_agent = Some(ua);
        self
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn rules(&self) -> &[ParamRule] {
        &self.rules
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    /// Whether the body comes from a whole-body strategy instead of the rules.
    pub fn has_body_strategy(&self) -> bool {
        self.body.is_some()
    }

    pub fn resolve_url(&self, query: &Query) -> Result<String> {
        self.url.resolve(query)
    }

    /// Body strategy if declared, otherwise per-rule resolution.
    pub fn resolve_body(&self, query: &Query) -> Result<Body> {
        match self.body {
            Some(strategy) => strategy(query),
            None => rule::resolve(&self.rules, query),
        }
    }
}
