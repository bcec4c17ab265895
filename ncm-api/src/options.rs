//! Merging endpoint options with session state.

use crate::endpoint::{Crypto, EndpointOptions, UserAgent};
use crate::session::SessionState;
use std::collections::BTreeMap;

/// Effective options handed to the transport for one call.
///
/// This is a detached value: editing it never touches the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub crypto: Crypto,
    pub cookies: BTreeMap<String, String>,
    pub user_agent: Option<UserAgent>,
    pub url_override: Option<String>,
    pub proxy: Option<String>,
    pub real_ip: Option<String>,
    pub use_http: bool,
}

/// Combine an endpoint's static options with a session snapshot.
///
/// Cookies are the union of both sets; on a name collision the session cookie
/// wins. Network settings come only from the session; crypto, user agent and
/// signed path only from the endpoint.
pub fn merge_options(endpoint: &EndpointOptions, session: &SessionState) -> RequestOptions {
    let mut cookies = endpoint.cookies.clone();
    cookies.extend(
        session
            .cookies
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    RequestOptions {
        crypto: endpoint.crypto,
        cookies,
        user_agent: endpoint.user_agent,
        url_override: endpoint.url_override.clone(),
        proxy: session.network.proxy.clone(),
        real_ip: session.network.real_ip.clone(),
        use_http: session.network.use_http,
    }
}
