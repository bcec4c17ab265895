//! Route → [`Endpoint`] registry and the built-in endpoint table.
//!
//! The built-in table is grouped by area, one submodule each:
//!
//! | Module     | Routes                                                      |
//! |------------|-------------------------------------------------------------|
//! | `account`  | login family, logout, user profile/playlists/subscriptions  |
//! | `cloud`    | cloud drive listing, upload check/token/info, publish       |
//! | `track`    | song url/detail/lyric, like, fm, scrobble, check music      |
//! | `playlist` | playlist CRUD, recommendations, charts                      |
//! | `search`   | cloud search, hot list, suggestions                         |
//! | `comment`  | comments and resource likes                                 |
//! | `discover` | artist, album, mv, mlog, dj, banner, batch                  |
//!
//! A few defaults depend on the clock or on randomness; each is documented
//! where it is declared.

mod account;
mod cloud;
mod comment;
mod discover;
mod playlist;
mod search;
mod track;
pub mod transform;

use crate::endpoint::Endpoint;
use std::collections::BTreeMap;

/// Immutable-after-build set of endpoint definitions, keyed by route.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    endpoints: BTreeMap<String, Endpoint>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in endpoint.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for endpoint in account::endpoints()
            .into_iter()
            .chain(cloud::endpoints())
            .chain(comment::endpoints())
            .chain(discover::endpoints())
            .chain(playlist::endpoints())
            .chain(search::endpoints())
            .chain(track::endpoints())
        {
            catalog.register(endpoint);
        }
        tracing::trace!(endpoints = catalog.len(), "built-in catalog ready");
        catalog
    }

    /// Add `endpoint`, replacing any previous definition of its route.
    pub fn register(&mut self, endpoint: Endpoint) -> Option<Endpoint> {
        self.endpoints.insert(endpoint.route().to_owned(), endpoint)
    }

    pub fn get(&self, route: &str) -> Option<&Endpoint> {
        self.endpoints.get(route)
    }

    /// Registered routes in lexical order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter;
    use crate::endpoint::Crypto;
    use crate::error::NeteaseError;
    use crate::query::{Param, Query};
    use crate::rule::RuleKind;
    use serde_json::{Value, json};

    fn builtin(route: &str) -> Endpoint {
        Catalog::builtin().get(route).cloned().unwrap()
    }

    /// Every builtin endpoint resolved purely from declarative rules: a query
    /// holding each required key yields exactly the rule names, and dropping a
    /// required key fails on the first rule that reads it.
    #[test]
    fn declarative_endpoints_resolve_to_their_rule_names() {
        let catalog = Catalog::builtin();
        let mut checked = 0;
        for route in catalog.routes() {
            let ep = catalog.get(route).unwrap();
            let declarative = ep.rules().iter().all(|r| {
                matches!(
                    r.kind(),
                    RuleKind::Required | RuleKind::Optional(_) | RuleKind::Constant(_)
                )
            });
            if ep.has_body_strategy() || !declarative {
                continue;
            }
            checked += 1;

            let required: Vec<&str> = ep
                .rules()
                .iter()
                .filter(|r| matches!(r.kind(), RuleKind::Required))
                .map(|r| r.source_key())
                .collect();
            let full: Query = required.iter().map(|k| (*k, Param::Int(1))).collect();
            let body = ep
                .resolve_body(&full)
                .unwrap_or_else(|e| panic!("{route}: {e}"));
            let mut names: Vec<&str> = Vec::new();
            for rule in ep.rules() {
                if !names.contains(&rule.name()) {
                    names.push(rule.name());
                }
            }
            assert_eq!(body.keys().map(String::as_str).collect::<Vec<_>>(), names, "{route}");

            for key in &required {
                let partial: Query = required
                    .iter()
                    .filter(|k| *k != key)
                    .map(|k| (*k, Param::Int(1)))
                    .collect();
                let first = ep
                    .rules()
                    .iter()
                    .find(|r| matches!(r.kind(), RuleKind::Required) && r.source_key() == *key)
                    .unwrap();
                match ep.resolve_body(&partial) {
                    Err(NeteaseError::MissingParameter(name)) => {
                        assert_eq!(name, first.name(), "{route} without {key}");
                    }
                    other => panic!("{route} without {key}: {other:?}"),
                }
            }
        }
        assert!(checked > 20, "only {checked} declarative endpoints");
    }

    #[test]
    fn routes_are_unique_across_areas() {
        let total = account::endpoints().len()
            + cloud::endpoints().len()
            + comment::endpoints().len()
            + discover::endpoints().len()
            + playlist::endpoints().len()
            + search::endpoints().len()
            + track::endpoints().len();
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), total);
        assert!(catalog.len() >= 70);
    }

    #[test]
    fn adapters_find_their_backing_endpoints() {
        let catalog = Catalog::builtin();
        assert!(catalog.get(adapter::CHECK_MUSIC).is_some());
        assert!(catalog.get(adapter::LOGIN).is_some());
        // served entirely by scraping
        assert!(catalog.get(adapter::LOGIN_STATUS).is_none());
        assert!(catalog.get(adapter::RELATED_PLAYLIST).is_none());
    }

    #[test]
    fn every_signed_path_is_an_api_path() {
        let catalog = Catalog::builtin();
        for route in catalog.routes() {
            let options = catalog.get(route).unwrap().options();
            match options.crypto {
                Crypto::Eapi => {
                    let path = options.url_override.as_deref().unwrap();
                    assert!(path.starts_with("/api/"), "{route}: {path}");
                }
                _ => assert!(options.url_override.is_none(), "{route}"),
            }
        }
    }

    #[test]
    fn register_replaces_route() {
        let mut catalog = Catalog::new();
        assert!(catalog.is_empty());
        catalog.register(Endpoint::post("/x", "https://a"));
        let old = catalog.register(Endpoint::post("/x", "https://b")).unwrap();
        assert_eq!(old.resolve_url(&Query::new()).unwrap(), "https://a");
        assert_eq!(catalog.routes().collect::<Vec<_>>(), ["/x"]);
    }

    #[test]
    fn like_resolves_forwarded_id_and_constants() {
        let ep = builtin("/like");
        let q = Query::new().with("id", "347230").with("like", "true").with("time", "99");
        let body = ep.resolve_body(&q).unwrap();
        assert_eq!(
            Value::Object(body),
            json!({ "alg": "itembased", "trackId": "347230", "like": "true", "time": "3" })
        );
        assert_eq!(ep.options().cookies["os"], "pc");
        assert_eq!(ep.options().cookies["appver"], "2.7.1.198277");
    }

    #[test]
    fn upload_check_requires_md5() {
        let ep = builtin("/cloud/upload/check");
        let err = ep.resolve_body(&Query::new().with("size", 5_000_000)).unwrap_err();
        assert!(matches!(err, NeteaseError::MissingParameter(ref k) if k == "md5"));

        let q = Query::new().with("size", 5_000_000).with("md5", "abc");
        let body = ep.resolve_body(&q).unwrap();
        assert_eq!(body["length"], 5_000_000);
        assert_eq!(body["bitrate"], "999000");
        assert_eq!(body["songId"], "0");
    }

    #[test]
    fn song_detail_builds_both_id_forms() {
        let body = builtin("/song/detail")
            .resolve_body(&Query::new().with("ids", "347230,1357375695"))
            .unwrap();
        assert_eq!(body["c"], r#"[{"id":347230},{"id":1357375695}]"#);
        assert_eq!(body["ids"], "[347230,1357375695]");
    }

    #[test]
    fn unknown_discriminant_is_configuration_error() {
        let err = builtin("/comment/new")
            .resolve_body(&Query::new().with("type", 42).with("id", 1))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, NeteaseError::InvalidParameter { ref name, .. } if name == "type"));

        let err = builtin("/banner")
            .resolve_body(&Query::new().with("type", 9))
            .unwrap_err();
        assert!(matches!(err, NeteaseError::InvalidParameter { ref name, .. } if name == "clientType"));
    }

    #[test]
    fn song_url_carries_device_cookie() {
        let ep = builtin("/song/url");
        let nuid = &ep.options().cookies["_ntes_nuid"];
        assert_eq!(nuid.len(), 32);
        assert!(nuid.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            ep.options().url_override.as_deref(),
            Some("/api/song/enhance/player/url")
        );
    }
}
