//! Protocol adapters.
//!
//! | Route               | Behavior                                                   |
//! |---------------------|------------------------------------------------------------|
//! | `/check/music`      | player-url lookup reduced to `{ success, message }`        |
//! | `/login`            | email login; `502` replaced by a fixed envelope            |
//! | `/login/status`     | profile scraped from the logged-in home page               |
//! | `/related/playlist` | playlist cards scraped from a public playlist page         |
//!
//! Once their input is valid, the scraping adapters never fail: any fetch or
//! parse problem becomes an envelope (`301` for login status, `500` for
//! related playlists).

use crate::client::NeteaseClient;
use crate::endpoint::UserAgent;
use crate::envelope::{self, CODE_BAD_CREDENTIALS, CODE_OK};
use crate::error::{NeteaseError, Result};
use crate::query::Query;
use crate::scrape;
use crate::transport::PageRequest;
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const CHECK_MUSIC: &str = "/check/music";
pub const LOGIN: &str = "/login";
pub const LOGIN_STATUS: &str = "/login/status";
pub const RELATED_PLAYLIST: &str = "/related/playlist";

/// Routes served by adapters, in addition to the catalog.
pub const ROUTES: [&str; 4] = [CHECK_MUSIC, LOGIN, LOGIN_STATUS, RELATED_PLAYLIST];

const HOME_URL: &str = "https://music.163.com";

impl NeteaseClient {
    /// Ask the player-url endpoint whether a track is playable.
    pub(crate) async fn check_music(&self, query: &Query) -> Result<Value> {
        let reply = self.request(self.endpoint(CHECK_MUSIC)?, query).await?;
        let playable = envelope::code(&reply) == Some(CODE_OK)
            && envelope::code(&reply["data"][0]) == Some(CODE_OK);
        Ok(json!({
            "success": playable,
            "message": if playable { "ok" } else { envelope::NO_RIGHTS_MSG },
        }))
    }

    pub(crate) async fn login(&self, query: &Query) -> Result<Value> {
        let reply = self.request(self.endpoint(LOGIN)?, query).await?;
        if envelope::code(&reply) == Some(CODE_BAD_CREDENTIALS) {
            tracing::debug!("login rejected credentials");
            return Ok(envelope::bad_credentials());
        }
        Ok(reply)
    }

    /// Fetch a page and fold the cookies it sets into the session.
    async fn fetch_page(&self, request: PageRequest) -> Result<String> {
        let page = self.transport().fetch_page(request).await?;
        self.session().store_cookies(page.cookies);
        Ok(page.text)
    }

    pub(crate) async fn login_status(&self) -> Value {
        let snapshot = self.session().snapshot();
        let request = PageRequest {
            url: HOME_URL.to_owned(),
            cookies: snapshot.cookies,
            user_agent: None,
            network: snapshot.network,
        };
        let page = match self.fetch_page(request).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch home page");
                return envelope::not_logged_in();
            }
        };
        scrape::login_status(&page).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "home page has no login state");
            envelope::not_logged_in()
        })
    }

    pub(crate) async fn related_playlist(&self, query: &Query) -> Result<Value> {
        let param = query.require("id")?;
        let id = param
            .as_i64()
            .ok_or_else(|| NeteaseError::invalid("id", param))?;
        let request = PageRequest {
            url: format!("{HOME_URL}/playlist?id={id}"),
            cookies: BTreeMap::new(),
            user_agent: Some(UserAgent::Pc),
            network: self.session().network(),
        };
        let scraped = match self.fetch_page(request).await {
            Ok(page) => scrape::related_playlists(&page).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        Ok(match scraped {
            Ok(playlists) => json!({ "code": CODE_OK, "playlists": playlists }),
            Err(msg) => {
                tracing::warn!(playlist = id, error = %msg, "related playlists unavailable");
                envelope::upstream_error(msg)
            }
        })
    }
}
