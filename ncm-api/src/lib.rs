//! Declarative request engine for the Netease Cloud Music API.
//!
//! Every remote operation is an [`Endpoint`]: a route, a URL (fixed or
//! computed from the query), an ordered list of [`ParamRule`]s that build the
//! request body from a loosely-typed [`Query`], and transport options (crypto
//! scheme, static cookies, user-agent hint). [`NeteaseClient::invoke`] looks
//! the route up in a [`Catalog`], resolves it, merges the options with the
//! shared [`Session`], and hands the request to a [`Transport`](transport::Transport).
//!
//! ```no_run
//! use ncm_api::{NeteaseClient, Query};
//!
//! # async fn run() -> ncm_api::Result<()> {
//! let client = NeteaseClient::new()?;
//! let query = Query::new().with("keywords", "海阔天空").with("limit", 5);
//! let reply = client.invoke("/cloudsearch", &query, true).await?;
//! println!("{}", reply["result"]["songCount"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Request schemes
//!
//! | Scheme     | Form fields             | Used by                        |
//! |------------|-------------------------|--------------------------------|
//! | `weapi`    | `params`, `encSecKey`   | web client endpoints           |
//! | `eapi`     | `params`                | mobile/desktop client endpoints|
//! | `linuxapi` | `eparams`               | Linux desktop forwarder        |
//!
//! See [`crypto`] for the exact constructions.
//!
//! # Sessions
//!
//! Cookies returned by the upstream (notably `MUSIC_U` after login) are folded
//! into the [`Session`] after every call. The session can be persisted to
//! `~/.config/ncm-api/session.json` with [`Session::save`].

pub mod adapter;
pub mod catalog;
pub mod client;
pub mod crypto;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod options;
pub mod query;
pub mod rule;
mod scrape;
pub mod session;
pub mod transport;

pub use catalog::Catalog;
pub use client::NeteaseClient;
pub use endpoint::Endpoint;
pub use error::{NeteaseError, Result};
pub use query::{Param, Query};
pub use rule::ParamRule;
pub use session::Session;
