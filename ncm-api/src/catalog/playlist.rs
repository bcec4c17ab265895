//! Playlist CRUD, daily recommendations and official charts.

use super::transform::{json_array, toplist_id};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::query::Query;
use crate::rule::ParamRule;

fn subscribe_url(q: &Query) -> Result<String> {
    let op = if q.require("t")?.to_string() == "1" {
        "subscribe"
    } else {
        "unsubscribe"
    };
    Ok(format!("https://music.163.com/weapi/playlist/{op}"))
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::post("/playlist/create", "https://music.163.com/api/playlist/create")
            .rule(ParamRule::required("name"))
            .rule(ParamRule::required("privacy"))
            .rule(ParamRule::optional("type", "NORMAL"))
            .weapi()
            .cookie("os", "pc"),
        Endpoint::post("/playlist/delete", "https://music.163.com/weapi/playlist/remove")
            .rule(ParamRule::required("ids").transform(json_array))
            .weapi()
            .cookie("os", "pc"),
        Endpoint::post(
            "/playlist/detail",
            "https://music.163.com/api/v6/playlist/detail",
        )
        .rule(ParamRule::required("id"))
        .rule(ParamRule::constant("n", 100_000))
        .rule(ParamRule::optional("s", 8))
        .linuxapi(),
        Endpoint::post(
            "/playlist/tracks",
            "https://music.163.com/weapi/playlist/manipulate/tracks",
        )
        .rule(ParamRule::required("op"))
        .rule(ParamRule::required("pid"))
        .rule(ParamRule::constant("imme", true))
        .rule(ParamRule::required("trackIds").from("tracks").transform(json_array))
        .weapi(),
        Endpoint::post_dynamic("/playlist/subscribe", subscribe_url)
            .rule(ParamRule::required("id"))
            .weapi(),
        Endpoint::post(
            "/playlist/desc/update",
            "https://interface3.music.163.com/eapi/playlist/desc/update",
        )
        .rule(ParamRule::required("id"))
        .rule(ParamRule::required("desc"))
        .eapi("/api/playlist/desc/update"),
        Endpoint::post(
            "/playlist/privacy",
            "https://interface.music.163.com/eapi/playlist/update/privacy",
        )
        .rule(ParamRule::required("id"))
        .rule(ParamRule::constant("privacy", 0))
        .eapi("/api/playlist/update/privacy"),
        Endpoint::post(
            "/recommend/resource",
            "https://music.163.com/weapi/v1/discovery/recommend/resource",
        )
        .weapi(),
        Endpoint::post("/toplist", "https://music.163.com/api/toplist").linuxapi(),
        // chart by index into the official chart table
        Endpoint::post("/top/list", "https://music.163.com/weapi/v3/playlist/detail")
            .rule(ParamRule::required("id").from("idx").transform(toplist_id))
            .rule(ParamRule::constant("n", 10_000))
            .weapi(),
    ]
}
