//! Browsing: artists, albums, MVs, mlogs, DJ radios, banners and batching.

use super::transform::{artist_initial, banner_client, batch_body, dj_toplist_type};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::query::{Param, Query};
use crate::rule::ParamRule;
use chrono::{Datelike, Local, Utc};
use serde_json::json;

fn artist_albums_url(q: &Query) -> Result<String> {
    Ok(format!(
        "https://music.163.com/weapi/artist/albums/{}",
        q.require("id")?
    ))
}

fn album_url(q: &Query) -> Result<String> {
    Ok(format!("https://music.163.com/weapi/v1/album/{}", q.require("id")?))
}

fn album_subscribe_url(q: &Query) -> Result<String> {
    let op = if q.require("t")?.to_string() == "1" { "sub" } else { "unsub" };
    Ok(format!("https://music.163.com/api/album/{op}"))
}

fn mlog_ids(q: &Query) -> Result<Param> {
    Ok(Param::Str(format!("[\"{}\"]", q.require("id")?)))
}

/// Song context for mlog recommendations, empty without `songid`.
fn mlog_ext_info(q: &Query) -> Result<Param> {
    Ok(match q.get("songid") {
        Some(id) => Param::Str(json!({ "songId": id.to_string() }).to_string()),
        None => Param::Str(String::new()),
    })
}

/// Stamped with the current time on every call.
fn aidj_ext_info(_: &Query) -> Result<Param> {
    let info = json!({
        "noAidjToAidj": false,
        "lastRequestTimestamp": Utc::now().timestamp_millis(),
        "listenedTs": false,
    });
    Ok(Param::Str(info.to_string()))
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    // `/top/album` defaults to the year and month the catalog was built in
    let today = Local::now();

    vec![
        Endpoint::post_dynamic("/artist/album", artist_albums_url)
            .rule(ParamRule::optional("limit", 30))
            .rule(ParamRule::optional("offset", 0))
            .rule(ParamRule::constant("total", true))
            .weapi(),
        Endpoint::post(
            "/artist/detail",
            "https://music.163.com/api/artist/head/info/get",
        )
        .rule(ParamRule::required("id"))
        .weapi(),
        Endpoint::post("/artist/songs", "https://music.163.com/api/v1/artist/songs")
            .rule(ParamRule::required("id"))
            .rule(ParamRule::constant("private_cloud", true))
            .rule(ParamRule::constant("work_type", 1))
            .rule(ParamRule::optional("order", "hot"))
            .rule(ParamRule::optional("offset", 0))
            .rule(ParamRule::optional("limit", 100))
            .weapi()
            .cookie("os", "pc"),
        Endpoint::post("/artist/top/song", "https://music.163.com/api/artist/top/song")
            .rule(ParamRule::required("id"))
            .weapi(),
        // `initial`: -1 hot, 0 for `#`, else a letter
        Endpoint::post("/artist/list", "https://music.163.com/api/v1/artist/list")
            .rule(
                ParamRule::optional("initial", -1)
                    .empty_as_absent()
                    .transform(artist_initial),
            )
            .rule(ParamRule::optional("offset", 0))
            .rule(ParamRule::optional("limit", 30))
            .rule(ParamRule::constant("total", true))
            .rule(ParamRule::optional("type", -1))
            .rule(ParamRule::optional("area", -1))
            .weapi(),
        Endpoint::post_dynamic("/album", album_url).weapi(),
        Endpoint::post(
            "/album/detail/dynamic",
            "https://music.163.com/api/album/detail/dynamic",
        )
        .rule(ParamRule::required("id"))
        .weapi(),
        Endpoint::post_dynamic("/album/subscribe", album_subscribe_url)
            .rule(ParamRule::required("id"))
            .weapi(),
        Endpoint::post(
            "/top/album",
            "https://music.163.com/api/discovery/new/albums/area",
        )
        .rule(ParamRule::optional("area", "ALL"))
        .rule(ParamRule::optional("limit", 50))
        .rule(ParamRule::optional("offset", 0))
        .rule(ParamRule::optional("type", "new"))
        .rule(ParamRule::optional("year", today.year().to_string()))
        .rule(ParamRule::optional("month", today.month().to_string()))
        .rule(ParamRule::constant("total", "false"))
        .rule(ParamRule::constant("rcmd", true))
        .weapi(),
        Endpoint::post("/mv/detail", "https://music.163.com/api/v1/mv/detail")
            .rule(ParamRule::required("id").from("mvid"))
            .weapi(),
        Endpoint::post(
            "/mv/url",
            "https://music.163.com/weapi/song/enhance/play/mv/url",
        )
        .rule(ParamRule::required("id"))
        .rule(ParamRule::optional("r", 1080))
        .weapi(),
        Endpoint::post(
            "/mlog/url",
            "https://interface3.music.163.com/eapi/mlog/video/url",
        )
        .rule(ParamRule::custom("mlogIds", mlog_ids))
        .rule(ParamRule::constant("scene", 0))
        .rule(ParamRule::optional("resolution", "1080").from("res"))
        .rule(ParamRule::constant("type", 1))
        .rule(ParamRule::constant("netstate", 1))
        .eapi("/api/mlog/video/url"),
        Endpoint::post(
            "/mlog/rcmd/feed/list",
            "https://interface.music.163.com/eapi/mlog/rcmd/feed/list",
        )
        .rule(ParamRule::required("id"))
        .rule(ParamRule::constant("type", 2))
        .rule(ParamRule::constant("rcmdType", 20))
        .rule(ParamRule::optional("limit", 10))
        .rule(ParamRule::custom("extInfo", mlog_ext_info))
        .eapi("/api/mlog/rcmd/feed/list"),
        Endpoint::post("/dj/detail", "https://music.163.com/weapi/djradio/get")
            .rule(ParamRule::required("id").from("rid"))
            .weapi(),
        Endpoint::post("/dj/program", "https://music.163.com/weapi/dj/program/byradio")
            .rule(ParamRule::required("radioId").from("rid"))
            .rule(ParamRule::optional("limit", 30))
            .rule(ParamRule::optional("offset", 0))
            .rule(ParamRule::optional("asc", "false"))
            .weapi(),
        Endpoint::post("/dj/toplist", "https://music.163.com/api/djradio/toplist")
            .rule(ParamRule::optional("limit", 100))
            .rule(ParamRule::optional("offset", 0))
            .rule(ParamRule::optional("type", "new").transform(dj_toplist_type))
            .weapi(),
        Endpoint::post("/banner", "https://music.163.com/api/v2/banner/get")
            .rule(
                ParamRule::optional("clientType", 0)
                    .from("type")
                    .transform(banner_client),
            )
            .linuxapi(),
        Endpoint::post(
            "/aidj/content/rcmd",
            "https://interface3.music.163.com/eapi/aidj/content/rcmd/info",
        )
        .rule(ParamRule::custom("extInfo", aidj_ext_info))
        .eapi("/api/aidj/content/rcmd/info"),
        // forwards every `/api/...` query key as one eapi call
        Endpoint::post("/batch", "http://music.163.com/eapi/batch")
            .body_with(batch_body)
            .eapi("/api/batch"),
    ]
}
