//! Single tracks: playback URLs, metadata, lyrics, likes, FM and scrobbling.

use super::transform::{json_array, scrobble_logs, song_detail_ids};
use crate::crypto;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::query::{Param, Query};
use crate::rule::ParamRule;

fn fm_trash_url(q: &Query) -> Result<String> {
    Ok(format!(
        "https://music.163.com/weapi/radio/trash/add?alg=RT&songId={}&time={}",
        q.require("id")?,
        q.get_or("time", 25)
    ))
}

/// Seed track for intelligence mode: `sid` when given, else the current `id`.
fn start_music_id(q: &Query) -> Result<Param> {
    q.get("sid").map_or_else(|| q.require("id").cloned(), |sid| Ok(sid.clone()))
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        // `_ntes_nuid` is a random device id drawn once, when the catalog is
        // built, and reused by every call through this catalog
        Endpoint::post(
            "/song/url",
            "https://interface3.music.163.com/eapi/song/enhance/player/url",
        )
        .rule(ParamRule::required("ids").from("id").transform(json_array))
        .rule(ParamRule::optional("br", 999_000))
        .eapi("/api/song/enhance/player/url")
        .cookie("os", "pc")
        .cookie("_ntes_nuid", crypto::random_hex(16)),
        Endpoint::post(
            "/song/url/v1",
            "https://interface.music.163.com/eapi/song/enhance/player/url/v1",
        )
        .rule(ParamRule::required("ids").from("id").transform(json_array))
        .rule(ParamRule::optional("level", "exhigh"))
        .rule(ParamRule::constant("encodeType", "flac"))
        .rule(ParamRule::constant("immerseType", "c51"))
        .eapi("/api/song/enhance/player/url/v1")
        .cookie("os", "android")
        .cookie("appver", "8.10.05"),
        Endpoint::post("/song/detail", "https://music.163.com/weapi/v3/song/detail")
            .rule(ParamRule::required("c").from("ids").transform(song_detail_ids))
            .rule(ParamRule::required("ids").transform(json_array))
            .weapi(),
        Endpoint::post("/lyric", "https://music.163.com/api/song/lyric?_nmclfl=1")
            .rule(ParamRule::required("id"))
            .rule(ParamRule::constant("lv", "-1"))
            .rule(ParamRule::constant("kv", "-1"))
            .rule(ParamRule::constant("rv", "-1"))
            .rule(ParamRule::constant("tv", "-1"))
            .linuxapi()
            .cookie("os", "ios"),
        Endpoint::post(
            "/lyric/new",
            "https://interface3.music.163.com/eapi/song/lyric/v1",
        )
        .rule(ParamRule::required("id"))
        .rule(ParamRule::constant("cp", false))
        .rule(ParamRule::constant("tv", "0"))
        .rule(ParamRule::constant("lv", "0"))
        .rule(ParamRule::constant("rv", "0"))
        .rule(ParamRule::constant("kv", "0"))
        .rule(ParamRule::constant("yv", "0"))
        .rule(ParamRule::constant("ytv", "0"))
        .rule(ParamRule::constant("yrv", "0"))
        .eapi("/api/song/lyric/v1"),
        // backs the `/check/music` adapter
        Endpoint::post(
            "/check/music",
            "https://music.163.com/weapi/song/enhance/player/url",
        )
        .rule(ParamRule::required("ids").from("id").transform(json_array))
        .rule(ParamRule::optional("br", 999_000))
        .weapi(),
        Endpoint::post("/like", "https://music.163.com/api/radio/like")
            .rule(ParamRule::constant("alg", "itembased"))
            .rule(ParamRule::required("trackId").from("id"))
            .rule(ParamRule::required("like"))
            .rule(ParamRule::constant("time", "3"))
            .weapi()
            .cookie("os", "pc")
            .cookie("appver", "2.7.1.198277"),
        Endpoint::post_dynamic("/fm_trash", fm_trash_url)
            .rule(ParamRule::required("songId").from("id"))
            .weapi(),
        Endpoint::post("/personal_fm", "https://music.163.com/weapi/v1/radio/get").weapi(),
        Endpoint::post("/scrobble", "https://music.163.com/weapi/feedback/weblog")
            .rule(ParamRule::custom("logs", scrobble_logs))
            .weapi(),
        Endpoint::post(
            "/song/wiki/summary",
            "https://interface3.music.163.com/eapi/music/wiki/home/song/get",
        )
        .rule(ParamRule::required("songId").from("id"))
        .eapi("/api/song/play/about/block/page"),
        Endpoint::post(
            "/playmode/intelligence/list",
            "https://interface.music.163.com/eapi/playmode/intelligence/list",
        )
        .rule(ParamRule::required("songId").from("id"))
        .rule(ParamRule::required("playlistId").from("pid"))
        .rule(ParamRule::constant("type", "fromPlayAll"))
        .rule(ParamRule::custom("startMusicId", start_music_id))
        .rule(ParamRule::optional("count", 1))
        .eapi("/api/playmode/intelligence/list"),
        Endpoint::post(
            "/recommend/songs",
            "https://music.163.com/api/v3/discovery/recommend/songs",
        )
        .weapi()
        .cookie("os", "ios"),
    ]
}
