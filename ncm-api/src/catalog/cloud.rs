//! Cloud drive: listing, deletion, and the upload handshake
//! (`/cloud/upload/check` → `/cloud/upload/token` → `/upload/cloud/info` →
//! `/cloud/pub`).

use super::transform::json_array;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::query::{Param, Query};
use crate::rule::ParamRule;
use std::path::Path;

const DESKTOP_APPVER: &str = "2.7.1.198277";

/// File name without directory or extension.
fn upload_file_stem(q: &Query) -> Result<Param> {
    let name = q.require("filename")?.to_string();
    let stem = Path::new(&name)
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    Ok(stem.into())
}

/// Upload endpoints impersonate the desktop client.
fn desktop(endpoint: Endpoint) -> Endpoint {
    endpoint.weapi().cookie("os", "pc").cookie("appver", DESKTOP_APPVER)
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::post("/user/cloud", "https://music.163.com/api/v1/cloud/get")
            .rule(ParamRule::optional("limit", 30))
            .rule(ParamRule::optional("offset", 0))
            .weapi(),
        desktop(
            Endpoint::post("/user/cloud/del", "https://music.163.com/weapi/cloud/del").rule(
                ParamRule::required("songIds")
                    .from("id")
                    .transform(json_array),
            ),
        ),
        desktop(
            Endpoint::post(
                "/cloud/upload/check",
                "https://interface.music.163.com/api/cloud/upload/check",
            )
            .rule(ParamRule::optional("bitrate", "999000"))
            .rule(ParamRule::constant("ext", ""))
            .rule(ParamRule::required("length").from("size"))
            .rule(ParamRule::required("md5"))
            .rule(ParamRule::constant("songId", "0"))
            .rule(ParamRule::constant("version", 1)),
        ),
        desktop(
            Endpoint::post(
                "/cloud/upload/token",
                "https://music.163.com/weapi/nos/token/alloc",
            )
            .rule(ParamRule::constant(
                "bucket",
                "jd-musicrep-privatecloud-audio-public",
            ))
            .rule(ParamRule::optional("ext", "mp3"))
            .rule(ParamRule::custom("filename", upload_file_stem))
            .rule(ParamRule::constant("local", false))
            .rule(ParamRule::constant("nos_product", 3))
            .rule(ParamRule::constant("type", "audio"))
            .rule(ParamRule::required("md5")),
        ),
        desktop(
            Endpoint::post(
                "/upload/cloud/info",
                "https://music.163.com/api/upload/cloud/info/v2",
            )
            .rule(ParamRule::required("md5"))
            .rule(ParamRule::required("songid").from("songId"))
            .rule(ParamRule::required("filename"))
            .rule(ParamRule::required("song"))
            .rule(ParamRule::optional("album", "未知专辑"))
            .rule(ParamRule::optional("artist", "未知艺术家"))
            .rule(ParamRule::required("bitrate"))
            .rule(ParamRule::required("resourceId")),
        ),
        desktop(
            Endpoint::post("/cloud/pub", "https://interface.music.163.com/api/cloud/pub/v2")
                .rule(ParamRule::required("songid")),
        ),
        Endpoint::post(
            "/cloud/lyric",
            "https://interface.music.163.com/eapi/cloud/lyric/get",
        )
        .rule(ParamRule::required("songId").from("id"))
        .rule(ParamRule::required("userId"))
        .rule(ParamRule::constant("lv", "0"))
        .rule(ParamRule::constant("kv", "0"))
        .rule(ParamRule::constant("tv", "0"))
        .eapi("/api/cloud/lyric/get")
        .cookie("os", "pc"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn find(route: &str) -> Endpoint {
        endpoints().into_iter().find(|e| e.route() == route).unwrap()
    }

    #[test]
    fn token_uses_file_stem() {
        let q = Query::new()
            .with("filename", "/music/Artist - Title.flac")
            .with("md5", "d41d8cd98f00b204e9800998ecf8427e")
            .with("ext", "flac");
        let body = find("/cloud/upload/token").resolve_body(&q).unwrap();
        assert_eq!(body["filename"], "Artist - Title");
        assert_eq!(body["ext"], "flac");
        assert_eq!(body["bucket"], "jd-musicrep-privatecloud-audio-public");
        assert_eq!(body["local"], false);
    }

    #[test]
    fn upload_info_defaults_unknown_album_and_artist() {
        let q = Query::new()
            .with("md5", "m")
            .with("songId", "123")
            .with("filename", "f")
            .with("song", "s")
            .with("bitrate", 320_000)
            .with("resourceId", 9);
        assert_eq!(
            Value::Object(find("/upload/cloud/info").resolve_body(&q).unwrap()),
            json!({
                "md5": "m",
                "songid": "123",
                "filename": "f",
                "song": "s",
                "album": "未知专辑",
                "artist": "未知艺术家",
                "bitrate": 320_000,
                "resourceId": 9,
            })
        );
    }

    #[test]
    fn delete_wraps_ids() {
        let body = find("/user/cloud/del")
            .resolve_body(&Query::new().with("id", "1, 2"))
            .unwrap();
        assert_eq!(body["songIds"], "[1,2]");
        let ep = find("/user/cloud/del");
        assert_eq!(ep.options().cookies["appver"], DESKTOP_APPVER);
    }
}
