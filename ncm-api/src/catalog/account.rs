//! Login family, logout, and the current user's profile and subscriptions.

use super::transform::login_password;
use crate::endpoint::{Endpoint, UserAgent};
use crate::error::Result;
use crate::query::Query;
use crate::rule::ParamRule;

fn user_detail_url(q: &Query) -> Result<String> {
    Ok(format!(
        "https://music.163.com/weapi/v1/user/detail/{}",
        q.require("uid")?
    ))
}

/// `limit`/`offset` paging plus `total: true`, shared by the sublists.
fn sublist(route: &str, url: &str, limit: i32) -> Endpoint {
    Endpoint::post(route, url)
        .rule(ParamRule::optional("limit", limit))
        .rule(ParamRule::optional("offset", 0))
        .rule(ParamRule::constant("total", true))
        .weapi()
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        // email login; the adapter rewrites bad-credential replies
        Endpoint::post("/login", "https://interface.music.163.com/eapi/w/login")
            .rule(ParamRule::required("username").from("email"))
            .rule(ParamRule::custom("password", login_password))
            .rule(ParamRule::constant("remember", true))
            .rule(ParamRule::constant("type", 0))
            .rule(ParamRule::constant("https", true))
            .weapi()
            .cookie("os", "pc")
            .cookie("appver", "2.9.8")
            .user_agent(UserAgent::Pc),
        Endpoint::post(
            "/login/cellphone",
            "https://interface.music.163.com/eapi/w/login/cellphone",
        )
        .rule(ParamRule::required("phone"))
        .rule(ParamRule::optional("countrycode", ""))
        .rule(ParamRule::custom("password", login_password))
        .rule(ParamRule::constant("rememberLogin", true))
        .rule(ParamRule::constant("type", 1))
        .rule(ParamRule::constant("https", true))
        .eapi("/api/w/login/cellphone"),
        Endpoint::post(
            "/login/qr/key",
            "https://interface.music.163.com/eapi/login/qrcode/unikey",
        )
        .rule(ParamRule::constant("type", 3))
        .eapi("/api/login/qrcode/unikey"),
        Endpoint::post(
            "/login/qr/check",
            "https://interface.music.163.com/eapi/login/qrcode/client/login",
        )
        .rule(ParamRule::required("key"))
        .rule(ParamRule::constant("type", 3))
        .eapi("/api/login/qrcode/client/login"),
        Endpoint::post("/logout", "https://music.163.com/weapi/logout")
            .weapi()
            .user_agent(UserAgent::Pc),
        // JSON account lookup; `/login/status` is the scraping variant
        Endpoint::post(
            "/user/account",
            "https://music.163.com/weapi/w/nuser/account/get",
        )
        .weapi(),
        Endpoint::post_dynamic("/user/detail", user_detail_url).weapi(),
        Endpoint::post("/user/playlist", "https://music.163.com/api/user/playlist")
            .rule(ParamRule::required("uid"))
            .rule(ParamRule::optional("limit", 30))
            .rule(ParamRule::constant("includeVideo", true))
            .rule(ParamRule::optional("offset", 0))
            .weapi(),
        Endpoint::post("/user/record", "https://music.163.com/weapi/v1/play/record")
            .rule(ParamRule::required("uid"))
            .rule(ParamRule::optional("type", 0))
            .weapi(),
        Endpoint::post("/daily_signin", "https://music.163.com/weapi/point/dailyTask")
            .rule(ParamRule::optional("type", 0))
            .weapi(),
        Endpoint::post("/likelist", "https://music.163.com/weapi/song/like/get")
            .rule(ParamRule::required("uid"))
            .weapi(),
        sublist("/artist/sublist", "https://music.163.com/weapi/artist/sublist", 25),
        sublist("/album/sublist", "https://music.163.com/weapi/album/sublist", 25),
        sublist("/dj/sublist", "https://music.163.com/weapi/djradio/get/subed", 30),
    ]
}
