use crate::endpoint::{Endpoint, UserAgent};
use crate::error::Result;
use crate::query::Query;
use crate::rule::ParamRule;

fn suggest_url(q: &Query) -> Result<String> {
    let kind = if q.text("type") == "mobile" { "keyword" } else { "web" };
    Ok(format!("https://music.163.com/weapi/search/suggest/{kind}"))
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::post(
            "/cloudsearch",
            "https://interface.music.163.com/eapi/cloudsearch/pc",
        )
        .rule(ParamRule::required("s").from("keywords"))
        .rule(ParamRule::optional("type", 1))
        .rule(ParamRule::optional("limit", 30))
        .rule(ParamRule::optional("offset", 0))
        .rule(ParamRule::constant("total", true))
        .eapi("/api/cloudsearch/pc"),
        Endpoint::post("/search/hot", "https://music.163.com/weapi/search/hot")
            .rule(ParamRule::constant("type", 1111))
            .weapi()
            .user_agent(UserAgent::Mobile),
        Endpoint::post_dynamic("/search/suggest", suggest_url)
            .rule(ParamRule::required("s").from("keywords"))
            .weapi(),
    ]
}
