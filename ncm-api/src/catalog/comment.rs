//! Comments and resource likes.
//!
//! Threads are addressed as `<type prefix><resource id>`, e.g. `R_SO_4_347230`
//! for the comments of song 347230. Events (type `6`) already carry a full
//! `threadId`.

use super::transform::{comment_type, lookup, resource_type, thread_id};
use crate::endpoint::Endpoint;
use crate::error::{NeteaseError, Result};
use crate::query::{Param, Query};
use crate::rule::{Body, ParamRule};

/// `add` / `delete` / `reply` by `t` = 1 / 0 / other.
fn comment_url(q: &Query) -> Result<String> {
    let op = match q.require("t")?.to_string().as_str() {
        "1" => "add",
        "0" => "delete",
        _ => "reply",
    };
    Ok(format!("https://music.163.com/weapi/resource/comments/{op}"))
}

fn like_url(q: &Query) -> Result<String> {
    let op = if q.require("t")?.to_string() == "1" { "like" } else { "unlike" };
    Ok(format!("https://music.163.com/weapi/v1/comment/{op}"))
}

fn resource_like_url(q: &Query) -> Result<String> {
    let op = if q.require("t")?.to_string() == "1" { "like" } else { "unlike" };
    Ok(format!("https://music.163.com/weapi/resource/{op}"))
}

/// Thread of a regular resource, without the event shortcut.
fn comment_thread(q: &Query) -> Result<Param> {
    let prefix = lookup(q, "type", comment_type)?;
    Ok(Param::Str(format!("{prefix}{}", q.require("id")?)))
}

fn comment_like_thread(q: &Query) -> Result<Param> {
    thread_id(q, comment_type)
}

fn resource_like_thread(q: &Query) -> Result<Param> {
    thread_id(q, resource_type)
}

/// Paging cursor for the v2 comment list.
///
/// Sort type `3` (by time) pages with the caller's `cursor` (default `0`);
/// the others page by offset, `(pageNo - 1) * pageSize`, prefixed with
/// `normalHot#` for sort type `2` (by heat). Absent paging keys take the same
/// defaults as their own rules.
fn comment_cursor(q: &Query) -> Result<Param> {
    let sort = q.get_or("sortType", 1).to_string();
    if sort == "3" {
        return Ok(q.get_or("cursor", 0));
    }
    let number = |key: &str, default: i64| {
        let value = q.get_or(key, default);
        value.as_i64().ok_or_else(|| NeteaseError::invalid(key, &value))
    };
    let page_no = number("pageNo", 1)?;
    let page_size = number("pageSize", 20)?;
    let offset = page_no
        .checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(page_size))
        .ok_or_else(|| NeteaseError::invalid("pageNo", page_no))?;
    let prefix = if sort == "2" { "normalHot#" } else { "" };
    Ok(Param::Str(format!("{prefix}{offset}")))
}

/// Body of `/comment`, whose fields depend on the operation `t`.
fn comment_body(q: &Query) -> Result<Body> {
    let mut body = Body::new();
    body.insert("threadId".into(), comment_thread(q)?.into());
    let t = q.require("t")?;
    let (comment_id, content) = match t.to_string().as_str() {
        "0" => (true, false),
        "1" => (false, true),
        "2" => (true, true),
        _ => return Err(NeteaseError::invalid("t", t)),
    };
    if comment_id {
        body.insert("commentId".into(), q.require("commentId")?.clone().into());
    }
    if content {
        body.insert("content".into(), q.require("content")?.clone().into());
    }
    Ok(body)
}

pub(super) fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::post_dynamic("/comment", comment_url)
            .body_with(comment_body)
            .weapi()
            .cookie("os", "pc"),
        Endpoint::post("/comment/new", "https://music.163.com/api/v2/resource/comments")
            .rule(ParamRule::custom("threadId", comment_thread))
            .rule(ParamRule::custom("cursor", comment_cursor))
            .rule(ParamRule::optional("pageNo", 1))
            .rule(ParamRule::optional("pageSize", 20))
            .rule(ParamRule::optional("showInner", true))
            .rule(ParamRule::optional("sortType", 1))
            .eapi("/api/v2/resource/comments")
            .cookie("os", "pc"),
        Endpoint::post(
            "/comment/floor",
            "https://music.163.com/api/resource/comment/floor/get",
        )
        .rule(ParamRule::custom("threadId", comment_thread))
        .rule(ParamRule::required("parentCommentId"))
        .rule(ParamRule::optional("time", -1))
        .rule(ParamRule::optional("limit", 20))
        .weapi(),
        Endpoint::post_dynamic("/comment/like", like_url)
            .rule(ParamRule::required("commentId").from("cid"))
            .rule(ParamRule::custom("threadId", comment_like_thread))
            .weapi()
            .cookie("os", "pc"),
        Endpoint::post_dynamic("/resource/like", resource_like_url)
            .rule(ParamRule::custom("threadId", resource_like_thread))
            .weapi()
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
    fn comment_operations() {
        let ep = find("/comment");
        let base = Query::new().with("type", 0).with("id", 347_230);

        let add = base.clone().with("t", 1).with("content", "nice");
        assert!(ep.resolve_url(&add).unwrap().ends_with("/comments/add"));
        assert_eq!(
            Value::Object(ep.resolve_body(&add).unwrap()),
            json!({ "threadId": "R_SO_4_347230", "content": "nice" })
        );

        let delete = base.clone().with("t", 0).with("commentId", 9);
        assert!(ep.resolve_url(&delete).unwrap().ends_with("/comments/delete"));
        assert_eq!(
            Value::Object(ep.resolve_body(&delete).unwrap()),
            json!({ "threadId": "R_SO_4_347230", "commentId": 9 })
        );

        let reply = base.clone().with("t", 2).with("commentId", 9).with("content", "re");
        assert!(ep.resolve_url(&reply).unwrap().ends_with("/comments/reply"));
        assert_eq!(ep.resolve_body(&reply).unwrap().len(), 3);

        let bogus = base.with("t", 5);
        assert!(matches!(
            ep.resolve_body(&bogus),
            Err(NeteaseError::InvalidParameter { ref name, .. }) if name == "t"
        ));
    }

    #[test]
    fn cursor_by_sort_type() {
        let q = Query::new().with("type", 0).with("id", 1);
        assert_eq!(comment_cursor(&q).unwrap(), Param::Str("0".into()));

        let q2 = q.clone().with("sortType", 2).with("pageNo", 3).with("pageSize", 30);
        assert_eq!(comment_cursor(&q2).unwrap(), Param::Str("normalHot#60".into()));

        let q3 = q.clone().with("sortType", "3").with("cursor", "1602072870260");
        assert_eq!(comment_cursor(&q3).unwrap(), Param::Str("1602072870260".into()));
        assert_eq!(comment_cursor(&q.clone().with("sortType", 3)).unwrap(), Param::Int(0));

        let bad = q.with("pageNo", "first");
        assert!(matches!(
            comment_cursor(&bad),
            Err(NeteaseError::InvalidParameter { ref name, .. }) if name == "pageNo"
        ));
    }

    #[test]
    fn cursor_offset_overflow_is_rejected() {
        let ep = find("/comment/new");
        let base = Query::new().with("type", 0).with("id", 1);
        for q in [
            base.clone().with("pageNo", i64::MIN).with("pageSize", 20),
            base.clone().with("pageNo", i64::MAX).with("pageSize", 20),
        ] {
            let err = ep.resolve_body(&q).unwrap_err();
            assert!(
                matches!(err, NeteaseError::InvalidParameter { ref name, .. } if name == "pageNo")
            );
            assert!(err.is_configuration());
        }

        let bad_size = base.with("pageNo", 2).with("pageSize", "many");
        assert!(matches!(
            ep.resolve_body(&bad_size),
            Err(NeteaseError::InvalidParameter { ref name, .. }) if name == "pageSize"
        ));
    }

    #[test]
    fn new_comments_body_in_rule_order() {
        let q = Query::new().with("type", 1).with("id", 5_436_712).with("pageNo", 2);
        let body = find("/comment/new").resolve_body(&q).unwrap();
        assert_eq!(
            body.keys().map(String::as_str).collect::<Vec<_>>(),
            ["threadId", "cursor", "pageNo", "pageSize", "showInner", "sortType"]
        );
        assert_eq!(body["threadId"], "R_MV_5_5436712");
        assert_eq!(body["cursor"], "20");
    }

    #[test]
    fn comment_like_event_thread() {
        let ep = find("/comment/like");
        let q = Query::new()
            .with("t", 1)
            .with("type", 6)
            .with("cid", 1_535_550_516)
            .with("threadId", "A_EV_2_6559519868_32953014");
        assert!(ep.resolve_url(&q).unwrap().ends_with("/v1/comment/like"));
        let body = ep.resolve_body(&q).unwrap();
        assert_eq!(body["commentId"], 1_535_550_516);
        assert_eq!(body["threadId"], "A_EV_2_6559519868_32953014");
    }

    #[test]
    fn resource_like_rejects_unlikable_type() {
        let q = Query::new().with("t", 1).with("type", 0).with("id", 1);
        assert!(matches!(
            find("/resource/like").resolve_body(&q),
            Err(NeteaseError::InvalidParameter { ref name, .. }) if name == "type"
        ));
    }
}
