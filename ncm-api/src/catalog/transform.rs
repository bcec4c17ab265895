//! Value transformers, discriminant lookup tables and custom resolvers used by
//! the built-in catalog.
//!
//! Transformers return `None` for a value they have no mapping for; the rule
//! engine reports that as [`NeteaseError::InvalidParameter`].

use crate::error::{NeteaseError, Result};
use crate::query::{Param, Query};
use crate::rule::Transformer;
use serde_json::{Value, json};

/// `"1, 2,3"` → `"[1,2,3]"`; non-string values are wrapped as-is.
pub fn json_array(value: &Param) -> Option<Param> {
    let inner = match value {
        Param::Str(s) => s.replace(' ', ""),
        other => other.to_string(),
    };
    Some(Param::Str(format!("[{inner}]")))
}

/// `"1,2"` → `[{"id":1},{"id":2}]`, the `c` field of song detail.
pub fn song_detail_ids(value: &Param) -> Option<Param> {
    let items: Vec<String> = value
        .to_string()
        .split(',')
        .map(|id| format!("{{\"id\":{}}}", id.trim()))
        .collect();
    Some(Param::Str(format!("[{}]", items.join(","))))
}

/// Comment thread prefix for a resource type.
pub fn comment_type(value: &Param) -> Option<Param> {
    let prefix = match value.to_string().as_str() {
        "0" => "R_SO_4_",      // song
        "1" => "R_MV_5_",      // mv
        "2" => "A_PL_0_",      // playlist
        "3" => "R_AL_3_",      // album
        "4" => "A_DJ_1_",      // dj radio
        "5" => "R_VI_62_",     // video
        "6" => "A_EV_2_",      // event
        "7" => "R_MLOG_1001_", // mlog
        _ => return None,
    };
    Some(prefix.into())
}

/// Thread prefix for the resources that can be liked.
pub fn resource_type(value: &Param) -> Option<Param> {
    let prefix = match value.to_string().as_str() {
        "1" => "R_MV_5_",
        "4" => "A_DJ_1_",
        "5" => "R_VI_62_",
        "6" => "A_EV_2_",
        _ => return None,
    };
    Some(prefix.into())
}

pub fn banner_client(value: &Param) -> Option<Param> {
    let client = match value.to_string().as_str() {
        "0" => "pc",
        "1" => "android",
        "2" => "iphone",
        "3" => "ipad",
        _ => return None,
    };
    Some(client.into())
}

pub fn dj_toplist_type(value: &Param) -> Option<Param> {
    match value.to_string().as_str() {
        "new" => Some(Param::Int(0)),
        "hot" => Some(Param::Int(1)),
        _ => None,
    }
}

/// Official chart playlist ids, indexed by `idx`.
const TOPLIST_IDS: [i64; 37] = [
    3_779_629,     // new songs
    3_778_678,     // hot songs
    2_884_035,     // originals
    19_723_756,    // soaring
    10_520_166,    // electronic
    180_106,       // UK
    60_198,        // Billboard
    21_845_217,    // KTV
    11_641_012,    // iTunes
    120_001,       // Hit FM
    60_131,        // Oricon
    3_733_003,     // Melon
    60_255,        // Mnet
    46_772_709,    // Melon OST
    112_504,       // China TOP (HK/TW)
    64_016,        // China TOP (mainland)
    10_169_002,    // RTHK
    4_395_559,     // Chinese classics
    1_899_724,     // Chinese hip-hop
    27_135_204,    // NRJ EuroHot 30
    112_463,       // Hito
    3_812_895,     // Beatport
    71_385_702,    // ACG
    991_319_590,   // rap
    71_384_707,    // classical
    1_978_921_795, // electronic (new)
    2_250_011_882, // Douyin
    2_617_766_278, // new voices
    745_956_260,   // Korean
    2_023_401_535, // UK Q magazine
    2_006_508_653, // esports
    2_809_513_713, // western hot
    2_809_577_409, // western new
    2_847_251_561, // rap TOP
    3_001_835_560, // ACG anime
    3_001_795_926, // ACG games
    3_001_890_046, // VOCALOID
];

pub fn toplist_id(value: &Param) -> Option<Param> {
    let idx = usize::try_from(value.as_i64()?).ok()?;
    TOPLIST_IDS.get(idx).copied().map(Param::Int)
}

/// Artist-list initial: numeric values pass through, a letter becomes the
/// char code of its upper-case form.
pub fn artist_initial(value: &Param) -> Option<Param> {
    if let Some(n) = value.as_i64() {
        return Some(Param::Int(n));
    }
    let first = value.as_str()?.chars().next()?;
    let upper = first.to_uppercase().next()?;
    Some(Param::Int(i64::from(u32::from(upper))))
}

/// Apply a lookup table to `query[key]`, raising the same error the rule
/// engine would.
pub(crate) fn lookup(query: &Query, key: &str, table: Transformer) -> Result<Param> {
    let raw = query.require(key)?;
    table(raw).ok_or_else(|| NeteaseError::invalid(key, raw))
}

/// `<prefix for type><id>`, or the caller's raw `threadId` for events.
pub(crate) fn thread_id(query: &Query, table: Transformer) -> Result<Param> {
    if query.text("type") == "6" {
        return query.require("threadId").cloned();
    }
    let prefix = lookup(query, "type", table)?;
    Ok(Param::Str(format!("{prefix}{}", query.require("id")?)))
}

/// Lower-case hex MD5 of `password`, or the caller's `md5_password` when no
/// plain password is given.
pub(crate) fn login_password(query: &Query) -> Result<Param> {
    match (query.get("password"), query.get("md5_password")) {
        (None, Some(digest)) => Ok(digest.clone()),
        _ => {
            let plain = query.require("password")?.to_string();
            Ok(crate::crypto::md5_hex(plain.as_bytes()).into())
        }
    }
}

/// `{"e_r": true}` plus every `/api/...` key of the query, for `/batch`.
pub(crate) fn batch_body(query: &Query) -> Result<crate::rule::Body> {
    let mut body = crate::rule::Body::new();
    body.insert("e_r".into(), Value::Bool(true));
    for (key, value) in query.iter().filter(|(k, _)| k.starts_with("/api/")) {
        body.insert(key.to_owned(), value.clone().into());
    }
    Ok(body)
}

/// One "play ended" weblog entry, serialized as the JSON string the upstream
/// expects in `logs`.
pub(crate) fn scrobble_logs(query: &Query) -> Result<Param> {
    let entry = json!([{
        "action": "play",
        "json": {
            "id": Value::from(query.require("id")?.clone()),
            "sourceId": Value::from(query.require("sourceId")?.clone()),
            "time": Value::from(query.require("time")?.clone()),
            "download": 0,
            "end": "playend",
            "type": "song",
            "wifi": 0,
            "source": "list",
            "mainsite": 1,
            "content": "",
        },
    }]);
    Ok(Param::Str(serde_json::to_string(&entry)?))
}
