//! Passive replies and their wire encoding.
//!
//! Every free-text field of a reply is a [`CData`]. The XML encoder writes
//! `CData` values as CDATA sections (splitting any embedded `]]>`), so content
//! such as `<b>&amp;` reaches the platform verbatim instead of being parsed as
//! markup. The JSON encoder writes them as ordinary strings.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::Writer;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{PortalError, Result};
use crate::protocol::inbound::{msg_type, Header};
use crate::protocol::WireFormat;

/// Upper bound on articles in a single news reply.
pub const MAX_NEWS_ARTICLES: usize = 8;

const CDATA_END: &str = "]]>";

/// Free text written as character data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CData(String);

impl CData {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CData {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CData {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Serialize for CData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Reply header: the inbound sender becomes the recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyHeader {
    pub to_user: CData,
    pub from_user: CData,
    pub create_time: i64,
}

impl ReplyHeader {
    /// Swap the inbound users and stamp the current time.
    pub fn answering(inbound: &Header) -> Self {
        Self {
            to_user: CData::new(inbound.from_user.as_str()),
            from_user: CData::new(inbound.to_user.as_str()),
            create_time: unix_now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Music {
    pub title: CData,
    pub description: CData,
    pub music_url: CData,
    pub hq_music_url: CData,
    pub thumb_media_id: CData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: CData,
    pub description: CData,
    pub pic_url: CData,
    pub url: CData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Text { content: CData },
    Image { media_id: CData },
    Voice { media_id: CData },
    Video { media_id: CData, title: CData, description: CData },
    Music(Music),
    News { articles: Vec<Article> },
}

impl ReplyBody {
    pub fn msg_type(&self) -> &'static str {
        match self {
            ReplyBody::Text { .. } => msg_type::TEXT,
            ReplyBody::Image { .. } => msg_type::IMAGE,
            ReplyBody::Voice { .. } => msg_type::VOICE,
            ReplyBody::Video { .. } => msg_type::VIDEO,
            ReplyBody::Music(_) => msg_type::MUSIC,
            ReplyBody::News { .. } => msg_type::NEWS,
        }
    }
}

/// A passive reply to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyMessage {
    pub header: ReplyHeader,
    pub body: ReplyBody,
}

impl ReplyMessage {
    pub fn answering(inbound: &Header, body: ReplyBody) -> Self {
        Self {
            header: ReplyHeader::answering(inbound),
            body,
        }
    }

    pub fn text(inbound: &Header, content: impl Into<String>) -> Self {
        Self::answering(
            inbound,
            ReplyBody::Text {
                content: CData::new(content),
            },
        )
    }
}

/// Serialize a reply in the conversation's wire format.
pub fn encode(reply: &ReplyMessage, format: WireFormat) -> Result<Bytes> {
    if let ReplyBody::News { articles } = &reply.body {
        if articles.is_empty() || articles.len() > MAX_NEWS_ARTICLES {
            return Err(PortalError::Internal(format!(
                "news reply must hold 1..={MAX_NEWS_ARTICLES} articles, got {}",
                articles.len()
            )));
        }
    }
    match format {
        WireFormat::Xml => encode_xml(reply),
        WireFormat::Json => encode_json(reply),
    }
}

fn encode_xml(reply: &ReplyMessage) -> Result<Bytes> {
    let h = &reply.header;
    let mut out = XmlOut::new();
    out.open("xml")?;
    out.cdata("ToUserName", &h.to_user)?;
    out.cdata("FromUserName", &h.from_user)?;
    out.text("CreateTime", &h.create_time.to_string())?;
    out.cdata("MsgType", &CData::from(reply.body.msg_type()))?;

    match &reply.body {
        ReplyBody::Text { content } => out.cdata("Content", content)?,
        ReplyBody::Image { media_id } => {
            out.open("Image")?;
            out.cdata("MediaId", media_id)?;
            out.close("Image")?;
        }
        ReplyBody::Voice { media_id } => {
            out.open("Voice")?;
            out.cdata("MediaId", media_id)?;
            out.close("Voice")?;
        }
        ReplyBody::Video {
            media_id,
            title,
            description,
        } => {
            out.open("Video")?;
            out.cdata("MediaId", media_id)?;
            out.cdata("Title", title)?;
            out.cdata("Description", description)?;
            out.close("Video")?;
        }
        ReplyBody::Music(m) => {
            out.open("Music")?;
            out.cdata("Title", &m.title)?;
            out.cdata("Description", &m.description)?;
            out.cdata("MusicUrl", &m.music_url)?;
            out.cdata("HQMusicUrl", &m.hq_music_url)?;
            out.cdata("ThumbMediaId", &m.thumb_media_id)?;
            out.close("Music")?;
        }
        ReplyBody::News { articles } => {
            out.text("ArticleCount", &articles.len().to_string())?;
            out.open("Articles")?;
            for a in articles {
                out.open("item")?;
                out.cdata("Title", &a.title)?;
                out.cdata("Description", &a.description)?;
                out.cdata("PicUrl", &a.pic_url)?;
                out.cdata("Url", &a.url)?;
                out.close("item")?;
            }
            out.close("Articles")?;
        }
    }

    out.close("xml")?;
    Ok(out.finish())
}

fn encode_json(reply: &ReplyMessage) -> Result<Bytes> {
    let h = &reply.header;
    let mut obj = Map::new();
    obj.insert("ToUserName".into(), json!(h.to_user));
    obj.insert("FromUserName".into(), json!(h.from_user));
    obj.insert("CreateTime".into(), json!(h.create_time));
    obj.insert("MsgType".into(), json!(reply.body.msg_type()));

    match &reply.body {
        ReplyBody::Text { content } => {
            obj.insert("Content".into(), json!(content));
        }
        ReplyBody::Image { media_id } => {
            obj.insert("Image".into(), json!({ "MediaId": media_id }));
        }
        ReplyBody::Voice { media_id } => {
            obj.insert("Voice".into(), json!({ "MediaId": media_id }));
        }
        ReplyBody::Video {
            media_id,
            title,
            description,
        } => {
            obj.insert(
                "Video".into(),
                json!({ "MediaId": media_id, "Title": title, "Description": description }),
            );
        }
        ReplyBody::Music(m) => {
            obj.insert(
                "Music".into(),
                json!({
                    "Title": m.title,
                    "Description": m.description,
                    "MusicUrl": m.music_url,
                    "HQMusicUrl": m.hq_music_url,
                    "ThumbMediaId": m.thumb_media_id,
                }),
            );
        }
        ReplyBody::News { articles } => {
            let items: Vec<Value> = articles
                .iter()
                .map(|a| {
                    json!({
                        "Title": a.title,
                        "Description": a.description,
                        "PicUrl": a.pic_url,
                        "Url": a.url,
                    })
                })
                .collect();
            obj.insert("ArticleCount".into(), json!(articles.len()));
            obj.insert("Articles".into(), json!({ "item": items }));
        }
    }

    serde_json::to_vec(&Value::Object(obj))
        .map(Bytes::from)
        .map_err(|e| PortalError::Internal(format!("reply json encode failed: {e}")))
}

/// Minimal element writer shared by the reply and wire encoders.
pub(crate) struct XmlOut {
    w: Writer<Vec<u8>>,
}

impl XmlOut {
    pub(crate) fn new() -> Self {
        Self {
            w: Writer::new(Vec::with_capacity(256)),
        }
    }

    fn emit(&mut self, ev: XmlEvent<'_>) -> Result<()> {
        self.w
            .write_event(ev)
            .map_err(|e| PortalError::Internal(format!("reply xml encode failed: {e}")))
    }

    pub(crate) fn open(&mut self, name: &str) -> Result<()> {
        self.emit(XmlEvent::Start(BytesStart::new(name)))
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<()> {
        self.emit(XmlEvent::End(BytesEnd::new(name)))
    }

    /// Escaped text element, for numeric and other markup-free values.
    pub(crate) fn text(&mut self, name: &str, value: &str) -> Result<()> {
        self.open(name)?;
        self.emit(XmlEvent::Text(BytesText::new(value)))?;
        self.close(name)
    }

    /// Character data element. `]]>` cannot appear inside one CDATA section,
    /// so it is split across two adjacent sections.
    pub(crate) fn cdata(&mut self, name: &str, value: &CData) -> Result<()> {
        self.open(name)?;
        for chunk in cdata_chunks(value.as_str()) {
            self.emit(XmlEvent::CData(BytesCData::new(chunk)))?;
        }
        self.close(name)
    }

    pub(crate) fn finish(self) -> Bytes {
        Bytes::from(self.w.into_inner())
    }
}

/// Split text into CDATA section bodies so no section contains `]]>`.
pub(crate) fn cdata_chunks(value: &str) -> Vec<String> {
    let parts: Vec<&str> = value.split(CDATA_END).collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut chunk = String::with_capacity(part.len() + 3);
            if i > 0 {
                chunk.push('>');
            }
            chunk.push_str(part);
            if i < last {
                chunk.push_str("]]");
            }
            chunk
        })
        .collect()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn header() -> Header {
        Header {
            to_user: "gh_app".into(),
            from_user: "o_user".into(),
            create_time: 1,
        }
    }

    fn xml_string(reply: &ReplyMessage) -> String {
        String::from_utf8(encode(reply, WireFormat::Xml).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn text_reply_swaps_users() {
        let reply = ReplyMessage::text(&header(), "hi");
        assert_eq!(reply.header.to_user.as_str(), "o_user");
        assert_eq!(reply.header.from_user.as_str(), "gh_app");
        assert!(reply.header.create_time > 0);
    }

    #[test]
    fn cdata_terminator_is_split() {
        let reply = ReplyMessage::text(&header(), "a]]>b");
        let xml = xml_string(&reply);
        assert!(xml.contains("<Content><![CDATA[a]]]]><![CDATA[>b]]></Content>"), "{xml}");
    }

    #[test]
    fn every_music_field_is_cdata() {
        let reply = ReplyMessage::answering(
            &header(),
            ReplyBody::Music(Music {
                title: "<t>".into(),
                description: "d&d".into(),
                music_url: "http://m/?a=1&b=2".into(),
                hq_music_url: "http://hq".into(),
                thumb_media_id: "thumb".into(),
            }),
        );
        let xml = xml_string(&reply);
        assert!(xml.contains("<Title><![CDATA[<t>]]></Title>"));
        assert!(xml.contains("<Description><![CDATA[d&d]]></Description>"));
        assert!(xml.contains("<MusicUrl><![CDATA[http://m/?a=1&b=2]]></MusicUrl>"));
        assert!(xml.contains("<ThumbMediaId><![CDATA[thumb]]></ThumbMediaId>"));
    }

    #[test]
    fn news_reply_counts_articles() {
        let article = Article {
            title: "t".into(),
            description: "d".into(),
            pic_url: "p".into(),
            url: "u".into(),
        };
        let reply = ReplyMessage::answering(
            &header(),
            ReplyBody::News {
                articles: vec![article.clone(), article],
            },
        );
        let xml = xml_string(&reply);
        assert!(xml.contains("<ArticleCount>2</ArticleCount>"));
        assert_eq!(xml.matches("<item>").count(), 2);
    }

    #[test]
    fn news_reply_rejects_too_many_articles() {
        let article = Article {
            title: "t".into(),
            description: "d".into(),
            pic_url: "p".into(),
            url: "u".into(),
        };
        let reply = ReplyMessage::answering(
            &header(),
            ReplyBody::News {
                articles: vec![article; MAX_NEWS_ARTICLES + 1],
            },
        );
        let err = encode(&reply, WireFormat::Xml).unwrap_err();
        assert_eq!(err.client_code().as_str(), "INTERNAL");
    }

    #[test]
    fn json_reply_uses_plain_strings() {
        let reply = ReplyMessage::text(&header(), "<hello>");
        let bytes = encode(&reply, WireFormat::Json).unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["Content"], "<hello>");
        assert_eq!(v["MsgType"], "text");
        assert_eq!(v["ToUserName"], "o_user");
    }
}
