//! Inbound callback messages (XML / JSON).
//!
//! The platform pushes one loosely-typed record for every message and event
//! kind. Decoding happens in two steps: the body is parsed into a permissive
//! flat record (unknown elements ignored, every field optional), which is then
//! folded into [`InboundMessage`], a tagged union keyed by `MsgType` and, for
//! events, `Event`. Only the fields defined for a variant survive the fold.

use std::cell::OnceCell;

use quick_xml::events::{BytesCData, BytesText, Event as XmlEvent};
use quick_xml::{Reader, Writer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PortalError, Result};
use crate::protocol::reply::cdata_chunks;
use crate::protocol::WireFormat;

/// `MsgType` discriminator values.
pub mod msg_type {
    pub const TEXT: &str = "text";
    pub const IMAGE: &str = "image";
    pub const VOICE: &str = "voice";
    pub const VIDEO: &str = "video";
    pub const SHORT_VIDEO: &str = "shortvideo";
    pub const LOCATION: &str = "location";
    pub const LINK: &str = "link";
    pub const EVENT: &str = "event";
    /// Reply only.
    pub const MUSIC: &str = "music";
    /// Reply only.
    pub const NEWS: &str = "news";
}

/// `Event` discriminator values (case matters on the wire).
pub mod event_type {
    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const SCAN: &str = "SCAN";
    pub const LOCATION: &str = "LOCATION";
    pub const CLICK: &str = "CLICK";
    pub const VIEW: &str = "VIEW";
    pub const SCANCODE_PUSH: &str = "scancode_push";
    pub const SCANCODE_WAITMSG: &str = "scancode_waitmsg";
    pub const PIC_SYSPHOTO: &str = "pic_sysphoto";
    pub const PIC_PHOTO_OR_ALBUM: &str = "pic_photo_or_album";
    pub const PIC_WEIXIN: &str = "pic_weixin";
    pub const LOCATION_SELECT: &str = "location_select";
    pub const VIEW_MINIPROGRAM: &str = "view_miniprogram";
    pub const TEMPLATE_SEND_JOB_FINISH: &str = "TEMPLATESENDJOBFINISH";
    pub const MASS_SEND_JOB_FINISH: &str = "MASSSENDJOBFINISH";
    pub const PUBLISH_JOB_FINISH: &str = "PUBLISHJOBFINISH";
    pub const WXA_MEDIA_CHECK: &str = "wxa_media_check";
    pub const SUBSCRIBE_MSG_POPUP: &str = "subscribe_msg_popup_event";
    pub const WEAPP_AUDIT_SUCCESS: &str = "weapp_audit_success";
    pub const WEAPP_AUDIT_FAIL: &str = "weapp_audit_fail";
    pub const WEAPP_AUDIT_DELAY: &str = "weapp_audit_delay";
}

/// Prefix on `EventKey` when a not-yet-following user subscribes via a QR code.
pub const QR_SCENE_PREFIX: &str = "qrscene_";

// --------------------
// Typed model
// --------------------

/// Fields present on every inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Receiving account (the app).
    pub to_user: String,
    /// Sending user's open id.
    pub from_user: String,
    /// Unix seconds.
    pub create_time: i64,
}

impl Header {
    pub fn open_id(&self) -> &str {
        &self.from_user
    }
}

/// A decoded callback: common header + exactly one payload variant.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub header: Header,
    pub body: MessageBody,
}

impl InboundMessage {
    pub fn msg_type(&self) -> &str {
        self.body.msg_type()
    }
}

#[derive(Debug, Clone)]
pub enum MessageBody {
    Text(TextMessage),
    Image(ImageMessage),
    Voice(VoiceMessage),
    Video(VideoMessage),
    ShortVideo(VideoMessage),
    Location(LocationMessage),
    Link(LinkMessage),
    Event(Event),
    /// Forward-compatible catch-all; carries the raw `MsgType`.
    Unknown { msg_type: String },
}

impl MessageBody {
    pub fn msg_type(&self) -> &str {
        match self {
            MessageBody::Text(_) => msg_type::TEXT,
            MessageBody::Image(_) => msg_type::IMAGE,
            MessageBody::Voice(_) => msg_type::VOICE,
            MessageBody::Video(_) => msg_type::VIDEO,
            MessageBody::ShortVideo(_) => msg_type::SHORT_VIDEO,
            MessageBody::Location(_) => msg_type::LOCATION,
            MessageBody::Link(_) => msg_type::LINK,
            MessageBody::Event(_) => msg_type::EVENT,
            MessageBody::Unknown { msg_type } => msg_type,
        }
    }
}

/// Where a message was sent from when it originates in a published article.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSource {
    pub msg_data_id: String,
    /// 1-based article index within a multi-article post.
    pub idx: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextMessage {
    pub msg_id: i64,
    pub content: String,
    /// Set when the text is a tap on a menu inside a previous message.
    pub biz_msg_menu_id: Option<i64>,
    pub source: Option<ArticleSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageMessage {
    pub msg_id: i64,
    pub pic_url: String,
    pub media_id: String,
    pub source: Option<ArticleSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceMessage {
    pub msg_id: i64,
    pub media_id: String,
    pub format: String,
    /// Speech recognition result, when enabled for the account.
    pub recognition: Option<String>,
    pub media_id_16k: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMessage {
    pub msg_id: i64,
    pub media_id: String,
    pub thumb_media_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationMessage {
    pub msg_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub scale: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkMessage {
    pub msg_id: i64,
    pub title: String,
    pub description: String,
    pub url: String,
}

/// `Event` payloads.
#[derive(Debug, Clone)]
pub enum Event {
    /// Follow. `scene` is set when the follow came from a parametric QR code.
    Subscribe { scene: Option<SceneScan> },
    Unsubscribe,
    /// An existing follower scanned a parametric QR code.
    Scan(SceneScan),
    Location(LocationReport),
    Click { event_key: String },
    View { url: String, menu_id: Option<String> },
    ScanCodePush(ScanCodeEvent),
    ScanCodeWaitMsg(ScanCodeEvent),
    PicSysPhoto(PicEvent),
    PicPhotoOrAlbum(PicEvent),
    PicWeixin(PicEvent),
    LocationSelect(LocationSelectEvent),
    ViewMiniprogram { page_path: String, menu_id: Option<String> },
    TemplateSendJobFinish { msg_id: i64, status: String },
    MassSendJobFinish(MassSendReport),
    PublishJobFinish,
    WxaMediaCheck,
    SubscribeMsgPopup(PopupEvents),
    WeappAuditSuccess,
    WeappAuditFail,
    WeappAuditDelay,
    /// Forward-compatible catch-all; carries the raw `Event` name.
    Unknown { name: String },
}

impl Event {
    /// Wire name of the event.
    pub fn name(&self) -> &str {
        match self {
            Event::Subscribe { .. } => event_type::SUBSCRIBE,
            Event::Unsubscribe => event_type::UNSUBSCRIBE,
            Event::Scan(_) => event_type::SCAN,
            Event::Location(_) => event_type::LOCATION,
            Event::Click { .. } => event_type::CLICK,
            Event::View { .. } => event_type::VIEW,
            Event::ScanCodePush(_) => event_type::SCANCODE_PUSH,
            Event::ScanCodeWaitMsg(_) => event_type::SCANCODE_WAITMSG,
            Event::PicSysPhoto(_) => event_type::PIC_SYSPHOTO,
            Event::PicPhotoOrAlbum(_) => event_type::PIC_PHOTO_OR_ALBUM,
            Event::PicWeixin(_) => event_type::PIC_WEIXIN,
            Event::LocationSelect(_) => event_type::LOCATION_SELECT,
            Event::ViewMiniprogram { .. } => event_type::VIEW_MINIPROGRAM,
            Event::TemplateSendJobFinish { .. } => event_type::TEMPLATE_SEND_JOB_FINISH,
            Event::MassSendJobFinish(_) => event_type::MASS_SEND_JOB_FINISH,
            Event::PublishJobFinish => event_type::PUBLISH_JOB_FINISH,
            Event::WxaMediaCheck => event_type::WXA_MEDIA_CHECK,
            Event::SubscribeMsgPopup(_) => event_type::SUBSCRIBE_MSG_POPUP,
            Event::WeappAuditSuccess => event_type::WEAPP_AUDIT_SUCCESS,
            Event::WeappAuditFail => event_type::WEAPP_AUDIT_FAIL,
            Event::WeappAuditDelay => event_type::WEAPP_AUDIT_DELAY,
            Event::Unknown { name } => name,
        }
    }
}

/// Parametric QR code scan. `scene_key` has any `qrscene_` prefix removed.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneScan {
    pub scene_key: String,
    pub ticket: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    pub latitude: f64,
    pub longitude: f64,
    pub precision: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanCodeEvent {
    pub event_key: String,
    pub scan_type: String,
    pub scan_result: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PicEvent {
    pub event_key: String,
    pub count: u32,
    pub pic_md5_sums: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationSelectEvent {
    pub event_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub scale: f64,
    pub label: String,
    pub poi_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MassSendReport {
    pub msg_id: i64,
    pub status: String,
    pub total_count: i64,
    pub filter_count: i64,
    pub sent_count: i64,
    pub error_count: i64,
}

/// One template decision from a subscription popup.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeMsgPopup {
    pub template_id: String,
    /// `accept` or `reject`.
    pub subscribe_status: String,
    pub popup_scene: u32,
}

/// Subscription popup decisions as delivered: one or more wrapper elements,
/// each holding one or more `List` items.
///
/// [`PopupEvents::items`] flattens the groups on first use and caches the
/// result for the lifetime of this message.
#[derive(Debug, Clone, Default)]
pub struct PopupEvents {
    groups: Vec<Vec<SubscribeMsgPopup>>,
    flat: OnceCell<Vec<SubscribeMsgPopup>>,
}

impl PopupEvents {
    pub fn new(groups: Vec<Vec<SubscribeMsgPopup>>) -> Self {
        Self {
            groups,
            flat: OnceCell::new(),
        }
    }

    /// Flat, ordered list of popup decisions.
    pub fn items(&self) -> &[SubscribeMsgPopup] {
        self.flat
            .get_or_init(|| self.groups.iter().flatten().cloned().collect())
    }

    pub fn is_normalized(&self) -> bool {
        self.flat.get().is_some()
    }
}

// --------------------
// Decoding
// --------------------

/// Decode a plain (already decrypted) callback body.
pub fn decode(bytes: &[u8], format: WireFormat) -> Result<InboundMessage> {
    let raw: RawMessage = match format {
        WireFormat::Xml => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| PortalError::Decode(format!("envelope is not utf-8: {e}")))?;
            let protected = protect_leaf_text(s)?;
            quick_xml::de::from_str(&protected)
                .map_err(|e| PortalError::Decode(format!("invalid xml envelope: {e}")))?
        }
        WireFormat::Json => {
            let mut v: Value = serde_json::from_slice(bytes)
                .map_err(|e| PortalError::Decode(format!("invalid json envelope: {e}")))?;
            if !v.is_object() {
                return Err(PortalError::Decode("json envelope must be an object".into()));
            }
            normalize_json_popups(&mut v);
            stringify_scalars(&mut v);
            serde_json::from_value(v)
                .map_err(|e| PortalError::Decode(format!("invalid json envelope: {e}")))?
        }
    };
    Ok(raw.into_message())
}

/// The serde XML reader trims plain text but passes CDATA through verbatim,
/// so leaf text is re-emitted as CDATA before deserializing. Whitespace
/// between elements stays plain text and is still dropped.
fn protect_leaf_text(xml: &str) -> Result<String> {
    let invalid = |e: quick_xml::Error| PortalError::Decode(format!("invalid xml envelope: {e}"));

    let mut reader = Reader::from_str(xml);
    let mut out = Writer::new(Vec::with_capacity(xml.len() + 64));
    // Set after a start tag, cleared by an end or empty tag.
    let mut in_leaf = false;
    // Unescaped text whose fate depends on the next event.
    let mut pending: Option<String> = None;

    loop {
        let ev = reader.read_event().map_err(invalid)?;
        let leaf_text_ends = matches!(ev, XmlEvent::End(_) | XmlEvent::CData(_));
        if !matches!(ev, XmlEvent::Text(_)) || !in_leaf {
            if let Some(text) = pending.take() {
                if leaf_text_ends {
                    for chunk in cdata_chunks(&text) {
                        out.write_event(XmlEvent::CData(BytesCData::new(chunk)))
                            .map_err(invalid)?;
                    }
                } else {
                    out.write_event(XmlEvent::Text(BytesText::new(&text)))
                        .map_err(invalid)?;
                }
            }
        }

        match ev {
            XmlEvent::Eof => break,
            XmlEvent::Text(t) if in_leaf => {
                let text = t.unescape().map_err(invalid)?;
                pending.get_or_insert_with(String::new).push_str(&text);
                continue;
            }
            XmlEvent::Start(_) => in_leaf = true,
            XmlEvent::End(_) | XmlEvent::Empty(_) => in_leaf = false,
            _ => {}
        }
        out.write_event(ev).map_err(invalid)?;
    }

    String::from_utf8(out.into_inner())
        .map_err(|e| PortalError::Decode(format!("envelope is not utf-8: {e}")))
}

/// JSON pushes may send the popup wrapper and its `List` as a bare object.
/// Coerce both into the XML shape.
fn normalize_json_popups(v: &mut Value) {
    let Some(popup) = v.get_mut("SubscribeMsgPopupEvent") else {
        return;
    };
    if popup.is_object() {
        let inner = popup.take();
        *popup = Value::Array(vec![inner]);
    }
    let Value::Array(wrappers) = popup else {
        return;
    };
    for wrapper in wrappers {
        let Some(list) = wrapper.get_mut("List") else {
            continue;
        };
        if list.is_object() {
            let inner = list.take();
            *list = Value::Array(vec![inner]);
        }
    }
}

/// Give JSON the XML data model: scalars become text, `null` means absent.
fn stringify_scalars(v: &mut Value) {
    match v {
        Value::Object(map) => {
            map.retain(|_, x| !x.is_null());
            for x in map.values_mut() {
                stringify_scalars(x);
            }
        }
        Value::Array(items) => {
            for x in items {
                stringify_scalars(x);
            }
        }
        Value::Number(n) => {
            let text = n.to_string();
            *v = Value::String(text);
        }
        Value::Bool(b) => {
            let text = b.to_string();
            *v = Value::String(text);
        }
        Value::String(_) | Value::Null => {}
    }
}

/// Numeric leaves are read as text in both grammars. Blank text counts as
/// absent; anything else must parse.
mod lenient {
    use std::fmt;
    use std::marker::PhantomData;
    use std::str::FromStr;

    use serde::de::{self, Deserializer, Visitor};

    struct NumberText<T>(PhantomData<T>);

    impl<'de, T: FromStr> Visitor<'de> for NumberText<T> {
        type Value = Option<T>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Option<T>, E> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(None);
            }
            v.parse()
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    pub(super) fn number<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + Default,
    {
        d.deserialize_str(NumberText(PhantomData))
            .map(Option::unwrap_or_default)
    }

    pub(super) fn optional_number<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
    {
        d.deserialize_str(NumberText(PhantomData))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMessage {
    #[serde(rename = "ToUserName")]
    to_user_name: String,
    #[serde(rename = "FromUserName")]
    from_user_name: String,
    #[serde(rename = "CreateTime")]
    #[serde(deserialize_with = "lenient::number")]
    create_time: i64,
    #[serde(rename = "MsgType")]
    msg_type: String,

    #[serde(rename = "MsgId")]
    #[serde(deserialize_with = "lenient::number")]
    msg_id: i64,
    // Template job notifications spell it `MsgID`.
    #[serde(rename = "MsgID")]
    #[serde(deserialize_with = "lenient::number")]
    template_msg_id: i64,
    #[serde(rename = "Content")]
    content: String,
    #[serde(rename = "Recognition")]
    recognition: String,
    #[serde(rename = "PicUrl")]
    pic_url: String,
    #[serde(rename = "MediaId")]
    media_id: String,
    #[serde(rename = "Format")]
    format: String,
    #[serde(rename = "ThumbMediaId")]
    thumb_media_id: String,
    #[serde(rename = "Location_X")]
    #[serde(deserialize_with = "lenient::number")]
    location_x: f64,
    #[serde(rename = "Location_Y")]
    #[serde(deserialize_with = "lenient::number")]
    location_y: f64,
    #[serde(rename = "Scale")]
    #[serde(deserialize_with = "lenient::number")]
    scale: f64,
    #[serde(rename = "Label")]
    label: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Url")]
    url: String,
    #[serde(rename = "bizmsgmenuid")]
    #[serde(deserialize_with = "lenient::optional_number")]
    biz_msg_menu_id: Option<i64>,
    #[serde(rename = "MsgDataId")]
    msg_data_id: String,
    #[serde(rename = "Idx")]
    #[serde(deserialize_with = "lenient::number")]
    idx: u32,
    #[serde(rename = "MediaId16K")]
    media_id_16k: String,

    #[serde(rename = "Event")]
    event: String,
    #[serde(rename = "EventKey")]
    event_key: String,
    #[serde(rename = "Ticket")]
    ticket: String,
    #[serde(rename = "Latitude")]
    #[serde(deserialize_with = "lenient::number")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    #[serde(deserialize_with = "lenient::number")]
    longitude: f64,
    #[serde(rename = "Precision")]
    #[serde(deserialize_with = "lenient::number")]
    precision: f64,
    #[serde(rename = "MenuId")]
    menu_id: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "TotalCount")]
    #[serde(deserialize_with = "lenient::number")]
    total_count: i64,
    #[serde(rename = "FilterCount")]
    #[serde(deserialize_with = "lenient::number")]
    filter_count: i64,
    #[serde(rename = "SentCount")]
    #[serde(deserialize_with = "lenient::number")]
    sent_count: i64,
    #[serde(rename = "ErrorCount")]
    #[serde(deserialize_with = "lenient::number")]
    error_count: i64,

    #[serde(rename = "ScanCodeInfo")]
    scan_code_info: RawScanCodeInfo,
    #[serde(rename = "SendPicsInfo")]
    send_pics_info: RawSendPicsInfo,
    #[serde(rename = "SendLocationInfo")]
    send_location_info: RawSendLocationInfo,
    #[serde(rename = "SubscribeMsgPopupEvent")]
    subscribe_msg_popup_event: Vec<RawPopupWrapper>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawScanCodeInfo {
    #[serde(rename = "ScanType")]
    scan_type: String,
    #[serde(rename = "ScanResult")]
    scan_result: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSendPicsInfo {
    #[serde(rename = "Count")]
    #[serde(deserialize_with = "lenient::number")]
    count: u32,
    #[serde(rename = "PicList")]
    pic_list: RawPicList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPicList {
    item: Vec<RawPic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPic {
    #[serde(rename = "PicMd5Sum")]
    pic_md5_sum: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSendLocationInfo {
    #[serde(rename = "Location_X")]
    #[serde(deserialize_with = "lenient::number")]
    location_x: f64,
    #[serde(rename = "Location_Y")]
    #[serde(deserialize_with = "lenient::number")]
    location_y: f64,
    #[serde(rename = "Scale")]
    #[serde(deserialize_with = "lenient::number")]
    scale: f64,
    #[serde(rename = "Label")]
    label: String,
    #[serde(rename = "Poiname")]
    poi_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPopupWrapper {
    #[serde(rename = "List")]
    list: Vec<RawPopup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPopup {
    #[serde(rename = "TemplateId")]
    template_id: String,
    #[serde(rename = "SubscribeStatusString")]
    subscribe_status: String,
    #[serde(rename = "PopupScene")]
    popup_scene: String,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl RawMessage {
    fn into_message(mut self) -> InboundMessage {
        let header = Header {
            to_user: std::mem::take(&mut self.to_user_name),
            from_user: std::mem::take(&mut self.from_user_name),
            create_time: self.create_time,
        };
        InboundMessage {
            header,
            body: self.into_body(),
        }
    }

    fn article_source(&self) -> Option<ArticleSource> {
        if self.msg_data_id.is_empty() {
            return None;
        }
        Some(ArticleSource {
            msg_data_id: self.msg_data_id.clone(),
            idx: self.idx,
        })
    }

    fn into_body(self) -> MessageBody {
        match self.msg_type.as_str() {
            msg_type::TEXT => MessageBody::Text(TextMessage {
                msg_id: self.msg_id,
                source: self.article_source(),
                content: self.content,
                biz_msg_menu_id: self.biz_msg_menu_id,
            }),
            msg_type::IMAGE => MessageBody::Image(ImageMessage {
                msg_id: self.msg_id,
                source: self.article_source(),
                pic_url: self.pic_url,
                media_id: self.media_id,
            }),
            msg_type::VOICE => MessageBody::Voice(VoiceMessage {
                msg_id: self.msg_id,
                media_id: self.media_id,
                format: self.format,
                recognition: non_empty(self.recognition),
                media_id_16k: non_empty(self.media_id_16k),
            }),
            msg_type::VIDEO => MessageBody::Video(self.into_video()),
            msg_type::SHORT_VIDEO => MessageBody::ShortVideo(self.into_video()),
            msg_type::LOCATION => MessageBody::Location(LocationMessage {
                msg_id: self.msg_id,
                latitude: self.location_x,
                longitude: self.location_y,
                scale: self.scale,
                label: self.label,
            }),
            msg_type::LINK => MessageBody::Link(LinkMessage {
                msg_id: self.msg_id,
                title: self.title,
                description: self.description,
                url: self.url,
            }),
            msg_type::EVENT => MessageBody::Event(self.into_event()),
            _ => {
                tracing::debug!(msg_type = %self.msg_type, "unrecognized MsgType");
                MessageBody::Unknown {
                    msg_type: self.msg_type,
                }
            }
        }
    }

    fn into_video(self) -> VideoMessage {
        VideoMessage {
            msg_id: self.msg_id,
            media_id: self.media_id,
            thumb_media_id: self.thumb_media_id,
        }
    }

    fn scan_code(self) -> ScanCodeEvent {
        ScanCodeEvent {
            event_key: self.event_key,
            scan_type: self.scan_code_info.scan_type,
            scan_result: self.scan_code_info.scan_result,
        }
    }

    fn pics(self) -> PicEvent {
        PicEvent {
            event_key: self.event_key,
            count: self.send_pics_info.count,
            pic_md5_sums: self
                .send_pics_info
                .pic_list
                .item
                .into_iter()
                .map(|p| p.pic_md5_sum)
                .collect(),
        }
    }

    fn into_event(self) -> Event {
        match self.event.as_str() {
            event_type::SUBSCRIBE => {
                let scene = if self.event_key.is_empty() {
                    None
                } else {
                    let key = self.event_key.as_str();
                    Some(SceneScan {
                        scene_key: key.strip_prefix(QR_SCENE_PREFIX).unwrap_or(key).to_string(),
                        ticket: self.ticket,
                    })
                };
                Event::Subscribe { scene }
            }
            event_type::UNSUBSCRIBE => Event::Unsubscribe,
            event_type::SCAN => Event::Scan(SceneScan {
                scene_key: self.event_key,
                ticket: self.ticket,
            }),
            event_type::LOCATION => Event::Location(LocationReport {
                latitude: self.latitude,
                longitude: self.longitude,
                precision: self.precision,
            }),
            event_type::CLICK => Event::Click {
                event_key: self.event_key,
            },
            event_type::VIEW => Event::View {
                url: self.event_key,
                menu_id: non_empty(self.menu_id),
            },
            event_type::SCANCODE_PUSH => Event::ScanCodePush(self.scan_code()),
            event_type::SCANCODE_WAITMSG => Event::ScanCodeWaitMsg(self.scan_code()),
            event_type::PIC_SYSPHOTO => Event::PicSysPhoto(self.pics()),
            event_type::PIC_PHOTO_OR_ALBUM => Event::PicPhotoOrAlbum(self.pics()),
            event_type::PIC_WEIXIN => Event::PicWeixin(self.pics()),
            event_type::LOCATION_SELECT => {
                let info = self.send_location_info;
                Event::LocationSelect(LocationSelectEvent {
                    event_key: self.event_key,
                    latitude: info.location_x,
                    longitude: info.location_y,
                    scale: info.scale,
                    label: info.label,
                    poi_name: info.poi_name,
                })
            }
            event_type::VIEW_MINIPROGRAM => Event::ViewMiniprogram {
                page_path: self.event_key,
                menu_id: non_empty(self.menu_id),
            },
            event_type::TEMPLATE_SEND_JOB_FINISH => Event::TemplateSendJobFinish {
                msg_id: self.template_msg_id,
                status: self.status,
            },
            event_type::MASS_SEND_JOB_FINISH => Event::MassSendJobFinish(MassSendReport {
                // mass send reports use `MsgID` like template jobs
                msg_id: self.template_msg_id,
                status: self.status,
                total_count: self.total_count,
                filter_count: self.filter_count,
                sent_count: self.sent_count,
                error_count: self.error_count,
            }),
            event_type::PUBLISH_JOB_FINISH => Event::PublishJobFinish,
            event_type::WXA_MEDIA_CHECK => Event::WxaMediaCheck,
            event_type::SUBSCRIBE_MSG_POPUP => {
                let groups = self
                    .subscribe_msg_popup_event
                    .into_iter()
                    .map(|w| {
                        w.list
                            .into_iter()
                            .map(|p| SubscribeMsgPopup {
                                popup_scene: p.popup_scene.trim().parse().unwrap_or_default(),
                                template_id: p.template_id,
                                subscribe_status: p.subscribe_status,
                            })
                            .collect()
                    })
                    .collect();
                Event::SubscribeMsgPopup(PopupEvents::new(groups))
            }
            event_type::WEAPP_AUDIT_SUCCESS => Event::WeappAuditSuccess,
            event_type::WEAPP_AUDIT_FAIL => Event::WeappAuditFail,
            event_type::WEAPP_AUDIT_DELAY => Event::WeappAuditDelay,
            _ => {
                tracing::debug!(event = %self.event, "unrecognized Event");
                Event::Unknown { name: self.event }
            }
        }
    }
}
