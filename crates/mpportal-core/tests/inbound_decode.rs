//! Inbound envelope decoding tests (XML + JSON).

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use mpportal_core::protocol::inbound::{decode, Event, MessageBody};
use mpportal_core::protocol::WireFormat;

fn xml(msg_type: &str, extra: &str) -> String {
    format!(
        "<xml><ToUserName><![CDATA[gh_app]]></ToUserName>\
         <FromUserName><![CDATA[o_user]]></FromUserName>\
         <CreateTime>1348831860</CreateTime>\
         <MsgType><![CDATA[{msg_type}]]></MsgType>{extra}</xml>"
    )
}

fn event_xml(event: &str, extra: &str) -> String {
    xml("event", &format!("<Event><![CDATA[{event}]]></Event>{extra}"))
}

#[test]
fn text_message_header_and_content() {
    let body = xml(
        "text",
        "<Content><![CDATA[hello]]></Content><MsgId>1234567890123456</MsgId>",
    );
    let msg = decode(body.as_bytes(), WireFormat::Xml).unwrap();
    assert_eq!(msg.header.to_user, "gh_app");
    assert_eq!(msg.header.from_user, "o_user");
    assert_eq!(msg.header.open_id(), "o_user");
    assert_eq!(msg.header.create_time, 1348831860);
    assert_eq!(msg.msg_type(), "text");

    let MessageBody::Text(text) = msg.body else {
        panic!("expected text");
    };
    assert_eq!(text.content, "hello");
    assert_eq!(text.msg_id, 1234567890123456);
    assert!(text.source.is_none());
}

#[test]
fn unknown_elements_are_ignored() {
    let body = xml(
        "text",
        "<Content>hi</Content><SomethingNew><Nested>1</Nested></SomethingNew><Extra>x</Extra>",
    );
    let msg = decode(body.as_bytes(), WireFormat::Xml).unwrap();
    assert!(matches!(msg.body, MessageBody::Text(ref t) if t.content == "hi"));
}

#[test]
fn missing_optional_fields_default() {
    let body = xml("image", "");
    let msg = decode(body.as_bytes(), WireFormat::Xml).unwrap();
    let MessageBody::Image(img) = msg.body else {
        panic!("expected image");
    };
    assert_eq!(img.media_id, "");
    assert_eq!(img.msg_id, 0);
}

#[test]
fn voice_with_recognition() {
    let body = xml(
        "voice",
        "<MediaId>m1</MediaId><Format>amr</Format><Recognition>腾讯</Recognition><MsgId>5</MsgId>",
    );
    let MessageBody::Voice(v) = decode(body.as_bytes(), WireFormat::Xml).unwrap().body else {
        panic!("expected voice");
    };
    assert_eq!(v.format, "amr");
    assert_eq!(v.recognition.as_deref(), Some("腾讯"));
    assert!(v.media_id_16k.is_none());
}

#[test]
fn video_and_short_video_share_payload() {
    for (ty, short) in [("video", false), ("shortvideo", true)] {
        let body = xml(ty, "<MediaId>m</MediaId><ThumbMediaId>t</ThumbMediaId>");
        let msg = decode(body.as_bytes(), WireFormat::Xml).unwrap();
        match (msg.body, short) {
            (MessageBody::Video(v), false) | (MessageBody::ShortVideo(v), true) => {
                assert_eq!(v.thumb_media_id, "t");
            }
            (other, _) => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn location_message() {
    let body = xml(
        "location",
        "<Location_X>23.134521</Location_X><Location_Y>113.358803</Location_Y>\
         <Scale>20</Scale><Label><![CDATA[somewhere]]></Label>",
    );
    let MessageBody::Location(loc) = decode(body.as_bytes(), WireFormat::Xml).unwrap().body else {
        panic!("expected location");
    };
    assert!((loc.latitude - 23.134521).abs() < 1e-9);
    assert!((loc.longitude - 113.358803).abs() < 1e-9);
    assert_eq!(loc.label, "somewhere");
}

#[test]
fn link_message() {
    let body = xml(
        "link",
        "<Title>t</Title><Description>d</Description><Url>http://x/?a=1&amp;b=2</Url>",
    );
    let MessageBody::Link(link) = decode(body.as_bytes(), WireFormat::Xml).unwrap().body else {
        panic!("expected link");
    };
    assert_eq!(link.url, "http://x/?a=1&b=2");
}

#[test]
fn unknown_msg_type_is_kept() {
    let body = xml("miniprogrampage", "<Title>t</Title>");
    let msg = decode(body.as_bytes(), WireFormat::Xml).unwrap();
    assert_eq!(msg.msg_type(), "miniprogrampage");
    assert!(matches!(msg.body, MessageBody::Unknown { .. }));
}

#[test]
fn click_and_view_events() {
    let click = event_xml("CLICK", "<EventKey><![CDATA[V1001_TODAY_MUSIC]]></EventKey>");
    match decode(click.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::Click { event_key }) => assert_eq!(event_key, "V1001_TODAY_MUSIC"),
        other => panic!("unexpected {other:?}"),
    }

    let view = event_xml("VIEW", "<EventKey>https://example.com</EventKey><MenuId>208</MenuId>");
    match decode(view.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::View { url, menu_id }) => {
            assert_eq!(url, "https://example.com");
            assert_eq!(menu_id.as_deref(), Some("208"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn scan_and_location_events() {
    let scan = event_xml("SCAN", "<EventKey>123</EventKey><Ticket>TK</Ticket>");
    match decode(scan.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::Scan(s)) => {
            assert_eq!(s.scene_key, "123");
            assert_eq!(s.ticket, "TK");
        }
        other => panic!("unexpected {other:?}"),
    }

    let loc = event_xml(
        "LOCATION",
        "<Latitude>23.137466</Latitude><Longitude>113.352425</Longitude><Precision>119.385040</Precision>",
    );
    match decode(loc.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::Location(r)) => assert!((r.precision - 119.38504).abs() < 1e-6),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn scancode_and_pic_events() {
    let scan = event_xml(
        "scancode_waitmsg",
        "<EventKey>rselfmenu_0_0</EventKey><ScanCodeInfo><ScanType>qrcode</ScanType>\
         <ScanResult>1</ScanResult></ScanCodeInfo>",
    );
    match decode(scan.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::ScanCodeWaitMsg(s)) => {
            assert_eq!(s.scan_type, "qrcode");
            assert_eq!(s.scan_result, "1");
        }
        other => panic!("unexpected {other:?}"),
    }

    let pics = event_xml(
        "pic_photo_or_album",
        "<EventKey>6</EventKey><SendPicsInfo><Count>2</Count><PicList>\
         <item><PicMd5Sum>aaa</PicMd5Sum></item><item><PicMd5Sum>bbb</PicMd5Sum></item>\
         </PicList></SendPicsInfo>",
    );
    match decode(pics.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::PicPhotoOrAlbum(p)) => {
            assert_eq!(p.count, 2);
            assert_eq!(p.pic_md5_sums, vec!["aaa".to_string(), "bbb".to_string()]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn location_select_event() {
    let body = event_xml(
        "location_select",
        "<EventKey>6</EventKey><SendLocationInfo><Location_X>23</Location_X>\
         <Location_Y>113</Location_Y><Scale>15</Scale><Label>L</Label>\
         <Poiname>P</Poiname></SendLocationInfo>",
    );
    match decode(body.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::LocationSelect(l)) => {
            assert_eq!(l.poi_name, "P");
            assert_eq!(l.label, "L");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn mass_send_report_counters() {
    let body = event_xml(
        "MASSSENDJOBFINISH",
        "<MsgID>1988</MsgID><Status>sendsuccess</Status><TotalCount>100</TotalCount>\
         <FilterCount>80</FilterCount><SentCount>75</SentCount><ErrorCount>5</ErrorCount>",
    );
    match decode(body.as_bytes(), WireFormat::Xml).unwrap().body {
        MessageBody::Event(Event::MassSendJobFinish(r)) => {
            assert_eq!(r.msg_id, 1988);
            assert_eq!(r.total_count, 100);
            assert_eq!(r.sent_count, 75);
            assert_eq!(r.error_count, 5);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_event_keeps_name() {
    let body = event_xml("card_pass_check", "<CardId>x</CardId>");
    let msg = decode(body.as_bytes(), WireFormat::Xml).unwrap();
    match msg.body {
        MessageBody::Event(ev) => {
            assert!(matches!(ev, Event::Unknown { .. }));
            assert_eq!(ev.name(), "card_pass_check");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn json_text_message() {
    let body = r#"{"ToUserName":"gh_app","FromUserName":"o_user","CreateTime":1,
        "MsgType":"text","Content":"hello","MsgId":42,"Unexpected":{"deep":[1,2]}}"#;
    let msg = decode(body.as_bytes(), WireFormat::Json).unwrap();
    let MessageBody::Text(t) = msg.body else {
        panic!("expected text");
    };
    assert_eq!(t.content, "hello");
    assert_eq!(t.msg_id, 42);
}

#[test]
fn malformed_bodies_are_decode_errors() {
    let cases: [(&[u8], WireFormat); 5] = [
        (b"<xml><ToUserName>a</xml>", WireFormat::Xml),
        (b"", WireFormat::Xml),
        (b"\xff\xfe<xml/>", WireFormat::Xml),
        (b"{\"MsgType\": ", WireFormat::Json),
        (b"[1,2,3]", WireFormat::Json),
    ];
    for (body, format) in cases {
        let err = decode(body, format).expect_err("must fail");
        assert_eq!(err.client_code().as_str(), "DECODE_FAILED", "body={body:?}");
    }
}
