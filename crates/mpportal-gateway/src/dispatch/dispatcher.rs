use async_trait::async_trait;

use mpportal_core::error::Result;
use mpportal_core::protocol::inbound::{Event, Header, InboundMessage, MessageBody};
use mpportal_core::protocol::reply::ReplyMessage;

use crate::config::ReplyTexts;

/// What a handler decided to do with one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Passive reply addressed back to the sender.
    Reply(ReplyMessage),
    /// Nothing to say; the transport writes the ack token.
    Ack,
}

/// Business handler for decoded callbacks.
///
/// Runs inside the deadline executor, so implementations may be slow; they
/// are aborted when the deadline passes.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, msg: InboundMessage) -> Result<Outcome>;
}

/// Default handler: a single exhaustive match from message kind to canned reply.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    texts: ReplyTexts,
}

impl Dispatcher {
    pub fn new(texts: ReplyTexts) -> Self {
        Self { texts }
    }

    pub fn texts(&self) -> &ReplyTexts {
        &self.texts
    }

    /// Pure routing decision for one message.
    pub fn dispatch(&self, msg: &InboundMessage) -> Outcome {
        let t = &self.texts;
        let reply = |content: String| Outcome::Reply(ReplyMessage::text(&msg.header, content));

        match &msg.body {
            MessageBody::Text(_) => reply(t.text.clone()),
            MessageBody::Image(_) => reply(t.image.clone()),
            MessageBody::Voice(v) => match v.recognition.as_deref() {
                Some(said) if !said.is_empty() => reply(format!("{} You said: {said}", t.voice)),
                _ => reply(t.voice.clone()),
            },
            MessageBody::Video(_) => reply(t.video.clone()),
            MessageBody::ShortVideo(_) => reply(t.short_video.clone()),
            MessageBody::Location(_) => reply(t.location.clone()),
            MessageBody::Link(_) => reply(t.link.clone()),
            MessageBody::Event(ev) => self.dispatch_event(msg, ev),
            MessageBody::Unknown { msg_type } => {
                tracing::debug!(%msg_type, "unsupported message type");
                reply(format!("Unsupported message type: {msg_type}"))
            }
        }
    }

    fn dispatch_event(&self, msg: &InboundMessage, ev: &Event) -> Outcome {
        let t = &self.texts;
        let reply = |content: String| Outcome::Reply(ReplyMessage::text(&msg.header, content));
        let received = || reply(format!("Received event: {}", ev.name()));

        match ev {
            Event::Subscribe { scene: None } => reply(t.welcome.clone()),
            Event::Subscribe { scene: Some(scene) } => {
                reply(format!("{} (scene: {})", t.welcome, scene.scene_key))
            }
            Event::Scan(scene) => reply(format!("Scanned scene: {}", scene.scene_key)),
            Event::Click { event_key } if event_key.is_empty() => reply(t.click.clone()),
            Event::Click { event_key } => reply(format!("Menu clicked: {event_key}")),
            Event::ScanCodePush(scan) | Event::ScanCodeWaitMsg(scan) => {
                reply(format!("Scan result: {}", scan.scan_result))
            }
            Event::Location(_)
            | Event::View { .. }
            | Event::PicSysPhoto(_)
            | Event::PicPhotoOrAlbum(_)
            | Event::PicWeixin(_)
            | Event::LocationSelect(_)
            | Event::ViewMiniprogram { .. }
            | Event::Unknown { .. } => received(),
            Event::SubscribeMsgPopup(popups) => {
                let accepted = popups
                    .items()
                    .iter()
                    .filter(|p| p.subscribe_status == "accept")
                    .count();
                tracing::debug!(total = popups.items().len(), accepted, "subscription popup");
                Outcome::Ack
            }
            Event::Unsubscribe
            | Event::TemplateSendJobFinish { .. }
            | Event::MassSendJobFinish(_)
            | Event::PublishJobFinish
            | Event::WxaMediaCheck
            | Event::WeappAuditSuccess
            | Event::WeappAuditFail
            | Event::WeappAuditDelay => Outcome::Ack,
        }
    }

    /// Reply used when a handler fails before producing its own.
    pub fn fallback(&self, header: &Header) -> ReplyMessage {
        ReplyMessage::text(header, self.texts.fallback.clone())
    }
}

#[async_trait]
impl MessageHandler for Dispatcher {
    async fn handle(&self, msg: InboundMessage) -> Result<Outcome> {
        let outcome = self.dispatch(&msg);
        tracing::debug!(
            msg_type = msg.msg_type(),
            replied = matches!(outcome, Outcome::Reply(_)),
            "dispatched"
        );
        Ok(outcome)
    }
}
