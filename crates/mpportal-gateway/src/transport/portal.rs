//! Portal HTTP handlers.
//!
//! - `GET  /v1/portal/:app_id` : verification handshake, echoes `echostr`
//! - `POST /v1/portal/:app_id` : push callback, answered with a passive reply
//!   or the ack token within the reply deadline
//!
//! Every request runs inside a `portal` span carrying app id, openid and kind.

use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use tracing::Instrument;

use mpportal_core::error::{ClientCode, PortalError, Result};
use mpportal_core::protocol::{reply, WireFormat};

use crate::app_state::AppState;
use crate::dispatch::{Completion, Outcome};
use crate::transport::codec::{self, HandshakeQuery, PushQuery};

/// Map a client code to its HTTP status.
pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest | ClientCode::AuthFailed | ClientCode::DecodeFailed => {
            StatusCode::BAD_REQUEST
        }
        ClientCode::UnknownApp => StatusCode::NOT_FOUND,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &PortalError) -> Response {
    let code = err.client_code();
    // Internal details stay in the logs.
    let msg = match err {
        PortalError::Internal(_) => "internal error".to_string(),
        other => other.to_string(),
    };
    (
        status_for(code),
        Json(json!({ "code": code.as_str(), "msg": msg })),
    )
        .into_response()
}

fn log_failure(err: &PortalError) {
    match err {
        PortalError::AuthFailed => tracing::warn!("signature verification failed"),
        PortalError::Internal(e) => tracing::error!(error = %e, "portal request failed"),
        other => tracing::warn!(error = %other, "portal request rejected"),
    }
}

pub async fn handshake(
    State(app): State<AppState>,
    Path(app_id): Path<String>,
    Query(q): Query<HandshakeQuery>,
) -> Response {
    let span = tracing::info_span!("portal", app_id = %app_id, openid = "", kind = "handshake");
    async move {
        let res: Result<()> = async {
            let creds = app.credentials().credentials(&app_id).await?;
            codec::verify_handshake(&creds, &q)
        }
        .await;

        match res {
            Ok(()) => {
                app.metrics().requests.inc(&[("kind", "handshake"), ("outcome", "ok")]);
                tracing::info!("handshake verified");
                (
                    StatusCode::OK,
                    [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                    q.echostr,
                )
                    .into_response()
            }
            Err(e) => {
                if matches!(e, PortalError::AuthFailed) {
                    app.metrics().verify_failures.inc(&[("mode", "plain")]);
                }
                app.metrics()
                    .requests
                    .inc(&[("kind", "handshake"), ("outcome", e.client_code().as_str())]);
                log_failure(&e);
                error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn push(
    State(app): State<AppState>,
    Path(app_id): Path<String>,
    Query(q): Query<PushQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let openid = q.openid.clone().unwrap_or_default();
    let span = tracing::info_span!("portal", app_id = %app_id, openid = %openid, kind = "push");
    async move {
        match handle_push(&app, &app_id, &q, &headers, body).await {
            Ok(resp) => resp,
            Err(e) => {
                record_failure(&app, &q, &e);
                log_failure(&e);
                error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

fn record_failure(app: &AppState, q: &PushQuery, err: &PortalError) {
    let m = app.metrics();
    match err {
        PortalError::AuthFailed => {
            let mode = match q.encoding() {
                Ok(codec::PushEncoding::Aes) => "safe",
                _ => "plain",
            };
            m.verify_failures.inc(&[("mode", mode)]);
        }
        PortalError::Decrypt(_) => m.decode_errors.inc(&[("stage", "decrypt")]),
        PortalError::Decode(_) => m.decode_errors.inc(&[("stage", "decode")]),
        _ => {}
    }
    m.requests
        .inc(&[("kind", "push"), ("outcome", err.client_code().as_str())]);
}

async fn handle_push(
    app: &AppState,
    app_id: &str,
    q: &PushQuery,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let creds = app.credentials().credentials(app_id).await?;
    let format = WireFormat::from_content_type(
        headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
    );

    let opened = codec::open_push(&creds, q, format, &body)?;
    let header = opened.message.header.clone();
    let msg_type = opened.message.msg_type().to_string();
    tracing::debug!(%msg_type, encoding = opened.encoding.as_str(), "push decoded");

    let handler = app.handler();
    let message = opened.message;
    let started = Instant::now();
    let completion = app
        .executor()
        .run(async move {
            match handler.handle(message).await? {
                Outcome::Reply(r) => reply::encode(&r, format).map(Some),
                Outcome::Ack => Ok(None),
            }
        })
        .await;
    app.metrics()
        .pipeline_duration
        .observe(&[("msg_type", msg_type.as_str())], started.elapsed());

    let (outcome, payload) = match completion {
        Completion::Reply(bytes) => ("reply", Some(bytes)),
        Completion::NoReply => ("ack", None),
        Completion::TimedOut => {
            tracing::warn!(
                deadline_ms = app.executor().deadline().as_millis() as u64,
                "reply deadline exceeded, acknowledging"
            );
            ("timeout", None)
        }
        Completion::Failed(reason) => {
            tracing::error!(%reason, "reply work failed, sending fallback");
            let fallback = reply::encode(&app.dispatcher().fallback(&header), format)?;
            ("fallback", Some(fallback))
        }
    };
    app.metrics()
        .requests
        .inc(&[("kind", "push"), ("outcome", outcome)]);

    let Some(payload) = payload else {
        return Ok(ack(app));
    };
    let sealed = codec::seal_reply(&creds, q, opened.encoding, format, payload)?;
    Ok((StatusCode::OK, [(CONTENT_TYPE, format.content_type())], sealed).into_response())
}

fn ack(app: &AppState) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        app.cfg().gateway.ack_token.clone(),
    )
        .into_response()
}
