//! Wire format of the Edge read-aloud service
//!
//! Synthesis runs over a WebSocket. The client sends two text frames, a
//! `speech.config` frame selecting the output format and an `ssml` frame
//! carrying the text. The service answers with text frames
//! (`turn.start`, `response`, `audio.metadata`, `turn.end`) and binary
//! `audio` frames. Every frame starts with `Key:Value` header lines
//! terminated by an empty line; binary frames prefix the header block with
//! its length as a big-endian `u16`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::catalog::{is_edge_voice_name, SHORT_VOICE_NAME};
use crate::error::{Result, VoiceError};

pub const TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";
pub const BASE_URL: &str = "speech.platform.bing.com/consumer/speech/synthesize/readaloud";
pub const SEC_MS_GEC_VERSION: &str = "1-130.0.2849.68";
pub const ORIGIN: &str = "chrome-extension://jdiccldimpdaibmpdkjnbmckianbfold";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0";

/// Largest escaped text sent in one SSML request
pub const MAX_CHUNK_BYTES: usize = 4096;

/// Seconds between 1601-01-01 and 1970-01-01
const WIN_EPOCH_SECS: u64 = 11_644_473_600;

/// Compute the `Sec-MS-GEC` token for a Unix timestamp.
///
/// The token is the upper-case SHA-256 of the Windows file-time tick count,
/// rounded down to five minutes, followed by the trusted client token.
pub fn sec_ms_gec(unix_secs: u64) -> String {
    let secs = unix_secs + WIN_EPOCH_SECS;
    let ticks = (secs - secs % 300) * 10_000_000;

    let digest = Sha256::digest(format!("{ticks}{TRUSTED_CLIENT_TOKEN}").as_bytes());
    digest.iter().map(|b| format!("{b:02X}")).collect()
}

/// Random connection id, 32 hex digits without dashes
pub fn connection_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn wss_url(sec_ms_gec: &str, connection_id: &str) -> String {
    format!(
        "wss://{BASE_URL}/edge/v1?TrustedClientToken={TRUSTED_CLIENT_TOKEN}\
         &Sec-MS-GEC={sec_ms_gec}&Sec-MS-GEC-Version={SEC_MS_GEC_VERSION}\
         &ConnectionId={connection_id}"
    )
}

pub fn voices_url(sec_ms_gec: &str) -> String {
    format!(
        "https://{BASE_URL}/voices/list?trustedclienttoken={TRUSTED_CLIENT_TOKEN}\
         &Sec-MS-GEC={sec_ms_gec}&Sec-MS-GEC-Version={SEC_MS_GEC_VERSION}"
    )
}

/// `X-Timestamp` value in the JavaScript `Date.toString()` style the service expects
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

pub fn speech_config_frame(timestamp: &str, output_format: &str) -> String {
    format!(
        "X-Timestamp:{timestamp}\r\n\
         Content-Type:application/json; charset=utf-8\r\n\
         Path:speech.config\r\n\r\n\
         {{\"context\":{{\"synthesis\":{{\"audio\":{{\"metadataoptions\":{{\
         \"sentenceBoundaryEnabled\":\"false\",\"wordBoundaryEnabled\":\"true\"}},\
         \"outputFormat\":\"{output_format}\"}}}}}}}}\r\n"
    )
}

pub fn ssml_frame(request_id: &str, timestamp: &str, ssml: &str) -> String {
    format!(
        "X-RequestId:{request_id}\r\n\
         Content-Type:application/ssml+xml\r\n\
         X-Timestamp:{timestamp}Z\r\n\
         Path:ssml\r\n\r\n\
         {ssml}"
    )
}

/// Wrap already-escaped text in an SSML document
pub fn build_ssml(voice: &str, rate: &str, escaped_text: &str) -> String {
    let voice = escape_attribute(voice);
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='en-US'>\
         <voice name='{voice}'>\
         <prosody pitch='+0Hz' rate='{rate}' volume='+0%'>{escaped_text}</prosody>\
         </voice></speak>"
    )
}

/// Expand `en-US-AvaNeural` into the long name used inside SSML.
///
/// A dash inside the voice part belongs to the region
/// (`zh-CN-liaoning-XiaobeiNeural` → region `CN-liaoning`). Long names are
/// returned unchanged; anything else is rejected.
pub fn long_voice_name(voice: &str) -> Result<String> {
    let Some(caps) = SHORT_VOICE_NAME.captures(voice) else {
        if is_edge_voice_name(voice) {
            return Ok(voice.to_string());
        }
        return Err(VoiceError::InvalidRequest(format!("Invalid voice: {}", voice)));
    };

    let lang = &caps[1];
    let mut region = caps[2].to_string();
    let mut name = &caps[3];

    if let Some(dash) = name.find('-') {
        region.push('-');
        region.push_str(&name[..dash]);
        name = &name[dash + 1..];
    }

    Ok(format!("Microsoft Server Speech Text to Speech Voice ({lang}-{region}, {name})"))
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Replace control characters the service rejects, then XML-escape
pub fn prepare_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{0}'..='\u{8}' | '\u{b}'..='\u{c}' | '\u{e}'..='\u{1f}' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// Split escaped text into chunks of at most `max_bytes`.
///
/// Cuts prefer the last newline, then the last space, inside the window and
/// never land inside a UTF-8 sequence or an XML entity. Chunks are trimmed
/// and empty chunks dropped.
pub fn split_text(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_bytes {
        let window = floor_char_boundary(rest, max_bytes);
        let head = &rest[..window];

        let mut split_at = head
            .rfind('\n')
            .or_else(|| head.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(window);

        if let Some(amp) = head[..split_at].rfind('&') {
            if amp > 0 && !head[amp..split_at].contains(';') {
                split_at = amp;
            }
        }

        push_trimmed(&mut chunks, &rest[..split_at]);
        rest = &rest[split_at..];
    }

    push_trimmed(&mut chunks, rest);
    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

/// Largest char boundary at or below `index`, but at least one char in
fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    if i == 0 {
        s.chars().next().map_or(s.len(), char::len_utf8)
    } else {
        i
    }
}

/// Parse `Key:Value` header lines
pub fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Split a text frame into headers and body
pub fn split_text_frame(frame: &str) -> (HashMap<String, String>, &str) {
    match frame.split_once("\r\n\r\n") {
        Some((headers, body)) => (parse_headers(headers), body),
        None => (parse_headers(frame), ""),
    }
}

/// Split a binary frame into headers and payload
pub fn split_binary_frame(frame: &[u8]) -> Result<(HashMap<String, String>, &[u8])> {
    if frame.len() < 2 {
        return Err(VoiceError::UnexpectedResponse(
            "binary frame shorter than its length prefix".to_string(),
        ));
    }

    let header_len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    let body_start = 2 + header_len;
    if frame.len() < body_start {
        return Err(VoiceError::UnexpectedResponse(format!(
            "binary frame header length {} exceeds frame size {}",
            header_len,
            frame.len()
        )));
    }

    let headers = String::from_utf8_lossy(&frame[2..body_start]);
    Ok((parse_headers(&headers), &frame[body_start..]))
}
