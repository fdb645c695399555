use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::config::MAX_PAGE_SIZE;
use crate::error::{AppError, AppResult};

const MAX_CURSOR_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub offset: usize,
    pub page_size: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCursor {
    offset: serde_json::Value,
    page_size: serde_json::Value,
}

pub fn encode_cursor(cursor: &Cursor) -> String {
    // Serializing two integers cannot fail.
    let bytes = serde_json::to_vec(cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes a caller-supplied cursor. Every failure is an `InvalidParameter`.
pub fn decode_cursor(token: &str) -> AppResult<Cursor> {
    let token = token.trim();
    if token.is_empty() {
        return Err(invalid("cursor must not be empty"));
    }
    if token.len() > MAX_CURSOR_CHARS {
        return Err(invalid("cursor is too long"));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|_| invalid("cursor is not valid base64"))?;
    let raw: RawCursor =
        serde_json::from_slice(&bytes).map_err(|_| invalid("cursor payload is malformed"))?;

    let offset = raw
        .offset
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| invalid("cursor offset must be a non-negative integer"))?;
    let page_size = raw
        .page_size
        .as_u64()
        .filter(|v| (1..=u64::from(MAX_PAGE_SIZE)).contains(v))
        .ok_or_else(|| invalid("cursor pageSize must be an integer between 1 and 100"))?;

    Ok(Cursor {
        offset,
        page_size: page_size as u32,
    })
}

fn invalid(message: &str) -> AppError {
    AppError::invalid_parameter(format!("invalid cursor: {message}"))
}
