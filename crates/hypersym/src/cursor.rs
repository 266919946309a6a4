// Copyright 2025 HyperSym Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resumable pagination state and its opaque wire encoding.
//!
//! The cursor is the only state that survives between pages of one
//! result stream: it pins the visible-upload set, the lazily gathered
//! moniker arrays, and the per-phase offsets. Encoding is JSON wrapped
//! in URL-safe base64; missing fields decode to their zero values so
//! the schema can grow without breaking in-flight tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::types::{Position, QualifiedMoniker};

/// Phase of the multi-phase result stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Local,
    Dependencies,
    Dependents,
    Done,
}

/// One frozen visible upload as carried between pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorVisibleUpload {
    #[serde(rename = "id")]
    pub dump_id: i64,
    #[serde(rename = "path")]
    pub target_path: String,
    #[serde(rename = "pos")]
    pub target_position: Position,
    #[serde(rename = "stripped", default)]
    pub target_path_without_root: String,
}

/// Offsets into the local (graph traversal) result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCursor {
    #[serde(rename = "upload", default)]
    pub upload_offset: usize,
    #[serde(rename = "location", default)]
    pub location_offset: usize,
}

/// Offsets into the remote (moniker search) result set. An
/// `upload_offset` of `-1` marks exhaustion of the reference batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCursor {
    #[serde(rename = "batch", default)]
    pub upload_batch_ids: Vec<i64>,
    #[serde(rename = "upload", default)]
    pub upload_offset: i64,
    #[serde(rename = "location", default)]
    pub location_offset: usize,
}

/// The entire resumable state of one result stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default)]
    pub phase: Phase,
    /// The visible-upload set frozen on the first page.
    #[serde(rename = "uploads", default)]
    pub cursors_to_visible_uploads: Vec<CursorVisibleUpload>,
    /// Kind-specific monikers (implementation monikers for the
    /// implementations operation, import monikers for references).
    /// `None` until gathered on the first page.
    #[serde(rename = "monikers", default)]
    pub ordered_monikers: Option<Vec<QualifiedMoniker>>,
    #[serde(rename = "exports", default)]
    pub ordered_export_monikers: Option<Vec<QualifiedMoniker>>,
    #[serde(rename = "local", default)]
    pub local_cursor: LocalCursor,
    #[serde(rename = "remote", default)]
    pub remote_cursor: RemoteCursor,
}

impl Cursor {
    /// Decode a raw token from a previous response. The empty string
    /// decodes to the initial cursor.
    pub fn decode(raw: &str) -> Result<Cursor, ResolveError> {
        if raw.is_empty() {
            return Ok(Cursor::default());
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| ResolveError::invalid_cursor(raw))?;
        serde_json::from_slice(&bytes).map_err(|_| ResolveError::invalid_cursor(raw))
    }

    /// Encode to an opaque, URL-safe token.
    pub fn encode(&self) -> Result<String, ResolveError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| ResolveError::Internal(format!("cursor serialization: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MonikerData, MonikerKind, PackageInformationData};

    fn sample_cursor() -> Cursor {
        Cursor {
            phase: Phase::Dependents,
            cursors_to_visible_uploads: vec![CursorVisibleUpload {
                dump_id: 42,
                target_path: "proto/api.go".into(),
                target_position: Position {
                    line: 12,
                    character: 3,
                },
                target_path_without_root: "api.go".into(),
            }],
            ordered_monikers: Some(vec![QualifiedMoniker {
                moniker: MonikerData {
                    kind: MonikerKind::Implementation,
                    scheme: "gomod".into(),
                    identifier: "pkg/Iface".into(),
                    package_information_id: "5".into(),
                },
                package_information: PackageInformationData {
                    manager: "gomod".into(),
                    name: "example.com/pkg".into(),
                    version: "v0.3.0".into(),
                },
            }]),
            ordered_export_monikers: Some(vec![]),
            local_cursor: LocalCursor {
                upload_offset: 1,
                location_offset: 0,
            },
            remote_cursor: RemoteCursor {
                upload_batch_ids: vec![7, 9],
                upload_offset: 20,
                location_offset: 4,
            },
        }
    }

    #[test]
    fn round_trip() {
        let cursor = sample_cursor();
        let token = cursor.encode().unwrap();
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn empty_token_decodes_to_initial_state() {
        let cursor = Cursor::decode("").unwrap();
        assert_eq!(cursor, Cursor::default());
        assert_eq!(cursor.phase, Phase::Local);
        assert!(cursor.ordered_monikers.is_none());
        assert!(cursor.ordered_export_monikers.is_none());
    }

    #[test]
    fn token_is_url_safe() {
        let token = sample_cursor().encode().unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(
            Cursor::decode("not base64!"),
            Err(ResolveError::InvalidCursor(_))
        ));

        // Valid base64, invalid payload.
        let token = URL_SAFE_NO_PAD.encode(b"[1, 2, 3]");
        assert!(matches!(
            Cursor::decode(&token),
            Err(ResolveError::InvalidCursor(_))
        ));
    }

    #[test]
    fn missing_and_unknown_fields_decode_to_zero_values() {
        let token = URL_SAFE_NO_PAD.encode(br#"{"phase":"dependents","surprise":true}"#);
        let cursor = Cursor::decode(&token).unwrap();
        assert_eq!(cursor.phase, Phase::Dependents);
        assert!(cursor.cursors_to_visible_uploads.is_empty());
        assert_eq!(cursor.remote_cursor, RemoteCursor::default());
    }
}
