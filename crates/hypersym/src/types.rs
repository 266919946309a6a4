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

//! Core data model shared by the resolver and its collaborators.

use serde::{Deserialize, Serialize};

/// A pre-built code-intelligence index attached to one repository commit.
/// Immutable for the duration of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dump {
    pub id: i64,
    pub repository_id: i64,
    pub repository_name: String,
    pub commit: String,
    /// Path prefix within the repository covered by this index. Location
    /// paths are relative to this root.
    pub root: String,
}

/// 0-indexed line/character offsets; characters count Unicode code points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: i64,
    pub character: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Whether the range encloses the given position, inclusive on both ends.
    pub fn contains(&self, pos: Position) -> bool {
        if pos.line < self.start.line || pos.line > self.end.line {
            return false;
        }
        if pos.line == self.start.line && pos.character < self.start.character {
            return false;
        }
        if pos.line == self.end.line && pos.character > self.end.character {
            return false;
        }
        true
    }
}

/// A location inside one dump. The path is relative to the dump's root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub dump_id: i64,
    pub path: String,
    pub range: Range,
}

/// A location adjusted into the user's view: full repository path and a
/// range valid at the commit the request targeted (when translatable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLocation {
    pub dump: Dump,
    pub path: String,
    pub target_commit: String,
    pub target_range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonikerKind {
    Import,
    Export,
    Implementation,
    Local,
}

impl MonikerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonikerKind::Import => "import",
            MonikerKind::Export => "export",
            MonikerKind::Implementation => "implementation",
            MonikerKind::Local => "local",
        }
    }
}

/// A cross-index symbol identity attached to a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonikerData {
    pub kind: MonikerKind,
    pub scheme: String,
    pub identifier: String,
    /// Empty when the moniker carries no package information.
    #[serde(default)]
    pub package_information_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInformationData {
    pub manager: String,
    pub name: String,
    pub version: String,
}

/// A moniker together with the package information it resolved to.
/// Identity spans all six fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedMoniker {
    pub moniker: MonikerData,
    pub package_information: PackageInformationData,
}

impl QualifiedMoniker {
    /// Stable identity key used for de-duplication.
    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.moniker.kind.as_str(),
            self.moniker.scheme,
            self.moniker.identifier,
            self.package_information.manager,
            self.package_information.name,
            self.package_information.version,
        )
    }
}

/// A `(repository, commit)` pair checked against gitserver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryCommit {
    pub repository_id: i64,
    pub commit: String,
}

/// A dump that should provide results for the current position, together
/// with the path and position translated to the dump's indexed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleUpload {
    pub dump: Dump,
    /// Translated path, including the dump's root.
    pub target_path: String,
    pub target_position: Position,
    /// Translated path with the dump's root stripped; the coordinate
    /// space the index store speaks.
    pub target_path_without_root: String,
}

/// Arguments for one page of a resolve request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArgs {
    pub repository_id: i64,
    pub commit: String,
    pub path: String,
    pub line: i64,
    pub character: i64,
    pub limit: usize,
    /// Cursor from the previous response, or empty for the first page.
    pub raw_cursor: String,
}
