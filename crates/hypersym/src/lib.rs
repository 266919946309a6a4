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

//! Paginated cross-index symbol resolution over a fleet of pre-built
//! code-intelligence indexes.
//!
//! Given a position in a repository at a commit, the resolver returns
//! the references or implementations of the symbol there, fusing two
//! sources into one ordered, deduplicated, cursor-resumable stream:
//! - "local" results from traversing the graphs of indexes attached to
//!   the queried commit, and
//! - "remote" results from moniker search over dependency and dependent
//!   indexes anywhere in the fleet.
//!
//! Storage, gitserver, and transport are consumed as capabilities (see
//! `store`); the only state that survives between pages is the opaque
//! cursor each response carries.

pub mod commits;
pub mod config;
pub mod cursor;
pub mod error;
pub mod loader;
pub mod logging;
pub mod monikers;
pub mod resolver;
pub mod store;
pub mod translator;
pub mod types;

// In-memory fakes exposed for integration tests.
pub mod test_utils;

pub use config::ResolverConfig;
pub use cursor::{Cursor, Phase};
pub use error::ResolveError;
pub use resolver::{ResolveKind, Resolver, DEFINITIONS_LIMIT, MONIKER_LIMIT};
pub use store::{
    GitDiffClient, GitserverClient, IndexStore, LocationTable, SubRepoPermsChecker,
};
pub use types::{
    Dump, Location, MonikerData, MonikerKind, PackageInformationData, Position,
    QualifiedMoniker, Range, RepositoryCommit, RequestArgs, UploadLocation,
};
