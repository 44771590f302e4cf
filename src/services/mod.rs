// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cache;
pub mod chat;
pub mod documents;
pub mod identity;
pub mod live;
pub mod notices;
pub mod profiles;
pub mod seasons;
pub mod submissions;

pub use cache::PortalCache;
pub use chat::ChatService;
pub use documents::DocumentService;
pub use identity::{IdTokenVerifier, VerifiedIdentity};
pub use live::{LiveQuery, LiveStream};
pub use notices::NoticeService;
pub use profiles::ProfileService;
pub use seasons::SeasonService;
pub use submissions::SubmissionService;
