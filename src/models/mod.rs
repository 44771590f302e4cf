// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod chat;
pub mod document;
pub mod notice;
pub mod profile;
pub mod season;
pub mod submission;

pub use chat::{ChatInput, ChatMessage, SenderRole};
pub use document::{Document, DocumentInput, DocumentType, NextOrderPolicy};
pub use notice::{Notice, NoticeInput, NoticeRow};
pub use profile::{
    is_answered, users_in_season, InitialProfileFields, ProfileUpdate, Reflection,
    SurveyAnswers, TypingSkillLevel, UserProfile,
};
pub use season::{Season, SeasonInput};
pub use submission::{
    resolve_latest, LatestSubmissions, OriginalPlay, OriginalSite, OwnedRecord, Quiz,
    Submission, SubmissionKind,
};
