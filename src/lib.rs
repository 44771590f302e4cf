// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course portal backend.
//!
//! This crate provides the data-access layer, the decision rules and the
//! JSON API behind the student and admin portals of a programming course.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SharedStore;
use services::{
    ChatService, DocumentService, IdTokenVerifier, NoticeService, PortalCache, ProfileService,
    SeasonService, SubmissionService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SharedStore,
    pub cache: PortalCache,
    pub identity: IdTokenVerifier,
}

impl AppState {
    pub fn new(config: Config, store: SharedStore, identity: IdTokenVerifier) -> Self {
        Self {
            config,
            store,
            cache: PortalCache::new(),
            identity,
        }
    }

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(self.store.clone(), self.cache.clone())
    }

    pub fn seasons(&self) -> SeasonService {
        SeasonService::new(self.store.clone(), self.cache.clone())
    }

    pub fn notices(&self) -> NoticeService {
        NoticeService::new(self.store.clone(), self.profiles(), self.seasons())
    }

    pub fn documents(&self) -> DocumentService {
        DocumentService::new(self.store.clone(), self.config.document_next_order)
    }

    pub fn chat(&self) -> ChatService {
        ChatService::new(self.store.clone())
    }

    pub fn submissions(&self) -> SubmissionService {
        SubmissionService::new(self.store.clone())
    }
}
