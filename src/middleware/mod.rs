// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (session auth, access gates).

pub mod auth;
pub mod gate;

pub use auth::require_auth;
pub use gate::{access_gate, require_admin};
