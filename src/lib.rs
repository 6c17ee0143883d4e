//! Account verification and password recovery service.
//!
//! Email-confirmed sign-up, single-use password reset links and
//! verification resends, served over HTTP with axum.

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod mailer;
pub mod pages;
pub mod state;
