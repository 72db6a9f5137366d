//! # Sesamo (Credential Issuance & Session Lifecycle)
//!
//! `sesamo` registers accounts, verifies email ownership, authenticates
//! logins with brute-force protection, issues short-lived access tokens
//! paired with revocable refresh tokens, and supports self-service password
//! reset. Registration and login are gated by bot-mitigation challenges.
//!
//! ## Account state machine
//!
//! - Accounts are created unverified; a one-time emailed token flips
//!   `email_verified` exactly once.
//! - Five consecutive failed logins lock an account for thirty minutes. The
//!   lock expires by timestamp alone; no unlock write is required.
//! - A successful password verification always resets the failure counter,
//!   even when the login is still denied for a missing email verification.
//!
//! ## Tokens
//!
//! Access and refresh tokens are signed in two independent contexts with
//! separate secrets. Refresh tokens are revocable through a per-account
//! allow-list and travel only in an `HttpOnly` cookie. Email-verify and
//! password-reset tokens are opaque 256-bit one-time secrets; reset tokens
//! expire after one hour and are consumed atomically with the password
//! change.
//!
//! Account enumeration is deliberately starved: unknown email and wrong
//! password answer identically, and forgot-password acknowledges whether or
//! not the account exists.

pub mod auth;
pub mod cli;
pub mod mail;
pub mod sesamo;
pub mod store;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
