//! Client for the Wallix Bastion REST API.
//!
//! A [`BastionClient`] wraps one `reqwest::Client` with its own cookie jar. After [`BastionClient::authenticate`]
//! succeeded every other call rides on the session cookie.

#[macro_use]
extern crate tracing;

mod auth;
mod client;
mod document;
pub mod endpoints;
mod error;

pub use auth::Credentials;
pub use client::{
    BastionClient,
    ClientConfig,
};
pub use document::Document;
pub use endpoints::{
    closed_sessions_from_date,
    SessionStatus,
    TargetType,
};
pub use error::{
    ApiError,
    ApiErrorBody,
    Result,
    StatusBody,
};
