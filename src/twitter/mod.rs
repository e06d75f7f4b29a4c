//! X API integration: credentials, request signing, and the remote client.
//!
//! The rest of the crate talks to the remote side exclusively through the
//! [`TwitterApi`] trait; [`XApiClient`] is the production implementation.

mod auth;
mod client;
mod error;

pub use auth::{
    authorization_header, percent_encode, Credentials, ENV_ACCESS_SECRET, ENV_ACCESS_TOKEN,
    ENV_API_KEY, ENV_API_SECRET,
};
pub use client::{MediaUpload, TimelineOptions, TweetRequest, TwitterApi, XApiClient};
pub use error::ApiError;
