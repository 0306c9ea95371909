//! Social network boundary
//!
//! Information Hiding:
//! - Graph API wire shapes live in `types`
//! - Transport and token handling live in `client`

pub mod client;
pub mod types;

pub use client::{comment_info, GraphConnector, InstagramClient, SocialApi};
pub use types::*;
