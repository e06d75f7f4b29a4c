//! twitter-mcp: MCP server for AI-assisted X/Twitter actions
//!
//! This library exposes a small set of X/Twitter actions (reading the home
//! timeline, posting tweets and replies with optional media, deleting tweets)
//! as MCP tools over a stdio JSON-RPC transport, with client-side rate-limit
//! throttling tuned for the X API free tier.

pub mod config;
pub mod error;
pub mod mcp;
pub mod media;
pub mod rate_limit;
pub mod tools;
pub mod twitter;
