//! PDF Layout Server
//!
//! Accepts PDF uploads over HTTP and returns layout-aware text spans
//! (page, text, font size, bold flag, bounding box) for every non-empty run
//! of text, in reading order. A legacy endpoint returns plain text per page.

pub mod config;
pub mod decoder;
pub mod error;
pub mod extract;
pub mod intake;
pub mod limits;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;

pub use routes::router;
