//! Lazy image source loading for browser documents.
//!
//! Re-exports the scheduler from `lazysrc-core` and, with the `web` feature,
//! the browser adapter.

pub use lazysrc_core::*;

#[cfg(feature = "web")]
pub mod web {
    pub use lazysrc_platform_web::*;
}
