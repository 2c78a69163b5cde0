//! Testing utilities and harness for lazysrc.
//!
//! [`LoaderTestRule`] runs a real [`LazyLoader`](lazysrc_core::LazyLoader)
//! against a fake page with a virtual clock, so debounce and poll behaviour
//! can be tested without waiting on wall-clock time.

pub mod element;
pub mod page;
pub mod rule;

pub use element::*;
pub use page::*;
pub use rule::*;
