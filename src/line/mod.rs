//! Style-aware row parsing and rendering.
//!
//! Rows carry inline `{name}` style tokens. [`Markup`] holds the parsed form
//! and [`Line`] the plain/markup/display views of a rendered window.

mod core;

pub use core::{Line, Markup, RESET_STYLE};
