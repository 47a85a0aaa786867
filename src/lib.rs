#![warn(clippy::pedantic)]
// Noisy doc/signature lints; would require annotating most pub functions
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Intentional casts throughout the numeric and pixel code (counts, snowflakes, coordinates)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod cli;
pub mod config;
pub mod errors;
pub mod history;
pub mod relations;
pub mod render;
pub mod sentiment;
pub(crate) mod utils;

pub use errors::{RelmapError, RelmapResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
