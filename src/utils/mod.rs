pub mod logging;

pub use logging::{body_or_note, truncate_text, RunLogger};
