//! Track supply: the `Track` model and a local-directory scanner.

mod display;
mod model;
mod scan;

pub use display::display_from_fields;
pub use model::Track;
pub use scan::{file_locator, scan};
