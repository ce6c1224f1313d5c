pub mod media;
pub mod owned_css;
pub mod parse_css;
