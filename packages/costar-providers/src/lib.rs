pub mod html;
pub mod letterboxd;

mod error;

pub use error::{Error, Result};
pub use letterboxd::{Film, LetterboxdClient, ListPage};
