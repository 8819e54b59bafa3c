pub mod catalogue;
pub mod download;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod retry;
pub mod upload;
pub mod vod;

pub use error::{Error, Result};
