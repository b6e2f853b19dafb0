//! Ophthalmic image labeler.
//!
//! Browse a folder of fundus/OCT images (JPEG, PNG, DICOM), grade each image,
//! keep the grades staged in memory, then commit them in one transaction while
//! copying every original into `Classified/<quality>/`.

pub mod config;
pub mod error;
pub mod export;
pub mod imaging;
pub mod logging;
pub mod reset;
pub mod state;

pub use error::{LabelerError, Result};
