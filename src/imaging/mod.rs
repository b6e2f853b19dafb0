/// Image file handling module
///
/// This module handles:
/// - Decoding raster and DICOM files into display-sized bitmaps (loader.rs)
/// - Copying originals into label folders (classify.rs)

pub mod classify;
pub mod loader;
