/// State management module
///
/// This module handles all application state, including:
/// - Database connections and queries (library.rs)
/// - Persisted record structures (data.rs)
/// - Form values and vocabularies (edit.rs)
/// - Folder scanning and the image cursor (navigation.rs)
/// - Unsaved per-image edits (staging.rs)
/// - Placeholder label suggestions (suggest.rs)
/// - The annotation session tying it together (session.rs)

pub mod data;
pub mod edit;
pub mod library;
pub mod navigation;
pub mod session;
pub mod staging;
pub mod suggest;
