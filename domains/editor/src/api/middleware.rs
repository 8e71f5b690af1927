//! Editor domain state

use std::sync::Arc;

use easel_media::MediaStorage;

use crate::EditorRepositories;

/// Application state for the Editor domain
#[derive(Clone)]
pub struct EditorState {
    pub repos: EditorRepositories,
    pub media: Arc<dyn MediaStorage>,
}

impl EditorState {
    pub fn new(repos: EditorRepositories, media: Arc<dyn MediaStorage>) -> Self {
        Self { repos, media }
    }
}
