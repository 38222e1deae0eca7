//! The image and link dialogs of the editor.
//!
//! An image goes through `Idle -> AltPrompt -> Idle`: it is validated when chosen, and uploaded
//! only once the alt text is confirmed. Editing the alt text of an image already in the document
//! goes through `Idle -> AltEdit -> Idle` and never touches storage.
use super::document::{Document, Link};
use crate::infras::{
    storage::{Bucket, ObjectStorage},
    uploads::{Upload, UploadRejection, ValidatedImage},
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error(transparent)]
    Rejected(#[from] UploadRejection),
    #[error("Select some text before adding a link")]
    EmptySelection,
    #[error("Enter a URL for the link")]
    EmptyUrl,
    #[error("There is no image at position {0}")]
    NoImageAt(usize),
    #[error("Image upload failed: {0}")]
    Storage(String),
}

pub struct Idle;

pub struct AltPrompt {
    image: ValidatedImage,
}

pub struct AltEdit {
    position: usize,
    alt: String,
}

pub struct ImageFlow<S> {
    state: S,
}

impl Default for ImageFlow<Idle> {
    fn default() -> Self {
        Self::new()
    }
}

// Blank answers keep the fallback
fn choose_alt(answer: &str, fallback: &str) -> String {
    let answer = answer.trim();
    if answer.is_empty() {
        fallback.to_string()
    } else {
        answer.to_string()
    }
}

impl ImageFlow<Idle> {
    pub fn new() -> Self {
        Self { state: Idle }
    }

    /// Validate a chosen file. A rejected file leaves nothing behind.
    pub fn select(self, upload: Upload) -> Result<ImageFlow<AltPrompt>, EditorError> {
        let image = upload.validate()?;
        Ok(ImageFlow {
            state: AltPrompt { image },
        })
    }

    pub fn edit_alt(self, doc: &Document, position: usize) -> Result<ImageFlow<AltEdit>, EditorError> {
        let (_, alt) = doc
            .image_at(position)
            .ok_or(EditorError::NoImageAt(position))?;
        Ok(ImageFlow {
            state: AltEdit {
                position,
                alt: alt.to_string(),
            },
        })
    }
}

impl ImageFlow<AltPrompt> {
    /// What the alt text field is pre-filled with
    pub fn suggested_alt(&self) -> &str {
        &self.state.image.suggested_alt
    }

    pub fn cancel(self) -> ImageFlow<Idle> {
        ImageFlow::new()
    }

    /// Upload the image and insert it at `position`, returning its public URL.
    ///
    /// When the upload fails the document is left untouched.
    pub async fn confirm<S: ObjectStorage + ?Sized>(
        self,
        doc: &mut Document,
        position: usize,
        alt: &str,
        storage: &S,
        uid: &str,
    ) -> Result<(ImageFlow<Idle>, String), EditorError> {
        let alt = choose_alt(alt, &self.state.image.suggested_alt);
        let url = storage
            .put(Bucket::Blog, None, uid, self.state.image.object)
            .await
            .map_err(|e| {
                log::error!("Failed to upload an editor image: {}", e);
                EditorError::Storage(e.to_string())
            })?;
        doc.insert_image(position, &url, alt);
        Ok((ImageFlow::new(), url))
    }
}

impl ImageFlow<AltEdit> {
    pub fn current_alt(&self) -> &str {
        &self.state.alt
    }

    pub fn position(&self) -> usize {
        self.state.position
    }

    pub fn confirm(self, doc: &mut Document, alt: &str) -> Result<ImageFlow<Idle>, EditorError> {
        let alt = choose_alt(alt, &self.state.alt);
        if doc.set_image_alt(self.state.position, alt) {
            Ok(ImageFlow::new())
        } else {
            Err(EditorError::NoImageAt(self.state.position))
        }
    }
}

/// Prefix `https://` to addresses typed without a scheme.
pub fn normalize_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        None
    } else if url.contains("://") || url.starts_with("mailto:") || url.starts_with('/') {
        Some(url.to_string())
    } else {
        Some(format!("https://{}", url))
    }
}

/// The link dialog, opened over a selection of the document
#[derive(Debug)]
pub struct LinkDialog {
    start: usize,
    end: usize,
    text: String,
}

impl LinkDialog {
    pub fn open(doc: &Document, start: usize, end: usize) -> Result<Self, EditorError> {
        let (start, end) = (start.min(end), start.max(end).min(doc.len()));
        let text = doc.text_between(start, end);
        if text.trim().is_empty() {
            return Err(EditorError::EmptySelection);
        }
        Ok(Self { start, end, text })
    }

    pub fn selected_text(&self) -> &str {
        &self.text
    }

    pub fn confirm(self, doc: &mut Document, url: &str, new_tab: bool) -> Result<(), EditorError> {
        let href = normalize_url(url).ok_or(EditorError::EmptyUrl)?;
        doc.apply_link(self.start, self.end, Link { href, new_tab });
        Ok(())
    }

    /// Strip links from the selection
    pub fn unlink(self, doc: &mut Document) {
        doc.remove_link(self.start, self.end);
    }
}
