//! The rich-text editor of the blog
pub mod document;
pub mod flow;

use self::flow::{AltPrompt, ImageFlow};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// How long a chosen image waits for its alt text before it is dropped
pub const PENDING_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Images chosen in the editor but not yet confirmed, one per user and draft.
///
/// Nothing here has reached storage yet; choosing another image in the same draft replaces the
/// pending one.
#[derive(Default)]
pub struct PendingImages(Mutex<HashMap<(String, String), (Instant, ImageFlow<AltPrompt>)>>);

impl PendingImages {
    pub async fn hold(&self, uid: &str, draft: &str, flow: ImageFlow<AltPrompt>) {
        self.hold_at(uid, draft, flow, Instant::now()).await
    }

    // Abandoned entries are swept whenever a new one comes in
    async fn hold_at(&self, uid: &str, draft: &str, flow: ImageFlow<AltPrompt>, now: Instant) {
        let mut pending = self.0.lock().await;
        pending.retain(|_, (since, _)| now.saturating_duration_since(*since) < PENDING_TIMEOUT);
        pending.insert((uid.to_string(), draft.to_string()), (now, flow));
    }

    pub async fn take(&self, uid: &str, draft: &str) -> Option<ImageFlow<AltPrompt>> {
        self.0
            .lock()
            .await
            .remove(&(uid.to_string(), draft.to_string()))
            .map(|(_, flow)| flow)
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.0.lock().await.len()
    }
}

#[cfg(test)]
mod tests;
