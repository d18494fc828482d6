use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use tracing::warn;

use crate::{state::AppState, storage::new_object_key};

const PHOTO_PREFIX: &str = "lectures";

/// A photo received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub body: Bytes,
    pub content_type: String,
}

/// Object key for a new lecture photo, or `None` for unsupported types.
pub fn photo_key(content_type: &str) -> Option<String> {
    new_object_key(PHOTO_PREFIX, content_type)
}

/// Store the photo under `key`.
pub async fn upload_photo(st: &AppState, key: &str, photo: PhotoUpload) -> anyhow::Result<()> {
    st.storage
        .put(key, photo.body, &photo.content_type)
        .await
        .with_context(|| format!("store photo {key}"))
}

/// Best-effort removal; an orphaned object is logged, never surfaced.
pub async fn discard_photo(st: &AppState, key: &str) {
    if let Err(e) = st.storage.remove(key).await {
        warn!(error = %e, %key, "failed to delete photo");
    }
}

pub async fn presign_photo(st: &AppState, key: &str) -> anyhow::Result<String> {
    let ttl = Duration::from_secs(st.config.storage.photo_url_ttl_secs);
    st.storage
        .presigned_url(key, ttl)
        .await
        .with_context(|| format!("presign url for key {}", key))
}
