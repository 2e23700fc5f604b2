use image::DynamicImage;
use std::collections::BTreeMap;

use crate::photos::errors::PhotoError;
use crate::photos::types::{
    DEFAULT_SESSION, Photo, PhotoContent, PhotoImages, PhotoVariant, local_now,
};
use crate::storage::{
    MANIFEST_VERSION, ManifestIndex, PhotoStorage, StorageError, make_thumbnail, normalize_image,
    thumbnail_data_url,
};

/// Result of handing a photo to the annotation editor
#[derive(Debug, Clone)]
pub enum AnnotationOutcome {
    Saved(DynamicImage),
    Cancelled,
}

/// Sessions and photos of the current user, mirrored to remote storage.
///
/// Every mutation rewrites the whole manifest. Remote failures are logged
/// and never fail the operation; in-memory state stays authoritative.
pub struct PhotoStore {
    sessions: BTreeMap<String, Vec<Photo>>,
    photo_counter: u64,
    current_session: String,
    storage: Option<Box<dyn PhotoStorage>>,
}

impl Default for PhotoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoStore {
    /// Empty store holding only the `Default` session
    pub fn new() -> Self {
        let mut sessions = BTreeMap::new();
        sessions.insert(DEFAULT_SESSION.to_string(), Vec::new());
        Self {
            sessions,
            photo_counter: 0,
            current_session: DEFAULT_SESSION.to_string(),
            storage: None,
        }
    }

    pub fn with_storage(storage: Box<dyn PhotoStorage>) -> Self {
        let mut store = Self::new();
        store.storage = Some(storage);
        store
    }

    pub fn attach_storage(&mut self, storage: Box<dyn PhotoStorage>) {
        tracing::info!("Attached {} storage", storage.scheme());
        self.storage = Some(storage);
    }

    pub fn detach_storage(&mut self) -> Option<Box<dyn PhotoStorage>> {
        self.storage.take()
    }

    /// Drop every session and photo, leaving only an empty `Default`.
    /// The id counter is kept so later ids stay unique.
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.sessions.insert(DEFAULT_SESSION.to_string(), Vec::new());
        self.current_session = DEFAULT_SESSION.to_string();
    }

    pub fn storage(&self) -> Option<&dyn PhotoStorage> {
        self.storage.as_deref()
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn session_names(&self) -> Vec<&str> {
        self.sessions.keys().map(String::as_str).collect()
    }

    pub fn has_session(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    pub fn photos(&self, session: &str) -> Option<&[Photo]> {
        self.sessions.get(session).map(Vec::as_slice)
    }

    /// Lookup without hydration
    pub fn find_photo(&self, photo_id: u64, session: &str) -> Option<&Photo> {
        self.sessions
            .get(session)?
            .iter()
            .find(|p| p.id == photo_id)
    }

    pub fn total_photos(&self) -> usize {
        self.sessions.values().map(Vec::len).sum()
    }

    pub fn photo_counter(&self) -> u64 {
        self.photo_counter
    }

    pub fn current_session(&self) -> &str {
        &self.current_session
    }

    pub fn select_session(&mut self, name: &str) -> bool {
        if !self.sessions.contains_key(name) {
            return false;
        }
        self.current_session = name.to_string();
        true
    }

    /// `false` if the name is blank or already taken.
    pub async fn create_session(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.sessions.contains_key(name) {
            tracing::debug!("Refusing to create session {:?}", name);
            return false;
        }

        self.sessions.insert(name.to_string(), Vec::new());
        tracing::info!("Created session {:?}", name);
        self.sync_best_effort().await;
        true
    }

    /// Add a captured photo and return its id.
    pub async fn add_photo(
        &mut self,
        image: DynamicImage,
        session: &str,
        comment: &str,
    ) -> Result<u64, PhotoError> {
        if !self.sessions.contains_key(session) {
            return Err(PhotoError::SessionNotFound(session.to_string()));
        }
        self.insert_photo(image, session, comment.to_string(), PhotoVariant::Original)
            .await
    }

    /// Add an annotated copy of `base_photo_id`. The base photo is left
    /// untouched; the copy inherits its comment unless one is given.
    pub async fn add_derived_photo(
        &mut self,
        base_photo_id: u64,
        session: &str,
        image: DynamicImage,
        comment: Option<&str>,
    ) -> Result<u64, PhotoError> {
        let photos = self
            .sessions
            .get(session)
            .ok_or_else(|| PhotoError::SessionNotFound(session.to_string()))?;
        let base = photos
            .iter()
            .find(|p| p.id == base_photo_id)
            .ok_or_else(|| PhotoError::PhotoNotFound {
                photo_id: base_photo_id,
                session: session.to_string(),
            })?;

        let comment = comment.map_or_else(|| base.comment.clone(), str::to_string);
        self.insert_photo(
            image,
            session,
            comment,
            PhotoVariant::Annotated {
                source_photo_id: base_photo_id,
            },
        )
        .await
    }

    /// Save the editor's result as a derived photo. A cancelled edit adds
    /// nothing.
    pub async fn save_annotation(
        &mut self,
        base_photo_id: u64,
        session: &str,
        outcome: AnnotationOutcome,
        comment: Option<&str>,
    ) -> Result<Option<u64>, PhotoError> {
        match outcome {
            AnnotationOutcome::Saved(image) => self
                .add_derived_photo(base_photo_id, session, image, comment)
                .await
                .map(Some),
            AnnotationOutcome::Cancelled => {
                tracing::debug!("Annotation of photo {} cancelled", base_photo_id);
                Ok(None)
            }
        }
    }

    async fn insert_photo(
        &mut self,
        image: DynamicImage,
        session: &str,
        comment: String,
        variant: PhotoVariant,
    ) -> Result<u64, PhotoError> {
        let image = normalize_image(&image);
        let thumbnail = make_thumbnail(&image);
        let thumb_data_url = match thumbnail_data_url(&thumbnail) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Failed to encode thumbnail: {}", e);
                None
            }
        };

        let photo_id = self.photo_counter + 1;
        self.photo_counter = photo_id;

        let (storage_uri, file_id) = match &self.storage {
            Some(storage) => match storage.save_blob(session, photo_id, &image).await {
                Ok(blob) => (Some(blob.uri), blob.file_id),
                Err(e) => {
                    tracing::warn!(
                        "Failed to store photo {} remotely, keeping it local only: {}",
                        photo_id,
                        e
                    );
                    (None, None)
                }
            },
            None => (None, None),
        };

        let photo = Photo {
            id: photo_id,
            comment,
            timestamp: local_now(),
            has_annotations: variant != PhotoVariant::Original,
            variant,
            storage_uri,
            file_id,
            thumb_data_url,
            content: PhotoContent::Hydrated(PhotoImages {
                original: image.clone(),
                current: image,
                thumbnail,
            }),
        };

        self.sessions
            .get_mut(session)
            .ok_or_else(|| PhotoError::SessionNotFound(session.to_string()))?
            .push(photo);

        tracing::info!(
            "Added {} photo {} to session {:?}",
            variant.as_str(),
            photo_id,
            session
        );
        self.sync_best_effort().await;
        Ok(photo_id)
    }

    /// Relocate a photo to the end of another session.
    pub async fn move_photo(&mut self, photo_id: u64, from: &str, to: &str) -> bool {
        if !self.sessions.contains_key(to) {
            return false;
        }
        let Some(source) = self.sessions.get_mut(from) else {
            return false;
        };
        let Some(index) = source.iter().position(|p| p.id == photo_id) else {
            return false;
        };

        let photo = source.remove(index);
        if let Some(target) = self.sessions.get_mut(to) {
            target.push(photo);
        }

        tracing::info!("Moved photo {} from {:?} to {:?}", photo_id, from, to);
        self.sync_best_effort().await;
        true
    }

    /// Remove a photo. Derived photos pointing at it are left as they are.
    pub async fn delete_photo(&mut self, photo_id: u64, session: &str) -> bool {
        let Some(photos) = self.sessions.get_mut(session) else {
            return false;
        };
        let Some(index) = photos.iter().position(|p| p.id == photo_id) else {
            return false;
        };
        let photo = photos.remove(index);

        if let (Some(storage), Some(uri)) = (&self.storage, photo.storage_uri.as_deref()) {
            storage.delete_blob(uri).await;
        }

        tracing::info!("Deleted photo {} from session {:?}", photo_id, session);
        self.sync_best_effort().await;
        true
    }

    pub async fn update_photo_comment(&mut self, photo_id: u64, session: &str, text: &str) -> bool {
        let Some(photo) = self.photo_mut(photo_id, session) else {
            return false;
        };
        photo.comment = text.to_string();
        self.sync_best_effort().await;
        true
    }

    /// Restore an original photo's current image to its baseline and clear
    /// `has_annotations`. Annotated copies cannot be reset.
    pub async fn reset_photo_annotations(&mut self, photo_id: u64, session: &str) -> bool {
        let Some(photo) = self.photo_mut(photo_id, session) else {
            return false;
        };
        if photo.variant != PhotoVariant::Original {
            return false;
        }
        let PhotoContent::Hydrated(images) = &mut photo.content else {
            return false;
        };

        images.current = images.original.clone();
        images.thumbnail = make_thumbnail(&images.original);
        photo.has_annotations = false;

        tracing::info!("Reset annotations on photo {}", photo_id);
        self.sync_best_effort().await;
        true
    }

    /// Look up a photo, loading its images from storage on first access.
    ///
    /// A failed load is logged and the photo is returned metadata-only.
    pub async fn get_photo(&mut self, photo_id: u64, session: &str) -> Option<&Photo> {
        let storage = self.storage.as_deref();
        let photo = self
            .sessions
            .get_mut(session)?
            .iter_mut()
            .find(|p| p.id == photo_id)?;

        let metadata_only = matches!(photo.content, PhotoContent::MetadataOnly);
        if let (true, Some(uri), Some(storage)) =
            (metadata_only, photo.storage_uri.as_deref(), storage)
        {
            match storage.load_blob(uri).await {
                Ok(image) => {
                    let thumbnail = make_thumbnail(&image);
                    photo.content = PhotoContent::Hydrated(PhotoImages {
                        original: image.clone(),
                        current: image,
                        thumbnail,
                    });
                    tracing::debug!("Hydrated photo {} from {}", photo_id, uri);
                }
                Err(e) => {
                    tracing::warn!("Failed to load photo {} from {}: {}", photo_id, uri, e);
                }
            }
        }

        Some(&*photo)
    }

    /// Replace the in-memory sessions with the remote manifest.
    ///
    /// An empty or unreadable manifest leaves local state as it is. The
    /// counter never moves backwards, so new ids cannot collide with any
    /// id seen locally or remotely. Returns whether anything was loaded.
    pub async fn load_from_remote(&mut self) -> bool {
        let Some(storage) = &self.storage else {
            return false;
        };

        let manifest = storage.load_manifest().await;
        if manifest.is_empty() {
            tracing::info!("Remote manifest is empty; keeping local sessions");
            return false;
        }

        let discarded = self.total_photos();
        if discarded > 0 {
            tracing::warn!(
                "Replacing {} local photos with the remote manifest",
                discarded
            );
        }

        let max_id = manifest.max_photo_id().unwrap_or(0);
        self.photo_counter = manifest.photo_counter.max(max_id).max(self.photo_counter);
        self.sessions = manifest
            .sessions
            .into_iter()
            .map(|(name, metas)| (name, metas.into_iter().map(Photo::from_meta).collect()))
            .collect();
        self.sessions
            .entry(DEFAULT_SESSION.to_string())
            .or_default();

        if !self.sessions.contains_key(&self.current_session) {
            self.current_session = DEFAULT_SESSION.to_string();
        }

        tracing::info!(
            "Loaded {} sessions with {} photos from remote manifest",
            self.sessions.len(),
            self.total_photos()
        );
        true
    }

    pub fn to_manifest(&self) -> ManifestIndex {
        ManifestIndex {
            sessions: self
                .sessions
                .iter()
                .map(|(name, photos)| (name.clone(), photos.iter().map(Photo::to_meta).collect()))
                .collect(),
            photo_counter: self.photo_counter,
            version: MANIFEST_VERSION.to_string(),
        }
    }

    /// Write the manifest now. Without storage this is a no-op.
    pub async fn sync_manifest(&self) -> Result<(), StorageError> {
        match &self.storage {
            Some(storage) => storage.save_manifest(&self.to_manifest()).await,
            None => Ok(()),
        }
    }

    async fn sync_best_effort(&self) {
        if let Err(e) = self.sync_manifest().await {
            tracing::warn!("Manifest sync failed, continuing with local state: {}", e);
        }
    }

    fn photo_mut(&mut self, photo_id: u64, session: &str) -> Option<&mut Photo> {
        self.sessions
            .get_mut(session)?
            .iter_mut()
            .find(|p| p.id == photo_id)
    }

    pub(crate) fn sessions(&self) -> &BTreeMap<String, Vec<Photo>> {
        &self.sessions
    }
}
