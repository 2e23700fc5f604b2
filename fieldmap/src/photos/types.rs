use chrono::{Local, NaiveDateTime};
use image::DynamicImage;
use serde::Serialize;

use crate::storage::{PhotoMeta, VARIANT_ANNOTATED, VARIANT_ORIGINAL};

/// Display format for photo timestamps, in local time
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_SESSION: &str = "Default";

/// Whether a photo is a capture or an annotated copy of another photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoVariant {
    Original,
    /// Points at a smaller id; the source may have been deleted since
    Annotated { source_photo_id: u64 },
}

impl PhotoVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => VARIANT_ORIGINAL,
            Self::Annotated { .. } => VARIANT_ANNOTATED,
        }
    }

    pub fn source_photo_id(&self) -> Option<u64> {
        match self {
            Self::Original => None,
            Self::Annotated { source_photo_id } => Some(*source_photo_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhotoImages {
    pub original: DynamicImage,
    pub current: DynamicImage,
    pub thumbnail: DynamicImage,
}

/// Photos loaded from a manifest carry metadata only until first read.
#[derive(Debug, Clone)]
pub enum PhotoContent {
    MetadataOnly,
    Hydrated(PhotoImages),
}

#[derive(Debug, Clone)]
pub struct Photo {
    pub(crate) id: u64,
    pub(crate) comment: String,
    pub(crate) timestamp: NaiveDateTime,
    pub(crate) has_annotations: bool,
    pub(crate) variant: PhotoVariant,
    pub(crate) storage_uri: Option<String>,
    pub(crate) file_id: Option<String>,
    pub(crate) thumb_data_url: Option<String>,
    pub(crate) content: PhotoContent,
}

impl Photo {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn has_annotations(&self) -> bool {
        self.has_annotations
    }

    pub fn variant(&self) -> PhotoVariant {
        self.variant
    }

    pub fn source_photo_id(&self) -> Option<u64> {
        self.variant.source_photo_id()
    }

    pub fn storage_uri(&self) -> Option<&str> {
        self.storage_uri.as_deref()
    }

    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }

    pub fn thumb_data_url(&self) -> Option<&str> {
        self.thumb_data_url.as_deref()
    }

    pub fn is_hydrated(&self) -> bool {
        matches!(self.content, PhotoContent::Hydrated(_))
    }

    pub fn images(&self) -> Option<&PhotoImages> {
        match &self.content {
            PhotoContent::Hydrated(images) => Some(images),
            PhotoContent::MetadataOnly => None,
        }
    }

    pub fn current_image(&self) -> Option<&DynamicImage> {
        self.images().map(|i| &i.current)
    }

    pub fn original_image(&self) -> Option<&DynamicImage> {
        self.images().map(|i| &i.original)
    }

    pub fn thumbnail(&self) -> Option<&DynamicImage> {
        self.images().map(|i| &i.thumbnail)
    }

    pub(crate) fn to_meta(&self) -> PhotoMeta {
        PhotoMeta {
            id: self.id,
            comment: self.comment.clone(),
            timestamp: self.timestamp_string(),
            has_annotations: self.has_annotations,
            source_photo_id: self.source_photo_id(),
            variant: self.variant.as_str().to_string(),
            storage_uri: self.storage_uri.clone(),
            file_id: self.file_id.clone(),
            thumb_data_url: self.thumb_data_url.clone(),
        }
    }

    /// Metadata-only photo from a manifest entry.
    ///
    /// `source_photo_id` decides the variant when the entry's fields disagree.
    pub(crate) fn from_meta(meta: PhotoMeta) -> Self {
        let variant = match meta.source_photo_id {
            Some(source_photo_id) => PhotoVariant::Annotated { source_photo_id },
            None => PhotoVariant::Original,
        };
        if variant.as_str() != meta.variant {
            tracing::warn!(
                "Manifest entry for photo {} has variant {:?} but source {:?}; using {}",
                meta.id,
                meta.variant,
                meta.source_photo_id,
                variant.as_str()
            );
        }

        let timestamp = NaiveDateTime::parse_from_str(&meta.timestamp, TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| {
                tracing::debug!(
                    "Photo {} has unreadable timestamp {:?}",
                    meta.id,
                    meta.timestamp
                );
                local_now()
            });

        Self {
            id: meta.id,
            comment: meta.comment,
            timestamp,
            has_annotations: meta.has_annotations || variant != PhotoVariant::Original,
            variant,
            storage_uri: meta.storage_uri,
            file_id: meta.file_id,
            thumb_data_url: meta.thumb_data_url,
            content: PhotoContent::MetadataOnly,
        }
    }
}

pub(crate) fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// One row of the session export table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Session")]
    pub session: String,
    #[serde(rename = "Photo ID")]
    pub photo_id: u64,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Comment")]
    pub comment: String,
    /// `Yes` or `No`
    #[serde(rename = "Has Annotations")]
    pub has_annotations: String,
    #[serde(rename = "Variant")]
    pub variant: String,
    #[serde(rename = "Source Photo ID")]
    pub source_photo_id: Option<u64>,
}
