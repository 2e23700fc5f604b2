use crate::photos::types::ExportRow;

use super::store::PhotoStore;

impl PhotoStore {
    /// One row per photo, sessions in name order, photos in session order.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.sessions()
            .iter()
            .flat_map(|(session, photos)| {
                photos.iter().map(move |photo| ExportRow {
                    session: session.clone(),
                    photo_id: photo.id(),
                    timestamp: photo.timestamp_string(),
                    comment: photo.comment().to_string(),
                    has_annotations: if photo.has_annotations() { "Yes" } else { "No" }
                        .to_string(),
                    variant: photo.variant().as_str().to_string(),
                    source_photo_id: photo.source_photo_id(),
                })
            })
            .collect()
    }
}
