//! Image encoding: uploaded PNG/JPEG bytes → base64 [`InlineImage`].
//!
//! The image is decoded once with the `image` crate so an unreadable or
//! truncated upload fails here, with the filename in the error, instead of as
//! an opaque rejection from the model API. The uploaded bytes (not a
//! re-encoding) are what get sent.

use crate::error::DocExtractError;
use crate::pipeline::input::{DocumentKind, UploadedDocument};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An image ready to be embedded in a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded) of the uploaded file.
    pub data: String,
    pub width: u32,
    pub height: u32,
}

/// Validate and base64-encode an uploaded image.
pub fn encode_image(doc: &UploadedDocument) -> Result<InlineImage, DocExtractError> {
    let format = match doc.kind {
        DocumentKind::Image(format) => format,
        DocumentKind::Pdf => {
            return Err(DocExtractError::UnsupportedDocument {
                filename: doc.filename.clone(),
                expected: "a PNG or JPEG image".into(),
            })
        }
    };

    let img = image::load_from_memory(&doc.bytes).map_err(|e| DocExtractError::InvalidImage {
        filename: doc.filename.clone(),
        detail: e.to_string(),
    })?;

    let data = STANDARD.encode(&doc.bytes);
    debug!(
        "Encoded '{}' ({}x{} px) → {} bytes base64",
        doc.filename,
        img.width(),
        img.height(),
        data.len()
    );

    Ok(InlineImage {
        mime_type: format.mime_type().to_string(),
        data,
        width: img.width(),
        height: img.height(),
    })
}
