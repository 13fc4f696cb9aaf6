//! Bibliography lookup
//!
//! Scan directories are named after the book's barcode. A lookup service
//! can resolve that barcode to a title for the splash banner; failure is
//! rendered inline in place of the title, never propagated.

use thiserror::Error;

/// Bibliography lookup error types
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("bibliography service unreachable: {0}")]
    Unreachable(String),

    #[error("barcode not recognized: {0}")]
    UnknownBarcode(String),
}

/// Resolves a book barcode to a display title.
pub trait BibliographyLookup {
    fn title_for(&self, barcode: &str) -> Result<String, LookupError>;
}

/// Default lookup used when no bibliography service is configured.
///
/// Validates the barcode shape so the banner distinguishes "real barcode,
/// no service" from "directory not named after a barcode".
#[derive(Debug, Default)]
pub struct OfflineLookup;

impl BibliographyLookup for OfflineLookup {
    fn title_for(&self, barcode: &str) -> Result<String, LookupError> {
        let looks_like_isbn = barcode.len() == 13
            && barcode.starts_with("978")
            && barcode.bytes().all(|b| b.is_ascii_digit());
        if looks_like_isbn {
            Err(LookupError::Unreachable("no service configured".to_string()))
        } else {
            Err(LookupError::UnknownBarcode(barcode.to_string()))
        }
    }
}

/// Banner line shown on the splash screen: the resolved title, or the
/// barcode with the failure as an inline diagnostic.
pub fn bibliography_banner(lookup: &dyn BibliographyLookup, barcode: &str) -> String {
    match lookup.title_for(barcode) {
        Ok(title) => title,
        Err(e) => format!("{barcode} [{e}]"),
    }
}
