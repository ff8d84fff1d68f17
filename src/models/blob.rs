//! References to uploaded files held by an external blob store

use serde::{Deserialize, Serialize};

/// Opaque pointer to a stored file: a relative path or an absolute URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn new(url_or_path: impl Into<String>) -> Self {
        Self(url_or_path.into())
    }

    pub fn url_or_path(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an uploaded file is for; decides where it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Manuscript,
    PaymentProof,
}

impl BlobKind {
    pub fn prefix(self) -> &'static str {
        match self {
            BlobKind::Manuscript => "articles",
            BlobKind::PaymentProof => "payment_proofs",
        }
    }

    /// Multipart field name carrying this kind of file
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "file" => Some(BlobKind::Manuscript),
            "payment_proof" => Some(BlobKind::PaymentProof),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_ref_is_a_bare_string_on_the_wire() {
        let blob = BlobRef::new("articles/2024/paper.pdf");
        assert_eq!(serde_json::to_string(&blob).unwrap(), "\"articles/2024/paper.pdf\"");
        assert_eq!(blob.url_or_path(), "articles/2024/paper.pdf");
    }

    #[test]
    fn test_kind_from_field() {
        assert_eq!(BlobKind::from_field("file"), Some(BlobKind::Manuscript));
        assert_eq!(BlobKind::from_field("payment_proof"), Some(BlobKind::PaymentProof));
        assert_eq!(BlobKind::from_field("other"), None);
        assert_eq!(BlobKind::PaymentProof.prefix(), "payment_proofs");
    }
}
