//! Upload admission rules, evaluated before the first byte is stored.

use mime_guess::mime::Mime;
use thiserror::Error;

use crate::config::UploadConfig;
use crate::utils::filename::{FilenameError, validate_document_name};

/// What the client claims about an upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadCandidate<'a> {
    pub name: &'a str,
    pub declared_type: &'a str,
    /// Byte count announced by the client, when it announced one.
    pub declared_size: Option<u64>,
}

impl UploadCandidate<'_> {
    /// The declared media type without parameters, lowercased.
    pub fn media_type(&self) -> String {
        media_essence(self.declared_type)
            .unwrap_or_else(|| self.declared_type.trim().to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Only {allowed} files are allowed (got '{declared}')")]
    UnsupportedType { declared: String, allowed: String },

    #[error("File size too large. Maximum size is {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("{}", .0.message())]
    InvalidName(FilenameError),

    #[error("Declared size of {declared} bytes does not match the {actual} bytes received")]
    SizeMismatch { declared: u64, actual: u64 },

    /// The upload body broke off or was malformed part-way through.
    #[error("Upload body could not be read: {reason}")]
    IncompleteUpload { reason: String },
}

/// A single admission check.
pub trait UploadRule: Send + Sync {
    fn check(&self, candidate: &UploadCandidate<'_>) -> Result<(), ValidationError>;
}

/// Accepts only media types on an allow-list.
pub struct MediaTypeRule {
    allowed: Vec<String>,
}

impl MediaTypeRule {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl UploadRule for MediaTypeRule {
    fn check(&self, candidate: &UploadCandidate<'_>) -> Result<(), ValidationError> {
        let accepted = media_essence(candidate.declared_type)
            .is_some_and(|essence| self.allowed.iter().any(|a| *a == essence));

        if accepted {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedType {
                declared: candidate.declared_type.to_string(),
                allowed: self.allowed.join(", "),
            })
        }
    }
}

/// Rejects uploads that announce more bytes than the ceiling.
pub struct SizeCeilingRule {
    max_size: u64,
}

impl SizeCeilingRule {
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }
}

impl UploadRule for SizeCeilingRule {
    fn check(&self, candidate: &UploadCandidate<'_>) -> Result<(), ValidationError> {
        match candidate.declared_size {
            Some(size) if size > self.max_size => Err(ValidationError::TooLarge {
                limit: self.max_size,
            }),
            _ => Ok(()),
        }
    }
}

/// Rejects names that cannot be echoed back safely.
pub struct FilenameRule;

impl UploadRule for FilenameRule {
    fn check(&self, candidate: &UploadCandidate<'_>) -> Result<(), ValidationError> {
        validate_document_name(candidate.name)
            .map(|_| ())
            .map_err(ValidationError::InvalidName)
    }
}

/// Ordered set of [`UploadRule`]s; the first rejection wins.
pub struct IngressValidator {
    rules: Vec<Box<dyn UploadRule>>,
    max_size: u64,
}

impl IngressValidator {
    pub fn new(rules: Vec<Box<dyn UploadRule>>, max_size: u64) -> Self {
        Self { rules, max_size }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            vec![
                Box::new(FilenameRule),
                Box::new(MediaTypeRule::new(&config.allowed_types)),
                Box::new(SizeCeilingRule::new(config.max_size)),
            ],
            config.max_size,
        )
    }

    /// Append a rule, evaluated after the existing ones.
    pub fn with_rule(mut self, rule: impl UploadRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Ceiling the blob store must also enforce while streaming.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn validate(&self, candidate: &UploadCandidate<'_>) -> Result<(), ValidationError> {
        self.rules.iter().try_for_each(|rule| rule.check(candidate))
    }
}

fn media_essence(declared: &str) -> Option<String> {
    declared
        .trim()
        .parse::<Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}
