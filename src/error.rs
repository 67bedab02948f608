use std::{fmt::{
    Display,
    Result,
    Formatter
}, cmp, io};
use pest::error::{Error as PestError, LineColLocation};
use crate::utils::policy::pest::human::Rule as humanRule;
use serde::{Serialize, Deserialize};

/// Error returned at the call boundary of every fallible operation.
///
/// All variants are recoverable by the caller; no operation retries
/// internally and no partial plaintext or key material accompanies a
/// failure.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum HabeError {
    /// Malformed policy string or an attribute leaf that does not match
    /// the `name@authority` shape.
    PolicyFormat(String),
    /// The attribute set of a user key does not satisfy the access policy
    /// of a ciphertext.
    PolicyNotSatisfied,
    /// A structurally inconsistent bundle, e.g. a referenced attribute
    /// missing from the encrypted key table.
    CiphertextIntegrity(String),
    /// AEAD tag verification failed on an unwrap step.
    Authentication,
    /// Authority creation, lookup or rotation failed.
    AuthoritySetup(String),
    /// Reading or writing serialized key material failed.
    Storage(String),
}

impl Display for HabeError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            HabeError::PolicyFormat(details) => write!(f, "policy format error: {}", details),
            HabeError::PolicyNotSatisfied => write!(f, "user attributes do not satisfy the access policy"),
            HabeError::CiphertextIntegrity(details) => write!(f, "ciphertext integrity error: {}", details),
            HabeError::Authentication => write!(f, "authentication failed"),
            HabeError::AuthoritySetup(details) => write!(f, "authority setup error: {}", details),
            HabeError::Storage(details) => write!(f, "storage error: {}", details),
        }
    }
}

impl std::error::Error for HabeError {}

impl From<PestError<humanRule>> for HabeError {
    fn from(error: PestError<humanRule>) -> Self {
        let line = match error.line_col.to_owned() {
            LineColLocation::Pos((line, _)) => line,
            LineColLocation::Span((start_line, _), (end_line, _)) => cmp::max(start_line, end_line),
        };
        HabeError::PolicyFormat(
            format!("syntax error in line {}", line)
        )
    }
}

impl From<aes_gcm::Error> for HabeError {
    fn from(_error: aes_gcm::Error) -> Self {
        // Aead's error is intentionally opaque, there is no more information in here
        HabeError::Authentication
    }
}

impl From<io::Error> for HabeError {
    fn from(error: io::Error) -> Self {
        HabeError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for HabeError {
    fn from(error: serde_json::Error) -> Self {
        HabeError::Storage(error.to_string())
    }
}
