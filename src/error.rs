//! Error taxonomy for dataset loading and schema resolution.
//!
//! Cell-level coercion problems never surface here; they degrade to the
//! sentinel values applied by [`crate::clean`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// The source file is missing, unreadable, or cannot be parsed at all.
    #[error("Error loading {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Coordinate columns could not be resolved while mapping is required.
    #[error("Missing coordinate columns. Found: {found:?}")]
    Schema { found: Vec<String> },
}

impl DashboardError {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DashboardError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, DashboardError::Schema { .. })
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_found_columns() {
        let err = DashboardError::Schema {
            found: vec!["name".to_string(), "status".to_string()],
        };
        assert!(err.is_schema());
        assert_eq!(
            err.to_string(),
            "Missing coordinate columns. Found: [\"name\", \"status\"]"
        );
    }

    #[test]
    fn load_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DashboardError>();
        let err = DashboardError::load("data/missing.xlsx", "No such file");
        assert!(!err.is_schema());
        assert!(err.to_string().contains("No such file"));
    }
}
