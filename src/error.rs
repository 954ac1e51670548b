use thiserror::Error;

#[derive(Error, Debug)]
pub enum GardenError {
    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("No row {id} in {table}")]
    NotFound { table: String, id: String },

    #[error("Object {path} already exists in bucket {bucket}")]
    Conflict { bucket: String, path: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid scale: {0} pixels per meter")]
    InvalidScale(f64),

    #[error("Failed to {action}: {source}")]
    Request {
        action: &'static str,
        #[source]
        source: Box<GardenError>,
    },
}

impl GardenError {
    /// True when the backend reported a missing row, even behind request context.
    pub fn is_not_found(&self) -> bool {
        match self {
            GardenError::NotFound { .. } => true,
            GardenError::Request { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GardenError>;

/// Adds a "failed to ..." context to backend errors, like the service layer messages.
pub trait Context<T> {
    fn context(self, action: &'static str) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    fn context(self, action: &'static str) -> Result<T> {
        self.map_err(|source| GardenError::Request {
            action,
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_and_keeps_not_found() {
        let r: Result<()> = Err(GardenError::NotFound {
            table: "plants".into(),
            id: "42".into(),
        });
        let err = r.context("fetch plant").unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch plant: No row 42 in plants");
        assert!(err.is_not_found());
        assert!(!GardenError::NotAuthenticated.is_not_found());
    }
}
