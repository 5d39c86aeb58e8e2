use crate::Config;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Results directory does not exist: {0}")]
    ResultsDirectoryMissing(String),

    #[error("Results directory is not readable: {0}")]
    ResultsDirectoryUnreadable(#[from] std::io::Error),

    #[error("Static files directory does not exist")]
    StaticDirectoryMissing,

    #[error("Contact form is missing setting: {0}")]
    ContactMisconfigured(&'static str),
}

impl StartupCheckError {
    /// Errors that make serving pointless.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::ResultsDirectoryMissing(_)
                | StartupCheckError::ResultsDirectoryUnreadable(_)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let results_dir = &config.results.source_directory;
    if !results_dir.exists() {
        error!("Results directory does not exist: {:?}", results_dir);
        errors.push(StartupCheckError::ResultsDirectoryMissing(
            results_dir.display().to_string(),
        ));
    } else {
        match tokio::fs::read_dir(results_dir).await {
            Ok(_) => info!("Results directory is accessible: {:?}", results_dir),
            Err(e) => {
                error!("Results directory is not accessible: {}", e);
                errors.push(StartupCheckError::ResultsDirectoryUnreadable(e));
            }
        }
    }

    let static_dir = &config.static_files.directory;
    if !static_dir.exists() {
        warn!("Static files directory does not exist: {:?}", static_dir);
        errors.push(StartupCheckError::StaticDirectoryMissing);
    } else {
        info!("Static files directory exists: {:?}", static_dir);
    }

    match (&config.email, &config.contact.recipient) {
        (Some(_), None) => {
            warn!("Email is configured but contact.recipient is not set");
            errors.push(StartupCheckError::ContactMisconfigured("contact.recipient"));
        }
        (None, Some(_)) => {
            warn!("contact.recipient is set but no email provider is configured");
            errors.push(StartupCheckError::ContactMisconfigured("email"));
        }
        (None, None) => info!("Contact form disabled (no email configured)"),
        (Some(_), Some(_)) => {}
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
