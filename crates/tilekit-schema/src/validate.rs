use crate::manifest::Manifest;
use thiserror::Error;

/// Fatal manifest rule violations. A manifest with any of these is neither
/// publishable nor loadable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tile has no name")]
    MissingName,
    #[error("tile does not have a default \"/\" resource")]
    MissingRootResource,
    #[error("icon has no src")]
    EmptyIconSrc,
    #[error("screenshot has no src")]
    EmptyScreenshotSrc,
    #[error("icon \"{0}\" is not in resources")]
    IconNotInResources(String),
    #[error("screenshot \"{0}\" is not in resources")]
    ScreenshotNotInResources(String),
    #[error("sizing dimensions must be positive")]
    ZeroSizing,
}

/// Advisory findings: reported, never blocking.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    #[error("tile has no icon")]
    NoIcon,
    #[error("tile has no description")]
    NoDescription,
}

#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check the rules a manifest must satisfy before a tile is considered
/// publishable or loadable. The same check runs on both paths: a manifest
/// just built by a writer and a manifest just parsed from a container or
/// record go through identical logic.
pub fn validate(manifest: &Manifest) -> ValidationReport {
    let mut report = ValidationReport::default();

    if manifest.name.trim().is_empty() {
        report.errors.push(ValidationError::MissingName);
    }

    if manifest.icons.is_empty() {
        report.warnings.push(ValidationWarning::NoIcon);
    }
    if manifest
        .description
        .as_deref()
        .is_none_or(|d| d.trim().is_empty())
    {
        report.warnings.push(ValidationWarning::NoDescription);
    }

    for icon in &manifest.icons {
        if icon.src.is_empty() {
            report.errors.push(ValidationError::EmptyIconSrc);
        } else if !manifest.resources.contains_key(&icon.src) {
            report
                .errors
                .push(ValidationError::IconNotInResources(icon.src.clone()));
        }
    }
    for shot in &manifest.screenshots {
        if shot.src.is_empty() {
            report.errors.push(ValidationError::EmptyScreenshotSrc);
        } else if !manifest.resources.contains_key(&shot.src) {
            report
                .errors
                .push(ValidationError::ScreenshotNotInResources(shot.src.clone()));
        }
    }

    if !manifest.resources.contains_key("/") {
        report.errors.push(ValidationError::MissingRootResource);
    }

    if let Some(sizing) = &manifest.sizing {
        if sizing.width == 0 || sizing.height == 0 {
            report.errors.push(ValidationError::ZeroSizing);
        }
    }

    report
}
