//! SVG Sanitization Check
//!
//! Scrubs each asset, rewrites the ones that changed, and classifies the
//! result: a successful rewrite is a warning, a failed one is a `dirty_svg`
//! error. Clean assets produce neither.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::hashing::sha256_hex;
use crate::messages::{MessageCatalog, DIRTY_SVG_ERROR, SANITISED_SVG_WARNING};
use crate::package::{AssetRef, AssetWriter};
use crate::scrub::{Scrubber, SvgScrubber};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DirtySvg,
}

impl ErrorKind {
    pub fn message_id(&self) -> &'static str {
        match self {
            ErrorKind::DirtySvg => DIRTY_SVG_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub data: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn dirty_svg(path: &str) -> Self {
        Self {
            kind: ErrorKind::DirtySvg,
            data: BTreeMap::from([("svg".to_string(), path.to_string())]),
        }
    }

    /// Render the author-facing text for this error.
    pub fn message(&self, catalog: &MessageCatalog) -> String {
        let args: Vec<(&str, &str)> = self
            .data
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        catalog.translate(self.kind.message_id(), &args)
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Clean,
    Rewritten,
    RewriteFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetReport {
    pub path: String,
    pub status: AssetStatus,
    pub original_sha256: String,
    pub sanitized_sha256: String,
}

/// Everything one run of the check produced, in asset order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub reports: Vec<AssetReport>,
}

impl CheckOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub struct SvgSanitizationCheck {
    scrubber: Box<dyn Scrubber>,
    catalog: MessageCatalog,
}

impl SvgSanitizationCheck {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self::with_scrubber(Box::new(SvgScrubber::new()), catalog)
    }

    pub fn with_scrubber(scrubber: Box<dyn Scrubber>, catalog: MessageCatalog) -> Self {
        Self { scrubber, catalog }
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    /// Scrub every asset in order. Never stops early on a failed write; only
    /// a read failure aborts the run.
    pub fn check<A: AssetRef>(
        &self,
        assets: &[A],
        writer: &dyn AssetWriter,
    ) -> Result<CheckOutcome, CheckError> {
        let mut outcome = CheckOutcome::default();

        for asset in assets {
            let path = asset.relative_path();
            let markup = asset.read().map_err(|source| CheckError::Read {
                path: path.to_string(),
                source,
            })?;
            let clean_markup = self.scrubber.scrub(&markup);

            let status = if clean_markup == markup {
                tracing::debug!(svg = path, "markup is clean");
                AssetStatus::Clean
            } else {
                match writer.write(path, &clean_markup) {
                    Ok(()) => {
                        tracing::info!(svg = path, "rewrote svg with sanitized markup");
                        outcome
                            .warnings
                            .push(self.catalog.translate(SANITISED_SVG_WARNING, &[("svg", path)]));
                        AssetStatus::Rewritten
                    }
                    Err(e) => {
                        tracing::warn!(svg = path, error = %e, "could not rewrite dirty svg");
                        outcome.errors.push(ValidationError::dirty_svg(path));
                        AssetStatus::RewriteFailed
                    }
                }
            };

            outcome.reports.push(AssetReport {
                path: path.to_string(),
                status,
                original_sha256: sha256_hex(markup.as_bytes()),
                sanitized_sha256: sha256_hex(clean_markup.as_bytes()),
            });
        }

        Ok(outcome)
    }
}

impl Default for SvgSanitizationCheck {
    fn default() -> Self {
        Self::new(MessageCatalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io;

    struct Stub {
        path: &'static str,
        markup: &'static str,
    }

    impl AssetRef for Stub {
        fn relative_path(&self) -> &str {
            self.path
        }

        fn read(&self) -> io::Result<String> {
            Ok(self.markup.to_string())
        }
    }

    struct Unreadable;

    impl AssetRef for Unreadable {
        fn relative_path(&self) -> &str {
            "assets/gone.svg"
        }

        fn read(&self) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        }
    }

    /// Drops anything after the first `!`.
    struct BangScrubber;

    impl Scrubber for BangScrubber {
        fn scrub(&self, markup: &str) -> String {
            markup.split('!').next().unwrap_or_default().to_string()
        }
    }

    #[derive(Default)]
    struct Recorder {
        writes: RefCell<Vec<(String, String)>>,
        fail_on: Option<&'static str>,
    }

    impl AssetWriter for Recorder {
        fn write(&self, path: &str, contents: &str) -> io::Result<()> {
            if self.fail_on == Some(path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.writes.borrow_mut().push((path.to_string(), contents.to_string()));
            Ok(())
        }
    }

    fn check() -> SvgSanitizationCheck {
        SvgSanitizationCheck::with_scrubber(Box::new(BangScrubber), MessageCatalog::new())
    }

    #[test]
    fn test_clean_asset_has_no_effect() {
        let writer = Recorder::default();
        let outcome = check()
            .check(&[Stub { path: "assets/a.svg", markup: "<svg/>" }], &writer)
            .unwrap();
        assert!(writer.writes.borrow().is_empty());
        assert!(outcome.warnings.is_empty());
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.reports[0].status, AssetStatus::Clean);
        assert_eq!(outcome.reports[0].original_sha256, outcome.reports[0].sanitized_sha256);
    }

    #[test]
    fn test_dirty_asset_rewritten_and_warned() {
        let writer = Recorder::default();
        let outcome = check()
            .check(&[Stub { path: "assets/a.svg", markup: "<svg/>!x" }], &writer)
            .unwrap();
        assert_eq!(
            *writer.writes.borrow(),
            vec![("assets/a.svg".to_string(), "<svg/>".to_string())]
        );
        assert_eq!(
            outcome.warnings,
            vec!["The markup in assets/a.svg has been edited for use in Zendesk, and may not display as intended."]
        );
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.reports[0].status, AssetStatus::Rewritten);
    }

    #[test]
    fn test_failed_write_is_error_without_warning() {
        let writer = Recorder { fail_on: Some("assets/a.svg"), ..Default::default() };
        let outcome = check()
            .check(&[Stub { path: "assets/a.svg", markup: "<svg/>!x" }], &writer)
            .unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.errors, vec![ValidationError::dirty_svg("assets/a.svg")]);
        assert_eq!(outcome.reports[0].status, AssetStatus::RewriteFailed);
    }

    #[test]
    fn test_failure_does_not_stop_later_assets() {
        let writer = Recorder { fail_on: Some("assets/a.svg"), ..Default::default() };
        let assets = [
            Stub { path: "assets/a.svg", markup: "<svg/>!x" },
            Stub { path: "assets/b.svg", markup: "<svg/>" },
            Stub { path: "assets/c.svg", markup: "<svg/>!y" },
        ];
        let outcome = check().check(&assets, &writer).unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("assets/c.svg"));
        assert_eq!(writer.writes.borrow().len(), 1);
        let statuses: Vec<_> = outcome.reports.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![AssetStatus::RewriteFailed, AssetStatus::Clean, AssetStatus::Rewritten]
        );
    }

    #[test]
    fn test_read_failure_propagates() {
        let err = check().check(&[Unreadable], &Recorder::default()).unwrap_err();
        assert!(err.to_string().contains("assets/gone.svg"));
    }

    #[test]
    fn test_error_serializes_with_kind_and_data() {
        let json = serde_json::to_value(ValidationError::dirty_svg("assets/x.svg")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "dirty_svg", "data": {"svg": "assets/x.svg"}}));
    }

    #[test]
    fn test_error_message_rendered_from_catalog() {
        let text = ValidationError::dirty_svg("assets/x.svg").message(&MessageCatalog::new());
        assert_eq!(
            text,
            "assets/x.svg contains invalid markup and could not be automatically regenerated."
        );
    }
}
