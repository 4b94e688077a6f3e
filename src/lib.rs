//! SvgGuard Core - SVG Asset Sanitization for App Packages
//!
//! Every SVG bundled in a package is scrubbed. Assets whose markup changes
//! are rewritten in place and reported as warnings; assets that cannot be
//! rewritten fail validation with a `dirty_svg` error.

pub mod config;
pub mod hashing;
pub mod messages;
pub mod package;
pub mod scrub;
pub mod validation;

pub use config::{CheckConfig, ConfigError, WriteMode};
pub use messages::MessageCatalog;
pub use package::{AppFile, AppPackage, AssetRef, AssetWriter, FsWriter, PackageError};
pub use scrub::{Scrubber, SvgScrubber};
pub use validation::{
    AssetReport, AssetStatus, CheckError, CheckOutcome, ErrorKind, SvgSanitizationCheck,
    ValidationError,
};

pub const CHECK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the stderr `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once.
pub fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "svgguard_core=warn".into());
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
