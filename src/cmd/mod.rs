//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `serve`  | `Serve`          |
//! | `export` | `Export`         |
//! | `status` | `Status`         |

pub mod export;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub use export::cmd_export;
pub use serve::cmd_serve;
pub use status::cmd_status;

/// Absolute path of an existing triage directory.
fn resolve_triage_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("Triage directory {} does not exist", dir.display());
    }
    dir.canonicalize()
        .with_context(|| format!("Failed to resolve {}", dir.display()))
}
