//! Static dashboard assets: the page bundled into the binary, or a
//! directory on disk when one is configured.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use rust_embed::RustEmbed;

/// Dashboard page compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/static"]
pub struct Assets;

/// Outcome of resolving a request path against an asset source.
#[derive(Debug)]
pub enum AssetLookup {
    Found { data: Cow<'static, [u8]>, mime: String },
    NotFound,
    Forbidden,
}

#[derive(Debug, Clone, Default)]
pub enum AssetSource {
    #[default]
    Embedded,
    Directory(PathBuf),
}

impl AssetSource {
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map(Self::Directory).unwrap_or_default()
    }

    /// Look up a URL path (leading `/` optional). Empty paths map to
    /// `index.html`. Any `..` segment is rejected, as is a resolved file
    /// outside the directory root.
    pub async fn lookup(&self, url_path: &str) -> AssetLookup {
        let path = url_path.trim_start_matches('/');
        let path = if path.is_empty() { "index.html" } else { path };

        if Path::new(path)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return AssetLookup::Forbidden;
        }
        let mime = mime_guess::from_path(path).first_or_octet_stream().to_string();

        match self {
            Self::Embedded => match Assets::get(path) {
                Some(file) => AssetLookup::Found { data: file.data, mime },
                None => AssetLookup::NotFound,
            },
            Self::Directory(root) => {
                let Ok(root) = tokio::fs::canonicalize(root).await else {
                    return AssetLookup::NotFound;
                };
                let Ok(full) = tokio::fs::canonicalize(root.join(path)).await else {
                    return AssetLookup::NotFound;
                };
                // Symlinks can still point outside the root.
                if !full.starts_with(&root) {
                    return AssetLookup::Forbidden;
                }
                if !full.is_file() {
                    return AssetLookup::NotFound;
                }
                match tokio::fs::read(&full).await {
                    Ok(data) => AssetLookup::Found {
                        data: Cow::Owned(data),
                        mime,
                    },
                    Err(e) => {
                        tracing::warn!(path = %full.display(), "failed to read static file: {}", e);
                        AssetLookup::NotFound
                    }
                }
            }
        }
    }
}
