//! Image assets and the ordered active set.
//!
//! An [`ImageAsset`] is a decoded-or-decodable picture with fixed intrinsic
//! dimensions. Assets are shared via `Arc` and never mutated in place;
//! replacing content means replacing the asset.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use pixbatch_common::error::PixbatchError;

/// Opaque, unique asset identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where the pixels of an asset come from.
#[derive(Clone)]
pub enum PixelSource {
    /// Encoded file contents (PNG, JPEG, WebP).
    Encoded(Arc<[u8]>),
    /// A file on disk, decoded on demand.
    Path(PathBuf),
    /// Pixels that are already decoded.
    Bitmap(Arc<RgbaImage>),
}

impl fmt::Debug for PixelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoded(bytes) => write!(f, "Encoded({} bytes)", bytes.len()),
            Self::Path(path) => write!(f, "Path({})", path.display()),
            Self::Bitmap(img) => write!(f, "Bitmap({}x{})", img.width(), img.height()),
        }
    }
}

/// One user-supplied picture.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    id: AssetId,
    name: String,
    source: PixelSource,
    width: u32,
    height: u32,
    aspect_ratio: f64,
}

impl ImageAsset {
    /// Create an asset from an already-resolved descriptor.
    pub fn new(
        id: AssetId,
        name: impl Into<String>,
        source: PixelSource,
        width: u32,
        height: u32,
    ) -> Result<Self, ModelError> {
        if width == 0 || height == 0 {
            return Err(ModelError::ZeroDimension {
                id: id.to_string(),
                width,
                height,
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            source,
            width,
            height,
            aspect_ratio: width as f64 / height as f64,
        })
    }

    /// Wrap an in-memory bitmap under a freshly generated id.
    pub fn from_bitmap(name: impl Into<String>, bitmap: RgbaImage) -> Result<Self, ModelError> {
        let (width, height) = bitmap.dimensions();
        Self::new(
            AssetId::generate(),
            name,
            PixelSource::Bitmap(Arc::new(bitmap)),
            width,
            height,
        )
    }

    pub fn id(&self) -> &AssetId {
        &self.id
    }

    /// Source filename, used for output naming.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &PixelSource {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `width / height`, cached at construction.
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Filename without its final extension (`"cat.photo.png"` -> `"cat.photo"`).
    pub fn file_stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => stem,
            _ => &self.name,
        }
    }
}

/// One slot of an [`ActiveSet`].
#[derive(Debug, Clone)]
pub struct ActiveEntry {
    pub asset: Arc<ImageAsset>,
    pub active: bool,
}

/// Direction for reordering an entry by one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Ordered assets slated for a composition, each flagged active or inactive.
///
/// Order determines grid cell assignment (row-major) and batch navigation.
/// Inactive entries keep their slot so re-activating restores their position.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    entries: Vec<ActiveEntry>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an asset as active. Ids must be unique within the set.
    pub fn push(&mut self, asset: Arc<ImageAsset>) -> Result<(), ModelError> {
        if self.contains(asset.id()) {
            return Err(ModelError::DuplicateId {
                id: asset.id().to_string(),
            });
        }
        self.entries.push(ActiveEntry {
            asset,
            active: true,
        });
        Ok(())
    }

    /// Append several assets, preserving their order. Stops at the first duplicate.
    pub fn extend(
        &mut self,
        assets: impl IntoIterator<Item = Arc<ImageAsset>>,
    ) -> Result<(), ModelError> {
        for asset in assets {
            self.push(asset)?;
        }
        Ok(())
    }

    /// Remove an asset, returning it if it was present.
    pub fn remove(&mut self, id: &AssetId) -> Option<Arc<ImageAsset>> {
        let index = self.position(id)?;
        Some(self.entries.remove(index).asset)
    }

    /// Swap the entry at `index` with its neighbour. Returns false at the ends.
    pub fn move_entry(&mut self, index: usize, direction: MoveDirection) -> bool {
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => index.checked_add(1),
        };
        match target {
            Some(target) if index < self.entries.len() && target < self.entries.len() => {
                self.entries.swap(index, target);
                true
            }
            _ => false,
        }
    }

    pub fn set_active(&mut self, id: &AssetId, active: bool) -> Result<(), ModelError> {
        let entry = self.entry_mut(id)?;
        entry.active = active;
        Ok(())
    }

    /// Flip the active flag, returning the new value.
    pub fn toggle_active(&mut self, id: &AssetId) -> Result<bool, ModelError> {
        let entry = self.entry_mut(id)?;
        entry.active = !entry.active;
        Ok(entry.active)
    }

    /// Remove everything, returning the removed assets in order.
    pub fn clear(&mut self) -> Vec<Arc<ImageAsset>> {
        self.entries.drain(..).map(|e| e.asset).collect()
    }

    pub fn entries(&self) -> &[ActiveEntry] {
        &self.entries
    }

    /// Active assets in set order.
    pub fn active_assets(&self) -> Vec<Arc<ImageAsset>> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .map(|e| Arc::clone(&e.asset))
            .collect()
    }

    /// All assets in set order, active or not.
    pub fn assets(&self) -> impl Iterator<Item = &Arc<ImageAsset>> {
        self.entries.iter().map(|e| &e.asset)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<ImageAsset>> {
        self.entries.get(index).map(|e| &e.asset)
    }

    pub fn find(&self, id: &AssetId) -> Option<&Arc<ImageAsset>> {
        self.entries.iter().find(|e| e.asset.id() == id).map(|e| &e.asset)
    }

    pub fn position(&self, id: &AssetId) -> Option<usize> {
        self.entries.iter().position(|e| e.asset.id() == id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.position(id).is_some()
    }

    pub fn is_active(&self, id: &AssetId) -> Option<bool> {
        self.entries
            .iter()
            .find(|e| e.asset.id() == id)
            .map(|e| e.active)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, id: &AssetId) -> Result<&mut ActiveEntry, ModelError> {
        self.entries
            .iter_mut()
            .find(|e| e.asset.id() == id)
            .ok_or_else(|| ModelError::UnknownAsset { id: id.to_string() })
    }
}

/// Errors raised while building or editing model values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Asset {id} has zero dimension ({width}x{height})")]
    ZeroDimension { id: String, width: u32, height: u32 },

    #[error("Asset {id} is already in the set")]
    DuplicateId { id: String },

    #[error("Unknown asset: {id}")]
    UnknownAsset { id: String },

    #[error("Invalid color: {value}")]
    InvalidColor { value: String },

    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },
}

impl From<ModelError> for PixbatchError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnknownAsset { id } => PixbatchError::unknown_item(id),
            ModelError::InvalidSettings { message } => PixbatchError::invalid_settings(message),
            other => PixbatchError::invalid_settings(other.to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_asset(id: &str, width: u32, height: u32) -> Arc<ImageAsset> {
    Arc::new(
        ImageAsset::new(
            AssetId::from(id),
            format!("{id}.png"),
            PixelSource::Bitmap(Arc::new(RgbaImage::new(width, height))),
            width,
            height,
        )
        .unwrap(),
    )
}
