//! Source decoding and the decoded-bitmap cache.
//!
//! Decodes run on tokio's blocking pool. Completion order is not the issue
//! order, so results are always filed by asset id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::RgbaImage;
use tiny_skia::{IntRect, IntSize, Pixmap};
use tokio::task::JoinSet;

use pixbatch_common::error::{PixbatchError, PixbatchResult};
use pixbatch_layout::autocrop::detect_opaque_bounds;
use pixbatch_model::asset::{AssetId, ImageAsset, PixelSource};
use pixbatch_model::geometry::PixelRect;

/// A decoded, premultiplied image ready to draw.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pixmap: Pixmap,
}

impl Bitmap {
    /// Convert a straight-alpha image.
    pub fn from_rgba(image: &RgbaImage) -> PixbatchResult<Self> {
        let (width, height) = image.dimensions();
        let mut data = Vec::with_capacity(image.as_raw().len());
        for px in image.pixels() {
            let [r, g, b, a] = px.0;
            let c = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| PixbatchError::render(format!("invalid bitmap size {width}x{height}")))?;
        let pixmap = Pixmap::from_vec(data, size)
            .ok_or_else(|| PixbatchError::render("bitmap buffer size mismatch"))?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Copy of a sub-rectangle, clipped to the bitmap. `None` if nothing overlaps.
    pub fn crop(&self, rect: PixelRect) -> Option<Pixmap> {
        let int_rect = IntRect::from_xywh(rect.x as i32, rect.y as i32, rect.width, rect.height)?;
        self.pixmap.clone_rect(int_rect)
    }

    /// Tightest box around non-transparent pixels (the full bitmap if none).
    pub fn opaque_bounds(&self) -> PixelRect {
        // Premultiplication leaves the alpha channel untouched.
        detect_opaque_bounds(self.pixmap.data(), self.width(), self.height())
    }
}

/// Decode an asset's pixel source. Blocking.
pub fn decode_asset(asset: &ImageAsset) -> PixbatchResult<Bitmap> {
    let id = asset.id().as_str();
    let bitmap = match asset.source() {
        PixelSource::Bitmap(image) => Bitmap::from_rgba(image)?,
        PixelSource::Encoded(bytes) => {
            let image = image::load_from_memory(bytes)
                .map_err(|e| PixbatchError::decode(id, e.to_string()))?;
            Bitmap::from_rgba(&image.to_rgba8())?
        }
        PixelSource::Path(path) => {
            if !path.exists() {
                return Err(PixbatchError::FileNotFound { path: path.clone() });
            }
            let image = image::open(path).map_err(|e| PixbatchError::decode(id, e.to_string()))?;
            Bitmap::from_rgba(&image.to_rgba8())?
        }
    };

    if (bitmap.width(), bitmap.height()) != asset.dimensions() {
        tracing::warn!(
            id,
            declared_width = asset.width(),
            declared_height = asset.height(),
            decoded_width = bitmap.width(),
            decoded_height = bitmap.height(),
            "Decoded size differs from declared size"
        );
    }
    Ok(bitmap)
}

/// A cache slot: decoded pixels, or the reason decoding failed.
#[derive(Debug, Clone)]
pub enum CachedBitmap {
    Ready(Arc<Bitmap>),
    Failed(String),
}

/// Outcome of a [`BitmapCache::preload`].
#[derive(Debug, Default)]
pub struct PreloadReport {
    pub loaded: usize,
    pub failed: Vec<(AssetId, String)>,
}

/// Decoded bitmaps keyed by asset id.
#[derive(Debug, Default)]
pub struct BitmapCache {
    entries: HashMap<AssetId, CachedBitmap>,
}

impl BitmapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: &AssetId) -> Option<&CachedBitmap> {
        self.entries.get(id)
    }

    /// Decoded bitmap, if loaded successfully.
    pub fn get(&self, id: &AssetId) -> Option<Arc<Bitmap>> {
        match self.entries.get(id)? {
            CachedBitmap::Ready(bitmap) => Some(Arc::clone(bitmap)),
            CachedBitmap::Failed(_) => None,
        }
    }

    /// Whether a decode was attempted (successful or not).
    pub fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: AssetId, bitmap: Bitmap) -> Arc<Bitmap> {
        let bitmap = Arc::new(bitmap);
        self.entries
            .insert(id, CachedBitmap::Ready(Arc::clone(&bitmap)));
        bitmap
    }

    /// Decode on the current thread and cache the result.
    pub fn load_blocking(&mut self, asset: &ImageAsset) -> PixbatchResult<Arc<Bitmap>> {
        if let Some(cached) = self.cached_result(asset.id()) {
            return cached;
        }
        let result = decode_asset(asset);
        self.file(asset.id().clone(), result)
    }

    /// Decode on the blocking pool and cache the result.
    pub async fn load(&mut self, asset: &Arc<ImageAsset>) -> PixbatchResult<Arc<Bitmap>> {
        if let Some(cached) = self.cached_result(asset.id()) {
            return cached;
        }
        let task_asset = Arc::clone(asset);
        let result = tokio::task::spawn_blocking(move || decode_asset(&task_asset))
            .await
            .unwrap_or_else(|e| Err(PixbatchError::decode(asset.id().as_str(), e.to_string())));
        self.file(asset.id().clone(), result)
    }

    /// Decode every uncached asset concurrently.
    pub async fn preload(&mut self, assets: &[Arc<ImageAsset>]) -> PreloadReport {
        let mut report = PreloadReport::default();
        let mut queued = HashSet::new();
        let mut tasks = JoinSet::new();

        for asset in assets {
            if self.entries.contains_key(asset.id()) || !queued.insert(asset.id().clone()) {
                continue;
            }
            let asset = Arc::clone(asset);
            tasks.spawn_blocking(move || {
                let result = decode_asset(&asset);
                (asset.id().clone(), result)
            });
        }

        if tasks.is_empty() {
            return report;
        }
        tracing::debug!(count = tasks.len(), "Preloading bitmaps");

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(bitmap))) => {
                    self.insert(id, bitmap);
                    report.loaded += 1;
                }
                Ok((id, Err(e))) => {
                    tracing::warn!(id = %id, error = %e, "Failed to decode image");
                    report.failed.push((id.clone(), e.to_string()));
                    self.entries.insert(id, CachedBitmap::Failed(e.to_string()));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Decode task did not complete");
                }
            }
        }
        report
    }

    /// Drop an asset's bitmap. Returns whether anything was cached.
    pub fn release(&mut self, id: &AssetId) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cached_result(&self, id: &AssetId) -> Option<PixbatchResult<Arc<Bitmap>>> {
        match self.entries.get(id)? {
            CachedBitmap::Ready(bitmap) => Some(Ok(Arc::clone(bitmap))),
            CachedBitmap::Failed(reason) => Some(Err(PixbatchError::decode(id.as_str(), reason.clone()))),
        }
    }

    fn file(&mut self, id: AssetId, result: PixbatchResult<Bitmap>) -> PixbatchResult<Arc<Bitmap>> {
        match result {
            Ok(bitmap) => Ok(self.insert(id, bitmap)),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Failed to decode image");
                self.entries
                    .insert(id.clone(), CachedBitmap::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use image::Rgba;

    fn bitmap_asset(id: &str, image: RgbaImage) -> Arc<ImageAsset> {
        let (w, h) = image.dimensions();
        Arc::new(
            ImageAsset::new(
                AssetId::from(id),
                format!("{id}.png"),
                PixelSource::Bitmap(Arc::new(image)),
                w,
                h,
            )
            .unwrap(),
        )
    }

    fn broken_asset(id: &str) -> Arc<ImageAsset> {
        Arc::new(
            ImageAsset::new(
                AssetId::from(id),
                format!("{id}.png"),
                PixelSource::Encoded(Arc::from(b"not an image".to_vec())),
                4,
                4,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_premultiplies_on_import() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        let bitmap = Bitmap::from_rgba(&image).unwrap();
        let px = bitmap.pixmap().pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() <= 101);
    }

    #[test]
    fn test_opaque_bounds_on_bitmap() {
        let mut image = RgbaImage::new(10, 10);
        image.put_pixel(2, 3, Rgba([0, 0, 0, 255]));
        image.put_pixel(6, 7, Rgba([0, 0, 0, 255]));
        let bitmap = Bitmap::from_rgba(&image).unwrap();
        assert_eq!(bitmap.opaque_bounds(), PixelRect::new(2, 3, 5, 5));
    }

    #[test]
    fn test_crop_outside_is_none() {
        let bitmap = Bitmap::from_rgba(&RgbaImage::new(4, 4)).unwrap();
        assert!(bitmap.crop(PixelRect::new(1, 1, 2, 2)).is_some());
        assert!(bitmap.crop(PixelRect::new(10, 10, 2, 2)).is_none());
    }

    #[test]
    fn test_missing_path_is_file_not_found() {
        let asset = ImageAsset::new(
            AssetId::from("gone"),
            "gone.png",
            PixelSource::Path(PathBuf::from("/definitely/not/here.png")),
            1,
            1,
        )
        .unwrap();
        assert!(matches!(
            decode_asset(&asset),
            Err(PixbatchError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_failed_decode_is_remembered() {
        let mut cache = BitmapCache::new();
        let asset = broken_asset("bad");
        assert!(cache.load_blocking(&asset).is_err());
        assert!(cache.contains(asset.id()));
        assert!(cache.get(asset.id()).is_none());
        assert!(matches!(cache.lookup(asset.id()), Some(CachedBitmap::Failed(_))));
    }

    #[tokio::test]
    async fn test_preload_files_results_by_id() {
        let mut cache = BitmapCache::new();
        let assets = vec![
            bitmap_asset("a", RgbaImage::new(3, 2)),
            broken_asset("b"),
            bitmap_asset("c", RgbaImage::new(5, 5)),
        ];
        let report = cache.preload(&assets).await;
        assert_eq!(report.loaded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, AssetId::from("b"));
        assert_eq!(cache.get(&AssetId::from("c")).unwrap().width(), 5);

        // Everything is cached now; a second preload decodes nothing.
        let again = cache.preload(&assets).await;
        assert_eq!(again.loaded, 0);
        assert!(again.failed.is_empty());
    }

    #[tokio::test]
    async fn test_release() {
        let mut cache = BitmapCache::new();
        let asset = bitmap_asset("a", RgbaImage::new(2, 2));
        cache.load(&asset).await.unwrap();
        assert!(cache.release(asset.id()));
        assert!(!cache.release(asset.id()));
        assert!(cache.is_empty());
    }
}
