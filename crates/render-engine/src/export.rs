//! Batch export: job construction and the sequential export loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use pixbatch_common::config::{ExportDefaults, FailurePolicy};
use pixbatch_common::error::{PixbatchError, PixbatchResult};
use pixbatch_layout::placement::default_transform;
use pixbatch_model::asset::{AssetId, ImageAsset};
use pixbatch_model::geometry::{CanvasSize, PixelRect};
use pixbatch_model::settings::{CompositionSettings, FramingSettings, GridSettings, ResizeSettings};
use pixbatch_model::transform::PlacedLayer;
use pixbatch_placement::store::TransformStore;

use crate::archive::build_archive;
use crate::compositor::{render_composition, CompositionInput, SkippedLayer};
use crate::decode::BitmapCache;
use crate::delivery::DeliverySink;
use crate::naming::{archive_file_name, item_file_name, timestamped_file_name, UniqueNames};
use crate::surface::Surface;

/// One encoded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// How outputs reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// One delivery per item, paced.
    Individual,
    /// One archive holding every item.
    Archive,
    Both,
}

impl DeliveryMode {
    /// Build from the two export toggles. Both off is invalid.
    pub fn from_flags(individual: bool, archive: bool) -> PixbatchResult<Self> {
        match (individual, archive) {
            (true, false) => Ok(Self::Individual),
            (false, true) => Ok(Self::Archive),
            (true, true) => Ok(Self::Both),
            (false, false) => Err(PixbatchError::invalid_settings(
                "at least one of individual or archive delivery must be enabled",
            )),
        }
    }

    pub fn individual(&self) -> bool {
        matches!(self, Self::Individual | Self::Both)
    }

    pub fn archive(&self) -> bool {
        matches!(self, Self::Archive | Self::Both)
    }
}

/// What one export item draws.
#[derive(Debug, Clone)]
pub enum ItemContent {
    Grid {
        assets: Vec<Arc<ImageAsset>>,
    },
    Framing {
        layers: Vec<PlacedLayer>,
    },
    Resize {
        asset: Arc<ImageAsset>,
        opaque_bounds: Option<PixelRect>,
    },
}

/// One item of a batch.
#[derive(Debug, Clone)]
pub struct ExportItem {
    /// Output file name.
    pub file_name: String,
    /// Source name, for progress and error reports.
    pub source_name: String,
    pub content: ItemContent,
}

impl ExportItem {
    fn input(&self) -> CompositionInput<'_> {
        match &self.content {
            ItemContent::Grid { assets } => CompositionInput::Grid { assets },
            ItemContent::Framing { layers } => CompositionInput::Framing { layers },
            ItemContent::Resize {
                asset,
                opaque_bounds,
            } => CompositionInput::Resize {
                asset,
                opaque_bounds: *opaque_bounds,
            },
        }
    }

    /// The asset whose decode failure fails the whole item.
    fn primary(&self) -> Option<&Arc<ImageAsset>> {
        match &self.content {
            ItemContent::Grid { .. } => None,
            ItemContent::Framing { layers } => layers.first().map(|l| &l.asset),
            ItemContent::Resize { asset, .. } => Some(asset),
        }
    }

    fn assets(&self) -> Vec<Arc<ImageAsset>> {
        match &self.content {
            ItemContent::Grid { assets } => assets.clone(),
            ItemContent::Framing { layers } => layers.iter().map(|l| Arc::clone(&l.asset)).collect(),
            ItemContent::Resize { asset, .. } => vec![Arc::clone(asset)],
        }
    }
}

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub settings: CompositionSettings,
    pub items: Vec<ExportItem>,
    pub delivery: DeliveryMode,
    /// Name of the archive delivery, when archiving.
    pub archive_name: String,
    pub failure_policy: FailurePolicy,
    /// Pause between individual deliveries.
    pub item_delay: Duration,
}

impl ExportJob {
    fn with_items(
        settings: CompositionSettings,
        items: Vec<ExportItem>,
        delivery: DeliveryMode,
        archive_prefix: &str,
        defaults: &ExportDefaults,
        millis: i64,
    ) -> Self {
        Self {
            settings,
            items,
            delivery,
            archive_name: archive_file_name(archive_prefix, millis),
            failure_policy: defaults.failure_policy,
            item_delay: Duration::from_millis(defaults.item_delay_ms),
        }
    }

    /// One composed grid of the active assets. Empty when there are none.
    pub fn grid(
        settings: &GridSettings,
        active: &[Arc<ImageAsset>],
        delivery: DeliveryMode,
        defaults: &ExportDefaults,
        millis: i64,
    ) -> Self {
        let items = if active.is_empty() {
            Vec::new()
        } else {
            vec![ExportItem {
                file_name: timestamped_file_name(&defaults.grid_prefix, millis),
                source_name: format!("{} images", active.len()),
                content: ItemContent::Grid {
                    assets: active.to_vec(),
                },
            }]
        };
        Self::with_items(
            CompositionSettings::Grid(settings.clone()),
            items,
            delivery,
            &defaults.grid_archive_prefix,
            defaults,
            millis,
        )
    }

    /// One framed output per batch item.
    ///
    /// Items without a saved transform use the on-screen item's transform, so
    /// adjusting the visible item seeds the unvisited ones. A default that was
    /// only displayed does not count as saved. Extras are shared
    /// across the whole batch and drawn above the subject.
    #[allow(clippy::too_many_arguments)]
    pub fn framing(
        settings: &FramingSettings,
        batch: &[Arc<ImageAsset>],
        store: &TransformStore,
        current: Option<&ImageAsset>,
        extras: &[PlacedLayer],
        delivery: DeliveryMode,
        defaults: &ExportDefaults,
        millis: i64,
    ) -> Self {
        let on_screen = current.map(|asset| store.resolve(asset));
        let mut names = UniqueNames::new();

        let items = batch
            .iter()
            .map(|asset| {
                let fallback = on_screen.unwrap_or_else(|| {
                    default_transform(asset.width(), asset.height(), settings.canvas_size(), store.limits())
                });
                let transform = store.resolve_or(asset.id(), &fallback);

                let mut layers = Vec::with_capacity(1 + extras.len());
                layers.push(PlacedLayer::new(Arc::clone(asset), transform));
                layers.extend(extras.iter().cloned());

                ExportItem {
                    file_name: names.claim(item_file_name(&defaults.framing_prefix, asset.file_stem())),
                    source_name: asset.name().to_string(),
                    content: ItemContent::Framing { layers },
                }
            })
            .collect();

        Self::with_items(
            CompositionSettings::Framing(settings.clone()),
            items,
            delivery,
            &defaults.framing_archive_prefix,
            defaults,
            millis,
        )
    }

    /// One resized output per item. `bounds` holds cached auto-crop bounds by id.
    pub fn resize(
        settings: &ResizeSettings,
        batch: &[Arc<ImageAsset>],
        bounds: &HashMap<AssetId, PixelRect>,
        delivery: DeliveryMode,
        defaults: &ExportDefaults,
        millis: i64,
    ) -> Self {
        let mut names = UniqueNames::new();
        let items = batch
            .iter()
            .map(|asset| ExportItem {
                file_name: names.claim(item_file_name(&defaults.resize_prefix, asset.file_stem())),
                source_name: asset.name().to_string(),
                content: ItemContent::Resize {
                    asset: Arc::clone(asset),
                    opaque_bounds: bounds.get(asset.id()).copied(),
                },
            })
            .collect();

        Self::with_items(
            CompositionSettings::Resize(*settings),
            items,
            delivery,
            &defaults.resize_archive_prefix,
            defaults,
            millis,
        )
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Items finished so far.
    pub current: usize,

    /// Total items in the batch.
    pub total: usize,

    /// Current stage.
    pub stage: ExportStage,
}

impl ExportProgress {
    /// Progress in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Delivering,
    Packaging,
    Complete,
    Failed,
}

/// An item left out of an export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// What a finished export produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    /// Items rendered and encoded.
    pub exported: usize,
    /// Names delivered individually, in order.
    pub delivered: Vec<String>,
    /// Archive name, if one was delivered.
    pub archive: Option<String>,
    /// Items that failed and were left out.
    pub skipped_items: Vec<SkippedItem>,
    /// Layers left out of otherwise exported items.
    pub skipped_layers: Vec<SkippedLayer>,
}

impl ExportSummary {
    /// Whether nothing was left out.
    pub fn is_clean(&self) -> bool {
        self.skipped_items.is_empty() && self.skipped_layers.is_empty()
    }
}

/// Render, encode, and deliver every item of `job`, strictly one at a time.
///
/// One export surface is reused for the whole batch. Deliveries already made
/// are not rolled back when a later item aborts the batch.
pub async fn export_batch(
    job: ExportJob,
    cache: &mut BitmapCache,
    sink: &mut dyn DeliverySink,
    progress: Option<ProgressCallback>,
) -> PixbatchResult<ExportSummary> {
    let total = job.items.len();
    let report = |current: usize, stage: ExportStage| ExportProgress {
        current,
        total,
        stage,
    };

    if total == 0 {
        tracing::info!("Nothing to export");
        return Ok(ExportSummary::default());
    }
    job.settings.validate()?;

    tracing::info!(
        mode = ?job.settings.kind(),
        items = total,
        delivery = ?job.delivery,
        sink = sink.name(),
        policy = ?job.failure_policy,
        "Starting export"
    );
    emit(&progress, report(0, ExportStage::Preparing));

    let mut summary = ExportSummary::default();
    let mut surface = Surface::new(CanvasSize::new(1, 1))?;
    let mut packaged = Vec::new();

    for (index, item) in job.items.iter().enumerate() {
        emit(&progress, report(index, ExportStage::Rendering));

        let outcome = match export_item(&job.settings, item, cache, &mut surface).await {
            Ok((file, skipped)) => deliver_item(&job, file, sink, &mut summary, &mut packaged)
                .await
                .map(|()| skipped),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(skipped) => {
                summary.exported += 1;
                summary.skipped_layers.extend(skipped);
            }
            Err(e) if job.failure_policy == FailurePolicy::Abort => {
                tracing::error!(index, item = %item.source_name, error = %e, "Export aborted");
                emit(&progress, report(index, ExportStage::Failed));
                return Err(PixbatchError::aborted(index, item.source_name.clone(), e));
            }
            Err(e) => {
                tracing::warn!(index, item = %item.source_name, error = %e, "Export item skipped");
                summary.skipped_items.push(SkippedItem {
                    index,
                    name: item.source_name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if job.delivery.archive() && !packaged.is_empty() {
        emit(&progress, report(total, ExportStage::Packaging));
        let bytes = build_archive(&packaged)?;
        let archive = ExportedFile::new(job.archive_name.clone(), bytes);
        sink.deliver(&archive)?;
        summary.archive = Some(archive.name);
    }

    emit(&progress, report(total, ExportStage::Complete));
    tracing::info!(
        exported = summary.exported,
        skipped_items = summary.skipped_items.len(),
        skipped_layers = summary.skipped_layers.len(),
        archive = ?summary.archive,
        "Export complete"
    );
    Ok(summary)
}

fn emit(progress: &Option<ProgressCallback>, update: ExportProgress) {
    if let Some(cb) = progress {
        cb(update);
    }
}

/// Load, render, and encode one item.
async fn export_item(
    settings: &CompositionSettings,
    item: &ExportItem,
    cache: &mut BitmapCache,
    surface: &mut Surface,
) -> PixbatchResult<(ExportedFile, Vec<SkippedLayer>)> {
    let primary = item.primary().map(|a| a.id().clone());
    let mut needed = item.assets();
    needed.extend(settings_assets(settings));

    for asset in &needed {
        if let Err(e) = cache.load(asset).await {
            if primary.as_ref() == Some(asset.id()) {
                return Err(e);
            }
        }
    }

    let report = render_composition(settings, item.input(), cache, surface)?;
    let bytes = surface.encode_png()?;
    tracing::debug!(
        file = %item.file_name,
        width = report.canvas.width,
        height = report.canvas.height,
        size = bytes.len(),
        "Item encoded"
    );
    Ok((ExportedFile::new(item.file_name.clone(), bytes), report.skipped))
}

async fn deliver_item(
    job: &ExportJob,
    file: ExportedFile,
    sink: &mut dyn DeliverySink,
    summary: &mut ExportSummary,
    packaged: &mut Vec<ExportedFile>,
) -> PixbatchResult<()> {
    if job.delivery.individual() {
        if !summary.delivered.is_empty() && !job.item_delay.is_zero() {
            tokio::time::sleep(job.item_delay).await;
        }
        sink.deliver(&file)?;
        summary.delivered.push(file.name.clone());
    }
    if job.delivery.archive() {
        packaged.push(file);
    }
    Ok(())
}

/// Images referenced by the settings themselves.
fn settings_assets(settings: &CompositionSettings) -> Vec<Arc<ImageAsset>> {
    match settings {
        CompositionSettings::Grid(s) => s.background_image.iter().cloned().collect(),
        CompositionSettings::Framing(s) => s.frame_overlay.iter().cloned().collect(),
        CompositionSettings::Resize(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixbatch_common::config::PlacementLimits;
    use pixbatch_model::asset::PixelSource;
    use pixbatch_model::transform::{PlacementTransform, TransformPatch};

    fn asset(id: &str, name: &str, w: u32, h: u32) -> Arc<ImageAsset> {
        Arc::new(
            ImageAsset::new(
                AssetId::from(id),
                name,
                PixelSource::Encoded(Arc::from(Vec::<u8>::new())),
                w,
                h,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_delivery_mode_from_flags() {
        assert_eq!(DeliveryMode::from_flags(true, false).unwrap(), DeliveryMode::Individual);
        assert_eq!(DeliveryMode::from_flags(true, true).unwrap(), DeliveryMode::Both);
        assert!(DeliveryMode::Both.individual() && DeliveryMode::Both.archive());
        assert!(DeliveryMode::from_flags(false, false).is_err());
    }

    #[test]
    fn test_grid_job_is_empty_without_assets() {
        let job = ExportJob::grid(
            &GridSettings::default(),
            &[],
            DeliveryMode::Individual,
            &ExportDefaults::default(),
            1,
        );
        assert!(job.items.is_empty());
        assert_eq!(job.archive_name, "grid_pack_1.zip");
    }

    #[test]
    fn test_grid_job_names_with_timestamp() {
        let job = ExportJob::grid(
            &GridSettings::default(),
            &[asset("a", "a.png", 10, 10)],
            DeliveryMode::Archive,
            &ExportDefaults::default(),
            1234,
        );
        assert_eq!(job.items[0].file_name, "grid_1234.png");
        assert_eq!(job.item_delay, Duration::from_millis(400));
    }

    #[test]
    fn test_framing_job_falls_back_to_on_screen_transform() {
        let settings = FramingSettings::default();
        let mut store = TransformStore::new(settings.canvas_size(), PlacementLimits::default());
        let visited = asset("v", "visited.jpg", 100, 100);
        let current = asset("c", "current.jpg", 100, 100);
        let unvisited = asset("u", "unvisited.jpg", 100, 100);

        store.update(&visited, &TransformPatch::position(1.0, 1.0));
        let on_screen = store.update(&current, &TransformPatch::position(50.0, 60.0));

        let batch = vec![visited, Arc::clone(&current), unvisited];
        let job = ExportJob::framing(
            &settings,
            &batch,
            &store,
            Some(current.as_ref()),
            &[],
            DeliveryMode::Individual,
            &ExportDefaults::default(),
            0,
        );

        let main = |i: usize| match &job.items[i].content {
            ItemContent::Framing { layers } => layers[0].transform,
            other => panic!("unexpected content {other:?}"),
        };
        assert_eq!((main(0).x, main(0).y), (1.0, 1.0));
        assert_eq!(main(1), on_screen);
        assert_eq!(main(2), on_screen);
        assert_eq!(job.items[2].file_name, "framed_unvisited.png");
    }

    #[test]
    fn test_framing_job_ignores_displayed_defaults() {
        let settings = FramingSettings::default();
        let mut store = TransformStore::new(settings.canvas_size(), PlacementLimits::default());
        let shown = asset("s", "shown.jpg", 100, 100);
        let current = asset("c", "current.jpg", 400, 100);

        // Displayed but never edited.
        store.get(&shown);
        let batch = vec![Arc::clone(&shown), Arc::clone(&current)];
        let job = ExportJob::framing(
            &settings,
            &batch,
            &store,
            Some(current.as_ref()),
            &[],
            DeliveryMode::Individual,
            &ExportDefaults::default(),
            0,
        );

        // Neither item is saved, so both take the current item's default.
        let expected = store.resolve(&current);
        for item in &job.items {
            match &item.content {
                ItemContent::Framing { layers } => assert_eq!(layers[0].transform, expected),
                other => panic!("unexpected content {other:?}"),
            }
        }
    }

    #[test]
    fn test_framing_job_shares_extras() {
        let settings = FramingSettings::default();
        let store = TransformStore::new(settings.canvas_size(), PlacementLimits::default());
        let logo = PlacedLayer::new(
            asset("logo", "logo.png", 50, 50),
            PlacementTransform::new(100.0, 100.0, 0.15, 0.0),
        );
        let batch = vec![asset("a", "a.png", 10, 10), asset("b", "b.png", 10, 10)];
        let job = ExportJob::framing(
            &settings,
            &batch,
            &store,
            None,
            std::slice::from_ref(&logo),
            DeliveryMode::Archive,
            &ExportDefaults::default(),
            7,
        );
        for item in &job.items {
            match &item.content {
                ItemContent::Framing { layers } => {
                    assert_eq!(layers.len(), 2);
                    assert_eq!(layers[1].id(), logo.id());
                }
                other => panic!("unexpected content {other:?}"),
            }
        }
        assert_eq!(job.archive_name, "framing_pack_7.zip");
    }

    #[test]
    fn test_resize_job_dedupes_names() {
        let batch = vec![asset("1", "photo.jpg", 10, 10), asset("2", "photo.png", 10, 10)];
        let job = ExportJob::resize(
            &ResizeSettings::default(),
            &batch,
            &HashMap::new(),
            DeliveryMode::Archive,
            &ExportDefaults::default(),
            0,
        );
        let names: Vec<_> = job.items.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["resized_photo.png", "resized_photo_2.png"]);
    }

    #[test]
    fn test_progress_fraction() {
        let p = ExportProgress {
            current: 1,
            total: 4,
            stage: ExportStage::Rendering,
        };
        assert_eq!(p.fraction(), 0.25);
    }
}
