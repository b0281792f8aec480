//! The editing session: tool selection, the three tool workspaces, the
//! decoded-bitmap cache, and the live preview surface.
//!
//! Preview and export never share a surface. The preview surface lives here;
//! each export renders into its own.

use std::sync::Arc;

use serde::Serialize;

use pixbatch_common::config::EngineConfig;
use pixbatch_common::error::{PixbatchError, PixbatchResult};
use pixbatch_common::logging::init_logging;
use pixbatch_model::asset::{AssetId, ImageAsset};
use pixbatch_model::geometry::CanvasSize;
use pixbatch_model::settings::{CompositionSettings, ToolKind};
use pixbatch_render_engine::compositor::{render_composition, CompositionInput, RenderReport};
use pixbatch_render_engine::decode::{BitmapCache, PreloadReport};
use pixbatch_render_engine::delivery::DeliverySink;
use pixbatch_render_engine::export::{
    export_batch, DeliveryMode, ExportJob, ExportSummary, ProgressCallback,
};
use pixbatch_render_engine::naming::now_millis;
use pixbatch_render_engine::surface::Surface;

use crate::batch::Navigation;
use crate::framing::FramingWorkspace;
use crate::grid::GridWorkspace;
use crate::resize::ResizeWorkspace;

/// What the host needs to display the last preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewInfo {
    /// Full-resolution canvas held by the preview surface.
    pub canvas: CanvasSize,
    /// On-screen size (`canvas * zoom`).
    pub display_width: f64,
    pub display_height: f64,
    /// Show a checkerboard behind the surface. Never painted into pixels.
    pub checkerboard: bool,
    pub report: RenderReport,
}

/// Application state for one editing session.
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    tool: ToolKind,
    grid: GridWorkspace,
    framing: FramingWorkspace,
    resize: ResizeWorkspace,
    cache: BitmapCache,
    preview: Surface,
}

impl Session {
    /// Start a session. Installs logging from `config` on first use.
    pub fn new(config: EngineConfig) -> PixbatchResult<Self> {
        config.validate()?;
        init_logging(&config.logging);

        let framing = FramingWorkspace::new(&config);
        tracing::info!(zoom = config.preview.zoom, "Session started");
        Ok(Self {
            config,
            tool: ToolKind::default(),
            grid: GridWorkspace::new(),
            framing,
            resize: ResizeWorkspace::new(),
            cache: BitmapCache::new(),
            preview: Surface::new(CanvasSize::new(1, 1))?,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switch tools. Each workspace keeps its state.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != self.tool {
            tracing::info!(from = ?self.tool, to = ?tool, "Tool changed");
            self.tool = tool;
        }
    }

    pub fn grid(&self) -> &GridWorkspace {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridWorkspace {
        &mut self.grid
    }

    pub fn framing(&self) -> &FramingWorkspace {
        &self.framing
    }

    pub fn framing_mut(&mut self) -> &mut FramingWorkspace {
        &mut self.framing
    }

    pub fn resize(&self) -> &ResizeWorkspace {
        &self.resize
    }

    pub fn resize_mut(&mut self) -> &mut ResizeWorkspace {
        &mut self.resize
    }

    pub fn cache(&self) -> &BitmapCache {
        &self.cache
    }

    pub fn preview(&self) -> &Surface {
        &self.preview
    }

    /// Preview scale. Also rescales pointer input for the framing controller.
    pub fn set_zoom(&mut self, zoom: f64) -> PixbatchResult<()> {
        if !(zoom > 0.0 && zoom.is_finite()) {
            return Err(PixbatchError::config("preview.zoom must be > 0"));
        }
        self.config.preview.zoom = zoom;
        self.framing.set_zoom(zoom);
        Ok(())
    }

    /// Append images to a tool's collection and start decoding them.
    pub async fn add_images(
        &mut self,
        tool: ToolKind,
        assets: Vec<Arc<ImageAsset>>,
    ) -> PixbatchResult<PreloadReport> {
        match tool {
            ToolKind::Grid => self.grid.add_images(assets.iter().cloned())?,
            ToolKind::Framing => self.framing.add_images(assets.iter().cloned())?,
            ToolKind::Resize => self.resize.add_images(assets.iter().cloned())?,
        }
        tracing::info!(tool = ?tool, count = assets.len(), "Images added");

        let report = self.cache.preload(&assets).await;
        if tool == ToolKind::Resize {
            self.resize.record_bounds(&self.cache);
        }
        Ok(report)
    }

    /// Add a framing extra shared by the whole batch.
    pub async fn add_framing_extra(&mut self, asset: Arc<ImageAsset>) -> PixbatchResult<()> {
        self.framing.add_extra(Arc::clone(&asset))?;
        self.cache.preload(&[asset]).await;
        Ok(())
    }

    /// Attach or clear the framing overlay.
    pub async fn set_frame_overlay(&mut self, overlay: Option<Arc<ImageAsset>>) {
        if let Some(overlay) = &overlay {
            self.cache.preload(std::slice::from_ref(overlay)).await;
        }
        if let Some(previous) = self.framing.set_frame_overlay(overlay) {
            self.release_if_unused(previous.id());
        }
    }

    /// Attach or clear the grid background image.
    pub async fn set_grid_background(&mut self, background: Option<Arc<ImageAsset>>) {
        if let Some(background) = &background {
            self.cache.preload(std::slice::from_ref(background)).await;
        }
        let previous = std::mem::replace(&mut self.grid.settings.background_image, background);
        if let Some(previous) = previous {
            self.release_if_unused(previous.id());
        }
    }

    /// Remove an asset from one tool's collection. Its bitmap is released
    /// once no workspace uses it.
    pub fn remove_asset(&mut self, tool: ToolKind, id: &AssetId) -> bool {
        let removed = match tool {
            ToolKind::Grid => self.grid.remove(id).is_some(),
            ToolKind::Framing => {
                self.framing.remove_image(id).is_some() || self.framing.remove_extra(id).is_some()
            }
            ToolKind::Resize => self.resize.remove(id).is_some(),
        };
        if removed {
            self.release_if_unused(id);
        }
        removed
    }

    /// Empty one tool's collection.
    pub fn clear(&mut self, tool: ToolKind) {
        let removed = match tool {
            ToolKind::Grid => self.grid.clear(),
            ToolKind::Framing => self.framing.clear(),
            ToolKind::Resize => self.resize.clear(),
        };
        for asset in removed {
            self.release_if_unused(asset.id());
        }
    }

    /// Move the active tool's cursor. The resize tool caches auto-crop
    /// bounds for the newly current item.
    pub async fn navigate(&mut self, to: Navigation) -> bool {
        match self.tool {
            ToolKind::Grid => false,
            ToolKind::Framing => self.framing.navigate(to),
            ToolKind::Resize => {
                if !self.resize.navigate(to) {
                    return false;
                }
                if let Some(current) = self.resize.current().cloned() {
                    if let Err(e) = self.cache.load(&current).await {
                        tracing::warn!(id = %current.id(), error = %e, "Current item did not decode");
                    }
                }
                self.resize.record_bounds(&self.cache);
                true
            }
        }
    }

    /// Repaint tick: apply coalesced pointer input. Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        let panned = self.grid.tick();
        let placed = self.framing.tick().is_some();
        panned || placed
    }

    /// Render the active tool's composition into the preview surface.
    pub async fn render_preview(&mut self) -> PixbatchResult<PreviewInfo> {
        let zoom = self.config.preview.zoom;
        let (settings, checkerboard) = match self.tool {
            ToolKind::Grid => (
                CompositionSettings::Grid(self.grid.settings.clone()),
                self.grid.settings.transparent,
            ),
            ToolKind::Framing => (CompositionSettings::Framing(self.framing.settings().clone()), true),
            ToolKind::Resize => (CompositionSettings::Resize(self.resize.settings), true),
        };

        let report = match self.tool {
            ToolKind::Grid => {
                let assets = self.grid.active_assets();
                self.preload_with(&settings, assets.clone()).await;
                render_composition(
                    &settings,
                    CompositionInput::Grid { assets: &assets },
                    &self.cache,
                    &mut self.preview,
                )?
            }
            ToolKind::Framing => {
                let layers = self.framing.layers();
                let assets = layers.iter().map(|l| Arc::clone(&l.asset)).collect();
                self.preload_with(&settings, assets).await;
                render_composition(
                    &settings,
                    CompositionInput::Framing { layers: &layers },
                    &self.cache,
                    &mut self.preview,
                )?
            }
            ToolKind::Resize => match self.resize.current().cloned() {
                Some(asset) => {
                    self.preload_with(&settings, vec![Arc::clone(&asset)]).await;
                    self.resize.record_bounds(&self.cache);
                    render_composition(
                        &settings,
                        CompositionInput::Resize {
                            asset: &asset,
                            opaque_bounds: self.resize.bounds(asset.id()),
                        },
                        &self.cache,
                        &mut self.preview,
                    )?
                }
                None => {
                    self.preview.clear();
                    RenderReport {
                        canvas: self.preview.size(),
                        drawn: 0,
                        skipped: Vec::new(),
                    }
                }
            },
        };

        let (display_width, display_height) = report.canvas.scaled(zoom);
        Ok(PreviewInfo {
            canvas: report.canvas,
            display_width,
            display_height,
            checkerboard,
            report,
        })
    }

    /// Build the export job for the active tool without running it.
    pub fn export_job(&self, delivery: DeliveryMode, millis: i64) -> ExportJob {
        let defaults = &self.config.export;
        match self.tool {
            ToolKind::Grid => ExportJob::grid(
                &self.grid.settings,
                &self.grid.active_assets(),
                delivery,
                defaults,
                millis,
            ),
            ToolKind::Framing => self.framing.export_job(delivery, defaults, millis),
            ToolKind::Resize => self.resize.export_job(delivery, defaults, millis),
        }
    }

    /// Export the active tool's collection at full resolution.
    pub async fn export(
        &mut self,
        delivery: DeliveryMode,
        sink: &mut dyn DeliverySink,
        progress: Option<ProgressCallback>,
    ) -> PixbatchResult<ExportSummary> {
        // A drag still waiting for its tick belongs in the export.
        self.framing.tick();
        let job = self.export_job(delivery, now_millis());
        export_batch(job, &mut self.cache, sink, progress).await
    }

    async fn preload_with(&mut self, settings: &CompositionSettings, mut assets: Vec<Arc<ImageAsset>>) {
        match settings {
            CompositionSettings::Grid(s) => assets.extend(s.background_image.iter().cloned()),
            CompositionSettings::Framing(s) => assets.extend(s.frame_overlay.iter().cloned()),
            CompositionSettings::Resize(_) => {}
        }
        let report = self.cache.preload(&assets).await;
        if !report.failed.is_empty() {
            tracing::debug!(failed = report.failed.len(), "Preview has undecodable layers");
        }
    }

    fn release_if_unused(&mut self, id: &AssetId) {
        let used = self.grid.references(id) || self.framing.references(id) || self.resize.references(id);
        if !used && self.cache.release(id) {
            tracing::debug!(id = %id, "Bitmap released");
        }
    }
}
