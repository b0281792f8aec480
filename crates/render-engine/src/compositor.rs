//! Compositor: paints one composition into a destination surface.
//!
//! Order of operations for every mode:
//! 1. Resize the surface to the solved canvas and clear it.
//! 2. Fill the background (grid only, unless transparent) and draw the
//!    optional background image with cover semantics.
//! 3. Draw layers in ascending z-order, each rotated about its own center.
//! 4. Draw the frame overlay, or stroke the border (framing only).
//!
//! A layer whose bitmap is missing or failed to decode is skipped and listed
//! in the [`RenderReport`]; the rest of the composition still renders.

use std::sync::Arc;

use serde::Serialize;
use tiny_skia::{
    FilterQuality, Paint, Path, PathBuilder, PixmapPaint, PixmapRef, Stroke, Transform,
};

use pixbatch_common::error::{PixbatchError, PixbatchResult};
use pixbatch_layout::fit::{cover, place_image_in_cell};
use pixbatch_layout::grid::compute_grid_layout;
use pixbatch_layout::resize::plan_resize;
use pixbatch_model::asset::{AssetId, ImageAsset};
use pixbatch_model::geometry::{CanvasSize, PixelRect, Rect};
use pixbatch_model::settings::{CompositionSettings, FramingSettings, GridSettings, ResizeSettings};
use pixbatch_model::transform::PlacedLayer;

use crate::decode::{BitmapCache, CachedBitmap};
use crate::surface::{to_skia_color, Surface};

/// The layers of one composition, matching the settings' mode.
#[derive(Debug, Clone, Copy)]
pub enum CompositionInput<'a> {
    /// Active assets in set order (row-major cell assignment).
    Grid { assets: &'a [Arc<ImageAsset>] },
    /// Main subject first, then extras in insertion order.
    Framing { layers: &'a [PlacedLayer] },
    /// One image; `opaque_bounds` is used when auto-crop is enabled.
    Resize {
        asset: &'a Arc<ImageAsset>,
        opaque_bounds: Option<PixelRect>,
    },
}

/// A layer left out of a composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedLayer {
    pub id: AssetId,
    pub reason: String,
}

/// What a render pass produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub canvas: CanvasSize,
    /// Layers actually painted (background image and overlay included).
    pub drawn: usize,
    pub skipped: Vec<SkippedLayer>,
}

impl RenderReport {
    fn new(canvas: CanvasSize) -> Self {
        Self {
            canvas,
            drawn: 0,
            skipped: Vec::new(),
        }
    }

    /// Whether every layer was drawn.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Canvas a composition will be rendered at, without drawing anything.
pub fn canvas_for(
    settings: &CompositionSettings,
    input: CompositionInput<'_>,
) -> PixbatchResult<CanvasSize> {
    match (settings, input) {
        (CompositionSettings::Grid(s), CompositionInput::Grid { assets }) => {
            Ok(compute_grid_layout(s, &aspect_ratios(assets)).canvas_size())
        }
        (CompositionSettings::Framing(s), CompositionInput::Framing { .. }) => Ok(s.canvas_size()),
        (
            CompositionSettings::Resize(s),
            CompositionInput::Resize {
                asset,
                opaque_bounds,
            },
        ) => Ok(plan_resize(asset.width(), asset.height(), s, opaque_bounds).canvas),
        (settings, _) => Err(mismatch(settings)),
    }
}

/// Paint `input` into `surface` according to `settings`.
///
/// Bitmaps must already be in `cache`; this function never decodes sources,
/// except for auto-crop bounds on a resize with none supplied.
pub fn render_composition(
    settings: &CompositionSettings,
    input: CompositionInput<'_>,
    cache: &BitmapCache,
    surface: &mut Surface,
) -> PixbatchResult<RenderReport> {
    let report = match (settings, input) {
        (CompositionSettings::Grid(s), CompositionInput::Grid { assets }) => {
            render_grid(s, assets, cache, surface)?
        }
        (CompositionSettings::Framing(s), CompositionInput::Framing { layers }) => {
            render_framing(s, layers, cache, surface)?
        }
        (
            CompositionSettings::Resize(s),
            CompositionInput::Resize {
                asset,
                opaque_bounds,
            },
        ) => render_resize(s, asset, opaque_bounds, cache, surface)?,
        (settings, _) => return Err(mismatch(settings)),
    };

    tracing::debug!(
        mode = ?settings.kind(),
        width = report.canvas.width,
        height = report.canvas.height,
        drawn = report.drawn,
        skipped = report.skipped.len(),
        "Composition rendered"
    );
    Ok(report)
}

fn render_grid(
    settings: &GridSettings,
    assets: &[Arc<ImageAsset>],
    cache: &BitmapCache,
    surface: &mut Surface,
) -> PixbatchResult<RenderReport> {
    let layout = compute_grid_layout(settings, &aspect_ratios(assets));
    let mut painter = Painter::begin(surface, cache, layout.canvas_size())?;
    let (cw, ch) = painter.canvas().as_f64();

    if !settings.transparent {
        painter.surface.fill(settings.background_color);
    }
    if let Some(background) = &settings.background_image {
        let p = cover(background.width() as f64, background.height() as f64, cw, ch);
        painter.draw_asset(background, p.rect_at(0.0, 0.0), 0.0);
    }

    for (index, asset) in assets.iter().enumerate() {
        let cell = layout.cell_rect(index);
        let p = place_image_in_cell(asset.aspect_ratio(), cell.w, cell.h);
        painter.draw_asset(asset, p.rect_at(cell.x, cell.y), 0.0);
    }

    Ok(painter.finish())
}

fn render_framing(
    settings: &FramingSettings,
    layers: &[PlacedLayer],
    cache: &BitmapCache,
    surface: &mut Surface,
) -> PixbatchResult<RenderReport> {
    let mut painter = Painter::begin(surface, cache, settings.canvas_size())?;
    let (cw, ch) = painter.canvas().as_f64();

    for layer in layers.iter().filter(|l| l.transform.visible) {
        painter.draw_asset(&layer.asset, layer.draw_rect(), layer.transform.rotation);
    }

    if let Some(overlay) = &settings.frame_overlay {
        painter.draw_asset(overlay, Rect::new(0.0, 0.0, cw, ch), 0.0);
    } else if settings.border_width > 0.0 {
        painter.stroke_border(settings, cw, ch);
    }

    Ok(painter.finish())
}

fn render_resize(
    settings: &ResizeSettings,
    asset: &Arc<ImageAsset>,
    opaque_bounds: Option<PixelRect>,
    cache: &BitmapCache,
    surface: &mut Surface,
) -> PixbatchResult<RenderReport> {
    let bitmap = match cache.lookup(asset.id()) {
        Some(CachedBitmap::Ready(bitmap)) => Some(Arc::clone(bitmap)),
        _ => None,
    };
    let bounds = match (opaque_bounds, &bitmap) {
        (None, Some(bitmap)) if settings.auto_crop.enabled => Some(bitmap.opaque_bounds()),
        (bounds, _) => bounds,
    };

    let plan = plan_resize(asset.width(), asset.height(), settings, bounds);
    let mut painter = Painter::begin(surface, cache, plan.canvas)?;

    match bitmap {
        Some(bitmap) if plan.source.is_full(bitmap.width(), bitmap.height()) => {
            painter.draw_pixmap(bitmap.pixmap().as_ref(), plan.dest, 0.0);
            painter.report.drawn += 1;
        }
        Some(bitmap) => match bitmap.crop(plan.source) {
            Some(cropped) => {
                painter.draw_pixmap(cropped.as_ref(), plan.dest, 0.0);
                painter.report.drawn += 1;
            }
            None => painter.skip(asset.id(), "crop region is outside the image"),
        },
        None => painter.skip_missing(asset),
    }

    Ok(painter.finish())
}

/// Draw state for one render pass.
struct Painter<'a> {
    surface: &'a mut Surface,
    cache: &'a BitmapCache,
    report: RenderReport,
}

impl<'a> Painter<'a> {
    fn begin(
        surface: &'a mut Surface,
        cache: &'a BitmapCache,
        canvas: CanvasSize,
    ) -> PixbatchResult<Self> {
        surface.resize(canvas)?;
        surface.clear();
        Ok(Self {
            surface,
            cache,
            report: RenderReport::new(canvas),
        })
    }

    fn canvas(&self) -> CanvasSize {
        self.report.canvas
    }

    fn draw_asset(&mut self, asset: &ImageAsset, rect: Rect, rotation: f64) {
        let bitmap = match self.cache.lookup(asset.id()) {
            Some(CachedBitmap::Ready(bitmap)) => Arc::clone(bitmap),
            _ => return self.skip_missing(asset),
        };
        if self.draw_pixmap(bitmap.pixmap().as_ref(), rect, rotation) {
            self.report.drawn += 1;
        }
    }

    /// Draw `source` scaled into `rect`, rotated about the rect's center.
    /// Returns false for degenerate rectangles.
    fn draw_pixmap(&mut self, source: PixmapRef<'_>, rect: Rect, rotation: f64) -> bool {
        if !rect.is_drawable() {
            return false;
        }
        let (cx, cy) = rect.center();
        let sx = rect.w / source.width() as f64;
        let sy = rect.h / source.height() as f64;
        let transform = Transform::from_translate(cx as f32, cy as f32)
            .pre_rotate(rotation.rem_euclid(360.0) as f32)
            .pre_translate(-(rect.w / 2.0) as f32, -(rect.h / 2.0) as f32)
            .pre_scale(sx as f32, sy as f32);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.surface
            .pixmap_mut()
            .draw_pixmap(0, 0, source, &paint, transform, None);
        true
    }

    fn stroke_border(&mut self, settings: &FramingSettings, cw: f64, ch: f64) {
        let bw = settings.border_width;
        let Some(path) = rounded_rect(bw / 2.0, bw / 2.0, cw - bw, ch - bw, settings.border_radius)
        else {
            tracing::debug!(border = bw, cw, ch, "Border wider than canvas, not drawn");
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(to_skia_color(settings.border_color));
        paint.anti_alias = true;
        let stroke = Stroke {
            width: bw as f32,
            ..Stroke::default()
        };
        self.surface
            .pixmap_mut()
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn skip_missing(&mut self, asset: &ImageAsset) {
        let reason = match self.cache.lookup(asset.id()) {
            Some(CachedBitmap::Failed(reason)) => reason.clone(),
            _ => "bitmap not loaded".to_string(),
        };
        self.skip(asset.id(), reason);
    }

    fn skip(&mut self, id: &AssetId, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(id = %id, reason = %reason, "Layer skipped");
        self.report.skipped.push(SkippedLayer {
            id: id.clone(),
            reason,
        });
    }

    fn finish(self) -> RenderReport {
        self.report
    }
}

/// Rectangle path with circular corners. `None` when the rectangle is empty.
fn rounded_rect(x: f64, y: f64, w: f64, h: f64, radius: f64) -> Option<Path> {
    if !(w > 0.0 && h > 0.0) {
        return None;
    }
    let (x, y, w, h) = (x as f32, y as f32, w as f32, h as f32);
    let r = (radius.max(0.0) as f32).min(w / 2.0).min(h / 2.0);
    if r <= 0.0 {
        return Some(PathBuilder::from_rect(tiny_skia::Rect::from_xywh(x, y, w, h)?));
    }

    // Cubic approximation of a quarter circle.
    const K: f32 = 0.552_284_8;
    let k = r * K;
    let (right, bottom) = (x + w, y + h);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

fn aspect_ratios(assets: &[Arc<ImageAsset>]) -> Vec<f64> {
    assets.iter().map(|a| a.aspect_ratio()).collect()
}

fn mismatch(settings: &CompositionSettings) -> PixbatchError {
    PixbatchError::invalid_settings(format!(
        "{:?} settings do not match the composition input",
        settings.kind()
    ))
}
