//! Composition settings: one strongly-typed record per layout mode.
//!
//! Image-valued settings (grid background, frame overlay) are attached by
//! the host after construction and are not part of the serialized form.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::{ImageAsset, ModelError};
use crate::color::Color;
use crate::geometry::CanvasSize;

/// Lowest allowed `item_scale` percentage in auto-flow grids.
pub const ITEM_SCALE_FLOOR: f64 = -90.0;

/// Settings for one composition, tagged by layout mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompositionSettings {
    Grid(GridSettings),
    Framing(FramingSettings),
    Resize(ResizeSettings),
}

/// The three layout tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Grid,
    Framing,
    Resize,
}

impl CompositionSettings {
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Grid(_) => ToolKind::Grid,
            Self::Framing(_) => ToolKind::Framing,
            Self::Resize(_) => ToolKind::Resize,
        }
    }

    /// Numeric sanity checks at the engine boundary.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Grid(s) => s.validate(),
            Self::Framing(s) => s.validate(),
            Self::Resize(s) => s.validate(),
        }
    }
}

/// How the grid derives its columns and canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridLayoutMode {
    /// Fixed column count on a fixed canvas; cells shrink to fit.
    #[default]
    Manual,
    /// Column count and canvas size derived from the images.
    AutoFlow,
}

/// Intended overall canvas shape for auto-flow grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetShape {
    #[default]
    Square,
    Portrait,
    Landscape,
}

impl TargetShape {
    /// Intended canvas width:height ratio.
    pub fn target_ratio(&self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::Portrait => 0.65,
            Self::Landscape => 1.6,
        }
    }
}

/// Grid tiling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,

    /// Column count in manual mode. Ignored in auto-flow.
    pub columns: u32,

    /// Gap between neighbouring cells.
    pub inner_spacing: f64,

    /// Gap between the outer cells and the canvas edge.
    pub outer_margin: f64,

    pub background_color: Color,

    /// Leave the background alpha at zero instead of filling it.
    pub transparent: bool,

    /// Drawn with cover semantics beneath every cell.
    #[serde(skip)]
    pub background_image: Option<Arc<ImageAsset>>,

    pub layout_mode: GridLayoutMode,

    /// Percentage adjustment of auto-flow cell size (`-10.0` shrinks cells by 10%).
    pub item_scale: f64,

    pub target_shape: TargetShape,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            canvas_width: 2048,
            canvas_height: 2048,
            columns: 3,
            inner_spacing: 5.0,
            outer_margin: 5.0,
            background_color: Color::rgb(0x0f, 0x17, 0x2a),
            transparent: false,
            background_image: None,
            layout_mode: GridLayoutMode::Manual,
            item_scale: 0.0,
            target_shape: TargetShape::Square,
        }
    }
}

impl GridSettings {
    pub fn is_auto_flow(&self) -> bool {
        self.layout_mode == GridLayoutMode::AutoFlow
    }

    /// Nominal canvas size before any auto-flow recomputation.
    pub fn nominal_canvas(&self) -> CanvasSize {
        CanvasSize::new(self.canvas_width, self.canvas_height)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require(self.canvas_width > 0, "grid canvas_width must be > 0")?;
        require(self.canvas_height > 0, "grid canvas_height must be > 0")?;
        require(
            self.is_auto_flow() || self.columns > 0,
            "grid columns must be > 0",
        )?;
        require(
            non_negative(self.inner_spacing),
            "grid inner_spacing must be >= 0",
        )?;
        require(
            non_negative(self.outer_margin),
            "grid outer_margin must be >= 0",
        )?;
        require(
            self.item_scale.is_finite() && self.item_scale >= ITEM_SCALE_FLOOR,
            "grid item_scale is below the floor",
        )?;
        Ok(())
    }
}

/// Single-subject framing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingSettings {
    /// User-set canvas width, used when no frame overlay is attached.
    pub canvas_width: u32,
    /// User-set canvas height, used when no frame overlay is attached.
    pub canvas_height: u32,

    pub border_width: f64,
    pub border_color: Color,
    pub border_radius: f64,

    /// Inner padding (kept for round-tripping host forms; not used by layout).
    pub padding: f64,

    /// Preview-only inset shadow radius. Not rasterized into exports.
    pub shadow: f64,

    /// Stretched over the whole canvas as the top layer; replaces the border.
    #[serde(skip)]
    pub frame_overlay: Option<Arc<ImageAsset>>,
}

impl Default for FramingSettings {
    fn default() -> Self {
        Self {
            canvas_width: 1080,
            canvas_height: 1080,
            border_width: 20.0,
            border_color: Color::WHITE,
            border_radius: 0.0,
            padding: 0.0,
            shadow: 10.0,
            frame_overlay: None,
        }
    }
}

impl FramingSettings {
    /// Effective canvas: the overlay's intrinsic size when one is attached.
    pub fn canvas_size(&self) -> CanvasSize {
        match &self.frame_overlay {
            Some(overlay) => CanvasSize::new(overlay.width(), overlay.height()),
            None => CanvasSize::new(self.canvas_width, self.canvas_height),
        }
    }

    /// Attach or clear the overlay. The user-set canvas is kept for when it is cleared.
    pub fn set_frame_overlay(&mut self, overlay: Option<Arc<ImageAsset>>) {
        self.frame_overlay = overlay;
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require(self.canvas_width > 0, "framing canvas_width must be > 0")?;
        require(self.canvas_height > 0, "framing canvas_height must be > 0")?;
        require(
            non_negative(self.border_width),
            "framing border_width must be >= 0",
        )?;
        require(
            non_negative(self.border_radius),
            "framing border_radius must be >= 0",
        )?;
        require(non_negative(self.shadow), "framing shadow must be >= 0")?;
        Ok(())
    }
}

/// How an image is fitted into a fixed target rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Scale to fit entirely inside, letterboxing the remainder.
    #[default]
    Fit,
    /// Scale to cover entirely, clipping the overflow.
    Fill,
    /// Scale each axis independently to the exact target.
    Stretch,
}

/// Which edge a proportional bound constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundType {
    /// The longer side becomes the bound.
    #[default]
    Max,
    /// The shorter side becomes the bound.
    Min,
}

/// Output sizing for the resize tool. Exactly one variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResizeTarget {
    Fixed { width: u32, height: u32 },
    Proportional { bound_size: u32, bound_type: BoundType },
}

impl Default for ResizeTarget {
    fn default() -> Self {
        Self::Fixed {
            width: 1080,
            height: 1080,
        }
    }
}

/// Trim transparent borders before resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AutoCrop {
    pub enabled: bool,
    /// Transparent margin added back around the detected content.
    pub margin: u32,
}

/// Bulk resize/crop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResizeSettings {
    pub target: ResizeTarget,
    pub scale_mode: ScaleMode,
    pub auto_crop: AutoCrop,
}

impl ResizeSettings {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self.target {
            ResizeTarget::Fixed { width, height } => {
                require(width > 0 && height > 0, "resize target must be > 0")
            }
            ResizeTarget::Proportional { bound_size, .. } => {
                require(bound_size > 0, "resize bound_size must be > 0")
            }
        }
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn require(ok: bool, message: &str) -> Result<(), ModelError> {
    if ok {
        Ok(())
    } else {
        Err(ModelError::InvalidSettings {
            message: message.to_string(),
        })
    }
}
