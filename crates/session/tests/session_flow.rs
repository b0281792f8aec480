use std::io::Cursor;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use pixbatch_common::config::EngineConfig;
use pixbatch_model::asset::ImageAsset;
use pixbatch_model::geometry::{CanvasSize, PixelRect, Point2D};
use pixbatch_model::settings::{FramingSettings, GridSettings, ToolKind};
use pixbatch_model::transform::TransformPatch;
use pixbatch_render_engine::{DeliveryMode, ItemContent, MemorySink};
use pixbatch_session::{Navigation, Session};

fn solid(name: &str, width: u32, height: u32) -> Arc<ImageAsset> {
    let bitmap = RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 255]));
    Arc::new(ImageAsset::from_bitmap(name, bitmap).unwrap())
}

fn dot(name: &str, x: u32, y: u32) -> Arc<ImageAsset> {
    let mut bitmap = RgbaImage::new(12, 12);
    bitmap.put_pixel(x, y, Rgba([0, 0, 0, 255]));
    Arc::new(ImageAsset::from_bitmap(name, bitmap).unwrap())
}

fn session() -> Session {
    let mut config = EngineConfig::default();
    config.export.item_delay_ms = 0;
    config.logging.level = "warn".to_string();
    Session::new(config).unwrap()
}

#[tokio::test]
async fn grid_preview_reports_display_size() {
    let mut session = session();
    session.grid_mut().settings = GridSettings {
        canvas_width: 64,
        canvas_height: 48,
        transparent: true,
        ..GridSettings::default()
    };
    session
        .add_images(ToolKind::Grid, vec![solid("a.png", 8, 8), solid("b.png", 8, 8)])
        .await
        .unwrap();
    session.set_zoom(0.5).unwrap();

    let info = session.render_preview().await.unwrap();
    assert_eq!(info.canvas, CanvasSize::new(64, 48));
    assert_eq!((info.display_width, info.display_height), (32.0, 24.0));
    assert!(info.checkerboard);
    assert_eq!(info.report.drawn, 2);
    assert_eq!(session.preview().size(), CanvasSize::new(64, 48));
    // Transparent grids leave the gaps at zero alpha.
    assert_eq!(session.preview().pixel(0, 0).unwrap().a, 0);
}

#[tokio::test]
async fn removing_an_asset_releases_its_bitmap_when_unused() {
    let mut session = session();
    let shared = solid("shared.png", 4, 4);
    session
        .add_images(ToolKind::Grid, vec![Arc::clone(&shared)])
        .await
        .unwrap();
    session
        .add_images(ToolKind::Resize, vec![Arc::clone(&shared)])
        .await
        .unwrap();
    assert!(session.cache().contains(shared.id()));

    assert!(session.remove_asset(ToolKind::Grid, shared.id()));
    assert!(session.cache().contains(shared.id()));

    assert!(session.remove_asset(ToolKind::Resize, shared.id()));
    assert!(!session.cache().contains(shared.id()));
    assert!(!session.remove_asset(ToolKind::Resize, shared.id()));
}

#[tokio::test]
async fn resize_navigation_caches_bounds_per_item() {
    let mut session = session();
    session.set_tool(ToolKind::Resize);
    let first = dot("first.png", 1, 2);
    let second = dot("second.png", 7, 9);
    session
        .add_images(ToolKind::Resize, vec![Arc::clone(&first), Arc::clone(&second)])
        .await
        .unwrap();

    assert_eq!(session.resize().bounds(first.id()), Some(PixelRect::new(1, 2, 1, 1)));
    assert_eq!(session.resize().bounds(second.id()), None);

    assert!(session.navigate(Navigation::Next).await);
    assert_eq!(session.resize().bounds(second.id()), Some(PixelRect::new(7, 9, 1, 1)));
    assert!(!session.navigate(Navigation::Next).await);
}

#[tokio::test]
async fn framing_drag_then_archive_export() {
    let mut session = session();
    session.set_tool(ToolKind::Framing);
    session.set_zoom(1.0).unwrap();
    session
        .framing_mut()
        .set_settings(FramingSettings {
            canvas_width: 100,
            canvas_height: 100,
            ..FramingSettings::default()
        })
        .unwrap();
    session
        .add_images(
            ToolKind::Framing,
            vec![solid("first.jpg", 50, 50), solid("second.jpg", 50, 50)],
        )
        .await
        .unwrap();

    // 50px image on a 100px canvas: scale 0.4, a 20px square at (40, 40).
    let info = session.render_preview().await.unwrap();
    assert_eq!(info.canvas, CanvasSize::new(100, 100));

    let framing = session.framing_mut();
    assert!(framing.pointer_down(Point2D::new(45.0, 45.0)).is_some());
    framing.pointer_move(Point2D::new(50.0, 45.0));
    framing.pointer_move(Point2D::new(55.0, 45.0));
    framing.pointer_up();
    assert!(session.tick());

    let first = session.framing().batch().items()[0].id().clone();
    assert_eq!(session.framing().store().peek(&first).unwrap().x, 50.0);

    let mut sink = MemorySink::new();
    let summary = session
        .export(DeliveryMode::Archive, &mut sink, None)
        .await
        .unwrap();
    assert_eq!(summary.exported, 2);
    assert!(summary.is_clean());

    let archive_name = summary.archive.unwrap();
    assert!(archive_name.starts_with("framing_pack_"));
    assert_eq!(sink.names(), vec![archive_name.as_str()]);

    let archive = zip::ZipArchive::new(Cursor::new(sink.delivered[0].bytes.clone())).unwrap();
    let names: Vec<_> = archive.file_names().collect();
    assert!(names.contains(&"framed_first.png"));
    assert!(names.contains(&"framed_second.png"));
}

#[test]
fn export_job_names_are_deterministic() {
    let mut session = session();
    session.set_tool(ToolKind::Grid);
    let job = session.export_job(DeliveryMode::Individual, 42);
    assert!(job.items.is_empty());
    assert_eq!(job.archive_name, "grid_pack_42.zip");
}

#[tokio::test]
async fn viewed_but_unedited_items_follow_the_on_screen_placement() {
    let mut session = session();
    session.set_tool(ToolKind::Framing);
    let first = solid("a.png", 100, 100);
    let second = solid("b.png", 100, 100);
    session
        .add_images(ToolKind::Framing, vec![Arc::clone(&first), Arc::clone(&second)])
        .await
        .unwrap();

    session.render_preview().await.unwrap();
    assert!(session.navigate(Navigation::Next).await);
    session.render_preview().await.unwrap();
    let on_screen = session
        .framing_mut()
        .edit(second.id(), &TransformPatch::position(7.0, 9.0))
        .unwrap();

    let job = session.export_job(DeliveryMode::Individual, 0);
    assert_eq!(job.items.len(), 2);
    for item in &job.items {
        match &item.content {
            ItemContent::Framing { layers } => assert_eq!(layers[0].transform, on_screen),
            other => panic!("unexpected content {other:?}"),
        }
    }
}
