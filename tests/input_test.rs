use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use cutout::consts::ACCEPT;
use cutout::decoder::ImageCrateDecoder;
use cutout::events::{Event, EventBus};
use cutout::input::{DropZone, FilePicker, UploadFile};
use cutout::remover::mock::{MockRemover, MockStep};
use cutout::saver::memory::MemorySaver;
use cutout::workflow::{SubmitOutcome, UploadState, UploadWorkflow, WorkflowConfig};

fn workflow(steps: Vec<MockStep>, bus: Arc<EventBus>) -> Arc<UploadWorkflow> {
    Arc::new(UploadWorkflow::new(
        Arc::new(ImageCrateDecoder::default()),
        Arc::new(MockRemover::new(steps)),
        Arc::new(MemorySaver::new()),
        bus,
        WorkflowConfig::default(),
    ))
}

fn png_upload(name: &str) -> UploadFile {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    UploadFile::new(name, "image/png", bytes)
}

#[tokio::test]
async fn drag_enter_then_leave_only_toggles_highlight() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let wf = workflow(vec![], bus);
    let zone = DropZone::new(Arc::clone(&wf));

    zone.drag_enter();
    assert!(wf.snapshot().is_dragging);
    zone.drag_over();
    zone.drag_leave();
    assert!(!wf.snapshot().is_dragging);

    assert_eq!(wf.state(), UploadState::Empty);
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    assert_eq!(
        events,
        vec![
            Event::Highlight { active: true },
            Event::Highlight { active: false }
        ]
    );
}

#[tokio::test]
async fn drop_submits_first_file_and_clears_highlight() {
    let wf = workflow(vec![MockStep::passthrough()], Arc::new(EventBus::default()));
    let zone = DropZone::new(Arc::clone(&wf));

    zone.drag_enter();
    let outcome = zone
        .drop_files(vec![png_upload("first.png"), png_upload("second.png")])
        .await;

    assert_eq!(outcome, Some(SubmitOutcome::Completed));
    let snapshot = wf.snapshot();
    assert!(!snapshot.is_dragging);
    assert_eq!(snapshot.file_name.as_deref(), Some("first.png"));
}

#[tokio::test]
async fn empty_drop_does_nothing() {
    let wf = workflow(vec![], Arc::new(EventBus::default()));
    let zone = DropZone::new(Arc::clone(&wf));

    zone.drag_enter();
    assert_eq!(zone.drop_files(Vec::new()).await, None);
    assert!(!wf.snapshot().is_dragging);
    assert_eq!(wf.state(), UploadState::Empty);
}

#[tokio::test]
async fn picker_and_drop_zone_are_equivalent() {
    let via_drop = workflow(vec![MockStep::passthrough()], Arc::new(EventBus::default()));
    let via_picker = workflow(vec![MockStep::passthrough()], Arc::new(EventBus::default()));

    let dropped = DropZone::new(Arc::clone(&via_drop))
        .drop_files(vec![png_upload("a.png")])
        .await;
    let picked = FilePicker::new(Arc::clone(&via_picker))
        .select(vec![png_upload("a.png")])
        .await;

    assert_eq!(dropped, picked);
    assert_eq!(via_drop.state(), via_picker.state());
    assert_eq!(
        via_drop.snapshot().processed.map(|p| p.bytes),
        via_picker.snapshot().processed.map(|p| p.bytes)
    );
}

#[tokio::test]
async fn picker_rejects_non_images() {
    let wf = workflow(vec![], Arc::new(EventBus::default()));
    let picker = FilePicker::new(Arc::clone(&wf));
    assert_eq!(picker.accept(), ACCEPT);

    let outcome = picker
        .select(vec![UploadFile::new("doc.pdf", "application/pdf", b"%PDF".to_vec())])
        .await;
    assert!(matches!(outcome, Some(SubmitOutcome::Rejected(_))));
    assert_eq!(wf.state(), UploadState::Empty);
}

#[tokio::test]
async fn cancelled_picker_does_nothing() {
    let wf = workflow(vec![], Arc::new(EventBus::default()));
    assert_eq!(FilePicker::new(Arc::clone(&wf)).select(Vec::new()).await, None);
}

#[tokio::test]
async fn file_from_disk_is_typed_by_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-extension");
    std::fs::write(&path, &*png_upload("x").bytes).unwrap();

    let file = UploadFile::from_path(&path).await.unwrap();
    assert_eq!(file.mime, "image/png");
    assert!(file.is_image());
}
