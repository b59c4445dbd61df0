use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cutout::decoder::{DecodedImage, ImageCrateDecoder};
use cutout::events::EventBus;
use cutout::input::UploadFile;
use cutout::remover::BackgroundRemover;
use cutout::remover::chroma::ChromaKeyRemover;
use cutout::remover::http::{HttpRemover, HttpRemoverConfig};
use cutout::saver::memory::MemorySaver;
use cutout::workflow::{SubmitOutcome, UploadState, UploadWorkflow, WorkflowConfig};

fn encode(img: RgbaImage) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

fn direct(url: String) -> HttpRemoverConfig {
    let mut config = HttpRemoverConfig::new(url);
    config.use_system_proxy = false;
    config
}

fn decoded(img: RgbaImage) -> DecodedImage {
    DecodedImage::new(DynamicImage::ImageRgba8(img), Some(ImageFormat::Png))
}

/// Serve exactly one HTTP request with a canned response.
/// Returns the base URL and a handle yielding the raw request body.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            request.extend_from_slice(&buf[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
        let content_length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while request.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        // The client may hang up early on purpose; write errors are fine.
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&body).await;
        let _ = socket.shutdown().await;

        request[header_end..].to_vec()
    });

    (format!("http://{addr}/remove"), handle)
}

#[tokio::test]
async fn chroma_remover_end_to_end() {
    let mut img = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
    for y in 4..6 {
        for x in 4..6 {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }

    let saver = Arc::new(MemorySaver::new());
    let workflow = UploadWorkflow::new(
        Arc::new(ImageCrateDecoder::default()),
        Arc::new(ChromaKeyRemover::default()),
        saver.clone(),
        Arc::new(EventBus::default()),
        WorkflowConfig::default(),
    );

    let outcome = workflow
        .submit_file(UploadFile::new("product.png", "image/png", encode(img)))
        .await;
    assert_eq!(outcome, SubmitOutcome::Completed);
    assert_eq!(workflow.state(), UploadState::Done);

    workflow.download().unwrap();
    let (_, bytes) = saver.saved().remove(0);
    let out = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(out.get_pixel(0, 0).0[3], 0);
    assert_eq!(out.get_pixel(4, 4).0, [0, 0, 0, 255]);
}

#[tokio::test]
async fn http_remover_posts_png_and_returns_body() {
    let response = encode(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 0])));
    let (url, server) = serve_once("200 OK", "image/png", response.clone()).await;

    let remover = HttpRemover::new(direct(url)).unwrap();
    let out = remover
        .remove(&decoded(RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]))))
        .await
        .unwrap();
    assert_eq!(out, response);

    let sent = server.await.unwrap();
    let sent = image::load_from_memory_with_format(&sent, ImageFormat::Png).unwrap();
    assert_eq!(sent.width(), 3);
}

#[tokio::test]
async fn jpeg_response_is_saved_as_png() {
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([20, 200, 20])))
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .unwrap();
    let (url, _server) = serve_once("200 OK", "image/jpeg", jpeg).await;

    let saver = Arc::new(MemorySaver::new());
    let workflow = UploadWorkflow::new(
        Arc::new(ImageCrateDecoder::default()),
        Arc::new(HttpRemover::new(direct(url)).unwrap()),
        saver.clone(),
        Arc::new(EventBus::default()),
        WorkflowConfig::default(),
    );

    let png = encode(RgbaImage::from_pixel(6, 4, Rgba([5, 5, 5, 255])));
    let outcome = workflow
        .submit_file(UploadFile::new("x.png", "image/png", png))
        .await;
    assert_eq!(outcome, SubmitOutcome::Completed);

    let processed = workflow.snapshot().processed.unwrap();
    assert_eq!(processed.mime, "image/png");
    assert_eq!(image::guess_format(&processed.bytes).unwrap(), ImageFormat::Png);

    workflow.download().unwrap();
    let (name, bytes) = saver.saved().remove(0);
    assert_eq!(name, "processed-image.png");
    let saved = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
    assert_eq!((saved.width(), saved.height()), (6, 4));
}

#[tokio::test]
async fn http_remover_surfaces_json_error() {
    let (url, server) = serve_once(
        "503 Service Unavailable",
        "application/json",
        br#"{"error":"model overloaded"}"#.to_vec(),
    )
    .await;

    let remover = HttpRemover::new(direct(url)).unwrap();
    let err = remover
        .remove(&decoded(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]))))
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("503"), "{msg}");
    assert!(msg.contains("model overloaded"), "{msg}");
    server.await.unwrap();
}

#[tokio::test]
async fn http_remover_refuses_non_image_body() {
    let (url, server) = serve_once("200 OK", "text/html", b"<html></html>".to_vec()).await;

    let remover = HttpRemover::new(direct(url)).unwrap();
    let err = remover
        .remove(&decoded(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]))))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("non-image"));
    server.await.unwrap();
}

#[tokio::test]
async fn http_remover_enforces_size_cap() {
    let (url, server) = serve_once("200 OK", "image/png", vec![0u8; 2048]).await;

    let mut config = direct(url);
    config.max_response_bytes = 1024;
    let remover = HttpRemover::new(config).unwrap();
    let err = remover
        .remove(&decoded(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]))))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exceeds"));
    let _ = server.await;
}

#[tokio::test]
async fn http_failure_becomes_failed_state() {
    let (url, _server) = serve_once("500 Internal Server Error", "text/plain", b"boom".to_vec()).await;

    let workflow = UploadWorkflow::new(
        Arc::new(ImageCrateDecoder::default()),
        Arc::new(HttpRemover::new(direct(url)).unwrap()),
        Arc::new(MemorySaver::new()),
        Arc::new(EventBus::default()),
        WorkflowConfig::default(),
    );

    let png = encode(RgbaImage::from_pixel(2, 2, Rgba([5, 5, 5, 255])));
    let outcome = workflow
        .submit_file(UploadFile::new("x.png", "image/png", png))
        .await;
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(workflow.state(), UploadState::Failed);
}
