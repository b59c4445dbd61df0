//! The page around the workflow: navigation, hero copy, "How It Works",
//! and the two preview panes. Pure rendering of a [`Snapshot`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::consts::format_number;
use crate::handle::ImageView;
use crate::workflow::Snapshot;

pub struct NavItem {
    pub name: &'static str,
    pub url: &'static str,
}

pub const NAV_ITEMS: &[NavItem] = &[
    NavItem { name: "Home", url: "/" },
    NavItem { name: "About", url: "/about" },
    NavItem { name: "Features", url: "/features" },
    NavItem { name: "Other tools", url: "/tools" },
];

pub struct Step {
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const STEPS: &[Step] = &[
    Step {
        icon: "📤",
        title: "Upload",
        description: "Drag & drop or click to upload your image",
    },
    Step {
        icon: "⚡",
        title: "Process",
        description: "Our AI removes the background automatically",
    },
    Step {
        icon: "💾",
        title: "Download",
        description: "Get your image with a transparent background",
    },
];

pub const BADGE: &str = "AI-Powered";
pub const TITLE: &str = "Remove Image Backgrounds Instantly";
pub const SUBTITLE: &str =
    "Upload your image and let our AI do the magic. Get perfect results in seconds.";

pub const DROP_HINT: &str = "Drop your image here or click to upload";
pub const SUPPORTED: &str = "Supports: PNG, JPG, WEBP";
pub const PROCESSING: &str = "Processing...";
pub const RESULT_PLACEHOLDER: &str = "Processed image will appear here";

/// Startup header: nav, hero copy, and the three steps.
pub fn render_header() -> String {
    let nav: Vec<&str> = NAV_ITEMS.iter().map(|item| item.name).collect();
    let mut out = String::new();
    let _ = writeln!(out, "   {}", nav.join("  ·  "));
    let _ = writeln!(out);
    let _ = writeln!(out, "   [{BADGE}]");
    let _ = writeln!(out, "   {TITLE}");
    let _ = writeln!(out, "   {SUBTITLE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "   How It Works");
    for step in STEPS {
        let _ = writeln!(out, "   {} {:<9} {}", step.icon, step.title, step.description);
    }
    out
}

/// The two preview panes as terminal text.
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    match &snapshot.original {
        None => {
            let marker = if snapshot.is_dragging { "▶" } else { " " };
            let _ = writeln!(out, " {marker} original   {DROP_HINT}");
            let _ = writeln!(out, "              {SUPPORTED}");
        }
        Some(original) => {
            let name = snapshot.file_name.as_deref().unwrap_or("upload");
            let _ = writeln!(out, "   original   {name} ({})", describe(original));
            if snapshot.is_processing {
                let _ = writeln!(out, "              {PROCESSING}");
            }
        }
    }

    match &snapshot.processed {
        Some(processed) => {
            let _ = writeln!(out, "   processed  {}", describe(processed));
        }
        None => {
            let _ = writeln!(out, "   processed  {RESULT_PLACEHOLDER}");
        }
    }

    if let Some(err) = &snapshot.last_error {
        let _ = writeln!(out, "   error      {err}");
    }
    out
}

/// A self-contained HTML page with both images embedded as data URIs.
pub fn render_html(snapshot: &Snapshot) -> String {
    let nav: String = NAV_ITEMS
        .iter()
        .map(|item| format!(r#"<a href="{}">{}</a>"#, item.url, item.name))
        .collect();
    let steps: String = STEPS
        .iter()
        .map(|s| {
            format!(
                r#"<div class="step"><div>{}</div><h3>{}</h3><p>{}</p></div>"#,
                s.icon, s.title, s.description
            )
        })
        .collect();

    let original = match &snapshot.original {
        Some(view) => {
            let overlay = if snapshot.is_processing {
                format!(r#"<div class="overlay">{PROCESSING}</div>"#)
            } else {
                String::new()
            };
            format!(r#"<img src="{}" alt="Original">{overlay}"#, view.data_uri())
        }
        None => format!("<span>{DROP_HINT}</span><small>{SUPPORTED}</small>"),
    };
    let processed = match &snapshot.processed {
        Some(view) => format!(r#"<img src="{}" alt="Processed">"#, view.data_uri()),
        None => format!("<span>{RESULT_PLACEHOLDER}</span>"),
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{TITLE}</title>
<style>
body {{ font-family: sans-serif; margin: 0; background: #fafafa; text-align: center; }}
nav a {{ margin: 0 1em; }}
.panes {{ display: grid; grid-template-columns: 1fr 1fr; gap: 2em; max-width: 72em; margin: 2em auto; }}
.pane {{ position: relative; min-height: 400px; border: 2px dashed #ddd; border-radius: 12px; display: flex; flex-direction: column; align-items: center; justify-content: center; }}
.pane img {{ max-width: 100%; max-height: 400px; object-fit: contain; }}
.checker {{ background: repeating-conic-gradient(#eee 0 25%, transparent 0 50%) 0 0 / 20px 20px; }}
.overlay {{ position: absolute; inset: 0; background: rgba(0,0,0,.5); color: #fff; display: flex; align-items: center; justify-content: center; }}
.steps {{ display: grid; grid-template-columns: repeat(3, 1fr); gap: 2em; max-width: 56em; margin: 0 auto; }}
</style>
</head>
<body>
<nav>{nav}</nav>
<span class="badge">{BADGE}</span>
<h1>{TITLE}</h1>
<p>{SUBTITLE}</p>
<div class="panes">
<div class="pane">{original}</div>
<div class="pane checker">{processed}</div>
</div>
<h2>How It Works</h2>
<div class="steps">{steps}</div>
</body>
</html>
"#
    )
}

/// Write [`render_html`] to `dir/cutout-preview.html` and return the path.
pub fn write_html(snapshot: &Snapshot, dir: &Path) -> Result<PathBuf> {
    let path = dir.join("cutout-preview.html");
    std::fs::write(&path, render_html(snapshot))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn describe(view: &ImageView) -> String {
    let digest = view.digest();
    format!(
        "{}, {} bytes, sha256 {}, {}",
        view.mime,
        format_number(view.bytes.len() as u64),
        &digest[..12],
        view.uri
    )
}
