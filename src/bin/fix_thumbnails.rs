use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;

use netescola::thumbnail::{HttpProbe, ThumbnailChecker, ThumbnailReplacement};
use netescola::video_catalog;

/// Check every catalog thumbnail and print replacements for the broken ones
/// as JSON. An optional path argument also writes the list to that file.
#[tokio::main]
async fn main() -> Result<()> {
    let output_path = env::args().nth(1);

    let checker = ThumbnailChecker::new(Arc::new(HttpProbe::new()), 60);
    let videos = video_catalog::all_videos();
    eprintln!("Found {} thumbnail URLs to validate...", videos.len());

    let mut replacements: Vec<ThumbnailReplacement> = Vec::new();
    for video in videos {
        eprintln!("Testing: {}", video.thumbnail_url);
        if let Some(replacement) = checker.resolve(video).await {
            eprintln!("  broken, replacing with {}", replacement.replacement_url);
            replacements.push(replacement);
        }
    }

    let json = serde_json::to_string_pretty(&replacements)?;
    println!("{}", json);

    if let Some(path) = output_path {
        tokio::fs::write(&path, &json)
            .await
            .with_context(|| format!("could not write replacements to {}", path))?;
        eprintln!("Wrote {} replacements to {}", replacements.len(), path);
    }

    eprintln!("Done: {} of {} thumbnails need replacing", replacements.len(), videos.len());
    Ok(())
}
