//! One-off media generation from the command line.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::core::AppConfig;
use crate::gemini::{GeneratedAsset, GeminiClient};

/// Writes the asset's bytes to `out`.
pub fn write_asset(asset: &GeneratedAsset, out: &Path) -> Result<()> {
    fs::write(out, &asset.data)
        .with_context(|| format!("Failed to write {:?} to {}", asset.kind, out.display()))?;
    tracing::info!("Wrote {} bytes to {}", asset.data.len(), out.display());
    Ok(())
}

pub async fn image(config: &AppConfig, prompt: &str, out: &str) -> Result<()> {
    let client = GeminiClient::new(config)?;
    let asset = client.generate_image(prompt).await?;
    write_asset(&asset, Path::new(out))?;
    println!("{}", out);
    Ok(())
}

pub async fn speech(config: &AppConfig, text: &str, out: &str) -> Result<()> {
    let client = GeminiClient::new(config)?;
    let asset = client.generate_speech(text).await?;
    write_asset(&asset, Path::new(out))?;
    println!("{}", out);
    Ok(())
}

pub async fn video(config: &AppConfig, prompt: &str, out: &str) -> Result<()> {
    let client = GeminiClient::new(config)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            println!("{}", msg);
        }
    });

    let result = client.generate_video(prompt, Some(tx)).await;
    // The sender was moved into the call and is dropped by now, so
    // the printer drains and exits
    let _ = printer.await;

    let asset = result?;
    write_asset(&asset, Path::new(out))?;
    println!("{}", out);
    Ok(())
}
