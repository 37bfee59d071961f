mod cli;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli::Cli;
use cli::output::OutputConfig;
use epub2md::epub::{Archive, reader};
use epub2md::extract::frontmatter::BookMetadata;
use epub2md::extract::order::reading_order;
use epub2md::extract::toc::TocIndex;
use epub2md::extract::{ConversionResult, Converter, Progress, ProgressSink};
use epub2md::util;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = OutputConfig::from_global(cli.json, cli.verbose, cli.quiet, cli.no_color);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(output.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();

    if !cli.input.exists() {
        bail!("input file not found: {}", cli.input.display());
    }
    if !util::is_epub_file(&cli.input) {
        bail!("not an EPUB file: {}", cli.input.display());
    }

    if cli.info {
        return show_info(&cli, &output);
    }

    let mut output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| util::default_output_path(&cli.input));
    if cli.no_clobber {
        output_path = util::unique_path(&output_path);
    }

    let converter = Converter::new(&cli.input, cli.conversion_options());
    let result = run_conversion(converter, output_path, &output)?;

    if output.json {
        output.print_json(&result)?;
    }
    if !result.success {
        bail!(
            "conversion failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    if !output.json
        && let Some(path) = &result.output_path
    {
        output.status(&format!("Converted {} -> {}", cli.input.display(), path.display()));
        output.detail(&format!("  {} images written", result.image_count));
    }

    Ok(())
}

/// Run the conversion on a worker thread and render its progress here.
fn run_conversion(
    converter: Converter,
    output_path: PathBuf,
    output: &OutputConfig,
) -> Result<ConversionResult> {
    let (tx, rx) = mpsc::channel::<Progress>();

    let worker = thread::Builder::new()
        .name("epub2md-convert".to_string())
        .spawn(move || {
            let forward = move |percentage: u8, message: &str| {
                // The receiver outlives the worker; a failed send only means
                // nobody is watching any more.
                let _ = tx.send(Progress {
                    percentage,
                    message: message.to_string(),
                });
            };
            let sink: &dyn ProgressSink = &forward;
            converter.save(&output_path, Some(sink))
        })
        .context("failed to start conversion thread")?;

    let pb = output.progress_bar();
    for progress in rx {
        pb.set_position(u64::from(progress.percentage));
        pb.set_message(progress.message);
    }
    pb.finish_and_clear();

    worker
        .join()
        .map_err(|_| anyhow!("conversion thread panicked"))
}

fn show_info(cli: &Cli, output: &OutputConfig) -> Result<()> {
    let book = reader::read_epub(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let metadata = BookMetadata::from_archive(&book);
    let documents = book.documents();
    let images = book.images();
    let spine = book.spine();
    let ordered = reading_order(&documents, &spine);
    let toc = TocIndex::flatten(book.toc());
    let total_size: u64 = book.resources.values().map(|v| v.len() as u64).sum();

    if output.json {
        let mut info = serde_json::json!({
            "metadata": metadata,
            "epub_version": book.navigation.epub_version.to_string(),
            "documents": documents.len(),
            "images": images.len(),
            "toc_entries": toc.len(),
            "size_bytes": total_size,
        });
        if output.verbose {
            info["reading_order"] =
                serde_json::json!(ordered.iter().map(|d| d.name).collect::<Vec<_>>());
            info["toc"] = serde_json::json!(toc.entries());
        }
        return output.print_json(&info);
    }

    println!("Title:      {}", metadata.title.as_deref().unwrap_or("(untitled)"));
    if let Some(author) = &metadata.author {
        println!("Author:     {author}");
    }
    if let Some(language) = &metadata.language {
        println!("Language:   {language}");
    }
    if let Some(publisher) = &metadata.publisher {
        println!("Publisher:  {publisher}");
    }
    println!("Version:    EPUB {}", book.navigation.epub_version);
    println!("Documents:  {}", documents.len());
    println!("Images:     {}", images.len());
    println!("TOC:        {} entries", toc.len());
    output.detail(&format!("Size:       {}", util::format_size(total_size)));

    if output.verbose {
        let rows: Vec<Vec<String>> = ordered
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                vec![
                    (i + 1).to_string(),
                    doc.id.to_string(),
                    doc.name.to_string(),
                    util::format_size(doc.content.len() as u64),
                ]
            })
            .collect();
        println!();
        output.print_table(&["#", "ID", "FILE", "SIZE"], &rows);
    }

    Ok(())
}
