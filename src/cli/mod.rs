pub mod output;

use clap::Parser;
use epub2md::extract::ConversionOptions;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "epub2md", version, about = "Convert EPUB books to Markdown")]
pub struct Cli {
    /// EPUB file to convert
    #[arg(value_name = "EPUB_FILE")]
    pub input: PathBuf,

    /// Output Markdown file (default: input path with a .md extension)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Do not extract images
    #[arg(long)]
    pub no_images: bool,

    /// Do not generate a table of contents
    #[arg(long)]
    pub no_toc: bool,

    /// Image directory name, relative to the output file
    #[arg(long, default_value = "images", env = "EPUB2MD_IMAGE_DIR")]
    pub image_dir: String,

    /// Heading for the generated table of contents
    #[arg(long, default_value = "目录")]
    pub toc_heading: String,

    /// Pick a free file name instead of overwriting an existing output
    #[arg(long)]
    pub no_clobber: bool,

    /// Show book information instead of converting
    #[arg(long)]
    pub info: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,
}

impl Cli {
    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions::default()
            .extract_images(!self.no_images)
            .generate_toc(!self.no_toc)
            .image_dir(self.image_dir.as_str())
            .toc_heading(self.toc_heading.as_str())
    }
}
