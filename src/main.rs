use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use prototyper_pdf::config::PT_PER_CM;
use prototyper_pdf::{ExportConfig, ImageAlign, PageSize};

#[derive(Parser)]
#[command(name = "prototyper-pdf")]
#[command(version)]
#[command(about = "Export a diagram prototyping project to a paginated PDF", long_about = None)]
struct Cli {
    /// Project XML file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output PDF (defaults to the input name with a .pdf extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Margin on every side, in centimetres
    #[arg(long, default_value = "2.0")]
    margin_cm: f32,

    /// Resolution diagrams are rasterised at
    #[arg(long, default_value = "300")]
    dpi: f32,

    /// Font family for document text
    #[arg(long, default_value = "Helvetica")]
    font: String,

    /// Center diagrams narrower than the page body
    #[arg(long)]
    center_images: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PageSizeArg {
    A4,
    A5,
    Letter,
    Legal,
}

impl From<PageSizeArg> for PageSize {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::A5 => PageSize::A5,
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::Legal => PageSize::Legal,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if !(cli.margin_cm >= 0.0 && cli.dpi > 0.0) {
        eprintln!("Error: margin must be non-negative and dpi positive");
        return ExitCode::FAILURE;
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("pdf"));
    let config = ExportConfig {
        page_size: cli.page_size.into(),
        margin: cli.margin_cm * PT_PER_CM,
        dpi: cli.dpi,
        font_family: cli.font,
        image_align: if cli.center_images {
            ImageAlign::Center
        } else {
            ImageAlign::Left
        },
    };

    match prototyper_pdf::export_project_file(&cli.input, &output, &config) {
        Ok(()) => {
            println!("Wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
