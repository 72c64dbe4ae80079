//! pdfloc CLI - locate images and text spans on PDF pages

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfloc::{
    render, DocumentRegions, Granularity, JsonFormat, LocateOptions, Locator, PageSelection,
};

#[derive(Parser)]
#[command(name = "pdfloc")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Locate images and text spans on PDF pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate image regions and text spans, output JSON
    Locate {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Text to locate (repeatable)
        #[arg(short, long = "text", value_name = "TEXT")]
        texts: Vec<String>,

        /// File with one target per line, or a JSON array of targets
        #[arg(long, value_name = "FILE")]
        targets: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Fuzzy-match chunking
        #[arg(long, value_enum, default_value = "word")]
        granularity: GranularityArg,

        /// Include Stamp/Image annotations as regions
        #[arg(long)]
        annotations: bool,

        /// Include page text and positioned text lines
        #[arg(long = "with-text")]
        with_text: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List image regions per page
    Images {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum GranularityArg {
    /// Sliding windows of the target's word count
    Word,
    /// Sentences split on . ! ?
    Sentence,
    /// Paragraphs split on blank lines
    Paragraph,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Word => Granularity::Word,
            GranularityArg::Sentence => Granularity::Sentence,
            GranularityArg::Paragraph => Granularity::Paragraph,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Locate {
            input,
            texts,
            targets,
            pages,
            granularity,
            annotations,
            with_text,
            compact,
            output,
        } => cmd_locate(
            &input,
            texts,
            targets.as_deref(),
            pages.as_deref(),
            granularity,
            annotations,
            with_text,
            compact,
            output.as_deref(),
        ),
        Commands::Images { input, pages } => cmd_images(&input, pages.as_deref()),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn page_selection(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn read_targets(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        let targets: Vec<String> = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid targets file {}: {}", path.display(), e))?;
        return Ok(targets);
    }
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Locate page by page so progress can be reported.
fn locate_with_progress(locator: &Locator) -> Result<DocumentRegions, Box<dyn std::error::Error>> {
    let page_count = locator.page_count();
    let selected: Vec<u32> = (1..=page_count)
        .filter(|n| locator.options().pages.includes(*n))
        .collect();

    let pb = ProgressBar::new(selected.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut doc = DocumentRegions {
        pdf_version: locator.version(),
        page_count,
        pages: Vec::new(),
    };
    for n in selected {
        pb.set_message(format!("Page {}/{}", n, page_count));
        doc.add_page(locator.locate_page(n)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(doc)
}

#[allow(clippy::too_many_arguments)]
fn cmd_locate(
    input: &Path,
    mut texts: Vec<String>,
    targets: Option<&Path>,
    pages: Option<&str>,
    granularity: GranularityArg,
    annotations: bool,
    with_text: bool,
    compact: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = targets {
        let loaded = read_targets(path)?;
        log::info!("Loaded {} targets from {}", loaded.len(), path.display());
        texts.extend(loaded);
    }

    // Lenient: one unreadable page should not lose the rest
    let options = LocateOptions::new()
        .lenient()
        .with_targets(texts)
        .with_pages(page_selection(pages)?)
        .with_granularity(granularity.into())
        .with_annotations(annotations)
        .with_text(with_text);
    let locator = Locator::open(input)?.with_options(options);
    log::info!(
        "Locating {} targets in {} ({} pages)",
        locator.options().targets.len(),
        input.display(),
        locator.page_count()
    );

    let doc = locate_with_progress(&locator)?;
    log::info!(
        "Found {} regions and {} spans",
        doc.regions().count(),
        doc.spans().count()
    );

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = render::to_json(&doc, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_images(input: &Path, pages: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let locator = Locator::open(input)?
        .lenient()
        .with_pages(page_selection(pages)?);
    let doc = locator.locate()?;

    let mut count = 0;
    for page in &doc.pages {
        if page.regions.is_empty() {
            continue;
        }
        println!("{}", format!("Page {}", page.page_number()).cyan().bold());
        for region in &page.regions {
            let r = &region.rect;
            let line = format!(
                "  {:<10} x={:.4} y={:.4} w={:.4} h={:.4} conf={:.2}",
                region.name, r.x, r.y, r.width, r.height, region.confidence
            );
            if region.estimated {
                println!("{} {}", line.yellow(), "(estimated)".dimmed());
            } else {
                println!("{}", line);
            }
            count += 1;
        }
        for d in &page.degradations {
            println!("  {} {}", "!".yellow(), d.to_string().dimmed());
        }
    }

    println!("\n{} {} regions", "Done!".green().bold(), count);

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let locator = Locator::open(input)?.lenient();
    let doc = locator.locate()?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if let Some(ref version) = doc.pdf_version {
        println!("{}: PDF {}", "Format".bold(), version);
    }
    println!("{}: {}", "Pages".bold(), doc.page_count);

    println!();
    println!("{}", "Regions".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for page in &doc.pages {
        let resolved = page.resolved_regions().count();
        let estimated = page.estimated_regions().count();
        println!(
            "{} {:>4}: {} resolved, {} estimated, {} degradations",
            "Page".bold(),
            page.page_number(),
            resolved,
            estimated,
            page.degradations.len()
        );
    }

    let total = doc.regions().count();
    println!("{}: {}", "Total regions".bold(), total);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfloc".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF image and text location tool");
    println!();
    println!("License: MIT");
}
