use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use handfont::core::{init_with_level, parse_level, TemplateSpec};
use handfont::font::{
    inspect_file, language_status, FontForgeCompiler, GlyphSource, PotraceTracer, SourceKind,
};
use handfont::io::{load_json, write_json, BuildConfig};
use handfont::print::{render_template, write_png, CellLabel, RenderOptions};
use handfont::{build_font_with_outcome, export_candidates, segment_file, Error, SegmenterParams};
use serde::Serialize;

type CliResult<T = ()> = Result<T, Box<dyn StdError>>;

#[derive(Parser)]
#[command(name = "handfont", version, about = "Fonts from hand-filled letter grids")]
struct Cli {
    /// off, error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Emit tracing spans instead of plain log lines (needs the `tracing` feature)
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Render the blank template page as PNG
    Template {
        /// TemplateSpec JSON; an A4 6x5 grid of 30 mm cells when absent
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        /// Letters in cell order, printed as labels with --letter-labels
        #[arg(long, default_value = "")]
        letters: String,
        /// Leave the cells unlabeled
        #[arg(long)]
        no_indices: bool,
        /// Label cells with their expected letter instead of the index
        #[arg(long, conflicts_with = "no_indices")]
        letter_labels: bool,
    },
    /// Split a filled-in scan into per-letter glyph images
    Segment {
        /// TemplateSpec JSON; an A4 6x5 grid of 30 mm cells when absent
        #[arg(long)]
        config: Option<PathBuf>,
        /// SegmenterParams JSON overriding the defaults
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long)]
        scan: PathBuf,
        /// Expected letters in cell order
        #[arg(long)]
        letters: String,
        /// Receives `<letter>_<variant>.png` and `report.json`
        #[arg(long)]
        out_dir: PathBuf,
        /// Write intermediate images here
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },
    /// Build a font from a BuildConfig JSON
    Build {
        #[arg(long)]
        config: PathBuf,
        /// Override the configured output path
        #[arg(long)]
        out: Option<PathBuf>,
        /// Build even when alphabet letters have no glyph
        #[arg(long)]
        allow_missing: bool,
    },
    /// Print coverage, metrics and color tables of a font as JSON
    Inspect {
        #[arg(long)]
        font: PathBuf,
        /// Characters to probe
        #[arg(long, default_value = "")]
        alphabet: String,
    },
    /// Report which alphabet letters still lack a glyph
    Status {
        #[arg(long)]
        alphabet: String,
        #[arg(long)]
        glyph_dir: PathBuf,
        #[arg(long, default_value = "custom")]
        language: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli) {
        eprintln!("failed to initialize logging: {e}");
    }
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) -> CliResult {
    #[cfg(feature = "tracing")]
    {
        if cli.trace {
            let _ = tracing_log::LogTracer::init();
            handfont::core::init_tracing(false, &cli.log_level);
            return Ok(());
        }
    }
    init_with_level(parse_level(&cli.log_level))?;
    #[cfg(not(feature = "tracing"))]
    {
        if cli.trace {
            log::warn!("built without the `tracing` feature; --trace ignored");
        }
    }
    Ok(())
}

fn run(cmd: Cmd) -> CliResult {
    match cmd {
        Cmd::Template {
            config,
            out,
            letters,
            no_indices,
            letter_labels,
        } => {
            let label = if no_indices {
                CellLabel::None
            } else if letter_labels {
                CellLabel::Letter
            } else {
                CellLabel::Index
            };
            cmd_template(config.as_deref(), &out, &letters, label)
        }
        Cmd::Segment {
            config,
            params,
            scan,
            letters,
            out_dir,
            debug_dir,
        } => cmd_segment(
            config.as_deref(),
            params.as_deref(),
            &scan,
            &letters,
            &out_dir,
            debug_dir.as_deref(),
        ),
        Cmd::Build {
            config,
            out,
            allow_missing,
        } => cmd_build(&config, out, allow_missing),
        Cmd::Inspect { font, alphabet } => print_json(&inspect_file(&font, &alphabet)?),
        Cmd::Status {
            alphabet,
            glyph_dir,
            language,
        } => {
            let covered: BTreeSet<String> = GlyphSource::scan_dir(&glyph_dir)?
                .into_iter()
                .map(|s| s.letter)
                .collect();
            print_json(&language_status(&language, &alphabet, &covered))
        }
    }
}

fn load_template(config: Option<&Path>) -> CliResult<TemplateSpec> {
    Ok(match config {
        Some(path) => load_json(path)?,
        None => TemplateSpec::a4_grid(6, 5, 30.0),
    })
}

fn cmd_template(config: Option<&Path>, out: &Path, letters: &str, label: CellLabel) -> CliResult {
    let geom = load_template(config)?.geometry()?;
    let opts = RenderOptions {
        label,
        ..RenderOptions::default()
    };
    let page = render_template(&geom, letters, &opts);
    write_png(out, &page, geom.dpi)?;
    log::info!(
        "wrote {} ({}x{} px, {} cells)",
        out.display(),
        page.width,
        page.height,
        geom.cell_count()
    );
    Ok(())
}

fn cmd_segment(
    config: Option<&Path>,
    params: Option<&Path>,
    scan: &Path,
    letters: &str,
    out_dir: &Path,
    debug_dir: Option<&Path>,
) -> CliResult {
    let geom = load_template(config)?.geometry()?;
    let params: SegmenterParams = match params {
        Some(path) => load_json(path)?,
        None => SegmenterParams::default(),
    };
    let report = segment_file(scan, &geom, letters, &params, debug_dir)?;
    let summary = report.summary();
    let written = export_candidates(&report.candidates, out_dir, geom.dpi)?;
    write_json(&summary, out_dir.join("report.json"))?;
    log::info!(
        "{} glyphs from {} cells ({:?})",
        written.len(),
        summary.cells_examined,
        summary.warp
    );
    print_json(&summary)
}

fn cmd_build(config_path: &Path, out: Option<PathBuf>, allow_missing: bool) -> CliResult {
    let mut config = BuildConfig::load_json(config_path)?;
    if out.is_some() {
        config.output_path = out;
    }
    let request = config.to_request()?;

    let status = request.readiness();
    if !status.ready {
        if !allow_missing {
            print_json(&status)?;
            return Err(Error::MissingGlyphs {
                missing: status.missing_chars,
                count: status.missing_count,
            }
            .into());
        }
        log::warn!("building without glyphs for {:?}", status.missing_chars);
    }

    let compiler = match &config.fontforge {
        Some(path) => FontForgeCompiler::new(path),
        None => FontForgeCompiler::locate()?,
    };
    let timeout = config.assembler.tracer_timeout();
    let tracer = match (&config.potrace, request.source_kind) {
        (Some(path), _) => PotraceTracer::new(path, timeout),
        (None, SourceKind::Raster) => PotraceTracer::locate(timeout)?,
        // vector sources are never traced
        (None, SourceKind::Vector) => PotraceTracer::new("potrace", timeout),
    };
    let outcome = build_font_with_outcome(&request, &compiler, &tracer)?;
    print_json(&outcome)
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
