//! Paginate an HTML document with the heuristic measurer.
//!
//! Usage:
//!   pageflow [OPTIONS] <INPUT.html | ->
//!
//! Prints a page/outline summary (or a JSON report with `--json`) and can
//! write the paginated document back out as HTML.

use std::cell::RefCell;
use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use pageflow::{page_label, parse_html, to_html, Document, EditorState, Outline};
use pageflow_reflow::{
    HeuristicMeasurer, HeuristicMetrics, Paginator, ReflowConfig, ReflowDiagnostic, ReflowReport,
};
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_FRAMES: usize = 256;

/// Shape of the `--config` JSON file. Missing fields keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct FileConfig {
    reflow: ReflowConfig,
    metrics: HeuristicMetrics,
}

#[derive(Clone, Debug, PartialEq)]
struct Options {
    input: String,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
    page_height: Option<f32>,
    reserve: Option<f32>,
    chars_per_line: Option<usize>,
    line_height: Option<f32>,
    max_iterations: Option<usize>,
    max_frames: usize,
    json: bool,
    verbose: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Run(Options),
    Help,
}

fn usage() {
    eprintln!("Usage: pageflow [OPTIONS] <INPUT.html | ->");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --page-height <PX>       Page height (default: 1122)");
    eprintln!("  --reserve <PX>           Header/footer reserve (default: 80)");
    eprintln!("  --chars-per-line <N>     Heuristic line width in characters (default: 40)");
    eprintln!("  --line-height <PX>       Heuristic paragraph line height (default: 20)");
    eprintln!("  --max-iterations <N>     Iteration cap per reflow pass (default: 20)");
    eprintln!("  --max-frames <N>         Passes to run before giving up (default: 256)");
    eprintln!("  --config <FILE>          JSON file with `reflow` and `metrics` sections");
    eprintln!("  --out <FILE>             Write the paginated document as HTML");
    eprintln!("  --json                   Print a JSON report instead of a summary");
    eprintln!("  -v, --verbose            Debug logging (RUST_LOG also applies)");
}

fn flag_value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str, String> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{} expects a value", flag))
}

fn number<T: FromStr>(raw: &str, flag: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{} expects a number, got {:?}", flag, raw))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut input = None;
    let mut options = Options {
        input: String::new(),
        out: None,
        config: None,
        page_height: None,
        reserve: None,
        chars_per_line: None,
        line_height: None,
        max_iterations: None,
        max_frames: DEFAULT_MAX_FRAMES,
        json: false,
        verbose: false,
    };
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--page-height" => {
                i += 1;
                options.page_height = Some(number(flag_value(args, i, arg)?, arg)?);
            }
            "--reserve" => {
                i += 1;
                options.reserve = Some(number(flag_value(args, i, arg)?, arg)?);
            }
            "--chars-per-line" => {
                i += 1;
                options.chars_per_line = Some(number(flag_value(args, i, arg)?, arg)?);
            }
            "--line-height" => {
                i += 1;
                options.line_height = Some(number(flag_value(args, i, arg)?, arg)?);
            }
            "--max-iterations" => {
                i += 1;
                options.max_iterations = Some(number(flag_value(args, i, arg)?, arg)?);
            }
            "--max-frames" => {
                i += 1;
                options.max_frames = number(flag_value(args, i, arg)?, arg)?;
            }
            "--config" => {
                i += 1;
                options.config = Some(PathBuf::from(flag_value(args, i, arg)?));
            }
            "--out" => {
                i += 1;
                options.out = Some(PathBuf::from(flag_value(args, i, arg)?));
            }
            "--json" => options.json = true,
            "--verbose" | "-v" => options.verbose = true,
            "--help" | "-h" => return Ok(Command::Help),
            other if other.starts_with("--") => {
                return Err(format!("unknown option {}", other));
            }
            other => {
                if input.replace(other.to_string()).is_some() {
                    return Err("expected exactly one input file".to_string());
                }
            }
        }
        i += 1;
    }

    options.input = input.ok_or_else(|| "missing input file".to_string())?;
    Ok(Command::Run(options))
}

/// Resolve reflow config and metrics: defaults, then the config file, then flags.
fn resolve_config(
    options: &Options,
    file: Option<FileConfig>,
) -> (ReflowConfig, HeuristicMetrics) {
    let FileConfig {
        mut reflow,
        mut metrics,
    } = file.unwrap_or_default();
    if let Some(page_height) = options.page_height {
        reflow.page_height = page_height;
    }
    if let Some(reserve) = options.reserve {
        reflow.header_footer_reserve = reserve;
    }
    if let Some(max_iterations) = options.max_iterations {
        reflow.max_iterations = max_iterations;
    }
    if let Some(chars_per_line) = options.chars_per_line {
        metrics.chars_per_line = chars_per_line;
    }
    if let Some(line_height) = options.line_height {
        metrics.line_height = line_height;
    }
    (reflow, metrics)
}

#[derive(Debug, Serialize)]
struct OutlineLine {
    depth: usize,
    level: u8,
    text: String,
    page: String,
}

#[derive(Debug, Serialize)]
struct PageLine {
    label: String,
    blocks: usize,
    characters: usize,
}

#[derive(Debug, Serialize)]
struct Summary {
    pages: Vec<PageLine>,
    passes: Vec<ReflowReport>,
    diagnostics: Vec<ReflowDiagnostic>,
    outline: Vec<OutlineLine>,
    settled: bool,
}

fn summarize(
    doc: &Document,
    passes: Vec<ReflowReport>,
    diagnostics: Vec<ReflowDiagnostic>,
    settled: bool,
) -> Summary {
    let total = doc.page_count();
    let pages = doc
        .pages
        .iter()
        .enumerate()
        .map(|(idx, page)| PageLine {
            label: page_label(idx, total),
            blocks: page.blocks.len(),
            characters: page.text().chars().count(),
        })
        .collect();
    let outline = Outline::from_document(doc)
        .flat()
        .into_iter()
        .map(|(depth, entry)| OutlineLine {
            depth,
            level: entry.level,
            text: entry.text.clone(),
            page: page_label(entry.page_index, total),
        })
        .collect();
    Summary {
        pages,
        passes,
        diagnostics,
        outline,
        settled,
    }
}

fn render_text(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!("pages: {}\n", summary.pages.len()));
    for page in &summary.pages {
        out.push_str(&format!(
            "  {}: {} blocks, {} chars\n",
            page.label, page.blocks, page.characters
        ));
    }

    let sum = |f: fn(&ReflowReport) -> usize| summary.passes.iter().map(f).sum::<usize>();
    out.push_str(&format!(
        "passes: {} ({})\n",
        summary.passes.len(),
        if summary.settled { "settled" } else { "unsettled" }
    ));
    out.push_str(&format!(
        "  splits={} moves_down={} moves_up={} created={} reclaimed={}\n",
        sum(|r| r.splits),
        sum(|r| r.moves_down),
        sum(|r| r.moves_up),
        sum(|r| r.pages_created),
        sum(|r| r.pages_reclaimed)
    ));
    if !summary.diagnostics.is_empty() {
        out.push_str(&format!("diagnostics: {}\n", summary.diagnostics.len()));
    }

    if !summary.outline.is_empty() {
        out.push_str("outline:\n");
        for line in &summary.outline {
            out.push_str(&format!(
                "  {}{} ({})\n",
                "  ".repeat(line.depth),
                line.text,
                line.page
            ));
        }
    }
    out
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("read stdin: {}", e))?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).map_err(|e| format!("read {}: {}", input, e))
}

fn run(options: &Options) -> Result<(), String> {
    let file_config = match &options.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("read {}: {}", path.display(), e))?;
            let parsed: FileConfig = serde_json::from_str(&raw)
                .map_err(|e| format!("parse {}: {}", path.display(), e))?;
            Some(parsed)
        }
        None => None,
    };
    let (config, metrics) = resolve_config(options, file_config);

    let html = read_input(&options.input)?;
    let doc = parse_html(&html).map_err(|e| format!("parse {}: {}", options.input, e))?;
    log::info!(
        "loaded {} with {} page(s) and {} block(s)",
        options.input,
        doc.page_count(),
        doc.block_count()
    );

    let diagnostics = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&diagnostics);
    let mut paginator = Paginator::new(config)
        .with_measurement_provider(Rc::new(HeuristicMeasurer::new(metrics)))
        .with_diagnostic_sink(move |diag| sink.borrow_mut().push(diag));

    let mut state = EditorState::new(doc);
    let passes = paginator.run_until_idle(&mut state, options.max_frames);
    let settled = !paginator.trigger().is_scheduled();
    if !settled {
        log::warn!(
            "document not settled after {} passes; raise --max-frames",
            passes.len()
        );
    }

    let diagnostics = diagnostics.borrow().clone();
    let summary = summarize(state.doc(), passes, diagnostics, settled);
    if options.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("serialize report: {}", e))?;
        println!("{}", json);
    } else {
        print!("{}", render_text(&summary));
    }

    if let Some(out) = &options.out {
        std::fs::write(out, to_html(state.doc()))
            .map_err(|e| format!("write {}: {}", out.display(), e))?;
        log::info!("wrote {}", out.display());
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            usage();
            return;
        }
        Err(err) => {
            eprintln!("pageflow: {}", err);
            usage();
            std::process::exit(2);
        }
    };

    let level = if options.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(err) = run(&options) {
        eprintln!("pageflow: {}", err);
        std::process::exit(1);
    }
}
