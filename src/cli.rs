// ============================================================================
// PixelStretch CLI: headless batch stretching via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelstretch -i photo.png                              (fit + export, no stretch)
//   pixelstretch -i photo.jpg --source 120 --target 480 -o out.png
//   pixelstretch -i "shots/*.jpg" --axis vertical --source 40 --target 0 --output-dir glitched/
//   pixelstretch -i a.png b.png --size 1920x1080 --output-dir out/
//
// No GUI is opened in CLI mode. Each file goes through the same session
// object the editor uses: load (fit to the export size), optional stretch,
// export PNG.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::error::EditorError;
use crate::ops::stretch::{Axis, SelectionLine};
use crate::project::Project;
use crate::settings::{ExportPreset, MAX_HISTORY_SIZE};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelStretch headless glitch processor.
///
/// Stretch one row or column of each input image across a band and export
/// the result as PNG, without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "pixelstretch",
    about = "PixelStretch headless batch processor",
    long_about = "Load images, fit them to an export size, optionally stretch one\n\
                  row or column across a band of lines, and export PNG.\n\n\
                  Example:\n  \
                  pixelstretch -i photo.jpg --source 120 --target 480 -o out.png\n  \
                  pixelstretch -i *.png --axis vertical --source 10 --target 90 --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Stretch axis: horizontal (rows) or vertical (columns).
    #[arg(short, long, default_value = "horizontal", value_parser = parse_axis)]
    pub axis: Axis,

    /// Line to sample, in image pixels after fitting. Clamped into the image.
    #[arg(long, requires = "target", allow_negative_numbers = true)]
    pub source: Option<i64>,

    /// Line the band reaches to. May fall outside the image.
    #[arg(long, requires = "source", allow_negative_numbers = true)]
    pub target: Option<i64>,

    /// Export size: 1080x1080, 1920x1080, 1080x1920, 1200x628 or 1000x1500.
    #[arg(long, default_value = "1080x1080", value_name = "WxH", value_parser = parse_preset)]
    pub size: ExportPreset,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here as `<stem>_<W>x<H>.png`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }

    /// The requested stretch, if both ends were given.
    pub fn stretch(&self) -> Option<(i64, i64)> {
        self.source.zip(self.target)
    }
}

fn parse_axis(text: &str) -> Result<Axis, String> {
    Axis::parse(text).ok_or_else(|| format!("unknown axis '{}' (use horizontal or vertical)", text))
}

fn parse_preset(text: &str) -> Result<ExportPreset, String> {
    ExportPreset::parse(text).map_err(|e| e.to_string())
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    if let Err(e) = ExportPreset::validate_table() {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;
    log_info!("batch: {} file(s), size {}, axis {:?}", total, args.size.label(), args.axis);

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        match run_one(input_path, &args) {
            Ok(written) => {
                log_info!("{} -> {}", input_path.display(), written.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        written.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

/// Load, stretch and export one file. Returns the path written.
fn run_one(input: &Path, args: &CliArgs) -> Result<PathBuf, EditorError> {
    // -- Step 1: Load ----------------------------------------------------
    let mut project = Project::new(args.size, MAX_HISTORY_SIZE);
    project.load_path(input)?;

    // -- Step 2: Stretch (optional) ------------------------------------------
    if let Some((source, target)) = args.stretch() {
        let (w, h) = project
            .image()
            .map(|img| img.dimensions())
            .ok_or(EditorError::NoImageLoaded)?;
        let last = args.axis.line_count(w, h).saturating_sub(1) as i64;
        let line = SelectionLine {
            axis: args.axis,
            position: source.clamp(0, last),
        };
        match project.commit_stretch(line, target) {
            Ok(()) => {}
            // Degenerate fit (a side floored to 0): export unstretched.
            Err(e) if e.is_silent() => {
                log_warn!("{}: stretch skipped ({})", input.display(), e);
                if args.verbose {
                    println!("  stretch skipped: {}", e);
                }
            }
            Err(e) => return Err(e),
        }
    }

    // -- Step 3: Export --------------------------------------------------
    let output = build_output_path(
        input,
        args.output.as_deref(),
        args.output_dir.as_deref(),
        &project.export_file_name(),
    );
    project.save_to(&output)?;
    Ok(output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path, use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` joined with the export file name
/// 3. Fallback: the export file name next to the input
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    export_name: &str,
) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    if let Some(dir) = output_dir {
        return dir.join(export_name);
    }
    input.parent().unwrap_or(Path::new(".")).join(export_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{encode_png, load_image_sync, write_bytes};
    use image::{Rgba, RgbaImage};

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("pixelstretch").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn parses_stretch_and_size() {
        let a = args(&["-i", "a.png", "--axis", "ver", "--source", "4", "--target", "-2", "--size", "1920×1080"]);
        assert_eq!(a.axis, Axis::Vertical);
        assert_eq!(a.stretch(), Some((4, -2)));
        assert_eq!(a.size, ExportPreset::Landscape);
    }

    #[test]
    fn defaults_and_rejections() {
        let a = args(&["-i", "a.png"]);
        assert_eq!(a.axis, Axis::Horizontal);
        assert_eq!(a.size, ExportPreset::Square);
        assert_eq!(a.stretch(), None);

        let parse = |argv: &[&str]| {
            CliArgs::try_parse_from(std::iter::once("pixelstretch").chain(argv.iter().copied()))
        };
        assert!(parse(&["-i", "a.png", "--source", "3"]).is_err());
        assert!(parse(&["-i", "a.png", "--size", "640x480"]).is_err());
        assert!(parse(&["-i", "a.png", "--axis", "diagonal"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn output_path_priority() {
        let input = Path::new("shots/cat.jpg");
        assert_eq!(
            build_output_path(input, Some(Path::new("x.png")), Some(Path::new("d")), "cat_1080x1080.png"),
            PathBuf::from("x.png")
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("d")), "cat_1080x1080.png"),
            PathBuf::from("d/cat_1080x1080.png")
        );
        assert_eq!(
            build_output_path(input, None, None, "cat_1080x1080.png"),
            PathBuf::from("shots/cat_1080x1080.png")
        );
    }

    #[test]
    fn run_one_stretches_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rows.png");
        let img = RgbaImage::from_fn(8, 8, |x, y| Rgba([y as u8, x as u8, 7, 255]));
        write_bytes(&encode_png(&img).unwrap(), &input).unwrap();

        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        let a = args(&[
            "-i",
            input.to_str().unwrap(),
            "--source",
            "99",
            "--target",
            "5",
            "--output-dir",
            out_dir.to_str().unwrap(),
        ]);
        let written = run_one(&input, &a).unwrap();
        assert_eq!(written, out_dir.join("rows_1080x1080.png"));

        // 8×8 sits at 536; source 99 clamps to row 7, band covers rows 5..=7.
        let out = load_image_sync(&written).unwrap();
        assert_eq!(out.dimensions(), (1080, 1080));
        assert_eq!(out.get_pixel(536, 541), &Rgba([7, 0, 7, 255]));
        assert_eq!(out.get_pixel(536, 540), &Rgba([4, 0, 7, 255]));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn empty_sample_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sliver.png");
        let img = RgbaImage::from_pixel(5000, 1, Rgba([200, 10, 10, 255]));
        write_bytes(&encode_png(&img).unwrap(), &input).unwrap();

        let output = dir.path().join("sliver_out.png");
        let a = args(&[
            "-i",
            input.to_str().unwrap(),
            "--source",
            "0",
            "--target",
            "5",
            "-o",
            output.to_str().unwrap(),
        ]);
        assert_eq!(run_one(&input, &a).unwrap(), output);

        let out = load_image_sync(&output).unwrap();
        assert_eq!(out.dimensions(), (1080, 1080));
        assert!(out.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn unreadable_input_fails_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "hi").unwrap();
        let a = args(&["-i", input.to_str().unwrap()]);
        assert!(matches!(run_one(&input, &a), Err(EditorError::InvalidFileType { .. })));
    }
}
