//! ptgrade CLI - Command-line interface for PT Champion grading
//!
//! Commands:
//! - score: Score a final performance value
//! - grade: Grade a stream of pose frames (NDJSON) for one exercise
//! - exercises: List registered exercises and their calibration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ptchampion_grading::exercise::{DepthGate, ExerciseDefinition};
use ptchampion_grading::{
    calculate_score, ExerciseType, GradingResult, GradingSession, Pose, SessionSummary,
    GRADING_VERSION,
};

/// ptgrade - Rep counting and fitness scoring
#[derive(Parser)]
#[command(name = "ptgrade")]
#[command(author = "PT Champion")]
#[command(version = GRADING_VERSION)]
#[command(about = "Count reps from pose frames and score exercise performance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a final performance value (reps, or seconds for timed events)
    Score {
        /// Exercise type (pushup, situp, pullup, run)
        #[arg(short, long)]
        exercise: String,

        /// Performance value
        #[arg(short, long)]
        value: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grade pose frames, one Pose JSON object per line
    Grade {
        /// Exercise type
        #[arg(short, long)]
        exercise: String,

        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Append a session summary with the final score
        #[arg(long)]
        summary: bool,

        /// Performance value for the summary (defaults to counted reps)
        #[arg(long)]
        performance: Option<f64>,
    },

    /// List registered exercises
    Exercises {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one grading result per line)
    Ndjson,
    /// JSON report object
    Json,
    /// Pretty-printed JSON report object
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GradeCliError> {
    match cli.command {
        Commands::Score {
            exercise,
            value,
            json,
        } => cmd_score(&exercise, value, json),

        Commands::Grade {
            exercise,
            input,
            output,
            output_format,
            summary,
            performance,
        } => cmd_grade(&exercise, &input, &output, output_format, summary, performance),

        Commands::Exercises { json } => cmd_exercises(json),
    }
}

fn cmd_score(exercise: &str, value: f64, json: bool) -> Result<(), GradeCliError> {
    let exercise: ExerciseType = exercise.parse()?;
    let score = calculate_score(exercise, value)?;

    if json {
        let report = ScoreReport {
            exercise,
            performance_value: value,
            unit: exercise.definition().performance_unit,
            score,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", score);
    }

    Ok(())
}

fn cmd_grade(
    exercise: &str,
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    summary: bool,
    performance: Option<f64>,
) -> Result<(), GradeCliError> {
    let exercise: ExerciseType = exercise.parse()?;
    let mut session = GradingSession::new(exercise);

    let reader: Box<dyn BufRead> = if is_stdio(input) {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("Reading pose frames from terminal; one JSON object per line, Ctrl-D to finish");
        }
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let mut results: Vec<GradingResult> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let pose: Pose = serde_json::from_str(trimmed).map_err(|e| {
            GradeCliError::ParseError(format!("Failed to parse pose on line {}: {}", index + 1, e))
        })?;

        results.push(session.process_pose(&pose)?);
    }

    if results.is_empty() && exercise.is_pose_tracked() {
        return Err(GradeCliError::NoFrames);
    }

    let summary = if summary {
        Some(session.finish(performance)?)
    } else {
        None
    };

    let output_data = format_output(&results, summary.as_ref(), &output_format)?;

    if is_stdio(output) {
        let mut stdout = io::stdout();
        write!(stdout, "{}", output_data)?;
        stdout.flush()?;
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_exercises(json: bool) -> Result<(), GradeCliError> {
    let definitions: Vec<&ExerciseDefinition> =
        ExerciseType::ALL.iter().map(|e| e.definition()).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    println!("Registered Exercises");
    println!("====================");
    for definition in definitions {
        println!(
            "\n{} ({}) - scored by {} on {}",
            definition.name,
            definition.exercise,
            definition.calibration.strategy_name(),
            definition.performance_unit
        );
        match &definition.motion {
            Some(motion) => {
                println!(
                    "  phases: down <= {:.0} deg, up >= {:.0} deg",
                    motion.thresholds.down_max, motion.thresholds.up_min
                );
                println!(
                    "  joints: {} (min confidence {:.2})",
                    motion.required_joints.join(", "),
                    motion.min_confidence
                );
                if let Some(DepthGate::ChinOverBar { clearance }) = motion.depth_gate {
                    println!("  depth: chin {:.2} above the bar", clearance);
                }
            }
            None => println!("  timed event, no live pose tracking"),
        }
    }

    Ok(())
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn format_output(
    results: &[GradingResult],
    summary: Option<&SessionSummary>,
    format: &OutputFormat,
) -> Result<String, GradeCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for result in results {
                lines.push(serde_json::to_string(result)?);
            }
            if let Some(summary) = summary {
                lines.push(serde_json::to_string(summary)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(&GradeReport { results, summary })?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(&GradeReport { results, summary })?),
    }
}

// Error types

#[derive(Debug)]
enum GradeCliError {
    Io(io::Error),
    Grading(ptchampion_grading::GradingError),
    Json(serde_json::Error),
    NoFrames,
    ParseError(String),
}

impl From<io::Error> for GradeCliError {
    fn from(e: io::Error) -> Self {
        GradeCliError::Io(e)
    }
}

impl From<ptchampion_grading::GradingError> for GradeCliError {
    fn from(e: ptchampion_grading::GradingError) -> Self {
        GradeCliError::Grading(e)
    }
}

impl From<serde_json::Error> for GradeCliError {
    fn from(e: serde_json::Error) -> Self {
        GradeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GradeCliError> for CliError {
    fn from(e: GradeCliError) -> Self {
        use ptchampion_grading::GradingError;

        match e {
            GradeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GradeCliError::Grading(e) => {
                let hint = match &e {
                    GradingError::UnknownExerciseType(_) => "Run 'ptgrade exercises' for valid types",
                    GradingError::InvalidInput(_) => "Performance values must be finite and non-negative",
                    GradingError::NotPoseTracked(_) | GradingError::MissingPerformance(_) => {
                        "Timed events are scored with --performance <seconds>"
                    }
                    GradingError::JsonError(_) => "Check JSON syntax",
                };
                CliError {
                    code: "GRADING_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            GradeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GradeCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No pose frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            GradeCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line must be a pose object: {\"joints\": {\"leftElbow\": {\"x\": .., \"y\": .., \"confidence\": ..}}}".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreReport {
    exercise: ExerciseType,
    performance_value: f64,
    unit: &'static str,
    score: u8,
}

#[derive(serde::Serialize)]
struct GradeReport<'a> {
    results: &'a [GradingResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a SessionSummary>,
}
