//! Personality CLI - Command-line interface for the personality predictor
//!
//! Commands:
//! - predict: Classify a single questionnaire response
//! - batch: Classify newline-delimited JSON requests
//! - doctor: Diagnose artifact health and configuration
//! - layout: Print the engineered feature layout

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use personality_predictor::artifacts::ArtifactPaths;
use personality_predictor::error::{ArtifactLoadError, PredictError};
use personality_predictor::insights::Insights;
use personality_predictor::layout::{feature_name, LayoutInfo, BASE_FEATURES, BASE_FEATURE_COUNT};
use personality_predictor::normalizer::Normalizer;
use personality_predictor::pipeline::PredictionPipeline;
use personality_predictor::types::RawInputs;
use personality_predictor::{PRODUCER_NAME, VERSION};

/// Personality - Extrovert/Introvert classifier over a short behavioral questionnaire
#[derive(Parser)]
#[command(name = "personality")]
#[command(version = VERSION)]
#[command(about = "Classify questionnaire responses as Extrovert or Introvert", long_about = None)]
struct Cli {
    /// Directory holding the model, scaler and label encoder artifacts
    /// (defaults to $PERSONALITY_MODELS_DIR, then ./models)
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single response given as flags or as a JSON request
    Predict {
        /// JSON request file (use - for stdin)
        #[arg(short, long, conflicts_with_all = ["time_alone", "social_events", "going_outside", "friends", "posts", "stage_fear", "drained"])]
        input: Option<PathBuf>,

        #[command(flatten)]
        answers: Answers,

        /// Output the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify newline-delimited JSON requests
    Batch {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Diagnose artifact health and configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the engineered feature layout
    Layout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Questionnaire answers given as flags
#[derive(Args, Debug, Default)]
struct Answers {
    /// Hours spent alone per day (0-11)
    #[arg(long)]
    time_alone: Option<f64>,

    /// Social events attended per month (0-10)
    #[arg(long)]
    social_events: Option<u32>,

    /// Days per week going outside (0-7)
    #[arg(long)]
    going_outside: Option<u32>,

    /// Number of close friends (0-15)
    #[arg(long)]
    friends: Option<u32>,

    /// Social media posts per week (0-10)
    #[arg(long)]
    posts: Option<u32>,

    /// Has stage fear (true/false)
    #[arg(long)]
    stage_fear: Option<bool>,

    /// Feels drained after socializing (true/false)
    #[arg(long)]
    drained: Option<bool>,
}

impl Answers {
    /// Request object holding the flags that were given, or `None` if none were
    fn to_request(&self) -> Option<Value> {
        let mut fields = Map::new();
        insert_flag(&mut fields, "time_alone", self.time_alone);
        insert_flag(&mut fields, "social_event_attendance", self.social_events);
        insert_flag(&mut fields, "going_outside", self.going_outside);
        insert_flag(&mut fields, "friends_circle_size", self.friends);
        insert_flag(&mut fields, "post_frequency", self.posts);
        insert_flag(&mut fields, "stage_fear", self.stage_fear);
        insert_flag(&mut fields, "drained_after_socializing", self.drained);
        if fields.is_empty() {
            None
        } else {
            Some(Value::Object(fields))
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

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

fn run(cli: Cli) -> Result<(), PersonalityCliError> {
    let paths = match &cli.models_dir {
        Some(dir) => ArtifactPaths::in_dir(dir),
        None => ArtifactPaths::from_env(),
    };

    match cli.command {
        Commands::Predict {
            input,
            answers,
            json,
        } => {
            let request = match (input, answers.to_request()) {
                (Some(path), _) => read_request(&path)?,
                (None, Some(request)) => request,
                (None, None) if !atty::is(atty::Stream::Stdin) => read_request(Path::new("-"))?,
                (None, None) => return Err(PersonalityCliError::NoInput),
            };
            cmd_predict(&paths, request, json)
        }
        Commands::Batch { input, output } => cmd_batch(&paths, &input, &output),
        Commands::Doctor { json } => cmd_doctor(&paths, json),
        Commands::Layout { json } => cmd_layout(json),
    }
}

fn insert_flag<T: Into<Value>>(fields: &mut Map<String, Value>, name: &str, value: Option<T>) {
    if let Some(value) = value {
        fields.insert(name.to_string(), value.into());
    }
}

fn read_input(path: &Path) -> Result<String, PersonalityCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn read_request(path: &Path) -> Result<Value, PersonalityCliError> {
    let data = read_input(path)?;
    if data.trim().is_empty() {
        return Err(PersonalityCliError::NoInput);
    }
    Ok(serde_json::from_str(&data)?)
}

fn cmd_predict(paths: &ArtifactPaths, request: Value, json: bool) -> Result<(), PersonalityCliError> {
    let pipeline = PredictionPipeline::load(paths)?;

    let result = pipeline.predict_value(request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", Insights::from_result(&result));
    }

    Ok(())
}

fn cmd_batch(paths: &ArtifactPaths, input: &Path, output: &Path) -> Result<(), PersonalityCliError> {
    let pipeline = PredictionPipeline::load(paths)?;

    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };
    let mut writer: Box<dyn Write> = if output.to_string_lossy() == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(fs::File::create(output)?)
    };

    let summary = run_batch(&pipeline, reader, &mut writer)?;
    log::info!(
        "Batch finished: {} classified, {} rejected",
        summary.succeeded,
        summary.failed
    );
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
struct BatchSummary {
    succeeded: usize,
    failed: usize,
}

/// Classify every non-blank line of `reader`, writing one output record per
/// request. Bad records, including lines that are not UTF-8, become error
/// records; only I/O failures stop the batch.
fn run_batch<R: BufRead, W: Write>(
    pipeline: &PredictionPipeline,
    mut reader: R,
    writer: &mut W,
) -> Result<BatchSummary, PersonalityCliError> {
    let mut summary = BatchSummary::default();
    let mut buf = Vec::new();
    let mut line_number = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let outcome = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => pipeline.predict_json(line.trim()).map_err(|e| BatchError {
                line: line_number,
                code: e.code(),
                message: e.to_string(),
            }),
            Err(e) => Err(BatchError {
                line: line_number,
                code: "MALFORMED_INPUT",
                message: format!("Line is not valid UTF-8: {e}"),
            }),
        };

        let record = match outcome {
            Ok(result) => {
                summary.succeeded += 1;
                serde_json::to_string(&result)?
            }
            Err(error) => {
                summary.failed += 1;
                serde_json::to_string(&error)?
            }
        };
        writeln!(writer, "{}", record)?;
    }
    writer.flush()?;

    Ok(summary)
}

fn cmd_doctor(paths: &ArtifactPaths, json: bool) -> Result<(), PersonalityCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();
    let layout = LayoutInfo::current();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("personality-predictor version {}", VERSION),
    });

    checks.push(DoctorCheck {
        name: "feature_layout".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "Layout v{} ({} base + {} derived columns, hash {:08x})",
            layout.version,
            BASE_FEATURE_COUNT,
            layout.feature_names.len() - BASE_FEATURE_COUNT,
            layout.hash
        ),
    });

    match PredictionPipeline::load(paths) {
        Ok(pipeline) => {
            let artifacts = pipeline.artifacts();
            let labels = artifacts.labels().classes();
            checks.push(DoctorCheck {
                name: "artifacts".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Loaded {} classifier from {} at {}",
                    artifacts.classifier().kind(),
                    artifact_dir(paths).display(),
                    artifacts.loaded_at().to_rfc3339()
                ),
            });
            checks.push(DoctorCheck {
                name: "labels".to_string(),
                status: CheckStatus::Ok,
                message: format!("Class 0 = {}, class 1 = {}", labels[0], labels[1]),
            });
            checks.push(scaler_check(artifacts.normalizer()));
            checks.push(sample_check(&pipeline));
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "artifacts".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
        }
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Personality Doctor Report");
        println!("=========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PersonalityCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn scaler_check(normalizer: &Normalizer) -> DoctorCheck {
    let scale = normalizer.scale();
    let (narrowest, widest) = scale
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(*s), hi.max(*s)));
    DoctorCheck {
        name: "scaler".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "{} columns, mean {} = {:.3}, scale range {:.3}..{:.3}",
            scale.len(),
            BASE_FEATURES[0],
            normalizer.mean()[0],
            narrowest,
            widest
        ),
    }
}

/// Default questionnaire answers, run end to end as a smoke test
const SAMPLE_ANSWERS: RawInputs = RawInputs {
    time_alone: 5.0,
    social_event_attendance: 4,
    going_outside: 4,
    friends_circle_size: 6,
    post_frequency: 3,
    stage_fear: false,
    drained_after_socializing: false,
};

fn sample_check(pipeline: &PredictionPipeline) -> DoctorCheck {
    let outcome = pipeline.engineer(&SAMPLE_ANSWERS).and_then(|(engineered, _)| {
        let result = pipeline.predict(&SAMPLE_ANSWERS)?;
        Ok((engineered, result))
    });

    match outcome {
        Ok((engineered, result)) => {
            let columns: Vec<String> = engineered
                .values()
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{}={:.3}", feature_name(i).unwrap_or("?"), v))
                .collect();
            DoctorCheck {
                name: "sample_prediction".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Default answers -> {} ({:.0}%) from [{}]",
                    result.personality,
                    result.confidence * 100.0,
                    columns.join(", ")
                ),
            }
        }
        Err(e) => DoctorCheck {
            name: "sample_prediction".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    }
}

fn artifact_dir(paths: &ArtifactPaths) -> &Path {
    paths.classifier.parent().unwrap_or_else(|| Path::new("."))
}

fn cmd_layout(json: bool) -> Result<(), PersonalityCliError> {
    let layout = LayoutInfo::current();

    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
    } else {
        println!("Feature layout v{} (hash {:08x})", layout.version, layout.hash);
        println!();
        for (index, name) in layout.feature_names.iter().enumerate() {
            let group = if index < BASE_FEATURE_COUNT { "base" } else { "derived" };
            println!("  {:>2}  {:<30} {}", index, name, group);
        }
    }

    Ok(())
}

// Error handling

#[derive(Debug)]
enum PersonalityCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Artifact(ArtifactLoadError),
    Predict(PredictError),
    NoInput,
    DoctorFailed,
}

impl From<io::Error> for PersonalityCliError {
    fn from(e: io::Error) -> Self {
        PersonalityCliError::Io(e)
    }
}

impl From<serde_json::Error> for PersonalityCliError {
    fn from(e: serde_json::Error) -> Self {
        PersonalityCliError::Json(e)
    }
}

impl From<ArtifactLoadError> for PersonalityCliError {
    fn from(e: ArtifactLoadError) -> Self {
        PersonalityCliError::Artifact(e)
    }
}

impl From<PredictError> for PersonalityCliError {
    fn from(e: PredictError) -> Self {
        PersonalityCliError::Predict(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PersonalityCliError> for CliError {
    fn from(e: PersonalityCliError) -> Self {
        match e {
            PersonalityCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PersonalityCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PersonalityCliError::Artifact(e) => CliError {
                code: "ARTIFACT_LOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Check --models-dir or PERSONALITY_MODELS_DIR; run 'personality doctor' for details"
                        .to_string(),
                ),
            },
            PersonalityCliError::Predict(e) => {
                let hint = match e {
                    PredictError::MalformedInput(_) => {
                        "Provide all seven answers within their documented ranges"
                    }
                    PredictError::Inference(_) => "The loaded artifacts produced an invalid result",
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            PersonalityCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No request given".to_string(),
                hint: Some("Pass answers as flags, or a JSON request via --input or stdin".to_string()),
            },
            PersonalityCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: None,
            },
        }
    }
}

#[derive(serde::Serialize)]
struct BatchError {
    line: usize,
    code: &'static str,
    message: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reference_pipeline() -> PredictionPipeline {
        PredictionPipeline::load_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("models")).unwrap()
    }

    const VALID: &str = r#"{"time_alone": 8, "social_event_attendance": 1, "going_outside": 1, "friends_circle_size": 2, "post_frequency": 0, "stage_fear": true, "drained_after_socializing": true}"#;
    const OUT_OF_RANGE: &str = r#"{"time_alone": 8, "social_event_attendance": 1, "going_outside": 12, "friends_circle_size": 2, "post_frequency": 0, "stage_fear": true, "drained_after_socializing": true}"#;
    const MISTYPED: &str = r#"{"time_alone": 8, "social_event_attendance": 1, "going_outside": 1, "friends_circle_size": 2, "post_frequency": 0, "stage_fear": "yes", "drained_after_socializing": true}"#;

    #[test]
    fn test_batch_keeps_going_after_bad_records() {
        let mut input = Vec::new();
        for line in [VALID, OUT_OF_RANGE, "", MISTYPED, "{ not json"] {
            input.extend_from_slice(line.as_bytes());
            input.push(b'\n');
        }
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(VALID.as_bytes());

        let mut output = Vec::new();
        let summary = run_batch(&reference_pipeline(), input.as_slice(), &mut output).unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 2,
                failed: 4
            }
        );

        let records: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 6);

        assert_eq!(records[0]["personality"], "Introvert");
        assert_eq!(records[1]["line"], 2);
        assert_eq!(records[1]["code"], "MALFORMED_INPUT");
        assert!(records[1]["message"].as_str().unwrap().contains("going_outside"));
        assert_eq!(records[2]["line"], 4);
        assert!(records[2]["message"].as_str().unwrap().contains("stage_fear"));
        assert_eq!(records[3]["line"], 5);
        assert_eq!(records[3]["code"], "MALFORMED_INPUT");
        assert_eq!(records[4]["line"], 6);
        assert_eq!(records[4]["code"], "MALFORMED_INPUT");
        assert!(records[4]["message"].as_str().unwrap().contains("UTF-8"));
        assert_eq!(records[5]["personality"], "Introvert");
    }

    #[test]
    fn test_answers_map_to_request_fields() {
        let answers = Answers {
            time_alone: Some(6.5),
            social_events: Some(2),
            going_outside: Some(1),
            friends: Some(4),
            posts: Some(1),
            stage_fear: Some(true),
            drained: Some(false),
        };
        let request = answers.to_request().unwrap();

        assert_eq!(
            RawInputs::from_value(request).unwrap(),
            RawInputs {
                time_alone: 6.5,
                social_event_attendance: 2,
                going_outside: 1,
                friends_circle_size: 4,
                post_frequency: 1,
                stage_fear: true,
                drained_after_socializing: false,
            }
        );
    }

    #[test]
    fn test_partial_answers_name_the_missing_field() {
        assert_eq!(Answers::default().to_request(), None);

        let answers = Answers {
            time_alone: Some(3.0),
            social_events: Some(5),
            ..Answers::default()
        };
        let err = RawInputs::from_value(answers.to_request().unwrap()).unwrap_err();
        assert_eq!(err.field, "going_outside");
    }

    #[test]
    fn test_doctor_sample_and_scaler_checks() {
        let pipeline = reference_pipeline();

        let sample = sample_check(&pipeline);
        assert!(matches!(sample.status, CheckStatus::Ok));
        assert!(sample.message.starts_with("Default answers -> Extrovert (90%)"));
        assert!(sample.message.contains("Social_Solitary_Balance="));

        let scaler = scaler_check(pipeline.artifacts().normalizer());
        assert!(scaler.message.starts_with("7 columns, mean Time_spent_Alone = 4.506"));
    }
}
