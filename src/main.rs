use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use log::{debug, error, info, LevelFilter};

use heart_stroke_risk::artifacts::{self, ArtifactPaths};
use heart_stroke_risk::batch;
use heart_stroke_risk::{
    ChestPainType, Classifier, ExerciseAngina, ModelContext, RawInput, RestingEcg, Result, Scaler,
    Sex, StSlope, UnmappedCategoryPolicy,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = HeartRiskArgs::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let env = Env::new().filter("HEART_RISK_LOG");
    Builder::new()
        .filter(Some("heart_stroke_risk"), log_level)
        .filter(Some("heart_risk"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", cli);

    match heart_risk(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Prediction failed: {}", err);
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Heart stroke risk from clinical risk factors", long_about = None)]
#[command(propagate_version = true)]
struct HeartRiskArgs {
    #[arg(short, long, env = "HEART_RISK_MODEL_DIR", default_value = "model",
    help = "Directory holding columns.json, scaler.json and classifier.json")]
    model_dir: PathBuf,
    #[arg(long, help = "Feature schema file, overrides the model directory")]
    schema: Option<PathBuf>,
    #[arg(long, help = "Scaler file, overrides the model directory")]
    scaler: Option<PathBuf>,
    #[arg(long, help = "Classifier file, overrides the model directory")]
    classifier: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = UnmappedPolicy::Baseline,
    help = "Handling of inputs without a schema column")]
    unmapped: UnmappedPolicy,
    #[arg(short, long, action = ArgAction::Count, global = true, help = "Verbose level")]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assess a single patient
    Predict(PredictArgs),
    /// Assess every row of a CSV file
    Batch {
        #[arg(short, long, help = "Input CSV with one patient per row")]
        input: PathBuf,
        #[arg(short, long, help = "Output CSV, stdout when omitted")]
        output: Option<PathBuf>,
    },
    /// Show the loaded artifacts
    Inspect,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long, default_value_t = 40, help = "Age in years (18-100)")]
    age: u32,
    #[arg(long, default_value = "M", help = "Sex: M or F")]
    sex: Sex,
    #[arg(long, default_value = "ATA", help = "Chest pain type: ATA, NAP, TA or ASY")]
    chest_pain: ChestPainType,
    #[arg(long, default_value_t = 120, help = "Resting blood pressure in mm Hg (80-200)")]
    resting_bp: u32,
    #[arg(long, default_value_t = 200, help = "Serum cholesterol in mg/dl (100-600)")]
    cholesterol: u32,
    #[arg(long, default_value_t = 0, help = "Fasting blood sugar above 120 mg/dl: 0 or 1")]
    fasting_bs: u8,
    #[arg(long, default_value = "Normal", help = "Resting ECG: Normal, ST or LVH")]
    resting_ecg: RestingEcg,
    #[arg(long, default_value_t = 150, help = "Maximum heart rate (60-220)")]
    max_hr: u32,
    #[arg(long, default_value = "Y", help = "Exercise-induced angina: Y or N")]
    exercise_angina: ExerciseAngina,
    #[arg(long, default_value_t = 1.0, help = "ST depression (0.0-6.0)")]
    oldpeak: f64,
    #[arg(long, default_value = "Up", help = "ST slope: Up, Flat or Down")]
    st_slope: StSlope,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, help = "Output format")]
    format: OutputFormat,
}

impl PredictArgs {
    fn raw_input(&self) -> RawInput {
        RawInput {
            age: self.age,
            sex: self.sex,
            chest_pain_type: self.chest_pain,
            resting_bp: self.resting_bp,
            cholesterol: self.cholesterol,
            fasting_bs: self.fasting_bs,
            resting_ecg: self.resting_ecg,
            max_hr: self.max_hr,
            exercise_angina: self.exercise_angina,
            oldpeak: self.oldpeak,
            st_slope: self.st_slope,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, ValueEnum)]
enum UnmappedPolicy {
    Reject,
    Baseline,
    Ignore,
}

impl From<UnmappedPolicy> for UnmappedCategoryPolicy {
    fn from(policy: UnmappedPolicy) -> Self {
        match policy {
            UnmappedPolicy::Reject => UnmappedCategoryPolicy::Reject,
            UnmappedPolicy::Baseline => UnmappedCategoryPolicy::AllowBaseline,
            UnmappedPolicy::Ignore => UnmappedCategoryPolicy::Ignore,
        }
    }
}

impl HeartRiskArgs {
    fn artifact_paths(&self) -> ArtifactPaths {
        let defaults = ArtifactPaths::in_dir(&self.model_dir);
        ArtifactPaths {
            schema: self.schema.clone().unwrap_or(defaults.schema),
            scaler: self.scaler.clone().unwrap_or(defaults.scaler),
            classifier: self.classifier.clone().unwrap_or(defaults.classifier),
        }
    }
}

async fn heart_risk(opts: HeartRiskArgs) -> Result<()> {
    let paths = opts.artifact_paths();

    match &opts.command {
        Command::Predict(args) => {
            let context = artifacts::load_context(&paths, opts.unmapped.into()).await?;
            predict(&context, args)
        }
        Command::Batch { input, output } => {
            let context = artifacts::load_context(&paths, opts.unmapped.into()).await?;
            let rows = batch::run_files(&context, input, output.as_deref())?;
            info!("Scored {} rows", rows);
            Ok(())
        }
        Command::Inspect => inspect(&paths).await,
    }
}

fn predict(context: &ModelContext, args: &PredictArgs) -> Result<()> {
    let result = context.assess(&args.raw_input())?;

    match args.format {
        OutputFormat::Text => {
            println!("{}", result.risk);
            println!("Risk Probability: {:.2}%", result.percentage());
            println!(
                "Prediction: {}",
                if result.label { "at risk" } else { "not at risk" }
            );
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).map_err(io::Error::other)?;
            println!("{}", json);
        }
    }
    Ok(())
}

async fn inspect(paths: &ArtifactPaths) -> Result<()> {
    let schema = artifacts::load_schema(&paths.schema).await?;
    let scaler = artifacts::load_scaler(&paths.scaler).await?;
    let classifier = artifacts::load_classifier(&paths.classifier).await?;

    println!("# Schema ({} columns)", schema.len());
    for (position, column) in schema.columns().iter().enumerate() {
        println!("{:>3}  {}", position, column);
    }
    println!("# Scaler: {} over {} features", scaler.kind(), scaler.n_features());
    println!(
        "# Classifier: {} over {} features",
        classifier.kind(),
        classifier.n_features()
    );
    Ok(())
}
