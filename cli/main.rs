#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use chrono::{Local, NaiveDate};
use clap::{Args, CommandFactory, Parser, Subcommand};
use env_logger::Env;
use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::process;
use std::sync::Arc;

use prognos::features::PatientForm;
use prognos::inference;
use prognos::startup;
use prognos::web::{self, render};

#[derive(Args)]
struct ArtifactArgs {
    /// Path to the reference CSV the form options are harvested from
    #[arg(long, default_value = "data/transformed_data.csv")]
    data: String,

    /// Path to the trained model artifact (TOML)
    #[arg(long, default_value = "models/survival_predictor.toml")]
    model: String,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    /// Age in years
    #[arg(long, default_value = "50")]
    age: i64,

    /// Gender; defaults to the first value in the reference data
    #[arg(long)]
    gender: Option<String>,

    /// Country; defaults to the first value in the reference data
    #[arg(long)]
    country: Option<String>,

    /// Cancer stage; defaults to the first value in the reference data
    #[arg(long)]
    stage: Option<String>,

    /// Number of comorbidities
    #[arg(long, default_value = "0")]
    comorbidities: i64,

    /// Smoking status; defaults to the first value in the reference data
    #[arg(long)]
    smoking: Option<String>,

    /// Body mass index
    #[arg(long, default_value = "25.0")]
    bmi: f64,

    /// Cholesterol level (mg/dL)
    #[arg(long, default_value = "200")]
    cholesterol: i64,

    /// Treatment type; defaults to the first value in the reference data
    #[arg(long)]
    treatment: Option<String>,

    /// Treatment duration in days
    #[arg(long, default_value = "30")]
    duration: i64,

    /// Diagnosis date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Parser)]
#[command(
    name = "prognos",
    version,
    about = "Lung cancer survival prediction form, served over HTTP",
    long_about = "Serves the lung cancer survival prediction form and JSON API, \
                 backed by a reference dataset and a trained model artifact that \
                 are loaded and validated once at startup."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the prediction form over HTTP
    #[command(about = "Serve the prediction form and JSON API")]
    Serve {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Interface to listen on
        #[arg(long, default_value = web::DEFAULT_HOST)]
        host: IpAddr,

        /// Port to listen on
        #[arg(long, default_value_t = web::DEFAULT_PORT)]
        port: u16,
    },

    /// Score one patient description from the command line
    #[command(about = "Score one patient description and print the survival probability")]
    Predict(PredictArgs),

    /// Validate the artifacts without serving
    #[command(about = "Load and validate the reference data and model artifact, then exit")]
    Check {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Serve {
            artifacts,
            host,
            port,
        }) => run_serve(artifacts, SocketAddr::new(host, port)),
        Some(Commands::Predict(args)) => run_predict(args),
        Some(Commands::Check { artifacts }) => run_check(artifacts),
        None => {
            Cli::command().print_help().expect("print help");
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_serve(artifacts: ArtifactArgs, addr: SocketAddr) -> Result<(), Box<dyn Error>> {
    let loaded = Arc::new(startup::initialize(&artifacts.data, &artifacts.model)?);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::serve(loaded, addr))?;
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<(), Box<dyn Error>> {
    let loaded = startup::initialize(&args.artifacts.data, &args.artifacts.model)?;

    let defaults = PatientForm::initial(&loaded.options);
    let form = PatientForm {
        age: args.age,
        gender: args.gender.unwrap_or(defaults.gender),
        country: args.country.unwrap_or(defaults.country),
        cancer_stage: args.stage.unwrap_or(defaults.cancer_stage),
        comorbidities_count: args.comorbidities,
        smoking_status: args.smoking.unwrap_or(defaults.smoking_status),
        bmi: args.bmi,
        cholesterol_level: args.cholesterol,
        treatment_type: args.treatment.unwrap_or(defaults.treatment_type),
        treatment_duration: args.duration,
    };
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let prediction = inference::predict_survival(&loaded.model, &form, date)?;
    println!("Assembled features:");
    for (name, value) in prediction.row.iter() {
        println!("  {name} = {value}");
    }
    println!(
        "Survival Probability: {}",
        render::format_percent(prediction.survival_probability())
    );
    Ok(())
}

fn run_check(artifacts: ArtifactArgs) -> Result<(), Box<dyn Error>> {
    let loaded = startup::initialize(&artifacts.data, &artifacts.model)?;
    println!(
        "OK: reference data and model artifact agree (schema version {}, {} declared columns).",
        loaded.model.schema.version,
        loaded.model.schema.fields.len()
    );
    Ok(())
}
