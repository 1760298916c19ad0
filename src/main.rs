//! svcchart CLI
//!
//! Entry point for the `svcchart` command-line tool.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use svcchart::config::{LoadRequest, ResolveReport};
use svcchart::logging::init_logging;
use svcchart::output::{self, OutputFormat};
use svcchart::pipeline::{Pipeline, PipelineError, PipelineRequest};

#[derive(Parser)]
#[command(name = "svcchart")]
#[command(about = "Layered configuration resolver and renderer for service charts", version)]
struct Cli {
    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, validate and render resource documents
    Render {
        #[command(flatten)]
        input: InputArgs,

        /// Write one file per resource into this directory instead of stdout
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the resolved configuration and its sources
    Resolve {
        #[command(flatten)]
        input: InputArgs,

        /// Do not redact secret-looking values
        #[arg(long)]
        reveal_secrets: bool,
    },

    /// Validate the resolved configuration and list every violation
    Validate {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print computed resource names and label sets
    Names {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Chart directory (values.yaml, values-<env>.yaml, Chart.yaml)
    #[arg(long, short = 'd')]
    chart_dir: Option<PathBuf>,

    /// Values file, applied in order after the chart values (repeatable)
    #[arg(long = "values", short = 'f')]
    values: Vec<PathBuf>,

    /// Environment name; selects values-<env>.yaml
    #[arg(long = "env", short = 'e')]
    environment: Option<String>,

    /// Override a value: key.path=value (repeatable)
    #[arg(long)]
    set: Vec<String>,

    /// Override a value, always as a string (repeatable)
    #[arg(long)]
    set_string: Vec<String>,

    /// Schema document extending the built-in schema
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Release name
    #[arg(long, short = 'r')]
    release: String,

    /// Chart name (overrides Chart.yaml)
    #[arg(long)]
    chart: Option<String>,

    /// Chart version (overrides Chart.yaml)
    #[arg(long)]
    chart_version: Option<String>,

    /// Application version (overrides Chart.yaml appVersion)
    #[arg(long)]
    app_version: Option<String>,

    /// Skip the built-in defaults layer
    #[arg(long)]
    no_defaults: bool,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Yaml)]
    output: OutputFormat,
}

impl InputArgs {
    fn pipeline(&self) -> Pipeline {
        let request = PipelineRequest {
            load: LoadRequest {
                chart_dir: self.chart_dir.clone(),
                environment: self.environment.clone(),
                values_files: self.values.clone(),
                set: self.set.clone(),
                set_string: self.set_string.clone(),
                no_defaults: self.no_defaults,
            },
            schema_path: self.schema.clone(),
            release: self.release.clone(),
            chart_name: self.chart.clone(),
            chart_version: self.chart_version.clone(),
            app_version: self.app_version.clone(),
        };
        match Pipeline::new(request) {
            Ok(pipeline) => pipeline,
            Err(e) => fail(e),
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // usage errors share the load-error exit code; --help and --version exit 0
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    init_logging(cli.quiet, cli.log_json);

    match cli.command {
        Commands::Render { input, out_dir } => run_render(&input, out_dir),
        Commands::Resolve {
            input,
            reveal_secrets,
        } => run_resolve(&input, reveal_secrets),
        Commands::Validate { input } => run_validate(&input),
        Commands::Names { input } => run_names(&input),
    }
}

fn run_render(input: &InputArgs, out_dir: Option<PathBuf>) {
    let outcome = match input.pipeline().run() {
        Ok(outcome) => outcome,
        Err(e) => fail(e),
    };

    match out_dir {
        Some(dir) => match output::write_artifacts(&outcome.artifacts, &dir, input.output) {
            Ok(paths) => {
                for path in paths {
                    eprintln!("wrote {}", path.display());
                }
            }
            Err(e) => fail(e.into()),
        },
        None => match output::render_documents(&outcome.artifacts, input.output) {
            Ok(text) => print!("{}", text),
            Err(e) => fail(e.into()),
        },
    }

    for omission in &outcome.omitted {
        eprintln!("skipped {}: {}", omission.kind, omission.reason);
    }
    if let Err(e) = outcome.check() {
        fail(e);
    }
}

fn run_resolve(input: &InputArgs, reveal_secrets: bool) {
    let config = match input.pipeline().resolve() {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    let report = match ResolveReport::new(&config, reveal_secrets) {
        Ok(report) => report,
        Err(e) => fail(e.into()),
    };
    print_value(&report, input.output);
}

fn run_validate(input: &InputArgs) {
    let pipeline = input.pipeline();
    let config = match pipeline.resolve() {
        Ok(config) => config,
        Err(e) => fail(e),
    };

    let violations = pipeline.check(&config);
    if input.output == OutputFormat::Json {
        print_value(&violations, input.output);
    } else if violations.is_empty() {
        println!("valid");
    } else {
        for violation in &violations {
            println!("{}: {}", violation.to_code(), violation);
        }
    }

    if !violations.is_empty() {
        process::exit(PipelineError::Validation(violations).exit_code());
    }
}

fn run_names(input: &InputArgs) {
    match input.pipeline().names() {
        Ok(report) => print_value(&report, input.output),
        Err(e) => fail(e),
    }
}

fn print_value<T: serde::Serialize>(value: &T, format: OutputFormat) {
    match output::to_string(value, format) {
        Ok(text) => print!("{}", text),
        Err(e) => fail(e.into()),
    }
}

/// Report an error on stderr and exit with its code.
fn fail(error: PipelineError) -> ! {
    match &error {
        PipelineError::Validation(violations) => {
            eprintln!("Error: {}", error);
            for violation in violations {
                eprintln!("  {}: {}", violation.to_code(), violation);
            }
        }
        PipelineError::Render(failures) => {
            eprintln!("Error: {}", error);
            for failure in failures {
                eprintln!("  {}", failure);
            }
        }
        _ => eprintln!("Error: {}", error),
    }
    process::exit(error.exit_code());
}
