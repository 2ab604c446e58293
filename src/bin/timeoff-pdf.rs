//! Time-off request CLI tool
//!
//! Fills a time-off request PDF form from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timeoff_pdf::pdf::{fill_pdf, inspect_template, FillOptions};
use timeoff_pdf::request::TimeOffRequest;

/// Timeoff PDF - Fill time-off request forms
#[derive(Parser)]
#[command(name = "timeoff-pdf")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Fill the employee section
    timeoff-pdf fill --input-path form.pdf --output-path filled.pdf \\
        --employee-name \"Dolores Abernathy\" --employee-requested-dates \"August 17th\"

    # Fill an arbitrary field and open the result
    timeoff-pdf fill --input-path form.pdf --field manager_name=Brad --open

    # List the fillable fields of a template
    timeoff-pdf fields form.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a form and write the finished PDF
    Fill {
        /// Template PDF
        #[arg(long)]
        input_path: PathBuf,

        /// Output PDF path (a temporary file is created when omitted)
        #[arg(long)]
        output_path: Option<PathBuf>,

        #[arg(long)]
        employee_name: Option<String>,

        #[arg(long)]
        employee_signature: Option<String>,

        #[arg(long)]
        employee_requested_dates: Option<String>,

        #[arg(long)]
        manager_name: Option<String>,

        #[arg(long)]
        manager_signature: Option<String>,

        /// Any other field as NAME=VALUE (repeatable, overrides the flags above)
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,

        /// Don't draw values as text; only mark fields read-only
        #[arg(long)]
        no_draw_text: bool,

        /// Also fill native form field values
        #[arg(long)]
        native_form_compat: bool,

        /// Font size for drawn values in points
        #[arg(long, default_value_t = 12.0)]
        font_size: f32,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// List the fillable fields on a template's first page
    Fields {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timeoff_pdf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fill {
            input_path, output_path, employee_name, employee_signature,
            employee_requested_dates, manager_name, manager_signature,
            fields, no_draw_text, native_form_compat, font_size, open,
        } => {
            let request = TimeOffRequest {
                employee_name,
                employee_signature,
                requested_dates: employee_requested_dates,
                manager_name,
                manager_approval: manager_signature,
            };
            let options = FillOptions {
                draw_text: !no_draw_text,
                native_form_compat,
                font_size,
            };
            cmd_fill(input_path, output_path, request, fields, options, open)
        }
        Commands::Fields { input } => cmd_fields(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Fill a form
fn cmd_fill(
    input: PathBuf,
    output: Option<PathBuf>,
    request: TimeOffRequest,
    assignments: Vec<String>,
    options: FillOptions,
    open: bool,
) -> Result<()> {
    let mut values = request.to_value_map();
    for assignment in &assignments {
        values.insert_assignment(assignment)?;
    }

    let report = fill_pdf(&input, output.as_deref(), &values, &options)
        .with_context(|| format!("Failed to fill {}", input.display()))?;

    for skipped in &report.skipped {
        eprintln!(
            "Skipped {}: {:?}",
            skipped.name.as_deref().unwrap_or("<unnamed>"),
            skipped.reason
        );
    }

    let output = report
        .output_path
        .context("fill finished without an output path")?;
    println!("pdf written: {}", output.display());

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Show the fillable fields of a PDF
fn cmd_fields(input: PathBuf) -> Result<()> {
    let info = inspect_template(&input)
        .with_context(|| format!("Failed to inspect {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", info.page_count);
    println!("Annotations on page 1: {}", info.annotation_count);

    for field in &info.fields {
        match field.rect {
            Some(rect) => println!(
                "  {} [{} {} {} {}]",
                field.name,
                rect.left(),
                rect.bottom(),
                rect.right(),
                rect.top()
            ),
            None => println!("  {} [no rectangle]", field.name),
        }
    }

    for skipped in &info.skipped {
        println!("  <unaddressable widget: {:?}>", skipped.reason);
    }

    Ok(())
}
