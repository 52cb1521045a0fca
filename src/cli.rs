//! Interactive command-line surface.
//!
//! Mirrors the four-choice menu of the original tool: static developer info,
//! project contact link, the inspection pipeline, and exit. Pipeline errors
//! are reported and drop the user back at the menu; only a missing APK
//! argument terminates the process (exit code 1).

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::error;

use crate::inspect::archive::ZipExtractor;
use crate::inspect::badging::BadgingInspector;
use crate::inspect::collect::PayloadCollector;
use crate::inspect::pipeline::InspectPipeline;
use crate::inspect::scan::StringScanner;
use crate::report::ReportAssembler;

const MENU_RULE: &str = "***************************************";

/// APK metadata and embedded-link harvester.
#[derive(Debug, Parser)]
#[command(name = "apk-harvester", version, about)]
pub struct Arguments {
    /// Path to the APK package to inspect
    pub apk: Option<PathBuf>,

    /// Also write a machine-readable inspection.json next to the APK
    #[arg(long)]
    pub json: bool,
}

fn show_menu() {
    println!("{MENU_RULE}");
    println!("1. Developer information");
    println!("2. Project contact link");
    println!("3. Extract links from the APK");
    println!("4. Exit");
    println!("{MENU_RULE}");
}

fn developer_info() {
    println!("{}", MENU_RULE.bright_magenta());
    println!("{}", "Developer: the apk-harvester authors".bright_magenta());
    println!("{}", MENU_RULE.bright_magenta());
}

fn contact_link() {
    println!("{}", MENU_RULE.bright_blue());
    println!(
        "{}",
        "Project page: https://github.com/Nertonm/apk-harvester".bright_blue()
    );
    println!("{}", MENU_RULE.bright_blue());
}

async fn run_inspection(apk_path: &Path, json: bool) -> Result<(), String> {
    let scanner = StringScanner::new().map_err(|e| e.to_string())?;
    let inspector = BadgingInspector::new().map_err(|e| e.to_string())?;
    let pipeline = InspectPipeline::new(
        ZipExtractor::new(),
        PayloadCollector::default(),
        scanner,
        inspector,
    );

    let result = pipeline
        .execute(apk_path.to_path_buf())
        .await
        .map_err(|e| e.to_string())?;

    let out_dir = apk_path.parent().unwrap_or_else(|| Path::new("."));
    let assembler = ReportAssembler::new(out_dir);
    let metadata_path = assembler
        .write_metadata_report(&result.metadata)
        .map_err(|e| e.to_string())?;
    let links_path = assembler
        .write_link_report(&result.report)
        .map_err(|e| e.to_string())?;

    println!("{}", "Extraction finished!".green());
    println!("APK information saved to '{}'.", metadata_path.display());
    println!("Found links saved to '{}'.", links_path.display());

    if json {
        let json_path = assembler
            .write_json_report(&result.metadata, &result.report)
            .map_err(|e| e.to_string())?;
        println!("JSON report saved to '{}'.", json_path.display());
    }

    Ok(())
}

/// Runs the interactive menu loop until the user exits.
pub async fn run(args: Arguments) -> ExitCode {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        show_menu();
        print!("Choose an option: ");
        let _ = io::stdout().flush();

        let choice = match lines.next() {
            Some(Ok(line)) => line.trim().to_string(),
            // EOF or unreadable stdin: nothing more to do.
            _ => return ExitCode::SUCCESS,
        };

        match choice.as_str() {
            "1" => developer_info(),
            "2" => contact_link(),
            "3" => {
                let apk_path = match &args.apk {
                    Some(path) => path.clone(),
                    None => {
                        eprintln!("Usage: apk-harvester /path/to/apk");
                        return ExitCode::from(1);
                    }
                };

                if let Err(message) = run_inspection(&apk_path, args.json).await {
                    error!(%message, "inspection failed");
                    eprintln!("{} {}", "Error:".red(), message);
                }
            }
            "4" => {
                println!("Exiting...");
                return ExitCode::SUCCESS;
            }
            _ => println!("Invalid option. Please choose a valid option."),
        }
    }
}
