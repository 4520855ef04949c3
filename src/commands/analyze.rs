use std::path::Path;
use std::process::ExitCode;

use ais_lib::types::ImageInfo;
use ais_lib::{analyze, AisError, AnalysisResult};

use crate::cli::OutputFormat;

pub fn run_analyze(input: &Path, format: OutputFormat) -> ExitCode {
    match analyze_file(input) {
        Ok(result) => {
            match format {
                OutputFormat::Json => match serde_json::to_string_pretty(&result) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Failed to serialize result: {e}");
                        return ExitCode::FAILURE;
                    }
                },
                OutputFormat::Pretty => print_pretty(input, &result),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let payload = e.to_payload();
            eprintln!(
                "{}",
                serde_json::to_string(&payload).unwrap_or_else(|_| payload.message.clone())
            );
            ExitCode::FAILURE
        }
    }
}

fn analyze_file(input: &Path) -> Result<AnalysisResult, AisError> {
    if !input.exists() {
        return Err(AisError::Config(format!(
            "File not found: {}",
            input.display()
        )));
    }
    let image = image::open(input)?.to_rgba8();
    let info = ImageInfo {
        src: input.display().to_string(),
        alt: String::new(),
        title: String::new(),
    };
    analyze(&image, &info)
}

fn print_pretty(input: &Path, result: &AnalysisResult) {
    println!("Analysis of {}", input.display());
    println!(
        "  dimensions: {}x{} (aspect {})",
        result.dimensions.width, result.dimensions.height, result.dimensions.aspect_ratio
    );
    println!(
        "  averages:   R {} / G {} / B {} (dominant {:?})",
        result.colors.average_red,
        result.colors.average_green,
        result.colors.average_blue,
        result.colors.dominant_color
    );
    println!(
        "  character:  brightness {}, {}, {:?}",
        result.characteristics.brightness,
        if result.characteristics.is_dark {
            "dark"
        } else {
            "light"
        },
        result.characteristics.estimated_type
    );
}
