use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use ais_lib::{
    AisError, AnalysisResult, Bridge, Config, ControllerOptions, Detection, DetectorClient,
    Discovery, HttpImageFetcher, MemoryPage, Message, PageController, PageStatistics, ResultStore,
};

use crate::cli::OutputFormat;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanOutput {
    statistics: PageStatistics,
    settled: usize,
    total: usize,
    stopped: bool,
    results: BTreeMap<String, AnalysisResult>,
}

pub async fn run_scan(
    config_path: Option<&Path>,
    page_path: PathBuf,
    endpoint: Option<String>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> ExitCode {
    match scan(config_path, &page_path, endpoint).await {
        Ok(out) => {
            if let Err(e) = write_output(&out, output.as_deref(), format) {
                eprintln!("Failed to write output: {e}");
                return ExitCode::FAILURE;
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

async fn scan(
    config_path: Option<&Path>,
    page_path: &Path,
    endpoint: Option<String>,
) -> Result<ScanOutput, AisError> {
    let mut config = Config::load(config_path)?;
    if let Some(endpoint) = endpoint {
        config.detector.endpoint = endpoint;
        config.validate()?;
    }

    let page = MemoryPage::from_json_file(page_path)?;
    let discovery = Discovery::from_config(&config);

    let fetcher = Arc::new(HttpImageFetcher::with_timeout(config.detector.timeout)?);
    let detector = Arc::new(DetectorClient::with_timeout_and_quality(
        &config.detector.endpoint,
        config.detector.timeout,
        config.detector.jpeg_quality,
    )?);
    let (controller, events) =
        PageController::new(fetcher, detector, ControllerOptions::from(&config));

    // Persist completions through the bridge relay, exactly as a live page
    // would, and render the outgoing notifications as terminal progress.
    let store = Arc::new(ResultStore::new(store_path(&config)));
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let relay = Bridge::relay(events, Arc::clone(&store), out_tx);
    let renderer = tokio::spawn(render_messages(out_rx));

    let candidates = discovery.scan(&page).await?;
    eprintln!("Found {} candidate image(s)", candidates.len());

    let summary = controller.process_all(candidates).await?;
    let statistics = controller.statistics();
    let results = controller.results().into_iter().collect();

    // Dropping the controller closes the event stream, which winds down the
    // relay and, through it, the renderer.
    drop(controller);
    let _ = relay.await;
    let _ = renderer.await;

    Ok(ScanOutput {
        statistics,
        settled: summary.settled,
        total: summary.total,
        stopped: summary.stopped,
        results,
    })
}

fn store_path(config: &Config) -> PathBuf {
    config
        .store_path
        .clone()
        .or_else(ResultStore::default_path)
        .unwrap_or_else(|| std::env::temp_dir().join("ais-results.json"))
}

/// Render outgoing bridge messages as terminal progress. A read-only
/// consumer; nothing here feeds back into processing.
async fn render_messages(mut messages: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = messages.recv().await {
        match message {
            Message::ImageProcessed { image_url, result } => match result.detection() {
                Some(detection) => {
                    eprintln!("  {} -> {}", image_url, verdict_label(detection))
                }
                None => eprintln!("  {image_url} -> detection failed"),
            },
            Message::ProcessingProgress { current, total } => {
                eprintln!("[{current}/{total}]");
            }
            Message::DetectionSummary { data } => {
                eprintln!(
                    "  so far: {} AI / {} human, avg confidence {:.0}%",
                    data.ai_count,
                    data.human_count,
                    data.average_confidence * 100.0
                );
            }
            _ => {}
        }
    }
}

/// Verdict wording mirrors the overlay tag: artificial above 70% confidence
/// is the high-confidence state.
fn verdict_label(detection: &Detection) -> String {
    let confidence = (detection.confidence * 100.0).round();
    if detection.is_artificial() && detection.confidence > 0.7 {
        format!("{confidence}% AI generated")
    } else if detection.is_artificial() {
        format!("possibly AI generated ({confidence}% confidence)")
    } else {
        format!("likely human ({confidence}% confidence)")
    }
}

fn write_output(
    out: &ScanOutput,
    path: Option<&Path>,
    format: OutputFormat,
) -> Result<(), AisError> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(out)?,
        OutputFormat::Pretty => render_pretty(out),
    };

    match path {
        Some(path) => std::fs::write(path, rendered.as_bytes())?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn render_pretty(out: &ScanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Processed {}/{} image(s){}",
        out.settled,
        out.total,
        if out.stopped { " (stopped)" } else { "" }
    ));
    lines.push(format!(
        "AI: {}  Human: {}  Avg confidence: {:.0}%",
        out.statistics.ai_count,
        out.statistics.human_count,
        out.statistics.average_confidence * 100.0
    ));
    for (url, result) in &out.results {
        let verdict = match result.detection() {
            Some(d) => verdict_label(d),
            None => "no verdict".to_string(),
        };
        lines.push(format!("{url}: {verdict}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_lib::Prediction;

    fn detection(prediction: Prediction, confidence: f64) -> Detection {
        Detection {
            human_probability: 1.0 - confidence,
            artificial_probability: confidence,
            prediction,
            confidence,
        }
    }

    #[test]
    fn verdict_label_distinguishes_confidence_bands() {
        let high = verdict_label(&detection(Prediction::Artificial, 0.92));
        assert_eq!(high, "92% AI generated");

        let mid = verdict_label(&detection(Prediction::Artificial, 0.6));
        assert!(mid.starts_with("possibly AI generated"));

        let human = verdict_label(&detection(Prediction::Human, 0.8));
        assert!(human.starts_with("likely human"));
    }

    #[test]
    fn boundary_at_seventy_percent_is_exclusive() {
        let at = verdict_label(&detection(Prediction::Artificial, 0.7));
        assert!(at.starts_with("possibly AI generated"));
    }
}
