use std::collections::HashMap;
use std::time::Instant;

/// Observer for driver-loop events.
///
/// Keeps the use case independent of where progress and timings end up.
pub trait PipelineLogger: Send {
    /// Report frame-level progress. `current` is the zero-based frame index;
    /// `total` is `None` while the source cannot report a frame count.
    fn progress(&mut self, current: usize, total: Option<usize>);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per sampled frame).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: Option<usize>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logs throttled progress through `log` and collects stage timings and
/// metrics for a summary at the end of the run.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Run summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} calls)",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let sum: f64 = values.iter().sum();
            lines.push(format!("  {name}: avg {:.1}  sum {sum:.0}", mean(values)));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    fn should_report(&self, current: usize, total: Option<usize>) -> bool {
        current % self.throttle_frames == 0 || total.is_some_and(|t| current + 1 == t)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: Option<usize>) {
        self.frames_seen = self.frames_seen.max(current + 1);
        if self.should_report(current, total) {
            log::info!("{}", format_progress(current, total));
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

/// Progress line for a zero-based frame index. The percentage is only
/// shown when the total is known and non-zero.
pub fn format_progress(current: usize, total: Option<usize>) -> String {
    let done = current + 1;
    match total {
        Some(total) if total > 0 => {
            let pct = (done as f64 / total as f64 * 100.0).min(100.0);
            format!("Processing: {done}/{total} frames ({pct:.1}%)")
        }
        _ => format!("Processing: {done} frames"),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(0, None);
        logger.progress(1, Some(0));
        logger.timing("detect", 5.0);
        logger.metric("faces", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_format_progress_known_total() {
        assert_eq!(
            format_progress(49, Some(200)),
            "Processing: 50/200 frames (25.0%)"
        );
    }

    #[test]
    fn test_format_progress_never_divides_by_unknown_or_zero() {
        assert_eq!(format_progress(9, None), "Processing: 10 frames");
        assert_eq!(format_progress(9, Some(0)), "Processing: 10 frames");
    }

    #[test]
    fn test_format_progress_caps_stale_total() {
        assert_eq!(
            format_progress(14, Some(10)),
            "Processing: 15/10 frames (100.0%)"
        );
    }

    #[test]
    fn test_progress_tracks_frames_seen_without_total() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 0..25 {
            logger.progress(i, None);
        }
        assert_eq!(logger.frames_seen, 25);
    }

    #[test]
    fn test_throttle_reports_interval_and_last_frame() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(logger.should_report(0, None));
        assert!(!logger.should_report(5, None));
        assert!(logger.should_report(20, Some(100)));
        assert!(logger.should_report(24, Some(25)));
        assert!(!logger.should_report(24, None));
    }

    #[test]
    fn test_timing_and_metric_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.metric("faces", 1.0);
        logger.metric("faces", 2.0);

        assert_eq!(logger.timings_for("detect"), Some(&[20.0, 30.0][..]));
        assert_relative_eq!(mean(logger.metrics_for("faces").unwrap()), 1.5);
        assert!(logger.timings_for("missing").is_none());
    }

    #[test]
    fn test_summary_contents() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(99, Some(100));
        logger.timing("detect", 10.0);
        logger.metric("faces", 4.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Run summary (100 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("faces: avg 4.0"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_info_is_not_part_of_summary() {
        let mut logger = StdoutPipelineLogger::new(10);
        for _ in 0..1000 {
            logger.info("hello world");
        }
        assert!(logger.summary_string().is_none());
    }
}
