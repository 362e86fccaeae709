//! Locally simulated run: paced progress lines, no network traffic.

use super::sink::LogSink;
use crate::model::{LogKind, RunConfig};
use std::time::Duration;

/// Pauses between simulated stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperTiming {
    pub connect: Duration,
    pub authenticate: Duration,
    pub analyze: Duration,
    pub manifests: Duration,
    pub per_app: Duration,
    pub profile: Duration,
    pub finish: Duration,
}

impl Default for StepperTiming {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(500),
            authenticate: Duration::from_millis(700),
            analyze: Duration::from_millis(800),
            manifests: Duration::from_millis(1500),
            per_app: Duration::from_millis(600),
            profile: Duration::from_millis(1000),
            finish: Duration::from_millis(800),
        }
    }
}

impl StepperTiming {
    /// Every pause multiplied by `factor` (0.0 disables pacing). Negative or NaN
    /// factors count as 0; products too large for a `Duration` saturate.
    pub fn scaled(self, factor: f64) -> Self {
        let f = factor.max(0.0);
        let mul = |d: Duration| {
            Duration::try_from_secs_f64(d.as_secs_f64() * f).unwrap_or(Duration::MAX)
        };
        Self {
            connect: mul(self.connect),
            authenticate: mul(self.authenticate),
            analyze: mul(self.analyze),
            manifests: mul(self.manifests),
            per_app: mul(self.per_app),
            profile: mul(self.profile),
            finish: mul(self.finish),
        }
    }
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

pub(crate) async fn run(sink: &mut LogSink, config: &RunConfig, timing: &StepperTiming) {
    pause(timing.connect).await;
    sink.emit("> ESTABLISHING SECURE CONNECTION...", LogKind::Info);
    pause(timing.authenticate).await;
    sink.emit("> AUTHENTICATING PRINCIPALS...", LogKind::Info);

    pause(timing.analyze).await;
    sink.emit(
        format!("Analyzing package manifests for: {}", config.app_ids.trim()),
        LogKind::Info,
    );

    pause(timing.manifests).await;
    for app in config.app_id_list() {
        sink.emit(format!("> Processing {app}..."), LogKind::Info);
        pause(timing.per_app).await;
        sink.emit(
            format!(
                "> Validating architecture compatibility ({})",
                config.architecture
            ),
            LogKind::Success,
        );
    }

    pause(timing.profile).await;
    sink.emit("Generating optimization profile...", LogKind::Warning);
    pause(timing.finish).await;
    sink.emit(
        "Process completed successfully. Report generated.",
        LogKind::Success,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_zero_disables_pacing() {
        let t = StepperTiming::default().scaled(0.0);
        assert!(t.connect.is_zero() && t.finish.is_zero() && t.per_app.is_zero());

        let half = StepperTiming::default().scaled(0.5);
        assert_eq!(half.manifests, Duration::from_millis(750));
    }

    #[test]
    fn huge_or_invalid_factors_do_not_panic() {
        let t = StepperTiming::default().scaled(1e30);
        assert_eq!(t.connect, Duration::MAX);

        let t = StepperTiming::default().scaled(f64::INFINITY);
        assert_eq!(t.finish, Duration::MAX);

        let t = StepperTiming::default().scaled(f64::NAN);
        assert!(t.connect.is_zero());
    }
}
