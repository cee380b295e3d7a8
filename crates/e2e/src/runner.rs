//! Scenario runner: isolated sessions, per-step results, failure screenshots

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use vetprobe_common::{FixtureStamp, SuiteConfig};

use crate::error::{E2eError, E2eResult};
use crate::events::EventSink;
use crate::flow::Flow;
use crate::page::Page;
use crate::preflight;
use crate::resolver::Resolution;
use crate::session::Session;
use crate::spec::{ScenarioSpec, ScenarioStep};

/// Opens one isolated browser session per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, scenario: &str) -> E2eResult<Arc<dyn Page>>;
}

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub action: String,
    pub success: bool,
    pub duration_ms: u64,
    pub detail: Option<String>,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    /// Value substituted for `{ts}` in this run
    pub stamp: i64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// `Err` naming the failure count when any scenario failed
    pub fn ensure_passed(&self) -> E2eResult<()> {
        if self.success() {
            Ok(())
        } else {
            Err(E2eError::AssertionFailed(format!(
                "{} of {} scenario(s) failed",
                self.failed, self.total
            )))
        }
    }
}

fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Resolved { kind, key } => format!("found {} '{}'", kind, key),
        Resolution::Created { kind, key, message } if message.is_empty() => {
            format!("created {} '{}'", kind, key)
        }
        Resolution::Created { kind, key, message } => {
            format!("created {} '{}': {}", kind, key, message)
        }
    }
}

/// Run one step against the flow; `Ok` carries a short description
pub async fn execute_step(flow: &mut Flow, step: &ScenarioStep) -> E2eResult<Option<String>> {
    Ok(match step {
        ScenarioStep::Login => {
            flow.login().await?;
            None
        }
        ScenarioStep::EnsureContact(record) => Some(describe(&flow.ensure_contact(record).await?)),
        ScenarioStep::EnsurePatient(record) => Some(describe(&flow.ensure_patient(record).await?)),
        ScenarioStep::CreatePatientFromContact(patient) => Some(describe(
            &flow.create_patient_from_contact(&patient.to_record()).await?,
        )),
        ScenarioStep::CreateAppointmentFromPatient(record) => Some(describe(
            &flow.create_appointment_from_patient(record).await?,
        )),
        ScenarioStep::EnsureWellnessPlan(record) => {
            Some(describe(&flow.ensure_wellness_plan(record).await?))
        }
        ScenarioStep::ExpectSavedMessage { contains } => {
            flow.expect_saved_message(contains)?;
            flow.context().last_message.clone()
        }
        ScenarioStep::Logout => {
            flow.logout().await?;
            None
        }
    })
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Runs scenarios with bounded parallelism, one fresh session each
pub struct ScenarioRunner {
    config: Arc<SuiteConfig>,
    factory: Arc<dyn SessionFactory>,
    events: Arc<dyn EventSink>,
}

impl ScenarioRunner {
    pub fn new(
        config: Arc<SuiteConfig>,
        factory: Arc<dyn SessionFactory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            factory,
            events,
        }
    }

    /// Run all scenarios in a directory
    pub async fn run_dir(&self, dir: &Path) -> E2eResult<TestSuiteResult> {
        let specs = ScenarioSpec::load_all(dir)?;
        self.run_specs(&specs).await
    }

    /// Run a list of scenarios; results keep the input order
    pub async fn run_specs(&self, specs: &[ScenarioSpec]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let settings = &self.config.runner;

        if settings.preflight {
            preflight::wait_for_app(&self.config.app.base_url, settings.preflight_timeout()).await?;
        }

        info!(
            "Running {} scenario(s), {} at a time...",
            specs.len(),
            settings.parallelism.max(1)
        );

        let results: Vec<TestResult> = stream::iter(specs)
            .map(|spec| self.run_spec(spec))
            .buffered(settings.parallelism.max(1))
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(TestSuiteResult {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a single scenario in its own session; never fails, errors land
    /// in the result
    pub async fn run_spec(&self, spec: &ScenarioSpec) -> TestResult {
        let start = Instant::now();
        let stamp = FixtureStamp::unique();
        debug!("Running scenario: {} (stamp {})", spec.name, stamp);

        let result = self.run_stamped(spec, stamp).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (steps, error) = match result {
            Ok((steps, error)) => (steps, error),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };
        let success = error.is_none();
        if success {
            info!("✓ {} ({} ms)", spec.name, duration_ms);
        } else {
            error!(
                "✗ {} - {}",
                spec.name,
                error.as_deref().unwrap_or("unknown error")
            );
        }

        TestResult {
            name: spec.name.clone(),
            success,
            duration_ms,
            stamp: stamp.millis(),
            steps,
            error,
        }
    }

    async fn run_stamped(
        &self,
        spec: &ScenarioSpec,
        stamp: FixtureStamp,
    ) -> E2eResult<(Vec<StepResult>, Option<String>)> {
        let spec = spec.stamped(stamp)?;
        let page = self.factory.open(&spec.name).await?;
        let session = Session::new(page.clone(), self.config.clone(), self.events.clone());
        let mut flow = Flow::new(session);

        let mut step_results = Vec::new();
        let mut test_error: Option<String> = None;

        for (index, step) in spec.steps.iter().enumerate() {
            let step_start = Instant::now();
            let outcome = execute_step(&mut flow, step).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(detail) => step_results.push(StepResult {
                    action: step.name().to_string(),
                    success: true,
                    duration_ms,
                    detail,
                    error: None,
                    screenshot_path: None,
                }),
                Err(e) => {
                    let screenshot_path = self
                        .capture_failure(page.as_ref(), &spec.name, index, step.name())
                        .await;
                    test_error = Some(format!("{}: {}", step.name(), e));
                    step_results.push(StepResult {
                        action: step.name().to_string(),
                        success: false,
                        duration_ms,
                        detail: None,
                        error: Some(e.to_string()),
                        screenshot_path,
                    });
                    break; // Stop on first failure
                }
            }
        }

        if test_error.is_none() {
            if let Err(e) = flow.finish() {
                test_error = Some(e.to_string());
            }
        }
        debug!("Scenario {} ended in state {}", spec.name, flow.state());

        if let Err(e) = page.close().await {
            warn!("Closing session for {} failed: {}", spec.name, e);
        }

        Ok((step_results, test_error))
    }

    async fn capture_failure(
        &self,
        page: &dyn Page,
        scenario: &str,
        index: usize,
        action: &str,
    ) -> Option<PathBuf> {
        if !self.config.runner.screenshot_on_failure {
            return None;
        }
        let dir = self.config.runner.output_dir.join("screenshots");
        let path = dir.join(format!("{}-{:02}-{}.png", file_safe(scenario), index, action));
        let written = async {
            let png = page.screenshot().await?;
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&path, png)?;
            Ok::<(), E2eError>(())
        }
        .await;
        match written {
            Ok(()) => {
                info!("Failure screenshot: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not capture failure screenshot: {}", e);
                None
            }
        }
    }

    /// Write suite results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let output_dir = &self.config.runner.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_safe_names() {
        assert_eq!(file_safe("new client/booking"), "new-client-booking");
    }

    #[test]
    fn test_describe_resolution() {
        let created = Resolution::Created {
            kind: vetprobe_common::EntityKind::Patient,
            key: "Rex".into(),
            message: "Patient saved".into(),
        };
        assert_eq!(describe(&created), "created patient 'Rex': Patient saved");
        let found = Resolution::Resolved {
            kind: vetprobe_common::EntityKind::Contact,
            key: "Smith, John".into(),
        };
        assert_eq!(describe(&found), "found contact 'Smith, John'");
    }
}
