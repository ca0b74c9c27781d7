//! Risk scores from an external prediction process.
//!
//! Each call spawns the configured program, writes one JSON feature object to
//! its stdin and reads a JSON object with a numeric `score` from its stdout.
//! Any deviation from that exchange is reported as an error; nothing is
//! retried.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub score: f64,
}

#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, features: &Value) -> Result<Prediction>;
}

#[derive(Debug, Clone)]
pub struct ProcessPredictor {
    program: String,
    args: Vec<String>,
}

impl ProcessPredictor {
    pub fn new<P: Into<String>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `program script`, e.g. `python3 ml/predict.py`.
    pub fn script<P: Into<String>, S: Into<String>>(program: P, script: S) -> Self {
        Self::new(program, vec![script.into()])
    }
}

#[async_trait]
impl Predictor for ProcessPredictor {
    async fn predict(&self, features: &Value) -> Result<Prediction> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start prediction process `{}`", self.program))?;

        let payload = serde_json::to_vec(features)?;
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                // The process may exit without reading; its output decides.
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    log::debug!("prediction process closed stdin early");
                }
                Err(err) => return Err(err).context("failed to write prediction input"),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for prediction process")?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::warn!("prediction process stderr: {}", stderr.trim());
        }

        parse_output(&output.stdout, output.status)
    }
}

fn parse_output(stdout: &[u8], status: ExitStatus) -> Result<Prediction> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        bail!("prediction process exited with {} and no output", status);
    }

    let value: Value = serde_json::from_str(text).context("failed to parse prediction output")?;
    if let Some(err) = value.get("error") {
        let reason = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        bail!("prediction failed: {}", reason);
    }
    if !status.success() {
        bail!("prediction process exited with {}", status);
    }

    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("prediction output has no numeric `score`"))?;
    Ok(Prediction { score })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Debt {
    Total(f64),
    Itemized(BTreeMap<String, f64>),
}

impl Debt {
    pub fn total(&self) -> f64 {
        match self {
            Debt::Total(total) => *total,
            Debt::Itemized(items) => items.values().sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub income: f64,
    pub expenses: BTreeMap<String, f64>,
    pub debt: Debt,
    pub savings: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFeatures {
    pub monthly_net: f64,
    pub debt_ratio: f64,
    pub savings_ratio: f64,
}

impl ScoreRequest {
    pub fn features(&self) -> ScoreFeatures {
        let total_expenses: f64 = self.expenses.values().sum();
        let ratio = |amount: f64| if self.income > 0.0 { amount / self.income } else { 0.0 };
        ScoreFeatures {
            monthly_net: self.income - total_expenses,
            debt_ratio: ratio(self.debt.total()),
            savings_ratio: ratio(self.savings),
        }
    }
}

/// Integer score returned by the budget scoring endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundedScore {
    pub score: i64,
}

impl From<Prediction> for RoundedScore {
    fn from(prediction: Prediction) -> Self {
        Self {
            score: prediction.score.round() as i64,
        }
    }
}

/// Yes/No answers per risk factor, sent to the model as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskProfile {
    pub factors: BTreeMap<String, String>,
}

impl RiskProfile {
    /// The fixed sample student used by the dashboard's score card.
    pub fn demo() -> Self {
        let answers = [
            ("name", "Student"),
            ("valid housing contract", "Yes"),
            ("missing payment plan", "No"),
            ("reduced aid", "No"),
            ("SAP warning", "No"),
            ("on-campus job", "Yes"),
            ("work restriction", "Yes"),
            ("late fees", "No"),
            ("meal plan cancellation", "Yes"),
            ("course withdrawal after deadline", "Yes"),
            ("missed financial advising appointments", "Yes"),
            ("dropped gpa", "Yes"),
            ("first-gen student", "Yes"),
            ("transfer student", "No"),
            ("prior emergency aid usage", "Yes"),
            ("student returning from break", "No"),
        ];
        Self {
            factors: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}
