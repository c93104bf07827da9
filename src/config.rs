use anyhow::{bail, Context};
use clap::{Args, ValueEnum};

use crate::grades::MAX_GRADE;
use crate::risk::RiskPolicy;
use crate::stats::DEFAULT_PASS_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsConfig {
    pub pass_threshold: f64,
    pub risk_policy: RiskPolicy,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            risk_policy: RiskPolicy::PassThreshold,
        }
    }
}

impl AnalyticsConfig {
    pub fn risk_threshold(&self) -> f64 {
        self.risk_policy.threshold(self.pass_threshold)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ThresholdArgs {
    /// Minimum grade counted as passing
    #[arg(long, default_value_t = DEFAULT_PASS_THRESHOLD)]
    pub pass_threshold: f64,
    /// Flag students below this grade; defaults to the pass threshold
    #[arg(long)]
    pub risk_threshold: Option<f64>,
}

impl TryFrom<&ThresholdArgs> for AnalyticsConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ThresholdArgs) -> anyhow::Result<Self> {
        check_threshold("pass threshold", args.pass_threshold)?;
        let risk_policy = match args.risk_threshold {
            Some(value) => {
                check_threshold("risk threshold", value)?;
                RiskPolicy::Custom(value)
            }
            None => RiskPolicy::PassThreshold,
        };

        Ok(Self {
            pass_threshold: args.pass_threshold,
            risk_policy,
        })
    }
}

fn check_threshold(name: &str, value: f64) -> anyhow::Result<()> {
    if !value.is_finite() || value <= 0.0 || value > MAX_GRADE {
        bail!("{name} must be above 0 and at most {MAX_GRADE}, got {value}");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Postgres enrollment store (DATABASE_URL)
    Db,
    /// REST backend (GRADES_API_URL)
    Api,
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Where enrollments are read from
    #[arg(long, value_enum, default_value_t = SourceKind::Db)]
    pub source: SourceKind,
    /// Base URL of the REST backend
    #[arg(long, env = "GRADES_API_URL")]
    pub api_url: Option<String>,
    /// Bearer token for the REST backend
    #[arg(long, env = "GRADES_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

pub fn database_url() -> anyhow::Result<String> {
    std::env::var("DATABASE_URL").context("DATABASE_URL must be set to a Postgres instance")
}
