use super::error::{self, ClientResult};
use crate::provider::{ErrorCode, ProviderError, Spec};
use crate::BootstrapData;
use log::info;
use machine_model::{Configuration, MachineAction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::ResultExt;
use std::io::Write;

/// `AgentClient` allows the [`Agent`] to obtain the machine class it works against and to report
/// the outcome of the operation to the controller.
///
/// This is provided as a trait so that mock implementations can be injected into the [`Agent`] for
/// testing purposes. In practice you will use the [`DefaultAgentClient`].
///
#[async_trait::async_trait]
pub trait AgentClient: Sized + Send + Sync {
    /// Create a new `AgentClient`.
    async fn new(data: BootstrapData) -> ClientResult<Self>;

    /// If there is a problem before the driver runs, this will be used to send the error.
    async fn send_init_error(&self, action: MachineAction, error: &str) -> ClientResult<()>;

    /// Get the machine class that the driver should work against.
    async fn get_spec<Config>(&self) -> ClientResult<Spec<Config>>
    where
        Config: Configuration;

    /// Notify the controller that the operation is starting.
    async fn send_starting(&self) -> ClientResult<()>;

    /// Notify the controller that the operation succeeded and provide its result.
    async fn send_succeeded<R>(&self, result: R) -> ClientResult<()>
    where
        R: Configuration;

    /// Notify the controller that the operation failed and provide an error message.
    async fn send_failed(&self, error: &ProviderError) -> ClientResult<()>;
}

/// Whether or not the operation succeeded.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStatus {
    Succeeded,
    Failed,
}

/// The error part of an [`AgentReport`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedError {
    /// `None` when the agent failed before the driver could run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

/// The document that the [`DefaultAgentClient`] writes to stdout once the operation is over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub action: MachineAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportedError>,
}

/// Provides the default [`AgentClient`] implementation. The machine class is read from the
/// provider spec file and reports are written to stdout as a single line of JSON.
#[derive(Clone, Debug)]
pub struct DefaultAgentClient {
    data: BootstrapData,
}

impl DefaultAgentClient {
    fn report(&self, status: ReportStatus) -> AgentReport {
        AgentReport {
            action: self.data.action,
            machine_name: self.data.machine_name.clone(),
            status,
            result: None,
            error: None,
        }
    }

    fn write_report(&self, report: &AgentReport) -> ClientResult<()> {
        let json = serde_json::to_string(report).context(error::SerializeReportSnafu)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", json)
            .and_then(|_| handle.flush())
            .context(error::WriteReportSnafu)
    }
}

#[async_trait::async_trait]
impl AgentClient for DefaultAgentClient {
    async fn new(data: BootstrapData) -> ClientResult<Self> {
        Ok(Self { data })
    }

    async fn send_init_error(&self, action: MachineAction, error: &str) -> ClientResult<()> {
        let mut report = self.report(ReportStatus::Failed);
        report.action = action;
        report.error = Some(ReportedError {
            code: None,
            message: error.to_string(),
        });
        self.write_report(&report)
    }

    async fn get_spec<Config>(&self) -> ClientResult<Spec<Config>>
    where
        Config: Configuration,
    {
        let path = &self.data.provider_spec_path;
        let configuration = Config::from_path(path).context(error::ReadSpecSnafu { path })?;
        Ok(Spec {
            configuration,
            secret_name: self.data.secret_name.clone(),
        })
    }

    async fn send_starting(&self) -> ClientResult<()> {
        match &self.data.machine_name {
            Some(name) => info!("Starting '{}' for machine '{}'", self.data.action, name),
            None => info!("Starting '{}'", self.data.action),
        }
        Ok(())
    }

    async fn send_succeeded<R>(&self, result: R) -> ClientResult<()>
    where
        R: Configuration,
    {
        let mut report = self.report(ReportStatus::Succeeded);
        report.result = Some(result.into_value().context(error::SerializeResultSnafu {
            action: self.data.action,
        })?);
        self.write_report(&report)
    }

    async fn send_failed(&self, error: &ProviderError) -> ClientResult<()> {
        let mut report = self.report(ReportStatus::Failed);
        report.error = Some(ReportedError {
            code: Some(error.code()),
            message: error.to_string(),
        });
        self.write_report(&report)
    }
}

#[test]
fn report_shape() {
    let report = AgentReport {
        action: MachineAction::Status,
        machine_name: Some("machine-1".to_string()),
        status: ReportStatus::Failed,
        result: None,
        error: Some(ReportedError {
            code: Some(ErrorCode::NotFound),
            message: "machine 'machine-1' not found".to_string(),
        }),
    };
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        serde_json::json!({
            "action": "status",
            "machineName": "machine-1",
            "status": "failed",
            "error": {"code": "notFound", "message": "machine 'machine-1' not found"}
        })
    );
}
