use machine_agent::clients::{
    AgentClient, AgentReport, ClientResult, ReportStatus, ReportedError,
};
use machine_agent::provider::{ProviderError, Spec};
use machine_agent::{BootstrapData, Configuration, MachineAction};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use super::MockConfig;

/// Reports sent by every [`MockAgentClient`], keyed by machine name so that tests running in
/// parallel do not see each other's reports.
fn reports() -> &'static Mutex<HashMap<String, Vec<AgentReport>>> {
    static REPORTS: OnceLock<Mutex<HashMap<String, Vec<AgentReport>>>> = OnceLock::new();
    REPORTS.get_or_init(Default::default)
}

/// Returns the reports that were sent for `machine_name`.
pub(crate) fn sent_reports(machine_name: &str) -> Vec<AgentReport> {
    reports()
        .lock()
        .unwrap()
        .get(machine_name)
        .cloned()
        .unwrap_or_default()
}

/// Create an [`AgentClient`] that keeps reports in memory so that we can test without writing to
/// stdout or reading spec files.
pub(crate) struct MockAgentClient {
    data: BootstrapData,
}

impl MockAgentClient {
    fn record(&self, report: AgentReport) {
        let key = self.data.machine_name.clone().unwrap_or_default();
        reports()
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push(report);
    }
}

#[async_trait::async_trait]
impl AgentClient for MockAgentClient {
    async fn new(data: BootstrapData) -> ClientResult<Self> {
        Ok(Self { data })
    }

    async fn send_init_error(&self, action: MachineAction, error: &str) -> ClientResult<()> {
        self.record(AgentReport {
            action,
            machine_name: self.data.machine_name.clone(),
            status: ReportStatus::Failed,
            result: None,
            error: Some(ReportedError {
                code: None,
                message: error.to_string(),
            }),
        });
        Ok(())
    }

    async fn get_spec<Config>(&self) -> ClientResult<Spec<Config>>
    where
        Config: Configuration,
    {
        let configuration = Config::from_value(
            MockConfig {
                datacenter: "dc1".to_string(),
            }
            .into_value()
            .unwrap(),
        )
        .unwrap();
        Ok(Spec {
            configuration,
            secret_name: self.data.secret_name.clone(),
        })
    }

    async fn send_starting(&self) -> ClientResult<()> {
        Ok(())
    }

    async fn send_succeeded<R>(&self, result: R) -> ClientResult<()>
    where
        R: Configuration,
    {
        self.record(AgentReport {
            action: self.data.action,
            machine_name: self.data.machine_name.clone(),
            status: ReportStatus::Succeeded,
            result: Some(result.into_value().unwrap()),
            error: None,
        });
        Ok(())
    }

    async fn send_failed(&self, error: &ProviderError) -> ClientResult<()> {
        self.record(AgentReport {
            action: self.data.action,
            machine_name: self.data.machine_name.clone(),
            status: ReportStatus::Failed,
            result: None,
            error: Some(ReportedError {
                code: Some(error.code()),
                message: error.to_string(),
            }),
        });
        Ok(())
    }
}
