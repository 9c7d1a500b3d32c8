use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process...");
        self.monitor.log_stats("Start");

        tracing::info!("Extracting data...");
        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} rows ({} columns)",
            dataset.len(),
            dataset.columns.len()
        );
        self.monitor.log_stats("Extract");

        tracing::info!("Transforming data...");
        let report = self.pipeline.transform(dataset).await?;
        tracing::info!(
            "Transformed {} rows, {} charts",
            report.cleaned.len(),
            report.charts.len()
        );
        self.monitor.log_stats("Transform");

        tracing::info!("Loading data...");
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
