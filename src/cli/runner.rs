//! Runner wiring configuration, transport and orchestrator together

use crate::cli::args::{Args, OutputFormat};
use crate::config::Credentials;
use crate::error::{PublishError, Result};
use crate::logging::Logger;
use crate::orchestrator::{Orchestrator, PlannedAction, PublishPlan};
use crate::outcome::RunReport;
use crate::transport::build_transport;

pub struct Runner {
    args: Args,
    logger: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        // JSON output owns stdout, so progress lines are silenced
        let logger = if args.quiet || args.output == OutputFormat::Json {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };
        Self { args, logger }
    }

    /// Run to completion and return the process exit code
    pub async fn run(&self) -> i32 {
        match self.execute().await {
            Ok(code) => code,
            Err(e) => {
                self.logger.error(&e.to_string());
                if let PublishError::AuthMissing = e {
                    self.logger.info("Set GITHUB_TOKEN (or GH_TOKEN) to a token with contents:write on the repository");
                }
                if e.is_fatal() {
                    self.logger.info("Run aborted, no release assets were changed");
                }
                1
            }
        }
    }

    async fn execute(&self) -> Result<i32> {
        self.logger.section("Release Asset Pusher");

        let config = self.args.to_config()?;
        config.validate()?;

        self.logger.summary_kv(
            "Target",
            &[
                ("Repository", format!("{}/{}", config.owner, config.repository)),
                ("Tag", config.tag.clone()),
                ("Files", config.assets.len().to_string()),
                ("Concurrency", config.concurrency.to_string()),
            ],
        );

        let credentials = Credentials::from_env();
        if credentials.is_present() {
            self.logger.step("API token found");
        }

        let transport = build_transport(&config, credentials, self.logger.clone())?;
        self.logger.verbose(&format!("Using {} transport", transport.name()));
        let orchestrator = Orchestrator::new(config, transport, self.logger.clone());

        if self.args.dry_run {
            let plan = orchestrator.plan().await?;
            self.print_plan(&plan)?;
            return Ok(0);
        }

        let report = orchestrator.run().await?;
        self.print_report(&report, orchestrator.config().release_page_url())?;
        Ok(report.exit_code())
    }

    fn print_plan(&self, plan: &PublishPlan) -> Result<()> {
        if self.args.output == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(plan)?);
            return Ok(());
        }

        let items: Vec<String> = plan
            .uploads
            .iter()
            .map(|upload| match &upload.action {
                PlannedAction::Create => format!(
                    "{} ({}) would be created",
                    upload.name,
                    self.logger.format_size(upload.local_size)
                ),
                PlannedAction::Replace { asset_id, remote_size } => format!(
                    "{} ({}) would replace asset {} ({})",
                    upload.name,
                    self.logger.format_size(upload.local_size),
                    asset_id,
                    self.logger.format_size(*remote_size)
                ),
            })
            .collect();
        self.logger.summary(&format!("Dry run for release {}", plan.release.name), &items);
        Ok(())
    }

    fn print_report(&self, report: &RunReport, fallback_page_url: String) -> Result<()> {
        if self.args.output == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(report)?);
            return Ok(());
        }

        self.logger.summary("Upload Results", &report.summary_lines());

        if report.is_success() {
            self.logger.success(&format!(
                "All files uploaded successfully in {} (total {})",
                self.logger.format_duration(report.elapsed),
                self.logger.format_duration(self.logger.elapsed())
            ));
            let page = report.release.html_url.clone().unwrap_or(fallback_page_url);
            self.logger.info(&format!("🌐 Release URL: {}", page));
        } else {
            self.logger.error(&format!(
                "Only {}/{} files uploaded successfully",
                report.succeeded(),
                report.total()
            ));
        }
        Ok(())
    }
}
