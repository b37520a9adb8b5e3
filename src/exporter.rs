use crate::{
    catalog::Family,
    gatherer::{
        GatherContext,
        Gatherer,
    },
    sink::{
        Sample,
        SampleSink,
    },
};
use bastion_api_client::{
    BastionClient,
    ClientConfig,
    Credentials,
};
use bastion_exporter_config::Config;
use eyre::WrapErr as _;
use futures::future::join_all;

pub const USER_AGENT: &str = "prometheus_exporter_wallix_bastion";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The API could not be reached or refused the credentials. Only `up` was emitted.
    Failed,
    /// Logged in and ran every gatherer. Some of them may have failed individually.
    Done { failed_families: usize },
}

/// Runs one scrape of the bastion per call. Nothing is kept between scrapes: every call logs in with a fresh
/// client and cookie jar.
#[derive(Debug)]
pub struct Exporter {
    client_config: ClientConfig,
    base_url: String,
    credentials: Credentials,
    sessions_closed_window: chrono::Duration,
}

impl Exporter {
    pub fn new(config: &Config) -> eyre::Result<Self> {
        let sessions_closed_window =
            chrono::Duration::from_std(config.sessions_closed_window).wrap_err("sessions closed window too large")?;

        Ok(Self {
            client_config: ClientConfig {
                timeout: config.timeout,
                skip_verify: config.skip_verify,
                user_agent: USER_AGENT.to_string(),
            },
            base_url: config.scrape_base().to_string(),
            credentials: Credentials::new(&config.wallix_username, config.wallix_password.expose()),
            sessions_closed_window,
        })
    }

    #[instrument(level = "debug", skip_all, fields(base_url = %self.base_url))]
    pub async fn scrape(&self, sink: &SampleSink) -> ScrapeOutcome {
        debug!("scrape started");
        let client = match BastionClient::new(&self.client_config, &self.base_url) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "cannot build the HTTP client");
                sink.emit(Sample::new(Family::Up, 0.0));
                return ScrapeOutcome::Failed;
            }
        };

        if let Err(e) = client.authenticate(&self.credentials).await {
            error!(error = %e, "cannot authenticate to the bastion");
            sink.emit(Sample::new(Family::Up, 0.0));
            return ScrapeOutcome::Failed;
        }
        sink.emit(Sample::new(Family::Up, 1.0));

        let ctx = GatherContext {
            client: &client,
            sink,
            sessions_closed_window: self.sessions_closed_window,
        };
        let results = join_all(Gatherer::all().into_iter().map(|gatherer| gatherer.run(ctx))).await;
        let failed_families = results.iter().filter(|ok| !**ok).count();

        debug!(gatherers = results.len(), failed_families, "scrape done");
        ScrapeOutcome::Done { failed_families }
    }
}
