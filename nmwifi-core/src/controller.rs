use crate::access_points::AccessPointRepository;
use crate::active::ActiveConnectionResolver;
use crate::adapter::AdapterLocator;
use crate::assemble::assemble;
use crate::config::ServiceConfig;
use crate::profile::ConnectionProfileBuilder;
use crate::scan::ScanRequester;
use crate::structs::{Network, ObjectId, Security};
use crate::traits::{Presenter, RemoteCallClient};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Outcome of the "show networks" use case.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkListing {
    /// The host has no wireless adapter; nothing can be listed this session.
    NoAdapter,
    Networks(Vec<Network>),
}

/// Sequences the components for the "show networks" and "connect" use cases.
///
/// Each use case is a strict chain of awaited remote calls. A new
/// [`show_networks`](Self::show_networks) supersedes one still in flight.
pub struct WifiController {
    client: Arc<dyn RemoteCallClient>,
    config: Arc<ServiceConfig>,
    in_flight: Mutex<CancellationToken>,
}

impl WifiController {
    pub fn new(client: Arc<dyn RemoteCallClient>, config: Arc<ServiceConfig>) -> Self {
        Self {
            client,
            config,
            in_flight: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Locate adapter → request scan → list access points → resolve the
    /// active one → assemble. Returns [`Error::Cancelled`] if a newer call
    /// started before this one finished.
    pub async fn show_networks(&self) -> Result<NetworkListing> {
        let token = self.supersede();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("network listing superseded");
                Err(Error::Cancelled)
            }
            result = self.collect_networks() => result,
        }
    }

    /// Installs a fresh token for this invocation and cancels the previous one.
    fn supersede(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *current, token.clone());
        previous.cancel();
        token
    }

    async fn collect_networks(&self) -> Result<NetworkListing> {
        let client = self.client.as_ref();
        let config = self.config.as_ref();

        let adapter = match AdapterLocator::new(client, config).find_wireless_adapter().await {
            Ok(adapter) => adapter,
            Err(Error::NotFound) => {
                tracing::warn!("no wireless adapter present");
                return Ok(NetworkListing::NoAdapter);
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = ScanRequester::new(client).request_scan(&adapter).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(adapter = %adapter, error = %e, "scan request failed, using cached results");
        }

        let access_points = AccessPointRepository::new(client, config)
            .list_access_points(&adapter)
            .await?;
        let (active, active_ssid) = self.resolve_active(&adapter).await?;

        let networks = assemble(access_points, active.as_ref(), &active_ssid);
        tracing::info!(
            count = networks.len(),
            connected = networks.iter().any(|n| n.connected),
            "network list assembled"
        );
        Ok(NetworkListing::Networks(networks))
    }

    /// Failing reads here only cost the "connected" marker.
    async fn resolve_active(&self, adapter: &ObjectId) -> Result<(Option<ObjectId>, Vec<u8>)> {
        let resolver = ActiveConnectionResolver::new(self.client.as_ref(), self.config.as_ref());

        let active = match resolver.active_access_point(adapter).await {
            Ok(active) => active,
            Err(e) if e.is_skippable() => {
                tracing::warn!(adapter = %adapter, error = %e, "cannot read active access point");
                None
            }
            Err(e) => return Err(e),
        };
        let Some(path) = active else {
            return Ok((None, Vec::new()));
        };

        match resolver.active_ssid(&path).await {
            Ok(ssid) => Ok((Some(path), ssid)),
            Err(e) if e.is_skippable() => {
                tracing::warn!(path = %path, error = %e, "cannot read active SSID");
                Ok((Some(path), Vec::new()))
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a WPA-PSK profile for `ssid`.
    pub async fn connect(&self, ssid: &[u8], password: &str) -> Result<ObjectId> {
        ConnectionProfileBuilder::new(self.client.as_ref(), self.config.as_ref())
            .connect(ssid, password)
            .await
    }

    pub async fn connect_with_security(
        &self,
        ssid: &[u8],
        security: Security,
        password: &str,
    ) -> Result<ObjectId> {
        ConnectionProfileBuilder::new(self.client.as_ref(), self.config.as_ref())
            .connect_with_security(ssid, security, password)
            .await
    }

    /// One full pass through the UI: list, pick, ask for the key, connect.
    /// Every error returned has already been shown through `presenter`.
    pub async fn run_interactive(&self, presenter: &dyn Presenter) -> Result<()> {
        let networks = match self.show_networks().await {
            Ok(NetworkListing::Networks(networks)) => networks,
            Ok(NetworkListing::NoAdapter) => {
                presenter.render_no_adapter().await;
                return Ok(());
            }
            Err(e) => {
                presenter.report_error(&e).await;
                return Err(e);
            }
        };

        presenter.render_network_list(&networks).await;
        let Some(network) = presenter.choose_network(&networks).await else {
            return Ok(());
        };

        // No point asking for a key we cannot use.
        if network.security != Security::WpaPsk {
            let e = Error::UnsupportedSecurity(network.security);
            presenter.report_error(&e).await;
            return Err(e);
        }

        let password = match presenter.prompt_for_password(&network.ssid).await {
            Ok(password) => password,
            Err(e) => {
                presenter.report_error(&e).await;
                return Err(e);
            }
        };
        match self.connect(&network.ssid, &password).await {
            Ok(path) => {
                presenter.report_connected(&path).await;
                Ok(())
            }
            Err(e) => {
                presenter.report_error(&e).await;
                Err(e)
            }
        }
    }
}
