use crate::Command;
use crate::console::ConsolePresenter;
use anyhow::Context;
use nmwifi_core::traits::{Presenter, RemoteCallClient};
use nmwifi_core::{NetworkListing, ServiceConfig, WifiController, web_server};
use std::process::ExitCode;
use std::sync::Arc;

// --- 1. 选择后端实现 ---
#[cfg(feature = "backend_nmdbus")]
fn create_client(config: Arc<ServiceConfig>) -> Arc<dyn RemoteCallClient> {
    tracing::info!("🚀 Using NetworkManager D-Bus backend");
    use nmwifi_core::backends::nmdbus::NmDbusClient;
    Arc::new(NmDbusClient::new(config))
}

#[cfg(all(feature = "backend_mock", not(feature = "backend_nmdbus")))]
fn create_client(_config: Arc<ServiceConfig>) -> Arc<dyn RemoteCallClient> {
    tracing::info!("🤖 Using mock backend");
    use nmwifi_core::backends::mock::MockNetworkManager;
    Arc::new(MockNetworkManager::demo())
}

// 如果没有选择任何后端，编译失败
#[cfg(not(any(feature = "backend_nmdbus", feature = "backend_mock")))]
compile_error!("No backend feature selected. Please choose one, e.g., --features nmwifi-daemon/backend_nmdbus");

/// Dispatches one CLI command against a freshly built controller.
pub async fn run(config: Arc<ServiceConfig>, command: Command) -> anyhow::Result<ExitCode> {
    let controller = Arc::new(WifiController::new(create_client(config.clone()), config));
    dispatch(controller, &ConsolePresenter::new(), command).await
}

/// Errors shown through `presenter` turn into a failing exit status; only
/// the ones it never saw are returned for `main` to print.
async fn dispatch(
    controller: Arc<WifiController>,
    presenter: &dyn Presenter,
    command: Command,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::List => match controller.show_networks().await {
            Ok(NetworkListing::Networks(networks)) => {
                presenter.render_network_list(&networks).await;
            }
            Ok(NetworkListing::NoAdapter) => presenter.render_no_adapter().await,
            Err(e) => {
                presenter.report_error(&e).await;
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Connect { ssid, password } => {
            let password = match password {
                Some(password) => password,
                None => presenter.prompt_for_password(ssid.as_bytes()).await?,
            };
            match controller.connect(ssid.as_bytes(), &password).await {
                Ok(path) => presenter.report_connected(&path).await,
                Err(e) => {
                    presenter.report_error(&e).await;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Interactive => {
            if controller.run_interactive(presenter).await.is_err() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Serve { bind } => {
            let addr = bind.unwrap_or(controller.config().bind_addr);
            web_server::start_web_server(controller, addr)
                .await
                .context("web server task panicked")??;
        }
    }
    Ok(ExitCode::SUCCESS)
}
