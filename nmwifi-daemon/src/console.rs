use async_trait::async_trait;
use nmwifi_core::traits::Presenter;
use nmwifi_core::{Error, Network, ObjectId};
use std::io::{self, BufRead, Write};

/// Terminal rendering of the network list and password prompt.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl ConsolePresenter {
    pub fn new() -> Self {
        Self
    }
}

fn bars(bucket: u8) -> &'static str {
    match bucket {
        0 => "____",
        25 => "▂___",
        50 => "▂▄__",
        75 => "▂▄▆_",
        100 => "▂▄▆█",
        // `strength_bucket` only yields multiples of 25.
        _ => "????",
    }
}

/// Reads one line from stdin off the async runtime.
async fn read_line(prompt: String) -> io::Result<String> {
    tokio::task::spawn_blocking(move || {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok::<_, io::Error>(line.trim().to_string())
    })
    .await
    .map_err(io::Error::other)?
}

#[async_trait]
impl Presenter for ConsolePresenter {
    async fn render_network_list(&self, networks: &[Network]) {
        if networks.is_empty() {
            println!("📡 No networks found.");
            return;
        }
        for (i, network) in networks.iter().enumerate() {
            println!(
                "{:>3}  {:<5} {:>3}%  {:<14} {}{}",
                i + 1,
                bars(network.bucket),
                network.strength,
                network.security.to_string(),
                network.name,
                if network.connected { "  (connected)" } else { "" },
            );
        }
    }

    async fn render_no_adapter(&self) {
        println!("❌ No wireless adapter found on this host.");
    }

    async fn choose_network(&self, networks: &[Network]) -> Option<Network> {
        if networks.is_empty() {
            return None;
        }
        let prompt = format!("Select network [1-{}], empty to quit: ", networks.len());
        let answer = match read_line(prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read selection");
                return None;
            }
        };
        let index = answer.parse::<usize>().ok()?.checked_sub(1)?;
        networks.get(index).cloned()
    }

    async fn prompt_for_password(&self, ssid: &[u8]) -> nmwifi_core::Result<String> {
        let prompt = format!("🔑 Password for '{}': ", String::from_utf8_lossy(ssid));
        let password = tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt))
            .await
            .map_err(io::Error::other)??;
        Ok(password)
    }

    async fn report_connected(&self, profile: &ObjectId) {
        println!("✅ Connection profile created: {}", profile);
    }

    async fn report_error(&self, error: &Error) {
        match error {
            Error::ServiceUnavailable(_) => {
                println!("❌ NetworkManager is not running or not reachable ({}).", error)
            }
            Error::NotFound => self.render_no_adapter().await,
            _ => println!("❌ {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_fill_one_cell_per_quarter() {
        let filled: Vec<usize> = [0, 25, 50, 75, 100]
            .into_iter()
            .map(|bucket| bars(bucket).chars().filter(|c| *c != '_').count())
            .collect();
        assert_eq!(filled, vec![0, 1, 2, 3, 4]);
        assert!([0, 25, 50, 75, 100].iter().all(|b| bars(*b).chars().count() == 4));
    }
}
