use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::InstallerConfig;

/// Builds the client every outbound request goes through, carrying the
/// installer's user agent.
pub fn build_client(config: &InstallerConfig) -> reqwest::Result<Client> {
    Client::builder().user_agent(config.user_agent()).build()
}

pub async fn get_json<T>(client: &Client, url: &str) -> reqwest::Result<T>
where
    T: DeserializeOwned,
{
    log::debug!("Requesting {}", url);
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}
