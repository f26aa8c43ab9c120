//! Subcommand implementations

use anyhow::Context;
use fitshare_client::{
    parse_time_minutes, ClientError, Config, FeedService, FitShareClient, LocalStores,
    NewsContent, ProvisionedDevice, Provisioner, ProvisioningOrigin, ReceivedFeedItem,
    SportCategory,
};
use std::sync::Arc;
use tracing::warn;

/// A logged-in user on this device
pub struct Session {
    user: String,
    client: Arc<FitShareClient>,
    stores: LocalStores,
    device: Option<ProvisionedDevice>,
}

impl Session {
    /// Run the login-time provisioning flow
    ///
    /// A rejected registration still yields a session, the feed is then
    /// shown without decryption.
    pub async fn login(config: Config, user: &str) -> anyhow::Result<Self> {
        let client = Arc::new(FitShareClient::new(config.clone())?);
        let stores = LocalStores::open_or_memory(&config).await;
        if let Some(notice) = storage_notice(&config, &stores) {
            eprintln!("{}", notice);
        }

        let provisioner = Provisioner::new(
            client.clone(),
            stores.clone(),
            client.session().clone(),
            config.key_bits,
        );

        let device = match provisioner.provision(user).await {
            Ok(device) => {
                if let Some(warning) = device.needs_warning() {
                    if stores.is_durable() {
                        eprintln!("{}", warning.user_message());
                    }
                }
                Some(device)
            }
            Err(e @ ClientError::RegistrationRejected { .. }) => {
                warn!(error = %e, "continuing without a device key");
                eprintln!("{}", e.user_message());
                None
            }
            Err(e) => {
                eprintln!("{}", e.user_message());
                return Err(e).context("device provisioning failed");
            }
        };

        Ok(Self {
            user: user.to_string(),
            client,
            stores,
            device,
        })
    }

    fn feed(&self) -> FeedService<FitShareClient> {
        FeedService::new(self.client.clone(), self.stores.clone())
    }
}

/// Notification for a data directory that was configured but could not be opened
fn storage_notice(config: &Config, stores: &LocalStores) -> Option<&'static str> {
    (config.data_dir.is_some() && !stores.is_durable())
        .then(|| ClientError::StorageUnavailable(String::new()).user_message())
}

pub fn provision(session: &Session) -> anyhow::Result<()> {
    let device = session
        .device
        .as_ref()
        .context("this device could not be provisioned")?;

    let how = match device.origin {
        ProvisioningOrigin::Reused => "reused",
        ProvisioningOrigin::Generated => "registered",
    };
    println!(
        "device {} {} for {}{}",
        device.identity.device_id,
        how,
        device.identity.fs_user_id,
        if device.durable { "" } else { " (this session only)" }
    );
    Ok(())
}

pub async fn post(
    session: &Session,
    category: &str,
    content: String,
    kcal: u32,
    time: &str,
    distance: f64,
) -> anyhow::Result<()> {
    let category: SportCategory = category.parse()?;
    let post = NewsContent::new(category, content, kcal, parse_time_minutes(time)?).with_distance(distance);

    let report = session
        .feed()
        .publish(&post.to_plaintext()?)
        .await
        .inspect_err(|e| eprintln!("{}", e.user_message()))?;

    println!(
        "posted {} to {} friend(s)",
        report.reference_news_id,
        report.delivered.len()
    );
    for failure in &report.failures {
        eprintln!("could not share with {}: {}", failure.fs_user_id, failure.error);
    }
    Ok(())
}

pub async fn feed(session: &Session, published: bool, json: bool) -> anyhow::Result<()> {
    let session_key = session.device.as_ref().and_then(|d| d.session_key.as_ref());
    let service = session.feed();
    let items = if published {
        service.published(&session.user, session_key).await
    } else {
        service.received(&session.user, session_key).await
    }
    .inspect_err(|e| eprintln!("{}", e.user_message()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("no posts yet");
    }
    for item in &items {
        println!("{}", render(item));
    }
    Ok(())
}

fn render(item: &ReceivedFeedItem) -> String {
    let who = item
        .publisher_username
        .as_deref()
        .unwrap_or(&item.publisher_fs_user_id);

    match NewsContent::from_plaintext(&item.data) {
        Ok(post) => {
            let mut line = format!(
                "[{}] {}: {} {}min {}kcal",
                item.created_at, who, post.category, post.time, post.kcal
            );
            if post.distance > 0.0 {
                line.push_str(&format!(" {:.2}km", post.distance));
            }
            if !post.content.is_empty() {
                line.push_str(&format!(" - {}", post.content));
            }
            line
        }
        Err(_) => format!("[{}] {}: <encrypted> {}", item.created_at, who, item.data),
    }
}
