use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::network::ApiClient;

/// One row of the unread-messages dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub sender_id: i64,
    pub sender_name: String,
    pub message: String,
    pub read: bool,
    /// Chat page with the sender.
    pub link: String,
}

/// Which backend list the feed is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// `GET /unread_messages`
    Unread,
    /// `GET /messages`
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFeed {
    pub unread_count: usize,
    pub entries: Vec<Notification>,
}

/// Fetch messages and resolve sender names, one profile request per
/// distinct sender. Entries keep the server's order.
pub async fn load_notifications(api: &ApiClient, source: FeedSource) -> Result<NotificationFeed> {
    let messages = match source {
        FeedSource::Unread => api.unread_messages().await?,
        FeedSource::All => api.messages().await?,
    };

    let mut seen = HashSet::new();
    let senders: Vec<i64> = messages
        .iter()
        .map(|message| message.sender_id)
        .filter(|sender_id| seen.insert(*sender_id))
        .collect();

    let lookups = join_all(senders.iter().map(|&sender_id| async move {
        (sender_id, api.user_profile(sender_id).await)
    }))
    .await;

    let names: HashMap<i64, String> = lookups
        .into_iter()
        .map(|(sender_id, profile)| match profile {
            Ok(profile) => (sender_id, profile.display_name()),
            Err(err) => {
                log::warn!("Could not resolve sender {sender_id}: {err}");
                (sender_id, format!("User {sender_id}"))
            }
        })
        .collect();

    let entries: Vec<Notification> = messages
        .into_iter()
        .map(|message| Notification {
            sender_id: message.sender_id,
            sender_name: names
                .get(&message.sender_id)
                .cloned()
                .unwrap_or_else(|| format!("User {}", message.sender_id)),
            message: message.message,
            read: message.read,
            link: format!("/message/{}", message.sender_id),
        })
        .collect();

    Ok(NotificationFeed {
        unread_count: entries.iter().filter(|entry| !entry.read).count(),
        entries,
    })
}

/// Refresh the feed every `interval` until the receiver goes away.
pub fn spawn_poller(
    api: ApiClient,
    interval: Duration,
    feed_sender: mpsc::Sender<NotificationFeed>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match load_notifications(&api, FeedSource::Unread).await {
                Ok(feed) => {
                    if feed_sender.send(feed).await.is_err() {
                        break;
                    }
                }
                Err(err) => log::warn!("Notification poll failed: {err}"),
            }
        }
        log::debug!("Notification poller stopped");
    })
}
