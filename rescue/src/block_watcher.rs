use crate::l1::ChainHead;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Heads closer than this to the last published one are not republished.
pub const REPUBLISH_DISTANCE: u64 = 5;

pub fn should_publish(last_published: Option<u64>, head: u64) -> bool {
    match last_published {
        None => true,
        Some(last) => head > last.saturating_add(REPUBLISH_DISTANCE),
    }
}

/// Polls the chain head and publishes it for observers.
pub struct BlockWatcher<H: ChainHead> {
    head: Arc<H>,
    poll_interval: Duration,
    sender: watch::Sender<Option<u64>>,
    cancel_token: CancellationToken,
}

impl<H: ChainHead> BlockWatcher<H> {
    pub fn new(
        head: Arc<H>,
        poll_interval: Duration,
        cancel_token: CancellationToken,
    ) -> (Self, watch::Receiver<Option<u64>>) {
        let (sender, receiver) = watch::channel(None);
        (
            Self {
                head,
                poll_interval,
                sender,
                cancel_token,
            },
            receiver,
        )
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    debug!("Block watcher stopped");
                    return;
                }
                _ = interval.tick() => {}
            }

            match self.head.block_number().await {
                Ok(head) => {
                    self.sender.send_if_modified(|last| {
                        if should_publish(*last, head) {
                            *last = Some(head);
                            true
                        } else {
                            false
                        }
                    });
                }
                Err(e) => warn!("Block watcher failed to read head: {}", e),
            }
        }
    }
}
