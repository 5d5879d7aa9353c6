//! Peer-pool fan-out and broadcast primitives (spec.md §4.8).
//!
//! `request_entity` races a subset of peers and returns the first
//! validated response, cancelling the rest; `broadcast_entity` fires a
//! message at every given peer without waiting on any of them. Neither
//! primitive knows anything about the entity it is carrying — validation
//! is supplied by the caller, the way the teacher's `BlockSync` leaves
//! block/transaction decoding to its own call sites.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

use meridian_types::app::AccountId;
use meridian_types::config::TransportConfig;

use crate::error::TransportError;

/// Identifies a peer in the pool. Peers are the same accounts that sign
/// blocks and transactions, so no separate network identity namespace is
/// needed.
pub type PeerId = AccountId;

/// The network-facing half of the pool: sends one request or one
/// broadcast message to a single peer. Implementations own the actual
/// connection management (dialing, retries, framing).
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Sends `request` to `peer` and returns its raw response bytes.
    async fn send_request(&self, peer: PeerId, request: Vec<u8>) -> Result<Vec<u8>, TransportError>;

    /// Sends `entity` to `peer` without waiting for any application-level
    /// acknowledgement.
    async fn send_broadcast(&self, peer: PeerId, entity: Vec<u8>) -> Result<(), TransportError>;
}

/// Computes the fan-out subset size per spec.md §4.8:
/// `max(min_peers, ceil(percent * |peers|))`, capped at the pool size.
fn subset_size(peer_count: usize, config: &TransportConfig) -> usize {
    let by_percent = (peer_count as f64 * config.fan_out_percent).ceil() as usize;
    config.fan_out_min_peers.max(by_percent).min(peer_count)
}

/// Picks a random subset of `peers` of the size `subset_size` computes.
/// The selection (and therefore which peer ultimately wins a race) is
/// non-deterministic by design.
fn select_subset(peers: &[PeerId], config: &TransportConfig) -> Vec<PeerId> {
    let size = subset_size(peers.len(), config);
    let mut shuffled: Vec<PeerId> = peers.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    shuffled.truncate(size);
    shuffled
}

/// Fans `request` out to a subset of `peers` and returns the first
/// validated response, cancelling every other in-flight request once a
/// winner is found. Returns [`TransportError::NotFound`] if no peer
/// answers with a valid entity before `request_timeout` elapses.
pub async fn request_entity<V>(
    transport: Arc<dyn PeerTransport>,
    peers: &[PeerId],
    request: &[u8],
    validate: V,
    request_timeout: Duration,
    config: &TransportConfig,
) -> Result<Vec<u8>, TransportError>
where
    V: Fn(&[u8]) -> bool + Send + Sync + 'static,
{
    if peers.is_empty() {
        return Err(TransportError::NoPeers);
    }
    let subset = select_subset(peers, config);
    let validate = Arc::new(validate);
    let concurrency = Arc::new(Semaphore::new(config.fan_out_concurrency.max(1)));

    let mut in_flight = JoinSet::new();
    for peer in subset {
        let transport = transport.clone();
        let validate = validate.clone();
        let concurrency = concurrency.clone();
        let request = request.to_vec();
        in_flight.spawn(async move {
            let _permit = concurrency.acquire_owned().await;
            let bytes = transport.send_request(peer, request).await?;
            if validate(&bytes) {
                Ok(bytes)
            } else {
                Err(TransportError::InvalidEntity(
                    format!("{peer:?}"),
                    "entity failed validation".to_string(),
                ))
            }
        });
    }

    let race = async {
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(Ok(bytes)) => return Some(bytes),
                Ok(Err(err)) => tracing::debug!(error = %err, "peer request did not win the race"),
                Err(err) => tracing::debug!(error = %err, "peer request task was aborted"),
            }
        }
        None
    };

    let outcome = timeout(request_timeout, race).await;
    in_flight.abort_all();
    match outcome {
        Ok(Some(bytes)) => Ok(bytes),
        _ => Err(TransportError::NotFound),
    }
}

/// Sends `entity` at every peer in `peers` without waiting for any of
/// them to answer. Per-peer failures are logged and otherwise swallowed.
pub fn broadcast_entity(transport: Arc<dyn PeerTransport>, peers: &[PeerId], entity: &[u8]) {
    for peer in peers.iter().copied() {
        let transport = transport.clone();
        let entity = entity.to_vec();
        tokio::spawn(async move {
            if let Err(err) = transport.send_broadcast(peer, entity).await {
                tracing::warn!(?peer, error = %err, "broadcast to peer failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn peer(byte: u8) -> PeerId {
        AccountId([byte; 32])
    }

    struct ScriptedTransport {
        winner: PeerId,
        response: Vec<u8>,
        call_count: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl PeerTransport for ScriptedTransport {
        async fn send_request(&self, peer: PeerId, _request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if peer == self.winner {
                Ok(self.response.clone())
            } else {
                tokio::time::sleep(self.delay).await;
                Err(TransportError::PeerError(format!("{peer:?}"), "slow peer".to_string()))
            }
        }

        async fn send_broadcast(&self, _peer: PeerId, _entity: Vec<u8>) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn test_config() -> TransportConfig {
        TransportConfig {
            fan_out_min_peers: 4,
            fan_out_percent: 1.0,
            ..TransportConfig::default()
        }
    }

    #[tokio::test]
    async fn returns_first_validated_response() {
        let peers: Vec<PeerId> = (0..5).map(peer).collect();
        let transport = Arc::new(ScriptedTransport {
            winner: peers[2],
            response: b"block-bytes".to_vec(),
            call_count: AtomicUsize::new(0),
            delay: Duration::from_millis(200),
        });
        let result = request_entity(
            transport,
            &peers,
            b"give-me-the-block",
            |bytes| bytes == b"block-bytes",
            Duration::from_secs(1),
            &test_config(),
        )
        .await
        .unwrap();
        assert_eq!(result, b"block-bytes");
    }

    #[tokio::test]
    async fn not_found_when_every_peer_fails() {
        let peers: Vec<PeerId> = (0..4).map(peer).collect();
        let transport = Arc::new(ScriptedTransport {
            winner: peer(255),
            response: Vec::new(),
            call_count: AtomicUsize::new(0),
            delay: Duration::from_millis(5),
        });
        let result = request_entity(
            transport,
            &peers,
            b"request",
            |_| true,
            Duration::from_millis(200),
            &test_config(),
        )
        .await;
        assert!(matches!(result, Err(TransportError::NotFound)));
    }

    #[tokio::test]
    async fn empty_peer_set_is_rejected() {
        let transport = Arc::new(ScriptedTransport {
            winner: peer(0),
            response: Vec::new(),
            call_count: AtomicUsize::new(0),
            delay: Duration::from_millis(1),
        });
        let result = request_entity(
            transport,
            &[],
            b"request",
            |_| true,
            Duration::from_millis(50),
            &test_config(),
        )
        .await;
        assert!(matches!(result, Err(TransportError::NoPeers)));
    }

    #[test]
    fn subset_size_honors_the_floor_and_the_percentage() {
        let config = TransportConfig {
            fan_out_min_peers: 4,
            fan_out_percent: 0.10,
            ..TransportConfig::default()
        };
        assert_eq!(subset_size(10, &config), 4);
        assert_eq!(subset_size(100, &config), 10);
        assert_eq!(subset_size(2, &config), 2);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_peer() {
        let peers: Vec<PeerId> = (0..3).map(peer).collect();
        let seen: Arc<Mutex<Vec<PeerId>>> = Arc::new(Mutex::new(Vec::new()));

        struct RecordingTransport {
            seen: Arc<Mutex<Vec<PeerId>>>,
        }

        #[async_trait]
        impl PeerTransport for RecordingTransport {
            async fn send_request(&self, _peer: PeerId, _request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
                Err(TransportError::NotFound)
            }
            async fn send_broadcast(&self, peer: PeerId, _entity: Vec<u8>) -> Result<(), TransportError> {
                self.seen.lock().unwrap_or_else(|p| p.into_inner()).push(peer);
                Ok(())
            }
        }

        let transport = Arc::new(RecordingTransport { seen: seen.clone() });
        broadcast_entity(transport, &peers, b"gossip");
        tokio::time::sleep(Duration::from_millis(50)).await;
        let recorded = seen.lock().unwrap_or_else(|p| p.into_inner());
        assert_eq!(recorded.len(), 3);
    }
}
