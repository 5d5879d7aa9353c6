//! A scripted [`PeerTransport`] fixture for integration tests, generalized
//! from the per-test fakes `meridian-transport`'s own unit tests define
//! inline: one type that answers requests from a fixed per-peer script and
//! records every broadcast it receives, reusable across crates instead of
//! being redefined in each one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use meridian_transport::error::TransportError;
use meridian_transport::pool::{PeerId, PeerTransport};

/// A peer's scripted response to `send_request`: a fixed payload after an
/// optional delay, or a fixed failure. Carries the failure as a plain
/// description rather than a [`TransportError`] so one script can be
/// replayed on every call ([`TransportError`] itself isn't `Clone`).
pub enum ScriptedResponse {
    Ok(Vec<u8>),
    OkAfter(Duration, Vec<u8>),
    Err(String),
}

/// A [`PeerTransport`] whose replies are fixed in advance per peer, and
/// whose broadcasts are recorded for later assertions.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<PeerId, ScriptedResponse>>,
    broadcasts: Mutex<Vec<(PeerId, Vec<u8>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `peer`'s next (and every subsequent) `send_request` reply.
    pub fn script(&self, peer: PeerId, response: ScriptedResponse) {
        self.scripts.lock().unwrap_or_else(|p| p.into_inner()).insert(peer, response);
    }

    /// Every `(peer, entity)` pair broadcast through this transport so far,
    /// in the order they arrived.
    pub fn broadcasts(&self) -> Vec<(PeerId, Vec<u8>)> {
        self.broadcasts.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl PeerTransport for ScriptedTransport {
    async fn send_request(&self, peer: PeerId, _request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let scripted = {
            let scripts = self.scripts.lock().unwrap_or_else(|p| p.into_inner());
            match scripts.get(&peer) {
                Some(ScriptedResponse::Ok(bytes)) => Ok((Duration::ZERO, bytes.clone())),
                Some(ScriptedResponse::OkAfter(delay, bytes)) => Ok((*delay, bytes.clone())),
                Some(ScriptedResponse::Err(message)) => {
                    Err(TransportError::PeerError(format!("{peer:?}"), message.clone()))
                }
                None => Err(TransportError::NotFound),
            }
        };
        let (delay, bytes) = scripted?;
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        Ok(bytes)
    }

    async fn send_broadcast(&self, peer: PeerId, entity: Vec<u8>) -> Result<(), TransportError> {
        self.broadcasts.lock().unwrap_or_else(|p| p.into_inner()).push((peer, entity));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::app::AccountId;

    fn peer(byte: u8) -> PeerId {
        AccountId([byte; 32])
    }

    #[tokio::test]
    async fn scripted_peer_answers_with_its_script() {
        let transport = ScriptedTransport::new();
        transport.script(peer(1), ScriptedResponse::Ok(b"hello".to_vec()));
        let reply = transport.send_request(peer(1), vec![]).await.expect("reply");
        assert_eq!(reply, b"hello");
    }

    #[tokio::test]
    async fn unscripted_peer_is_not_found() {
        let transport = ScriptedTransport::new();
        let err = transport.send_request(peer(9), vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::NotFound));
    }

    #[tokio::test]
    async fn broadcasts_are_recorded_in_order() {
        let transport = ScriptedTransport::new();
        transport.send_broadcast(peer(1), b"a".to_vec()).await.expect("broadcast");
        transport.send_broadcast(peer(2), b"b".to_vec()).await.expect("broadcast");
        let recorded = transport.broadcasts();
        assert_eq!(recorded, vec![(peer(1), b"a".to_vec()), (peer(2), b"b".to_vec())]);
    }
}
