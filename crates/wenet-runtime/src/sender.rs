//! Frame sender and the UDP datagram sink
//!
//! The sender is the last stage of the pipeline: it drains serialized
//! envelopes from the output queue into a [`FrameSink`]. A failed send is
//! counted and logged and the next envelope is tried. The sink is closed once
//! the output queue has been closed and drained.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, error, info, warn};
use wenet_core::{FrameSink, PipelineStats, RelayError, Result};

use crate::channels::OutputReceiver;

// ----------------------------------------------------------------------------
// Frame Sender
// ----------------------------------------------------------------------------

pub struct FrameSender<S: FrameSink> {
    output: OutputReceiver,
    sink: S,
    stats: Arc<PipelineStats>,
}

impl<S: FrameSink> FrameSender<S> {
    pub fn new(output: OutputReceiver, sink: S, stats: Arc<PipelineStats>) -> Self {
        Self {
            output,
            sink,
            stats,
        }
    }

    /// Forward envelopes until the output queue is closed and empty
    pub async fn run(mut self) -> Result<()> {
        info!("Frame sender started");

        while let Some(datagram) = self.output.recv().await {
            match self.sink.send(&datagram).await {
                Ok(()) => {
                    PipelineStats::bump(&self.stats.datagrams_sent);
                    debug!("Sent {} byte envelope", datagram.len());
                }
                Err(e) => {
                    PipelineStats::bump(&self.stats.send_failures);
                    error!("Failed to send envelope: {}", e);
                }
            }
        }

        if let Err(e) = self.sink.close().await {
            warn!("Failed to close frame sink: {}", e);
        }
        info!("Frame sender stopped");
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// UDP Sink
// ----------------------------------------------------------------------------

/// Datagram sink connected to the downstream relay
#[derive(Debug)]
pub struct UdpFrameSink {
    socket: Option<UdpSocket>,
    peer: SocketAddr,
}

impl UdpFrameSink {
    /// Resolve the relay address and bind a local socket of the same family
    pub async fn open(host: &str, port: u16) -> Result<Self> {
        let peer = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| RelayError::Config(format!("relay host '{}' did not resolve", host)))?;

        let local: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        info!("Relaying envelopes to {}", peer);

        Ok(Self {
            socket: Some(socket),
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        match &self.socket {
            Some(socket) => Ok(socket.local_addr()?),
            None => Err(RelayError::QueueClosed("udp sink")),
        }
    }
}

#[async_trait]
impl FrameSink for UdpFrameSink {
    async fn send(&mut self, datagram: &[u8]) -> Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or(RelayError::QueueClosed("udp sink"))?;
        socket.send(datagram).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            debug!("Closed UDP socket to {}", self.peer);
        }
        Ok(())
    }
}
