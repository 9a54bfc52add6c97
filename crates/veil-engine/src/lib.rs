// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matchmaking, relay, and queue-drain engine.
//!
//! [`RelayService`] wires the pieces together behind a single entry
//! point: a platform adapter hands every inbound envelope to
//! [`RelayService::dispatch`] and spawns the background drain with
//! [`RelayService::spawn_drain`]. All collaborators are injected, so
//! tests can combine the real engine with in-memory fakes.

pub mod commands;
pub mod matchmaker;
pub mod notices;
pub mod processor;
pub mod relay;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use veil_config::VeilConfig;
use veil_core::types::{EnvelopeBody, InboundEnvelope, OutboundContent, ParticipantStatus};
use veil_core::{RelayStore, Transport, VeilError};

pub use commands::{Command, CommandHandler};
pub use matchmaker::Matchmaker;
pub use processor::{DrainStats, QueueProcessor};
pub use relay::RelayEngine;

/// The assembled relay core.
pub struct RelayService {
    store: Arc<dyn RelayStore>,
    transport: Arc<dyn Transport>,
    relay: Arc<RelayEngine>,
    commands: CommandHandler,
    processor: Arc<QueueProcessor>,
    drain_interval: Duration,
}

impl RelayService {
    pub fn new(
        store: Arc<dyn RelayStore>,
        transport: Arc<dyn Transport>,
        config: &VeilConfig,
    ) -> Self {
        let matchmaker = Arc::new(Matchmaker::new(
            store.clone(),
            transport.clone(),
            config.matchmaking.clone(),
        ));
        let relay = Arc::new(RelayEngine::new(store.clone(), transport.clone()));
        let commands = CommandHandler::new(
            store.clone(),
            transport.clone(),
            matchmaker,
            relay.clone(),
        );
        let processor = Arc::new(QueueProcessor::new(
            store.clone(),
            transport.clone(),
            config.queue.clone(),
        ));
        Self {
            store,
            transport,
            relay,
            commands,
            processor,
            drain_interval: Duration::from_secs(config.queue.drain_interval_secs),
        }
    }

    /// Route one inbound envelope.
    ///
    /// Text bodies that parse as a command are executed; everything else
    /// is relayed to the sender's partner. A participant who is neither
    /// chatting nor issuing a command gets a hint instead of silence.
    pub async fn dispatch(&self, envelope: &InboundEnvelope) -> Result<(), VeilError> {
        if let EnvelopeBody::Text(text) = &envelope.body {
            if let Some(command) = Command::parse(text) {
                return self.commands.handle(&envelope.sender_id, command).await;
            }
        }

        if self.relay.relay(&envelope.sender_id, envelope).await? {
            return Ok(());
        }

        // relay() has already messaged a chatting sender about unsupported
        // or undeliverable content; only the not-chatting case is silent.
        let chatting = self
            .store
            .participant(&envelope.sender_id)
            .await?
            .is_some_and(|p| p.status == ParticipantStatus::Chatting);
        if !chatting {
            debug!(id = %envelope.sender_id, "content from idle participant");
            self.transport
                .send(
                    &envelope.sender_id,
                    OutboundContent::text(notices::IDLE_HINT),
                )
                .await?;
        }
        Ok(())
    }

    /// Run one queue drain pass now.
    pub async fn drain(&self) -> Result<DrainStats, VeilError> {
        self.processor.drain().await
    }

    /// Spawn the recurring queue drain. The first pass runs immediately,
    /// so deliveries deferred across a restart are retried at startup.
    pub fn spawn_drain(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let processor = self.processor.clone();
        scheduler::spawn_recurring("queue-drain", self.drain_interval, shutdown, move || {
            let processor = processor.clone();
            async move { processor.drain().await.map(|_| ()) }
        })
    }
}
