//! Conversation Context Cache
//!
//! Information Hiding:
//! - Peer key naming and blob encoding hidden from request handlers
//! - Persona construction delegated to a `PersonaSource`
//! - TTL policy (renew or not, persist or reseed) read from `ContextConfig`
//!
//! Every request runs its own load → mutate → save sequence; nothing holds
//! a live conversation across requests. `resolve_or_seed` is an unlocked
//! check-then-act: two first contacts from one peer can both miss, both
//! build a persona, and the later write wins. Both callers still get a
//! complete conversation and the stored blob is always one whole entry.

use crate::config::{ContextConfig, PersistPolicy};
use crate::core::{CompletionClient, Conversation, Turn};
use crate::error::{Error, Result};
use crate::snapshot::PersonaSource;
use crate::social::SocialApi;
use crate::storage::{KeyTtl, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;

/// Prefix of the user turn recording an inbound comment or message
pub const INTERACTION_MARKER: &str = "New message or comment received: ";

/// Cache key of the conversation held with one Instagram user
pub fn peer_key(external_user_id: &str) -> String {
    format!("inst:{}", external_user_id)
}

pub struct ContextCache {
    store: Arc<dyn KeyValueStore>,
    personas: Arc<dyn PersonaSource>,
    llm: Arc<dyn CompletionClient>,
    config: ContextConfig,
}

impl ContextCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        personas: Arc<dyn PersonaSource>,
        llm: Arc<dyn CompletionClient>,
        config: ContextConfig,
    ) -> Self {
        Self {
            store,
            personas,
            llm,
            config,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Stored conversation for `peer_key`, or a freshly seeded one
    pub async fn resolve_or_seed(
        &self,
        peer_key: &str,
        client: &dyn SocialApi,
        ttl: Duration,
    ) -> Result<Conversation> {
        if let Some(blob) = self.store.get(peer_key).await? {
            match Conversation::deserialize(peer_key, &blob) {
                Ok(conversation) if conversation.has_persona() => {
                    tracing::debug!(
                        "[ContextCache] Hit for '{}' ({} turns)",
                        peer_key,
                        conversation.len()
                    );
                    if self.config.renew_on_access {
                        self.store.expire(peer_key, ttl).await?;
                    }
                    return Ok(conversation);
                }
                Ok(conversation) => {
                    tracing::warn!(
                        "[ContextCache] Entry '{}' has no persona turn ({} turns); discarding and reseeding",
                        peer_key,
                        conversation.len()
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "[ContextCache] Data loss: discarding unreadable entry '{}' and reseeding: {}",
                        peer_key,
                        e
                    );
                }
            }
        }

        tracing::info!("[ContextCache] Miss for '{}', building persona", peer_key);
        let persona = self.personas.build_persona(client).await?;
        let conversation = Conversation::seeded(persona);

        if !self
            .store
            .set(peer_key, &conversation.serialize()?, Some(ttl))
            .await?
        {
            return Err(Error::StoreUnavailable(format!(
                "write of '{}' was not acknowledged",
                peer_key
            )));
        }
        Ok(conversation)
    }

    /// Record `inbound`, ask for a reply, and record the reply
    pub async fn extend_with_interaction(
        &self,
        mut conversation: Conversation,
        inbound: &str,
    ) -> Result<(Conversation, String)> {
        if !conversation.has_persona() {
            return Err(Error::corrupt(
                "conversation",
                format!(
                    "expected a persona system turn first, found {} turns without one",
                    conversation.len()
                ),
            ));
        }

        conversation.push(Turn::user(format!("{}{}", INTERACTION_MARKER, inbound)));

        let mut request = conversation.turns().to_vec();
        request.push(Turn::user(format!("Generate a reply to: {}", inbound)));

        let reply = self.llm.complete(&request).await?;
        if reply.is_empty() {
            return Err(Error::CompletionFailed("empty reply".to_string()));
        }

        conversation.push(Turn::assistant(reply.clone()));
        Ok((conversation, reply))
    }

    /// Write `conversation` back without renewing the entry's TTL
    ///
    /// Returns false when the entry expired in the meantime; it is not
    /// resurrected.
    pub async fn save(&self, peer_key: &str, conversation: &Conversation) -> Result<bool> {
        let mut conversation = conversation.clone();
        conversation.trim_to(self.config.max_turns);
        let blob = conversation.serialize()?;

        match self.store.ttl(peer_key).await? {
            KeyTtl::Missing => {
                tracing::debug!(
                    "[ContextCache] Entry '{}' expired before save, dropping {} turns",
                    peer_key,
                    conversation.len()
                );
                Ok(false)
            }
            KeyTtl::Persistent => self.store.set(peer_key, &blob, None).await,
            KeyTtl::Expires(remaining) => self.store.set(peer_key, &blob, Some(remaining)).await,
        }
    }

    /// One request's full transaction: resolve, extend, and persist per policy
    pub async fn handle_interaction(
        &self,
        peer_key: &str,
        client: &dyn SocialApi,
        inbound: &str,
    ) -> Result<String> {
        let conversation = self
            .resolve_or_seed(peer_key, client, self.config.ttl())
            .await?;
        let (conversation, reply) = self.extend_with_interaction(conversation, inbound).await?;

        if self.config.persist_policy == PersistPolicy::EveryTurn {
            self.save(peer_key, &conversation).await?;
        }
        Ok(reply)
    }
}
