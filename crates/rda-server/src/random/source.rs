use async_trait::async_trait;
use rda_common::Result;

use super::ClaimGenerator;
use crate::model::ClaimChange;
use crate::source::{exhausted, RecordSource};

/// Emits up to `max_to_send` generated claims as update changes whose
/// sequence number is the claim's index.
pub struct RandomClaimSource<G> {
    generator: G,
    max_to_send: u64,
    emitted: u64,
}

impl<G: ClaimGenerator> RandomClaimSource<G> {
    pub fn new(generator: G, max_to_send: u64) -> Self {
        Self {
            generator,
            max_to_send,
            emitted: 0,
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[async_trait]
impl<G> RecordSource<ClaimChange<G::Claim>> for RandomClaimSource<G>
where
    G: ClaimGenerator,
{
    async fn has_more(&mut self) -> Result<bool> {
        Ok(self.emitted < self.max_to_send)
    }

    async fn next(&mut self) -> Result<ClaimChange<G::Claim>> {
        if self.emitted >= self.max_to_send {
            return exhausted();
        }
        let index = self.emitted;
        let claim = self.generator.generate(index);
        self.emitted += 1;
        Ok(ClaimChange::update(
            index as i64,
            self.generator.config().clock.now(),
            claim,
        ))
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        Ok((self.emitted < self.max_to_send).then_some(self.emitted as i64))
    }

    /// Records depend only on their index, so skipping just moves the counter.
    async fn skip_to(&mut self, position: i64) -> Result<()> {
        let target = u64::try_from(position).unwrap_or(0).min(self.max_to_send);
        self.emitted = self.emitted.max(target);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
