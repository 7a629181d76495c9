use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use tokio::time::Instant;

use crate::{application::services::cooldown::CooldownTracker, domain::value_objects::RecipientId};

/// Picks one ready recipient uniformly at random.
///
/// The candidate list is filtered in the order given, so the pick only depends
/// on the random source, never on map iteration or arrival order.
pub struct FairSelector<R = StdRng> {
    rng: R,
}

impl FairSelector<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> FairSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// `pending` holds recipients with non-empty queues. Returns `None` when none of
    /// them is off cooldown.
    pub fn select(
        &mut self,
        pending: &[RecipientId],
        cooldown: &CooldownTracker,
        now: Instant,
    ) -> Option<RecipientId> {
        let ready: Vec<RecipientId> = pending
            .iter()
            .copied()
            .filter(|recipient| cooldown.can_send(*recipient, now))
            .collect();

        ready.choose(&mut self.rng).copied()
    }
}
