use std::sync::Arc;
use std::time::Duration;

use starbit_core::ServerDatagramMessage;

use crate::shared::Shared;

/// Runs the tick broadcaster (spec §4.5): fires at a fixed period, resolves
/// combat, checks victory, accrues resources, and fans out a personalized
/// delta to every registered datagram client.
pub async fn run(shared: Arc<Shared>) {
    let period = Duration::from_millis(shared.config.game.tick_period_ms);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let recipients = {
            let mut state = shared.state.lock().await;
            let Some((delta, ges_updates)) = state.run_tick() else {
                continue;
            };
            // `ges_updates` is the roster as it stood *before* this tick's
            // possible victory reset; reading `state.player_names()` here
            // instead would see an empty lobby on the winning tick and the
            // final delta (owner changes, victory) would reach no one.
            ges_updates
                .into_iter()
                .map(|update| {
                    let mut delta = delta.clone();
                    let name = update.owner.clone();
                    delta.ges_updates = Some(vec![update]);
                    (name, delta)
                })
                .collect::<Vec<_>>()
        };

        for (name, delta) in recipients {
            let message = ServerDatagramMessage::Tick(delta);
            match message.into_envelope().encode() {
                Ok(bytes) => shared.send_to(&name, bytes).await,
                Err(err) => log::warn!("failed to encode tick for {}: {}", name, err),
            }
        }
    }
}
