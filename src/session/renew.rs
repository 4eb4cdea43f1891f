use crate::gateway::{Gateway, GatewayError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use tokio::{
    task::JoinHandle,
    time::{sleep, Duration},
};
use tracing::{debug, error, info, warn};

const MAX_ATTEMPTS: u32 = 3;

/// Renew the access token in the background before it expires.
///
/// Sleeps for a jittered 70-90% of the token lifetime, renews, and
/// reschedules from the lifetime the backend returned. A transient failure
/// (5xx, transport) is retried up to 3 times with backoff (1s, 2s); a
/// rejected renewal is terminal, the gateway has already cleared the store
/// and emitted `SessionExpired`, so the task just ends. Long-running clients
/// opt in; the one-shot CLI does not use this.
pub fn spawn_auto_renew(gateway: Arc<Gateway>, expires_in: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut lease_seconds = expires_in.max(1);

        loop {
            let factor = rng.gen_range(70..90);
            let wait = Duration::from_millis(lease_seconds * factor * 10);

            debug!("will renew access token in {} ms", wait.as_millis());

            sleep(wait).await;

            let mut attempt = 0;

            let renewed = loop {
                match gateway.renew_access().await {
                    Ok(renewed) => break renewed,
                    Err(GatewayError::RenewalUnavailable { detail }) => {
                        attempt += 1;

                        if attempt >= MAX_ATTEMPTS {
                            // Credentials are still stored; the next 401 on a
                            // real request goes through the request-path
                            // renewal instead.
                            error!(
                                "background renewal unavailable after {MAX_ATTEMPTS} attempts, stopping: {detail}"
                            );
                            return;
                        }

                        let backoff = Duration::from_secs(1 << (attempt - 1));

                        warn!(
                            "background renewal unavailable (attempt {attempt}/{MAX_ATTEMPTS}), retrying in {}s: {detail}",
                            backoff.as_secs()
                        );

                        sleep(backoff).await;
                    }
                    Err(e) => {
                        // The session-expired procedure already ran; nothing
                        // left to renew against.
                        error!("background renewal failed, stopping: {e}");
                        return;
                    }
                }
            };

            info!(
                expires_in = renewed.expires_in,
                "access token renewed in the background"
            );

            // Zero means a concurrent caller renewed for us; keep the
            // previous lease estimate.
            if renewed.expires_in > 0 {
                lease_seconds = renewed.expires_in;
            }
        }
    })
}
