//! Egress self-check.
//!
//! Before a round's misses are turned into failure counts, the monitor
//! verifies its own network path by resolving a well-known external name.
//! A failure here means "we are blind", not "everything is down", and the
//! status engine suppresses down-processing for that round.

use std::sync::Arc;

use anyhow::Context;

type BoxFuture = std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>>;

/// Callback invoked once per round before down-processing.
///
/// `Ok(())` means local egress is healthy. Tests substitute their own
/// closure to simulate a local outage.
pub type EgressCheck = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// The default egress check: resolve `hostname` through the system DNS.
pub fn dns_egress_check(hostname: &str) -> EgressCheck {
    let hostname = hostname.to_string();
    Arc::new(move || {
        let hostname = hostname.clone();
        Box::pin(async move {
            let mut addrs = tokio::net::lookup_host((hostname.as_str(), 53))
                .await
                .with_context(|| format!("resolving {hostname}"))?;
            if addrs.next().is_none() {
                anyhow::bail!("{hostname} resolved to no addresses");
            }
            Ok(())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn localhost_resolves() {
        let check = dns_egress_check("localhost");
        assert!(check().await.is_ok());
    }

    #[tokio::test]
    async fn reserved_invalid_name_fails() {
        // RFC 6761 reserves .invalid to never resolve.
        let check = dns_egress_check("egress.invalid");
        assert!(check().await.is_err());
    }
}
