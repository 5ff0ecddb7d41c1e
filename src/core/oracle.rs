//! Price Oracle
//!
//! Ordered fallback over independent price sources. `0.0` means "price
//! unavailable" and is never cached.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::models::config::FlashConfig;
use crate::models::types::PriceQuote;
use crate::providers::dexscreener::DexScreenerClient;
use crate::providers::price::{BinanceSource, CoinGeckoSource, CoinPaprikaSource};
use crate::providers::traits::PriceSource;
use crate::utils::cache::{CacheStats, TtlCache};

/// Uncached oracle: tries each source in order
pub struct PriceOracle {
    sources: Vec<Arc<dyn PriceSource>>,
}

impl PriceOracle {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    /// CoinGecko → Binance → DexScreener → CoinPaprika
    pub fn from_config(config: &FlashConfig) -> Self {
        let price = &config.price;
        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(CoinGeckoSource::new(price.coingecko_id.clone())),
            Arc::new(BinanceSource::new(price.binance_symbol.clone())),
            Arc::new(DexScreenerClient::new(
                price.dexscreener_chain.clone(),
                price.dexscreener_pair.clone(),
            )),
            Arc::new(CoinPaprikaSource::new(price.coinpaprika_id.clone())),
        ];
        Self::new(sources)
    }

    /// First positive price with the source that produced it
    pub async fn fetch_quote(&self) -> Option<PriceQuote> {
        for source in &self.sources {
            debug!("📡 Fetching native price from {}", source.name());
            match source.fetch_usd().await {
                Ok(price) if price.is_finite() && price > 0.0 => {
                    info!("💵 Native price ${:.2} from {}", price, source.name());
                    return Some(PriceQuote {
                        price_usd: price,
                        source: source.name().to_string(),
                        fetched_at: Utc::now(),
                    });
                }
                Ok(price) => warn!("⚠️ {} returned invalid price {}", source.name(), price),
                Err(e) => warn!("⚠️ {} failed: {}", source.name(), e),
            }
        }
        warn!("❌ All price sources failed");
        None
    }

    /// Price in USD, `0.0` if every source failed
    pub async fn fetch_price(&self) -> f64 {
        self.fetch_quote().await.map(|q| q.price_usd).unwrap_or(0.0)
    }
}

const CACHE_KEY: &str = "native";

/// TTL-cached oracle. A failed refresh keeps serving the last good value.
pub struct CachedPriceOracle {
    inner: PriceOracle,
    cache: TtlCache<PriceQuote>,
}

impl CachedPriceOracle {
    pub fn new(inner: PriceOracle, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }

    pub async fn fetch_quote(&self) -> Option<PriceQuote> {
        if let Some(quote) = self.cache.get(CACHE_KEY) {
            return Some(quote);
        }

        match self.inner.fetch_quote().await {
            Some(quote) => {
                self.cache.set(CACHE_KEY, quote.clone());
                Some(quote)
            }
            None => {
                let stale = self.cache.get_stale(CACHE_KEY);
                if let Some(ref quote) = stale {
                    warn!(
                        "♻️ Price refresh failed, serving last good ${:.2} from {}",
                        quote.price_usd, quote.source
                    );
                }
                stale
            }
        }
    }

    /// Cached price in USD, `0.0` if no good value was ever obtained
    pub async fn fetch_price(&self) -> f64 {
        self.fetch_quote().await.map(|q| q.price_usd).unwrap_or(0.0)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use eyre::{eyre, Result};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        price: AtomicU64,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, price: f64) -> Arc<Self> {
            Arc::new(Self {
                name,
                price: AtomicU64::new(price.to_bits()),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, price: f64) {
            self.price.store(price.to_bits(), Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_usd(&self) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let price = f64::from_bits(self.price.load(Ordering::SeqCst));
            if price < 0.0 {
                return Err(eyre!("{} down", self.name));
            }
            Ok(price)
        }
    }

    fn sources(list: &[&Arc<Fixed>]) -> Vec<Arc<dyn PriceSource>> {
        list.iter()
            .map(|s| Arc::clone(*s) as Arc<dyn PriceSource>)
            .collect()
    }

    #[tokio::test]
    async fn test_first_positive_wins() {
        let a = Fixed::new("a", -1.0);
        let b = Fixed::new("b", 0.0);
        let c = Fixed::new("c", 601.0);
        let d = Fixed::new("d", 700.0);
        let oracle = PriceOracle::new(sources(&[&a, &b, &c, &d]));

        let quote = oracle.fetch_quote().await.unwrap();
        assert_eq!(quote.price_usd, 601.0);
        assert_eq!(quote.source, "c");
        assert_eq!(d.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_fail_returns_zero() {
        let oracle = PriceOracle::new(sources(&[&Fixed::new("a", -1.0), &Fixed::new("b", 0.0)]));
        assert_eq!(oracle.fetch_price().await, 0.0);
    }

    #[tokio::test]
    async fn test_cache_serves_fresh_value() {
        let source = Fixed::new("a", 600.0);
        let oracle = CachedPriceOracle::new(PriceOracle::new(sources(&[&source])), Duration::from_secs(60));

        assert_eq!(oracle.fetch_price().await, 600.0);
        source.set(650.0);
        assert_eq!(oracle.fetch_price().await, 600.0);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_refreshes_after_ttl() {
        let source = Fixed::new("a", 600.0);
        let oracle = CachedPriceOracle::new(PriceOracle::new(sources(&[&source])), Duration::from_millis(30));

        assert_eq!(oracle.fetch_price().await, 600.0);
        source.set(650.0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(oracle.fetch_price().await, 650.0);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_good() {
        let source = Fixed::new("a", 600.0);
        let oracle = CachedPriceOracle::new(PriceOracle::new(sources(&[&source])), Duration::from_millis(30));

        assert_eq!(oracle.fetch_price().await, 600.0);
        source.set(0.0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(oracle.fetch_price().await, 600.0);
    }

    #[tokio::test]
    async fn test_never_cached_zero() {
        let source = Fixed::new("a", 0.0);
        let oracle = CachedPriceOracle::new(PriceOracle::new(sources(&[&source])), Duration::from_secs(60));

        assert_eq!(oracle.fetch_price().await, 0.0);
        source.set(610.0);
        assert_eq!(oracle.fetch_price().await, 610.0);
    }
}
