//! DexScreener-backed supplier.
//!
//! Candidates come from the public search endpoint, one request per configured
//! query; quotes come from the pair endpoint. Instrument ids are
//! `<chainId>:<pairAddress>`.

use super::scoring::{CandidateScorer, PairMetrics, ScorerKind};
use super::{MarketDataSupplier, TickStream, TICK_CHANNEL_CAPACITY};
use crate::error::SupplierError;
use crate::types::{Candidate, InstrumentId, Tick};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use url::Url;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DexScreenerConfig {
    pub base_url: String,
    pub search_queries: Vec<String>,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub candidate_limit: usize,
    pub scorer: ScorerKind,
    pub min_volume_h24_usd: f64,
    pub min_liquidity_usd: f64,
    pub min_txns_h1: u64,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dexscreener.com/".to_string(),
            search_queries: ["solana", "eth", "bsc", "base"].map(String::from).to_vec(),
            poll_interval_ms: 5_000,
            request_timeout_ms: 3_000,
            candidate_limit: 5,
            scorer: ScorerKind::FlowImbalance,
            min_volume_h24_usd: 5_000.0,
            min_liquidity_usd: 500.0,
            min_txns_h1: 5,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    chain_id: String,
    pair_address: String,
    #[serde(default)]
    base_token: Option<TokenRef>,
    #[serde(default)]
    quote_token: Option<TokenRef>,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    txns: Option<Txns>,
    #[serde(default)]
    volume: Option<Windows>,
    #[serde(default)]
    price_change: Option<Windows>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
}

#[derive(Clone, Debug, Deserialize)]
struct TokenRef {
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct Txns {
    #[serde(default)]
    h1: Option<TxnCount>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct TxnCount {
    #[serde(default)]
    buys: u64,
    #[serde(default)]
    sells: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Windows {
    #[serde(default)]
    m5: Option<f64>,
    #[serde(default)]
    h1: Option<f64>,
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
struct Liquidity {
    #[serde(default)]
    usd: Option<f64>,
}

impl DexPair {
    fn id(&self) -> InstrumentId {
        InstrumentId(format!("{}:{}", self.chain_id, self.pair_address))
    }

    fn symbol(&self) -> String {
        let sym = |t: &Option<TokenRef>| {
            t.as_ref()
                .and_then(|t| t.symbol.clone())
                .unwrap_or_else(|| "?".to_string())
        };
        format!("{}/{}", sym(&self.base_token), sym(&self.quote_token))
    }

    fn price(&self) -> f64 {
        self.price_usd
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    fn metrics(&self) -> PairMetrics {
        let h1 = self
            .txns
            .as_ref()
            .and_then(|t| t.h1.clone())
            .unwrap_or_default();
        let volume = self.volume.clone().unwrap_or_default();
        let change = self.price_change.clone().unwrap_or_default();
        PairMetrics {
            price_usd: self.price(),
            buys_h1: h1.buys,
            sells_h1: h1.sells,
            volume_h1: volume.h1.unwrap_or(0.0),
            volume_h24: volume.h24.unwrap_or(0.0),
            price_change_h1: change.h1.unwrap_or(0.0),
            liquidity_usd: self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0),
        }
    }
}

/// Filters, de-duplicates, scores and ranks raw search results.
fn rank_pairs(
    pairs: impl IntoIterator<Item = DexPair>,
    cfg: &DexScreenerConfig,
    scorer: &dyn CandidateScorer,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out: Vec<Candidate> = pairs
        .into_iter()
        .filter(|p| {
            let m = p.metrics();
            m.price_usd > 0.0
                && m.volume_h24 > cfg.min_volume_h24_usd
                && m.liquidity_usd > cfg.min_liquidity_usd
                && m.buys_h1 + m.sells_h1 > cfg.min_txns_h1
        })
        .filter(|p| seen.insert(p.id()))
        .map(|p| Candidate {
            id: p.id(),
            symbol: p.symbol(),
            score: scorer.score(&p.metrics()),
        })
        .filter(|c| c.score.is_finite())
        .collect();
    // stable: equal scores keep discovery order
    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out.truncate(cfg.candidate_limit.max(1));
    out
}

fn tick_from_pair(pair: &DexPair) -> Result<Tick, SupplierError> {
    let price = pair.price();
    if !(price.is_finite() && price > 0.0) {
        return Err(SupplierError::Malformed(format!(
            "pair {} has no usable priceUsd",
            pair.pair_address
        )));
    }
    let m5 = pair.volume.as_ref().and_then(|v| v.m5).unwrap_or(0.0).max(0.0);
    let mut tick = Tick::new(Utc::now(), price, m5);
    if let Some(liq) = pair.liquidity.as_ref().and_then(|l| l.usd) {
        tick = tick.with_liquidity(liq);
    }
    Ok(tick)
}

struct Inner {
    cfg: DexScreenerConfig,
    base: Url,
    http: reqwest::Client,
    scorer: Box<dyn CandidateScorer>,
}

#[derive(Clone)]
pub struct DexScreenerSupplier {
    inner: Arc<Inner>,
}

impl DexScreenerSupplier {
    pub fn new(cfg: DexScreenerConfig) -> Result<Self, SupplierError> {
        let base = Url::parse(&cfg.base_url)
            .map_err(|e| SupplierError::Transport(format!("invalid base url {}: {e}", cfg.base_url)))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .user_agent("Mozilla/5.0")
            .build()?;
        let scorer = cfg.scorer.build();
        Ok(Self {
            inner: Arc::new(Inner {
                cfg,
                base,
                http,
                scorer,
            }),
        })
    }

    async fn get_pairs(&self, url: Url) -> Result<Vec<DexPair>, SupplierError> {
        let resp = self
            .inner
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;
        let body: PairsResponse = resp.json().await?;
        Ok(body.pairs.unwrap_or_default())
    }

    fn search_url(&self, query: &str) -> Result<Url, SupplierError> {
        let mut url = self
            .inner
            .base
            .join("latest/dex/search")
            .map_err(|e| SupplierError::Transport(e.to_string()))?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }

    fn pair_url(&self, id: &InstrumentId) -> Result<Url, SupplierError> {
        let (chain, pair) = id
            .0
            .split_once(':')
            .ok_or_else(|| SupplierError::Malformed(format!("instrument id {id} is not <chain>:<pair>")))?;
        self.inner
            .base
            .join(&format!("latest/dex/pairs/{chain}/{pair}"))
            .map_err(|e| SupplierError::Transport(e.to_string()))
    }
}

#[async_trait]
impl MarketDataSupplier for DexScreenerSupplier {
    async fn list_candidates(&self) -> Result<Vec<Candidate>, SupplierError> {
        let mut pairs = Vec::new();
        for q in &self.inner.cfg.search_queries {
            let url = self.search_url(q)?;
            match self.get_pairs(url).await {
                Ok(found) => {
                    tracing::debug!(query = %q, pairs = found.len(), "search returned");
                    pairs.extend(found);
                }
                Err(e) => tracing::warn!(query = %q, error = %e, "search failed; skipping"),
            }
        }
        let ranked = rank_pairs(pairs, &self.inner.cfg, self.inner.scorer.as_ref());
        if ranked.is_empty() {
            return Err(SupplierError::Empty);
        }
        Ok(ranked)
    }

    async fn stream_ticks(&self, id: &InstrumentId) -> Result<TickStream, SupplierError> {
        // validate the id up front so a bad one fails here, not on every poll
        self.pair_url(id)?;
        let this = self.clone();
        let id = id.clone();
        let poll = Duration::from_millis(self.inner.cfg.poll_interval_ms.max(1));
        Ok(TickStream::spawn(TICK_CHANNEL_CAPACITY, move |tx| async move {
            let mut interval = tokio::time::interval(poll);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let item = this.fetch_snapshot(&id).await;
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        }))
    }

    async fn fetch_snapshot(&self, id: &InstrumentId) -> Result<Tick, SupplierError> {
        let url = self.pair_url(id)?;
        let pairs = self.get_pairs(url).await?;
        let pair = pairs.first().ok_or(SupplierError::Empty)?;
        tick_from_pair(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::scoring::FlowImbalance;

    const SEARCH: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "base", "dexId": "uniswap", "pairAddress": "0xaaa",
                "baseToken": {"symbol": "AAA"}, "quoteToken": {"symbol": "WETH"},
                "priceUsd": "0.0123",
                "txns": {"h1": {"buys": 40, "sells": 10}},
                "volume": {"m5": 900.0, "h1": 12000.0, "h24": 250000.0},
                "priceChange": {"h1": 4.2},
                "liquidity": {"usd": 90000.0}
            },
            {
                "chainId": "base", "pairAddress": "0xbbb",
                "baseToken": {"symbol": "BBB"}, "quoteToken": {"symbol": "USDC"},
                "priceUsd": "1.5",
                "txns": {"h1": {"buys": 20, "sells": 15}},
                "volume": {"h24": 80000.0},
                "liquidity": {"usd": 40000.0}
            },
            {
                "chainId": "base", "pairAddress": "0xaaa",
                "priceUsd": "0.0123",
                "txns": {"h1": {"buys": 40, "sells": 10}},
                "volume": {"h24": 250000.0},
                "liquidity": {"usd": 90000.0}
            },
            {
                "chainId": "bsc", "pairAddress": "0xdead",
                "priceUsd": "2.0",
                "txns": {"h1": {"buys": 1, "sells": 1}},
                "volume": {"h24": 900000.0},
                "liquidity": {"usd": 90000.0}
            },
            {
                "chainId": "bsc", "pairAddress": "0xnoprice",
                "txns": {"h1": {"buys": 100, "sells": 1}},
                "volume": {"h24": 900000.0},
                "liquidity": {"usd": 90000.0}
            }
        ]
    }"#;

    fn parse(s: &str) -> Vec<DexPair> {
        serde_json::from_str::<PairsResponse>(s).unwrap().pairs.unwrap()
    }

    #[test]
    fn ranks_filters_and_dedupes() {
        let ranked = rank_pairs(parse(SEARCH), &DexScreenerConfig::default(), &FlowImbalance::default());
        let ids: Vec<&str> = ranked.iter().map(|c| c.id.0.as_str()).collect();
        // 0xdead has too few txns, 0xnoprice has no price, 0xaaa appears once.
        assert_eq!(ids, vec!["base:0xaaa", "base:0xbbb"]);
        assert_eq!(ranked[0].symbol, "AAA/WETH");
        assert_eq!(ranked[0].score, 30.0 * 2.0 + 250_000.0 / 20_000.0 + 1.0);
    }

    #[test]
    fn respects_candidate_limit() {
        let cfg = DexScreenerConfig {
            candidate_limit: 1,
            ..Default::default()
        };
        let ranked = rank_pairs(parse(SEARCH), &cfg, &FlowImbalance::default());
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn tick_from_pair_reads_price_volume_liquidity() {
        let pairs = parse(SEARCH);
        let tick = tick_from_pair(&pairs[0]).unwrap();
        assert_eq!(tick.price, 0.0123);
        assert_eq!(tick.volume, 900.0);
        assert_eq!(tick.liquidity_usd, Some(90_000.0));

        assert!(matches!(tick_from_pair(&pairs[4]), Err(SupplierError::Malformed(_))));
    }

    #[test]
    fn missing_pairs_key_is_empty() {
        let body: PairsResponse = serde_json::from_str(r#"{"schemaVersion":"1.0.0","pairs":null}"#).unwrap();
        assert!(body.pairs.unwrap_or_default().is_empty());
    }

    #[test]
    fn builds_endpoint_urls() {
        let s = DexScreenerSupplier::new(DexScreenerConfig::default()).unwrap();
        assert_eq!(
            s.search_url("uniswap base").unwrap().as_str(),
            "https://api.dexscreener.com/latest/dex/search?q=uniswap+base"
        );
        assert_eq!(
            s.pair_url(&InstrumentId::from("base:0xabc")).unwrap().as_str(),
            "https://api.dexscreener.com/latest/dex/pairs/base/0xabc"
        );
        assert!(s.pair_url(&InstrumentId::from("no-chain")).is_err());
    }
}
