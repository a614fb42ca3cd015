//! Trader attribution from the transfer graph of a transaction.
//!
//! The swap log only names the immediate caller of the pool, usually a
//! router. The beneficiary is recovered from the token transfers of the same
//! transaction once pass-through hops (pools, routers, quote tokens) are
//! removed and round trips cancelled. The result is a best guess: multi-leg
//! aggregator trades and two buys of one token in a single transaction are
//! not told apart, and only one fee-on-transfer token per transaction is
//! resolved by the amount ordering.

use alloy_primitives::{Address, B256};
use indexer_core::types::{Direction, Swap, Transfer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    pub address: Address,
    pub amount: f64,
}

/// Senders and receivers of one token within a transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenFlows {
    pub from: Vec<Flow>,
    pub to: Vec<Flow>,
}

impl TokenFlows {
    /// Drop one `to` entry for every `from` entry of the same address, and
    /// that `from` entry with it
    fn cancel_round_trips(&mut self) {
        let senders = std::mem::take(&mut self.from);
        for flow in senders {
            match self.to.iter().position(|t| t.address == flow.address) {
                Some(index) => {
                    self.to.remove(index);
                }
                None => self.from.push(flow),
            }
        }
    }

    fn sort_descending(&mut self) {
        self.from.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        self.to.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    }

    fn is_empty(&self) -> bool {
        self.from.is_empty() && self.to.is_empty()
    }
}

/// Reduced transfer graph of one transaction, per token
#[derive(Debug, Clone, Default)]
pub struct TransferGraph {
    tokens: HashMap<Address, TokenFlows>,
}

impl TransferGraph {
    pub fn build<'a>(
        transfers: impl IntoIterator<Item = &'a Transfer>,
        is_infrastructure: impl Fn(&Address) -> bool,
    ) -> Self {
        let mut tokens: HashMap<Address, TokenFlows> = HashMap::new();

        for transfer in transfers {
            let flows = tokens.entry(transfer.token).or_default();
            if !is_infrastructure(&transfer.from) {
                flows.from.push(Flow {
                    address: transfer.from,
                    amount: transfer.amount,
                });
            }
            if !is_infrastructure(&transfer.to) {
                flows.to.push(Flow {
                    address: transfer.to,
                    amount: transfer.amount,
                });
            }
        }

        for flows in tokens.values_mut() {
            flows.cancel_round_trips();
            flows.sort_descending();
        }

        Self { tokens }
    }

    pub fn flows(&self, token: &Address) -> Option<&TokenFlows> {
        self.tokens.get(token)
    }

    /// Largest surviving receiver of `token`
    pub fn top_receiver(&self, token: &Address) -> Option<Address> {
        self.flows(token)?.to.first().map(|f| f.address)
    }

    /// Largest surviving sender of `token`
    pub fn top_sender(&self, token: &Address) -> Option<Address> {
        self.flows(token)?.from.first().map(|f| f.address)
    }

    /// No endpoint survived the reduction for any token
    pub fn is_empty(&self) -> bool {
        self.tokens.values().all(TokenFlows::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribution {
    Trader(Address),
    /// Buy or sell with no surviving endpoint for the main token
    Unattributed,
    /// Relabelled as a self-cancelling round trip
    Arbitrage,
    TooComplicated,
    /// Direction was never a buy or a sell
    Skipped,
}

impl Attribution {
    pub const fn as_label(&self) -> &'static str {
        match self {
            Attribution::Trader(_) => "trader",
            Attribution::Unattributed => "none",
            Attribution::Arbitrage => "arbitrage",
            Attribution::TooComplicated => "too_complicated",
            Attribution::Skipped => "skipped",
        }
    }
}

/// Assign `swap.trader`, or relabel its direction
pub fn attribute_swap(
    swap: &mut Swap,
    graph: &TransferGraph,
    log_count: usize,
    max_logs: usize,
) -> Attribution {
    if log_count > max_logs {
        swap.direction = Direction::TooComplicated;
        return Attribution::TooComplicated;
    }

    let trader = match swap.direction {
        Direction::BuyOrAdd => graph.top_receiver(&swap.main_token),
        Direction::SellOrRemove => graph.top_sender(&swap.main_token),
        _ => return Attribution::Skipped,
    };

    match trader {
        Some(address) => {
            swap.trader = Some(address);
            Attribution::Trader(address)
        }
        None if graph.is_empty() => {
            swap.direction = Direction::Arbitrage;
            Attribution::Arbitrage
        }
        None => Attribution::Unattributed,
    }
}

/// Attribute every swap of a block, one transfer graph per transaction.
/// `log_counts` holds the receipt log count of each transaction.
pub fn attribute_block(
    swaps: &mut [Swap],
    transfers: &[Transfer],
    log_counts: &HashMap<B256, usize>,
    max_logs: usize,
    is_infrastructure: impl Fn(&Address) -> bool,
) -> Vec<Attribution> {
    let mut by_tx: HashMap<B256, Vec<&Transfer>> = HashMap::new();
    for transfer in transfers {
        by_tx.entry(transfer.key.tx_hash).or_default().push(transfer);
    }

    let mut graphs: HashMap<B256, TransferGraph> = HashMap::new();
    swaps
        .iter_mut()
        .map(|swap| {
            let tx_hash = swap.key.tx_hash;
            let graph = graphs.entry(tx_hash).or_insert_with(|| {
                let tx_transfers = by_tx.get(&tx_hash).map(Vec::as_slice).unwrap_or_default();
                TransferGraph::build(tx_transfers.iter().copied(), &is_infrastructure)
            });
            let log_count = log_counts.get(&tx_hash).copied().unwrap_or_default();
            attribute_swap(swap, graph, log_count, max_logs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use indexer_core::types::{EventKey, ProtocolVariant, TransferKind};
    use std::collections::HashSet;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn tx() -> B256 {
        B256::repeat_byte(0x77)
    }

    fn transfer(log_index: u64, token: Address, from: Address, to: Address, amount: f64) -> Transfer {
        Transfer {
            key: EventKey::new(tx(), log_index),
            token,
            from,
            to,
            raw_amount: U256::ZERO,
            amount,
            value_usd: 0.0,
            kind: TransferKind::Unknown,
            block_number: 1,
            block_time: 1,
            operator: addr(0xee),
        }
    }

    fn swap(log_index: u64, pair: Address, main_token: Address, quote: Address, direction: Direction) -> Swap {
        Swap {
            key: EventKey::new(tx(), log_index),
            pair,
            block_number: 1,
            block_time: 1,
            variant: ProtocolVariant::V2,
            token0: quote,
            token1: main_token,
            amount0_in: U256::ZERO,
            amount1_in: U256::ZERO,
            amount0_out: U256::ZERO,
            amount1_out: U256::ZERO,
            main_token,
            main_amount: 1.0,
            price: 1.0,
            price_usd: 1.0,
            volume_usd: 1.0,
            direction,
            sender: addr(0xdd),
            recipient: addr(0xdd),
            operator: addr(0xee),
            trader: None,
            gas_price: 1,
        }
    }

    fn infra(set: &[Address]) -> impl Fn(&Address) -> bool {
        let set: HashSet<Address> = set.iter().copied().collect();
        move |a| set.contains(a)
    }

    const USDC: u8 = 0xa0;
    const WETH: u8 = 0xc0;
    const TOKEN: u8 = 0x70;

    #[test]
    fn test_simple_buy() {
        let (x, pair) = (addr(0x01), addr(0x11));
        let transfers = vec![
            transfer(0, addr(USDC), x, pair, 100.0),
            transfer(1, addr(WETH), pair, x, 0.05),
        ];
        let mut swaps = vec![swap(2, pair, addr(WETH), addr(USDC), Direction::BuyOrAdd)];
        let counts = HashMap::from([(tx(), 3)]);

        let outcomes = attribute_block(&mut swaps, &transfers, &counts, 100, infra(&[pair]));
        assert_eq!(outcomes, vec![Attribution::Trader(x)]);
        assert_eq!(swaps[0].trader, Some(x));
        assert_eq!(swaps[0].direction, Direction::BuyOrAdd);
    }

    #[test]
    fn test_router_multi_hop() {
        let (operator, receiver) = (addr(0x01), addr(0x02));
        let (router, p1, p2) = (addr(0x0f), addr(0x11), addr(0x12));
        let transfers = vec![
            transfer(0, addr(USDC), operator, p1, 100.0),
            transfer(1, addr(WETH), p1, router, 0.05),
            transfer(2, addr(WETH), router, p2, 0.05),
            transfer(3, addr(TOKEN), p2, receiver, 5000.0),
        ];
        let graph = TransferGraph::build(&transfers, infra(&[router, p1, p2]));

        let usdc = graph.flows(&addr(USDC)).unwrap();
        assert_eq!(usdc.from, vec![Flow { address: operator, amount: 100.0 }]);
        assert!(usdc.to.is_empty());
        assert!(graph.flows(&addr(WETH)).unwrap().from.is_empty());
        assert!(graph.flows(&addr(WETH)).unwrap().to.is_empty());
        assert_eq!(graph.top_receiver(&addr(TOKEN)), Some(receiver));

        let mut weth_leg = swap(4, p1, addr(WETH), addr(USDC), Direction::BuyOrAdd);
        let mut token_leg = swap(5, p2, addr(TOKEN), addr(WETH), Direction::BuyOrAdd);

        assert_eq!(attribute_swap(&mut weth_leg, &graph, 6, 100), Attribution::Unattributed);
        assert_eq!(weth_leg.trader, None);
        assert_eq!(weth_leg.direction, Direction::BuyOrAdd);

        assert_eq!(attribute_swap(&mut token_leg, &graph, 6, 100), Attribution::Trader(receiver));
    }

    #[test]
    fn test_deflationary_buy_picks_largest_receiver() {
        let (operator, receiver, sink1, sink2, pair) =
            (addr(0x01), addr(0x02), addr(0x03), addr(0x04), addr(0x11));
        let transfers = vec![
            transfer(0, addr(WETH), operator, pair, 1.0),
            transfer(1, addr(TOKEN), pair, sink1, 5.0),
            transfer(2, addr(TOKEN), pair, receiver, 90.0),
            transfer(3, addr(TOKEN), pair, sink2, 5.0),
        ];
        let graph = TransferGraph::build(&transfers, infra(&[pair]));

        let mut buy = swap(4, pair, addr(TOKEN), addr(WETH), Direction::BuyOrAdd);
        assert_eq!(attribute_swap(&mut buy, &graph, 5, 100), Attribution::Trader(receiver));
    }

    #[test]
    fn test_round_trip_cancels_once_per_occurrence() {
        let (bot, other, pair) = (addr(0x01), addr(0x02), addr(0x11));
        let transfers = vec![
            transfer(0, addr(WETH), bot, pair, 1.0),
            transfer(1, addr(WETH), pair, bot, 1.1),
            transfer(2, addr(WETH), pair, bot, 0.3),
            transfer(3, addr(WETH), other, pair, 0.2),
        ];
        let graph = TransferGraph::build(&transfers, infra(&[pair]));
        let weth = graph.flows(&addr(WETH)).unwrap();

        // one bot send cancels one bot receive; the second receive survives
        assert_eq!(weth.from, vec![Flow { address: other, amount: 0.2 }]);
        assert_eq!(weth.to, vec![Flow { address: bot, amount: 0.3 }]);
    }

    #[test]
    fn test_cancelled_pair_contributes_no_trader() {
        let (a, pair) = (addr(0x01), addr(0x11));
        let transfers = vec![
            transfer(0, addr(TOKEN), a, pair, 10.0),
            transfer(1, addr(TOKEN), pair, a, 9.0),
        ];
        let graph = TransferGraph::build(&transfers, infra(&[pair]));
        assert!(graph.flows(&addr(TOKEN)).unwrap().from.is_empty());
        assert!(graph.flows(&addr(TOKEN)).unwrap().to.is_empty());
        assert_eq!(graph.top_receiver(&addr(TOKEN)), None);
        assert_eq!(graph.top_sender(&addr(TOKEN)), None);
    }

    #[test]
    fn test_empty_graph_relabels_arbitrage() {
        let (bot, p1, p2) = (addr(0x01), addr(0x11), addr(0x12));
        let transfers = vec![
            transfer(0, addr(WETH), bot, p1, 1.0),
            transfer(1, addr(TOKEN), p1, p2, 50.0),
            transfer(2, addr(WETH), p2, bot, 1.02),
        ];
        let mut swaps = vec![
            swap(3, p1, addr(TOKEN), addr(WETH), Direction::BuyOrAdd),
            swap(4, p2, addr(TOKEN), addr(WETH), Direction::SellOrRemove),
        ];
        let counts = HashMap::from([(tx(), 5)]);

        let outcomes = attribute_block(&mut swaps, &transfers, &counts, 100, infra(&[p1, p2]));
        assert_eq!(outcomes, vec![Attribution::Arbitrage, Attribution::Arbitrage]);
        assert!(swaps.iter().all(|s| s.direction == Direction::Arbitrage && s.trader.is_none()));
    }

    #[test]
    fn test_too_many_logs_skips_attribution() {
        let (x, pair) = (addr(0x01), addr(0x11));
        let transfers = vec![transfer(0, addr(WETH), pair, x, 1.0)];
        let mut swaps = vec![swap(1, pair, addr(WETH), addr(USDC), Direction::BuyOrAdd)];
        let counts = HashMap::from([(tx(), 101)]);

        let outcomes = attribute_block(&mut swaps, &transfers, &counts, 100, infra(&[pair]));
        assert_eq!(outcomes, vec![Attribution::TooComplicated]);
        assert_eq!(swaps[0].direction, Direction::TooComplicated);
        assert_eq!(swaps[0].trader, None);
    }

    #[test]
    fn test_unknown_direction_is_skipped() {
        let graph = TransferGraph::default();
        let mut unpriced = swap(0, addr(0x11), addr(WETH), addr(USDC), Direction::Unknown);
        assert_eq!(attribute_swap(&mut unpriced, &graph, 1, 100), Attribution::Skipped);
        assert_eq!(unpriced.direction, Direction::Unknown);
    }
}
