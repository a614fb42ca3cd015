//! Rolling pair statistics over gap-filled candle series.

use indexer_candles::Kline;
use indexer_core::types::TradeStats;

/// Change reported when the previous window had no activity and the current one has
pub const INFINITE_CHANGE: f64 = 1.0;

/// 60 minute candles for the 1h window, twice that to compare against the previous hour
pub const MINUTE_CANDLES: usize = 120;
/// 24 hour candles for the 24h window, twice that to compare against the previous day
pub const HOUR_CANDLES: usize = 48;

struct Window {
    tx_num: u64,
    volume_usd: f64,
    tx_change: Option<f64>,
    volume_change: Option<f64>,
    price_change: Option<f64>,
}

fn change(current: f64, previous: f64) -> f64 {
    let delta = current - previous;
    if delta == 0.0 {
        0.0
    } else if previous == 0.0 {
        INFINITE_CHANGE
    } else {
        delta / previous
    }
}

/// Sums over the trailing `span` candles; changes against the `span` before
/// them when the series is exactly `2 * span` long, and price change against
/// the close `span` candles back.
fn window(series: &[Kline], span: usize) -> Window {
    let split = series.len().saturating_sub(span);
    let recent = &series[split..];
    let tx_num: u64 = recent.iter().map(|k| k.tx_num).sum();
    let volume_usd: f64 = recent.iter().map(|k| k.volume_usd).sum();

    let (tx_change, volume_change) = if series.len() == 2 * span {
        let previous = &series[..span];
        let prev_tx: u64 = previous.iter().map(|k| k.tx_num).sum();
        let prev_volume: f64 = previous.iter().map(|k| k.volume_usd).sum();
        (
            Some(change(tx_num as f64, prev_tx as f64)),
            Some(change(volume_usd, prev_volume)),
        )
    } else {
        (None, None)
    };

    let price_change = match series.last() {
        Some(last) if series.len() > span => {
            let reference = series[series.len() - span - 1].close;
            Some(if reference != 0.0 {
                (last.close - reference) / reference
            } else {
                0.0
            })
        }
        _ => None,
    };

    Window {
        tx_num,
        volume_usd,
        tx_change,
        volume_change,
        price_change,
    }
}

/// Recompute statistics from the minute and hour series; fields that cannot
/// be derived from short history keep their `previous` value.
pub fn compute(previous: &TradeStats, minutes: &[Kline], hours: &[Kline], now: u64) -> TradeStats {
    let mut stats = TradeStats {
        updated_at: now,
        ..*previous
    };

    let hour = window(minutes, MINUTE_CANDLES / 2);
    stats.tx_num_1h = hour.tx_num;
    stats.volume_usd_1h = hour.volume_usd;
    if let Some(change) = hour.tx_change {
        stats.tx_change_1h = change;
    }
    if let Some(change) = hour.volume_change {
        stats.volume_change_1h = change;
    }
    if let Some(change) = hour.price_change {
        stats.price_change_1h = change;
    }
    if let Some(last) = minutes.last() {
        stats.price = last.close;
        stats.price_usd = last.price_usd;
    }

    let day = window(hours, HOUR_CANDLES / 2);
    stats.tx_num_24h = day.tx_num;
    stats.volume_usd_24h = day.volume_usd;
    if let Some(change) = day.tx_change {
        stats.tx_change_24h = change;
    }
    if let Some(change) = day.volume_change {
        stats.volume_change_24h = change;
    }
    if let Some(change) = day.price_change {
        stats.price_change_24h = change;
    }

    // young pairs: the hour series may lag the minute series
    stats.tx_num_24h = stats.tx_num_24h.max(stats.tx_num_1h);
    stats.volume_usd_24h = stats.volume_usd_24h.max(stats.volume_usd_1h);

    stats
}
