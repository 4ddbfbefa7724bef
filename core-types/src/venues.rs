//! Venue registry: the exchanges the data service covers and the channel
//! names each venue publishes.

pub const EXCHANGES: &[&str] = &[
    "bitmex",
    "binance",
    "binance-futures",
    "deribit",
    "bitstamp",
    "coinbase",
    "cryptofacilities",
    "kraken",
    "bitfinex",
    "bitfinex-derivatives",
    "okex",
    "binance-jersey",
    "binance-dex",
    "ftx",
    "gemini",
    "bitflyer",
];

const BINANCE_CHANNELS: &[&str] = &["trade", "ticker", "depth", "miniTicker", "depthSnapshot"];

const BINANCE_DEX_CHANNELS: &[&str] =
    &["trades", "marketDiff", "kline_1m", "ticker", "depthSnapshot"];

const BINANCE_FUTURES_CHANNELS: &[&str] =
    &["aggTrade", "ticker", "depth", "markPrice", "depthSnapshot"];

const BITFINEX_CHANNELS: &[&str] = &["trades", "book"];

const BITFINEX_DERIV_CHANNELS: &[&str] = &["trades", "book", "status"];

const BITFLYER_CHANNELS: &[&str] = &[
    "lightning_board_snapshot",
    "lightning_board",
    "lightning_ticker",
    "lightning_executions",
];

const BITMEX_CHANNELS: &[&str] = &[
    "trade",
    "orderBookL2",
    "liquidation",
    "connected",
    "announcement",
    "chat",
    "publicNotifications",
    "instrument",
    "settlement",
    "funding",
    "insurance",
    "orderBookL2_25",
    "quote",
    "quoteBin1m",
    "quoteBin5m",
    "quoteBin1h",
    "quoteBin1d",
    "tradeBin1m",
    "tradeBin5m",
    "tradeBin1h",
    "tradeBin1d",
];

const BITSTAMP_CHANNELS: &[&str] = &["live_trades", "live_orders", "diff_order_book"];

const COINBASE_CHANNELS: &[&str] = &[
    "subscriptions",
    "received",
    "open",
    "done",
    "match",
    "change",
    "l2update",
    "ticker",
    "snapshot",
    "last_match",
    "full_snapshot",
];

const CRYPTOFACILITIES_CHANNELS: &[&str] = &[
    "trade",
    "trade_snapshot",
    "book",
    "book_snapshot",
    "ticker",
    "heartbeat",
];

const DERIBIT_CHANNELS: &[&str] = &[
    "book",
    "deribit_price_index",
    "deribit_price_ranking",
    "estimated_expiration_price",
    "markprice.options",
    "perpetual",
    "trades",
    "ticker",
    "quote",
];

const FTX_CHANNELS: &[&str] = &["orderbook", "trades"];

const GEMINI_CHANNELS: &[&str] = &[
    "trade",
    "l2_updates",
    "auction_open",
    "auction_indicative",
    "auction_result",
];

const KRAKEN_CHANNELS: &[&str] = &["ticker", "trade", "book", "spread"];

const OKEX_CHANNELS: &[&str] = &[
    "spot/ticker",
    "spot/trade",
    "spot/depth",
    "swap/ticker",
    "swap/trade",
    "swap/depth",
    "swap/funding_rate",
    "swap/price_range",
    "swap/mark_price",
    "futures/ticker",
    "futures/trade",
    "futures/depth",
    "futures/price_range",
    "futures/mark_price",
    "futures/estimated_price",
];

pub fn is_known_exchange(exchange: &str) -> bool {
    EXCHANGES.contains(&exchange)
}

/// Channel names the given venue publishes, or `None` for unknown venues.
pub fn channels_for(exchange: &str) -> Option<&'static [&'static str]> {
    let channels = match exchange {
        "bitmex" => BITMEX_CHANNELS,
        "coinbase" => COINBASE_CHANNELS,
        "deribit" => DERIBIT_CHANNELS,
        "cryptofacilities" => CRYPTOFACILITIES_CHANNELS,
        "bitstamp" => BITSTAMP_CHANNELS,
        "kraken" => KRAKEN_CHANNELS,
        "okex" => OKEX_CHANNELS,
        "binance" | "binance-jersey" => BINANCE_CHANNELS,
        "binance-dex" => BINANCE_DEX_CHANNELS,
        "bitfinex" => BITFINEX_CHANNELS,
        "ftx" => FTX_CHANNELS,
        "gemini" => GEMINI_CHANNELS,
        "bitflyer" => BITFLYER_CHANNELS,
        "binance-futures" => BINANCE_FUTURES_CHANNELS,
        "bitfinex-derivatives" => BITFINEX_DERIV_CHANNELS,
        _ => return None,
    };
    Some(channels)
}
