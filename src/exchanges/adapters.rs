//! Built-in ticker adapters for the supported exchanges.
//!
//! Each adapter pairs a request path with the JSON location of the last
//! traded price in that exchange's public ticker response.

use serde_json::Value;

use super::ExchangeAdapter;
use super::utils::first_in;
use crate::domain::Pair;

/// Identifiers of the built-in exchanges, in scan order.
pub const BUILTIN_EXCHANGES: [&str; 8] = [
    "binance", "kucoin", "mexc", "okx", "bybit", "gateio", "huobi", "bitfinex",
];

/// Resolves a config identifier to its entry in [`BUILTIN_EXCHANGES`].
///
/// Matching is case-insensitive; "gate" and "gate.io" are accepted for Gate.io.
pub fn canonical_id(id: &str) -> Option<&'static str> {
    match id.trim().to_lowercase().as_str() {
        "gate" | "gate.io" => Some("gateio"),
        other => BUILTIN_EXCHANGES.iter().copied().find(|b| *b == other),
    }
}

/// Returns the built-in adapter for a config identifier.
pub fn builtin(id: &str) -> Option<ExchangeAdapter> {
    let adapter = match canonical_id(id)? {
        "binance" => {
            ExchangeAdapter::new("Binance", "https://api.binance.com", binance_path, binance_price)
        }
        "kucoin" => {
            ExchangeAdapter::new("KuCoin", "https://api.kucoin.com", kucoin_path, kucoin_price)
        }
        "mexc" => ExchangeAdapter::new("MEXC", "https://www.mexc.com", mexc_path, data_first_last),
        "okx" => ExchangeAdapter::new("OKX", "https://www.okx.com", okx_path, data_first_last),
        "bybit" => ExchangeAdapter::new("Bybit", "https://api.bybit.com", bybit_path, bybit_price),
        "gateio" => {
            ExchangeAdapter::new("Gate.io", "https://api.gate.io", gateio_path, gateio_price)
        }
        "huobi" => ExchangeAdapter::new("Huobi", "https://api.huobi.pro", huobi_path, huobi_price),
        "bitfinex" => ExchangeAdapter::new(
            "Bitfinex",
            "https://api-pub.bitfinex.com",
            bitfinex_path,
            bitfinex_price,
        ),
        _ => return None,
    };
    Some(adapter)
}

fn binance_path(pair: &Pair) -> String {
    format!("/api/v3/ticker/price?symbol={}", pair.concat())
}

fn binance_price(body: &Value) -> Option<&Value> {
    body.get("price")
}

fn kucoin_path(pair: &Pair) -> String {
    format!("/api/v1/market/orderbook/level1?symbol={}", pair.joined("-"))
}

fn kucoin_price(body: &Value) -> Option<&Value> {
    body.get("data")?.get("price")
}

fn mexc_path(pair: &Pair) -> String {
    format!("/open/api/v2/market/ticker?symbol={}", pair.joined("_"))
}

fn okx_path(pair: &Pair) -> String {
    format!("/api/v5/market/ticker?instId={}", pair.joined("-"))
}

/// MEXC and OKX both answer `{"data": [{"last": ...}]}`.
fn data_first_last(body: &Value) -> Option<&Value> {
    first_in(body, "data")?.get("last")
}

fn bybit_path(pair: &Pair) -> String {
    format!("/v2/public/tickers?symbol={}", pair.concat())
}

fn bybit_price(body: &Value) -> Option<&Value> {
    first_in(body, "result")?.get("last_price")
}

fn gateio_path(pair: &Pair) -> String {
    format!("/api2/1/ticker/{}", pair.concat().to_lowercase())
}

fn gateio_price(body: &Value) -> Option<&Value> {
    body.get("last")
}

fn huobi_path(pair: &Pair) -> String {
    format!("/market/detail/merged?symbol={}", pair.concat().to_lowercase())
}

fn huobi_price(body: &Value) -> Option<&Value> {
    body.get("tick")?.get("close")
}

fn bitfinex_path(pair: &Pair) -> String {
    format!("/v2/ticker/t{}", pair.concat())
}

/// Bitfinex tickers are flat arrays; LAST_PRICE sits at index 6.
fn bitfinex_price(body: &Value) -> Option<&Value> {
    body.as_array()?.get(6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::FetchError;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn btc() -> Pair {
        Pair::new("BTC", "USDT")
    }

    fn adapter(id: &str) -> ExchangeAdapter {
        builtin(id).unwrap()
    }

    fn assert_parse_failure(id: &str, body: Value) {
        let result = adapter(id).parse(&body);
        assert!(
            matches!(result, Err(FetchError::ParseFailure(_))),
            "{} should reject {}: got {:?}",
            id,
            body,
            result
        );
    }

    // ==================== URL building ====================

    #[test]
    fn test_build_urls() {
        let cases = [
            ("binance", "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT"),
            ("kucoin", "https://api.kucoin.com/api/v1/market/orderbook/level1?symbol=BTC-USDT"),
            ("mexc", "https://www.mexc.com/open/api/v2/market/ticker?symbol=BTC_USDT"),
            ("okx", "https://www.okx.com/api/v5/market/ticker?instId=BTC-USDT"),
            ("bybit", "https://api.bybit.com/v2/public/tickers?symbol=BTCUSDT"),
            ("gateio", "https://api.gate.io/api2/1/ticker/btcusdt"),
            ("huobi", "https://api.huobi.pro/market/detail/merged?symbol=btcusdt"),
            ("bitfinex", "https://api-pub.bitfinex.com/v2/ticker/tBTCUSDT"),
        ];
        for (id, url) in cases {
            assert_eq!(adapter(id).build_url(&btc()), url, "{}", id);
        }
    }

    #[test]
    fn test_build_url_with_long_base_symbol() {
        let pair = Pair::new("DOGE", "USDT");
        assert_eq!(
            adapter("kucoin").build_url(&pair),
            "https://api.kucoin.com/api/v1/market/orderbook/level1?symbol=DOGE-USDT"
        );
    }

    #[test]
    fn test_with_base_url_override() {
        let a = adapter("binance").with_base_url("http://127.0.0.1:9999/");
        assert_eq!(a.base_url(), "http://127.0.0.1:9999");
        assert_eq!(
            a.build_url(&btc()),
            "http://127.0.0.1:9999/api/v3/ticker/price?symbol=BTCUSDT"
        );
    }

    #[test]
    fn test_builtin_names_and_aliases() {
        assert_eq!(adapter("BINANCE").name(), "Binance");
        assert_eq!(adapter("gate").name(), "Gate.io");
        assert_eq!(adapter("gate.io").name(), "Gate.io");
        assert!(builtin("poloniex").is_none());
    }

    #[test]
    fn test_every_builtin_id_resolves() {
        for id in BUILTIN_EXCHANGES {
            assert!(builtin(id).is_some(), "{}", id);
        }
    }

    // ==================== Valid fixtures ====================

    #[test]
    fn test_parse_binance() {
        let body = json!({"symbol": "BTCUSDT", "price": "42000.50000000"});
        assert_eq!(adapter("binance").parse(&body), Ok(Decimal::new(4200050, 2)));
    }

    #[test]
    fn test_parse_kucoin() {
        let body = json!({
            "code": "200000",
            "data": {"time": 1700000000000u64, "sequence": "1", "price": "42001.1", "size": "0.01"}
        });
        assert_eq!(adapter("kucoin").parse(&body), Ok(Decimal::new(420011, 1)));
    }

    #[test]
    fn test_parse_mexc() {
        let body = json!({"code": 200, "data": [{"symbol": "BTC_USDT", "last": "41999.9"}]});
        assert_eq!(adapter("mexc").parse(&body), Ok(Decimal::new(419999, 1)));
    }

    #[test]
    fn test_parse_okx() {
        let body =
            json!({"code": "0", "msg": "", "data": [{"instId": "BTC-USDT", "last": "42002"}]});
        assert_eq!(adapter("okx").parse(&body), Ok(Decimal::new(42002, 0)));
    }

    #[test]
    fn test_parse_bybit() {
        let body =
            json!({"ret_code": 0, "result": [{"symbol": "BTCUSDT", "last_price": "42003.5"}]});
        assert_eq!(adapter("bybit").parse(&body), Ok(Decimal::new(420035, 1)));
    }

    #[test]
    fn test_parse_gateio() {
        let body = json!({"result": "true", "last": "42004.25", "highestBid": "42004"});
        assert_eq!(adapter("gateio").parse(&body), Ok(Decimal::new(4200425, 2)));
    }

    #[test]
    fn test_parse_huobi() {
        let body = json!({"status": "ok", "tick": {"close": 42005.75, "open": 41000.0}});
        assert_eq!(adapter("huobi").parse(&body), Ok(Decimal::new(4200575, 2)));
    }

    #[test]
    fn test_parse_bitfinex() {
        let body = json!([42000, 1.5, 42001, 2.0, 120, 0.0029, 42006.5, 1000.0, 43000, 41000]);
        assert_eq!(adapter("bitfinex").parse(&body), Ok(Decimal::new(420065, 1)));
    }

    // ==================== Malformed fixtures ====================

    #[test]
    fn test_parse_missing_fields() {
        assert_parse_failure("binance", json!({"code": -1121, "msg": "Invalid symbol."}));
        assert_parse_failure("kucoin", json!({"code": "200000", "data": null}));
        assert_parse_failure("mexc", json!({"code": 400, "msg": "symbol not exist"}));
        assert_parse_failure("okx", json!({"code": "51001", "data": []}));
        assert_parse_failure("bybit", json!({"ret_code": 10001, "result": []}));
        assert_parse_failure(
            "gateio",
            json!({"result": "false", "message": "Error: invalid currency pair"}),
        );
        assert_parse_failure("huobi", json!({"status": "error", "err-msg": "invalid symbol"}));
        assert_parse_failure("bitfinex", json!(["error", 10020, "symbol: invalid"]));
    }

    #[test]
    fn test_parse_non_numeric_price() {
        assert_parse_failure("binance", json!({"price": "n/a"}));
        assert_parse_failure("huobi", json!({"tick": {"close": null}}));
        assert_parse_failure("okx", json!({"data": [{"last": ""}]}));
    }

    #[test]
    fn test_parse_non_positive_price() {
        assert_parse_failure("binance", json!({"price": "0"}));
        assert_parse_failure("gateio", json!({"last": "-1.5"}));
    }

    #[test]
    fn test_parse_wrong_shape() {
        for id in BUILTIN_EXCHANGES {
            assert_parse_failure(id, json!("unexpected"));
            assert_parse_failure(id, json!(42));
        }
    }
}
