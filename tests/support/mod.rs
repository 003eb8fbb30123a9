//! Shared fixtures for the behaviour tests: a scripted provider and in-memory stores.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use quoteflow_core::{
    AlphaVantageFetcher, HttpClient, HttpError, HttpRequest, HttpResponse, PipelineConfig,
    ProviderConfig, QuoteRecord, QuoteStore, WarehouseConfig, WarehouseError,
};
use serde_json::{json, Map, Value};

pub const API_KEY: &str = "test-key";

/// What the scripted provider does for one symbol.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(HttpResponse),
    Fail(HttpError),
    Hang,
}

/// Provider double keyed on the `symbol` query parameter. Unscripted symbols get a 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, symbol: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .insert(symbol.to_owned(), reply);
        self
    }

    pub fn ok(self, symbol: &str, body: impl Into<String>) -> Self {
        self.reply(symbol, Reply::Respond(HttpResponse::ok_json(body)))
    }

    pub fn status(self, symbol: &str, status: u16) -> Self {
        self.reply(
            symbol,
            Reply::Respond(HttpResponse::with_status(status, "{}")),
        )
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let symbol = query_param(&request.url, "symbol").unwrap_or_default();
            self.requests.lock().expect("requests lock").push(request);

            let reply = self
                .replies
                .lock()
                .expect("replies lock")
                .get(&symbol)
                .cloned();

            match reply {
                Some(Reply::Respond(response)) => Ok(response),
                Some(Reply::Fail(error)) => Err(error),
                Some(Reply::Hang) => std::future::pending().await,
                None => Ok(HttpResponse::with_status(404, "not scripted")),
            }
        })
    }
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_owned())
    })
}

/// One series entry: `(timestamp, close, volume)`; open/high/low are derived from close.
pub type Entry<'a> = (&'a str, f64, u64);

/// A `TIME_SERIES_INTRADAY` body for the 5min interval.
pub fn intraday_body(symbol: &str, entries: &[Entry<'_>]) -> String {
    intraday_value(symbol, "5min", entries).to_string()
}

pub fn intraday_value(symbol: &str, interval: &str, entries: &[Entry<'_>]) -> Value {
    let mut series = Map::new();
    for (timestamp, close, volume) in entries {
        series.insert(
            (*timestamp).to_owned(),
            json!({
                "1. open": format!("{:.4}", close - 0.5),
                "2. high": format!("{:.4}", close + 0.25),
                "3. low": format!("{:.4}", close - 1.0),
                "4. close": format!("{close:.4}"),
                "5. volume": volume.to_string(),
            }),
        );
    }

    let mut body = Map::new();
    body.insert(
        String::from("Meta Data"),
        json!({
            "1. Information": format!("Intraday ({interval}) open, high, low, close prices and volume"),
            "2. Symbol": symbol,
            "4. Interval": interval,
        }),
    );
    body.insert(format!("Time Series ({interval})"), Value::Object(series));
    Value::Object(body)
}

pub fn provider(timeout_ms: u64) -> ProviderConfig {
    ProviderConfig::new(API_KEY)
        .with_base_url("https://provider.test/query")
        .with_timeout_ms(timeout_ms)
}

pub fn fetcher(client: &Arc<ScriptedHttpClient>) -> AlphaVantageFetcher {
    AlphaVantageFetcher::new(client.clone(), provider(1_000))
}

pub fn pipeline_config(symbols: &str, warehouse: WarehouseConfig) -> PipelineConfig {
    PipelineConfig::new(provider(1_000), warehouse)
        .with_symbols(symbols)
        .expect("symbols")
}

/// Store double that keeps every record it was handed.
#[derive(Default)]
pub struct RecordingStore {
    records: Mutex<Vec<QuoteRecord>>,
}

impl RecordingStore {
    pub fn records(&self) -> Vec<QuoteRecord> {
        self.records.lock().expect("records lock").clone()
    }
}

impl QuoteStore for RecordingStore {
    fn upsert(&self, record: &QuoteRecord) -> Result<(), WarehouseError> {
        self.records
            .lock()
            .expect("records lock")
            .push(record.clone());
        Ok(())
    }
}

/// Store double that rejects writes for the listed symbols.
pub struct RejectingStore {
    pub rejected: Vec<&'static str>,
    pub inner: RecordingStore,
}

impl QuoteStore for RejectingStore {
    fn upsert(&self, record: &QuoteRecord) -> Result<(), WarehouseError> {
        if self.rejected.contains(&record.symbol.as_str()) {
            return Err(WarehouseError::InvalidData(format!(
                "write rejected for {}",
                record.symbol
            )));
        }
        self.inner.upsert(record)
    }
}

/// Store double that blocks its thread before accepting a write.
pub struct SlowStore {
    pub delay: Duration,
}

impl QuoteStore for SlowStore {
    fn upsert(&self, _record: &QuoteRecord) -> Result<(), WarehouseError> {
        thread::sleep(self.delay);
        Ok(())
    }
}
