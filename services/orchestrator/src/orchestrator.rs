//! Run pipeline: producer, worker pool, and per-order processing
//!
//! The producer samples an instrument, asks the pricer for order
//! attributes, and pushes to the work queue. Workers pop one order at a
//! time and, under the symbol's lock, add it to the book, match it, push a
//! book snapshot to the broadcaster, and fold the outcome into the
//! symbol's statistics. Matching failures are ordinary events: the order
//! rests, the reason is logged, and the run continues.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use broadcaster::Broadcaster;
use matching_engine::{match_order, Fill, MarketBooks, SymbolBook};
use rand::Rng;
use thiserror::Error;
use types::config::Config;
use types::errors::{ConfigError, OrderError, RegistryError};
use types::instrument::{Equity, Instrument, InstrumentRegistry, OptionContract};
use types::now_nanos;
use types::order::{Order, OrderId};

use crate::queue::OrderQueue;

/// Equity orders generated per option order during an options run.
const EQUITY_OPTION_ORDER_RATIO: u64 = 2;

/// Fatal orchestration failures. Match failures never appear here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub executed: u64,
    pub matched: u64,
    pub duration: Duration,
}

/// Owns the pools, the books, and the work queue for one run.
pub struct Orchestrator {
    config: Config,
    registry: InstrumentRegistry,
    books: Arc<MarketBooks>,
    queue: Arc<OrderQueue>,
}

impl Orchestrator {
    /// Validate the config, sample the instrument pools, and seed one book
    /// per pooled instrument.
    pub fn new(config: Config) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let mut rng = rand::thread_rng();
        let mut registry = InstrumentRegistry::new();
        registry.initialise(config.asset_class, config.underlying_pool_count, &mut rng);

        let books = Arc::new(MarketBooks::build(registry.instruments(), &mut rng));

        Ok(Self { config, registry, books, queue: Arc::new(OrderQueue::new()) })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn books(&self) -> &Arc<MarketBooks> {
        &self.books
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// Drive the full run: spawn the worker pool, generate orders until the
    /// target count (or a fatal synthesis error), drain, and summarize.
    pub fn run(&self, broadcaster: Option<&Broadcaster>) -> Result<RunSummary, OrchestratorError> {
        let started = Instant::now();
        let executed = AtomicU64::new(0);
        let matched = AtomicU64::new(0);
        let worker_count = num_cpus::get().max(1);

        let mut production: Result<(), OrchestratorError> = Ok(());

        thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| self.worker_loop(broadcaster, &executed, &matched));
            }

            production = self.produce_orders();
            self.queue.close();
        });

        production?;

        let summary = RunSummary {
            executed: executed.load(Ordering::Relaxed),
            matched: matched.load(Ordering::Relaxed),
            duration: started.elapsed(),
        };
        tracing::info!(
            executed = summary.executed,
            matched = summary.matched,
            duration_ms = summary.duration.as_millis() as u64,
            "run complete"
        );
        Ok(summary)
    }

    // === Production ===

    fn produce_orders(&self) -> Result<(), OrchestratorError> {
        let mut rng = rand::thread_rng();
        let infinite = self.config.orders_to_generate == -1;
        let target = if infinite { 0 } else { self.config.orders_to_generate as u64 };

        let mut generated: u64 = 0;
        let mut ticks: u64 = 0;

        while infinite || ticks < target {
            match self.generate_orders(&mut rng, &mut generated) {
                Ok(orders) => {
                    for order in orders {
                        self.queue.push(order);
                    }
                }
                Err(error) => {
                    // Fatal for the producer; workers drain what remains.
                    self.queue.close();
                    return Err(error);
                }
            }

            if !infinite {
                ticks += 1;
            }
        }

        Ok(())
    }

    /// One generation tick. Options runs emit an equity order for the
    /// option's underlying every tick and pair in the option order at the
    /// configured ratio.
    fn generate_orders<R: Rng>(
        &self,
        rng: &mut R,
        generated: &mut u64,
    ) -> Result<Vec<Order>, OrchestratorError> {
        let instrument = self.registry.random_instrument(self.config.asset_class, rng)?;
        let mut orders = Vec::with_capacity(2);

        match instrument {
            Instrument::Option(contract) => {
                orders.push(self.new_equity_order(rng, contract.underlying(), generated)?);

                if *generated % (EQUITY_OPTION_ORDER_RATIO + 1) == 0 && *generated != 0 {
                    orders.push(self.new_option_order(rng, contract, generated)?);
                }
            }
            Instrument::Equity(equity) => {
                orders.push(self.new_equity_order(rng, equity, generated)?);
            }
            Instrument::Future(_) => {
                orders.push(self.new_future_order(rng, instrument, generated)?);
            }
        }

        Ok(orders)
    }

    fn next_id(generated: &mut u64) -> OrderId {
        let id = OrderId(*generated);
        *generated += 1;
        id
    }

    fn new_equity_order<R: Rng>(
        &self,
        rng: &mut R,
        equity: Equity,
        generated: &mut u64,
    ) -> Result<Order, OrchestratorError> {
        let instrument = Instrument::Equity(equity);
        let quote = if self.config.use_pricer {
            let mut book = self.books.book(instrument)?.lock();
            pricer::synthesize_equity(rng, &mut book.stats)
        } else {
            pricer::random_spot_quote(rng, &self.config)
        };

        let order = Order::create(
            Self::next_id(generated),
            instrument,
            quote.side,
            quote.price,
            quote.quantity,
            now_nanos(),
        )?;
        Ok(order)
    }

    fn new_future_order<R: Rng>(
        &self,
        rng: &mut R,
        instrument: Instrument,
        generated: &mut u64,
    ) -> Result<Order, OrchestratorError> {
        let quote = match (self.config.use_pricer, instrument) {
            (true, Instrument::Future(future)) => {
                let mut book = self.books.book(instrument)?.lock();
                pricer::synthesize_future(rng, future, &mut book.stats)
            }
            _ => pricer::random_spot_quote(rng, &self.config),
        };

        let order = Order::create(
            Self::next_id(generated),
            instrument,
            quote.side,
            quote.price,
            quote.quantity,
            now_nanos(),
        )?;
        Ok(order)
    }

    fn new_option_order<R: Rng>(
        &self,
        rng: &mut R,
        contract: OptionContract,
        generated: &mut u64,
    ) -> Result<Order, OrchestratorError> {
        let instrument = Instrument::Option(contract);
        let quote = if self.config.use_pricer {
            // Snapshot the underlying's statistics under its own lock, then
            // release before taking the option's lock.
            let underlying_stats = {
                let underlying = Instrument::Equity(contract.underlying());
                let book = self.books.book(underlying)?.lock();
                book.stats.clone()
            };

            let mut book = self.books.book(instrument)?.lock();
            pricer::synthesize_option(rng, contract, &mut book.stats, &underlying_stats)
        } else {
            pricer::random_option_quote(rng, &self.config, contract)
        };

        let order = Order::create_option(
            Self::next_id(generated),
            instrument,
            quote.side,
            quote.price,
            quote.quantity,
            now_nanos(),
            quote.details,
        )?;
        Ok(order)
    }

    // === Processing ===

    fn worker_loop(
        &self,
        broadcaster: Option<&Broadcaster>,
        executed: &AtomicU64,
        matched: &AtomicU64,
    ) {
        while let Some(order) = self.queue.pop() {
            match self.process_order(order, broadcaster) {
                Ok(true) => {
                    matched.fetch_add(1, Ordering::Relaxed);
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::error!(%error, "order processing failed");
                }
            }
            executed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Process one order under its symbol's lock: add to book, match,
    /// broadcast the book, and update statistics. Returns whether the order
    /// matched.
    fn process_order(
        &self,
        order: Order,
        broadcaster: Option<&Broadcaster>,
    ) -> Result<bool, OrchestratorError> {
        let instrument = order.instrument();
        let order_id = order.id();

        let mut book = self.books.book(instrument)?.lock();
        book.insert_order(order);

        let outcome = match_order(&mut book, order_id, None);

        if let Some(broadcaster) = broadcaster {
            let (best_bid, best_ask) = book.top_of_book();
            broadcaster.broadcast_book(instrument, best_bid, best_ask);
        }

        if let Some(processed) = book.order(order_id).cloned() {
            let mut rng = rand::thread_rng();
            pricer::update_market_data(&mut rng, &mut book.stats, &processed);
        }

        match outcome {
            Ok(fills) => {
                if let Some(broadcaster) = broadcaster {
                    let transactions = book.transactions();
                    let start = transactions.len().saturating_sub(fills.len());
                    for transaction in &transactions[start..] {
                        broadcaster.broadcast_trade(transaction);
                    }
                }

                if tracing::enabled!(tracing::Level::DEBUG) {
                    for fill in &fills {
                        tracing::debug!("{}", fill_report(&book, fill));
                    }
                }
                Ok(true)
            }
            Err(reason) => {
                if let Some(order) = book.order(order_id) {
                    tracing::debug!(
                        "Order: {} | Asset class: {} | Matched with: N/A | Side: {} | \
                         Ticker: {} | Price: ${} | Qnty: {} | Remaining Qnty: {}{} | Reason: {}",
                        order.id(),
                        instrument.asset_class(),
                        order.side(),
                        instrument,
                        order.price(),
                        order.quantity(),
                        order.outstanding(),
                        option_details(order),
                        reason
                    );
                }
                Ok(false)
            }
        }
    }
}

fn option_details(order: &Order) -> String {
    match order.option() {
        Some(details) => format!(
            " | Strike: ${:.2} | Type: {} | Expiry: {:.2}y",
            details.strike, details.kind, details.expiry_years
        ),
        None => String::new(),
    }
}

fn fill_side_report(book: &SymbolBook, order_id: OrderId, counterparty: OrderId) -> String {
    match book.order(order_id) {
        Some(order) => {
            let fulfilled = if order.outstanding() == 0 { " [FULFILLED]" } else { "" };
            format!(
                "Order: {} | Asset class: {} | Status: Matched | Matched with: {} | Side: {} | \
                 Ticker: {} | Price: ${} | Qnty: {} | Remaining Qnty: {}{}",
                order.id(),
                order.instrument().asset_class(),
                counterparty,
                order.side(),
                order.instrument(),
                order.price(),
                order.quantity(),
                order.outstanding(),
                fulfilled
            )
        }
        None => format!("Order: {order_id} | <missing>"),
    }
}

fn fill_report(book: &SymbolBook, fill: &Fill) -> String {
    format!(
        "{}\n{}",
        fill_side_report(book, fill.incoming_id, fill.resting_id),
        fill_side_report(book, fill.resting_id, fill.incoming_id)
    )
}
