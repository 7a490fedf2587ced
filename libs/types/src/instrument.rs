//! Asset families, symbols, and the sampled instrument registry
//!
//! Three instrument families are simulated: cash equities, dated futures,
//! and equity options. Contracts are plain value types; an option's
//! underlying equity is a pure function of its ticker. The registry holds
//! the runtime-selected pool sampled from each family's full enumeration.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

use crate::errors::RegistryError;

/// Instrument family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Equity,
    Future,
    Option,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetClass::Equity => "Equity",
            AssetClass::Future => "Future",
            AssetClass::Option => "Option",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Equities
// ---------------------------------------------------------------------------

/// Cash equity tickers available to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Equity {
    AAPL,
    MSFT,
    GOOGL,
    AMZN,
    META,
    BLK,
    NVDA,
    AMD,
    INTC,
    QCOM,
    JPM,
    BAC,
    CRM,
    GS,
    MS,
    ORCL,
    IBM,
    TSM,
    UBER,
    LYFT,
}

impl Equity {
    pub const ALL: [Equity; 20] = [
        Equity::AAPL,
        Equity::MSFT,
        Equity::GOOGL,
        Equity::AMZN,
        Equity::META,
        Equity::BLK,
        Equity::NVDA,
        Equity::AMD,
        Equity::INTC,
        Equity::QCOM,
        Equity::JPM,
        Equity::BAC,
        Equity::CRM,
        Equity::GS,
        Equity::MS,
        Equity::ORCL,
        Equity::IBM,
        Equity::TSM,
        Equity::UBER,
        Equity::LYFT,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Equity::AAPL => "AAPL",
            Equity::MSFT => "MSFT",
            Equity::GOOGL => "GOOGL",
            Equity::AMZN => "AMZN",
            Equity::META => "META",
            Equity::BLK => "BLK",
            Equity::NVDA => "NVDA",
            Equity::AMD => "AMD",
            Equity::INTC => "INTC",
            Equity::QCOM => "QCOM",
            Equity::JPM => "JPM",
            Equity::BAC => "BAC",
            Equity::CRM => "CRM",
            Equity::GS => "GS",
            Equity::MS => "MS",
            Equity::ORCL => "ORCL",
            Equity::IBM => "IBM",
            Equity::TSM => "TSM",
            Equity::UBER => "UBER",
            Equity::LYFT => "LYFT",
        }
    }
}

impl fmt::Display for Equity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Contract months
// ---------------------------------------------------------------------------

/// Quarterly expiry cycle shared by futures and options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExpiryMonth {
    Mar26,
    Jun26,
    Sep26,
    Dec26,
}

impl ExpiryMonth {
    pub const ALL: [ExpiryMonth; 4] = [
        ExpiryMonth::Mar26,
        ExpiryMonth::Jun26,
        ExpiryMonth::Sep26,
        ExpiryMonth::Dec26,
    ];

    /// Calendar month number (1-12) of the expiry.
    pub fn month(&self) -> u32 {
        match self {
            ExpiryMonth::Mar26 => 3,
            ExpiryMonth::Jun26 => 6,
            ExpiryMonth::Sep26 => 9,
            ExpiryMonth::Dec26 => 12,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpiryMonth::Mar26 => "MAR26",
            ExpiryMonth::Jun26 => "JUN26",
            ExpiryMonth::Sep26 => "SEP26",
            ExpiryMonth::Dec26 => "DEC26",
        }
    }

    /// Time to expiry in years, at month granularity.
    ///
    /// The expiry year is ignored so contracts never expire out from under a
    /// long-running simulation; the same calendar month means one month out.
    pub fn years_to_expiry_from(&self, current_month: u32) -> f64 {
        let expiry = self.month();
        let months = if expiry == current_month {
            1.0
        } else {
            (expiry as f64 - current_month as f64).abs()
        };
        months / 12.0
    }

    /// Time to expiry in years from the current wall-clock month.
    pub fn years_to_expiry(&self) -> f64 {
        use chrono::Datelike;
        self.years_to_expiry_from(chrono::Utc::now().month())
    }
}

impl fmt::Display for ExpiryMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Futures
// ---------------------------------------------------------------------------

/// Tickers with listed futures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FutureTicker {
    AAPL,
    MSFT,
    TSLA,
}

impl FutureTicker {
    pub const ALL: [FutureTicker; 3] = [FutureTicker::AAPL, FutureTicker::MSFT, FutureTicker::TSLA];

    pub fn symbol(&self) -> &'static str {
        match self {
            FutureTicker::AAPL => "AAPL",
            FutureTicker::MSFT => "MSFT",
            FutureTicker::TSLA => "TSLA",
        }
    }
}

/// A dated futures contract, e.g. `AAPL_MAR26`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Future {
    pub ticker: FutureTicker,
    pub month: ExpiryMonth,
}

impl Future {
    /// Full enumeration: every ticker crossed with every expiry.
    pub fn all() -> Vec<Future> {
        let mut contracts = Vec::with_capacity(FutureTicker::ALL.len() * ExpiryMonth::ALL.len());
        for ticker in FutureTicker::ALL {
            for month in ExpiryMonth::ALL {
                contracts.push(Future { ticker, month });
            }
        }
        contracts
    }
}

impl fmt::Display for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.ticker.symbol(), self.month)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Call/Put tag carried in the contract symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            OptionKind::Call => "C",
            OptionKind::Put => "P",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptionKind::Call => "Call",
            OptionKind::Put => "Put",
        };
        write!(f, "{s}")
    }
}

/// Tickers with listed options.
///
/// Every optionable ticker must resolve to a cash equity: option orders
/// inherit spot-price data from the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionTicker {
    AAPL,
    MSFT,
    NVDA,
}

impl OptionTicker {
    pub const ALL: [OptionTicker; 3] = [OptionTicker::AAPL, OptionTicker::MSFT, OptionTicker::NVDA];

    pub fn symbol(&self) -> &'static str {
        match self {
            OptionTicker::AAPL => "AAPL",
            OptionTicker::MSFT => "MSFT",
            OptionTicker::NVDA => "NVDA",
        }
    }

    /// The cash equity underlying this option ticker.
    pub fn underlying(&self) -> Equity {
        match self {
            OptionTicker::AAPL => Equity::AAPL,
            OptionTicker::MSFT => Equity::MSFT,
            OptionTicker::NVDA => Equity::NVDA,
        }
    }
}

/// A listed option contract, e.g. `AAPL_MAR26_C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionContract {
    pub ticker: OptionTicker,
    pub month: ExpiryMonth,
    pub kind: OptionKind,
}

impl OptionContract {
    /// Full enumeration: ticker x expiry x call/put.
    pub fn all() -> Vec<OptionContract> {
        let mut contracts =
            Vec::with_capacity(OptionTicker::ALL.len() * ExpiryMonth::ALL.len() * 2);
        for ticker in OptionTicker::ALL {
            for month in ExpiryMonth::ALL {
                for kind in [OptionKind::Call, OptionKind::Put] {
                    contracts.push(OptionContract { ticker, month, kind });
                }
            }
        }
        contracts
    }

    /// The cash equity this contract derives its spot data from.
    pub fn underlying(&self) -> Equity {
        self.ticker.underlying()
    }
}

impl fmt::Display for OptionContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.ticker.symbol(), self.month, self.kind.suffix())
    }
}

// ---------------------------------------------------------------------------
// Instrument
// ---------------------------------------------------------------------------

/// Any tradable instrument in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    Equity(Equity),
    Future(Future),
    Option(OptionContract),
}

impl Instrument {
    pub fn asset_class(&self) -> AssetClass {
        match self {
            Instrument::Equity(_) => AssetClass::Equity,
            Instrument::Future(_) => AssetClass::Future,
            Instrument::Option(_) => AssetClass::Option,
        }
    }

    pub fn symbol(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Equity(eq) => write!(f, "{eq}"),
            Instrument::Future(fut) => write!(f, "{fut}"),
            Instrument::Option(opt) => write!(f, "{opt}"),
        }
    }
}

impl From<Equity> for Instrument {
    fn from(eq: Equity) -> Self {
        Instrument::Equity(eq)
    }
}

impl From<Future> for Instrument {
    fn from(fut: Future) -> Self {
        Instrument::Future(fut)
    }
}

impl From<OptionContract> for Instrument {
    fn from(opt: OptionContract) -> Self {
        Instrument::Option(opt)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Runtime-selected instrument pools.
///
/// Holds, for the configured asset class, a shuffled N-element sample of the
/// family's full enumeration. An Option run also carries an equity pool
/// because options read spot data from their underlying; underlyings of
/// pooled options are always included so the lookup cannot miss.
///
/// Initialization is one-shot: a second call is a no-op.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    equities: Vec<Equity>,
    futures: Vec<Future>,
    options: Vec<OptionContract>,
    initialised: bool,
}

fn sample<T: Copy, R: Rng>(full: &[T], pool_size: usize, rng: &mut R) -> Vec<T> {
    let mut pool: Vec<T> = full.to_vec();
    if pool_size > 0 && pool_size < pool.len() {
        pool.shuffle(rng);
        pool.truncate(pool_size);
    }
    pool
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the pools for the given asset class. No-op once initialised.
    pub fn initialise<R: Rng>(&mut self, asset_class: AssetClass, pool_size: usize, rng: &mut R) {
        if self.initialised {
            return;
        }

        match asset_class {
            AssetClass::Equity => {
                self.equities = sample(&Equity::ALL, pool_size, rng);
            }
            AssetClass::Future => {
                self.futures = sample(&Future::all(), pool_size, rng);
            }
            AssetClass::Option => {
                self.options = sample(&OptionContract::all(), pool_size, rng);
                self.equities = sample(&Equity::ALL, pool_size, rng);

                // Spot data for every pooled option must resolve.
                for opt in &self.options {
                    let underlying = opt.underlying();
                    if !self.equities.contains(&underlying) {
                        self.equities.push(underlying);
                    }
                }
            }
        }

        self.initialised = true;
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn equities(&self) -> &[Equity] {
        &self.equities
    }

    pub fn futures(&self) -> &[Future] {
        &self.futures
    }

    pub fn options(&self) -> &[OptionContract] {
        &self.options
    }

    /// Every instrument that needs a book and price data for this run.
    pub fn instruments(&self) -> Vec<Instrument> {
        let mut all: Vec<Instrument> = Vec::new();
        all.extend(self.equities.iter().copied().map(Instrument::from));
        all.extend(self.futures.iter().copied().map(Instrument::from));
        all.extend(self.options.iter().copied().map(Instrument::from));
        all
    }

    /// Draw a uniformly random instrument of the requested family.
    pub fn random_instrument<R: Rng>(
        &self,
        asset_class: AssetClass,
        rng: &mut R,
    ) -> Result<Instrument, RegistryError> {
        let empty = || RegistryError::EmptyPool { asset_class };
        match asset_class {
            AssetClass::Equity => self
                .equities
                .choose(rng)
                .copied()
                .map(Instrument::from)
                .ok_or_else(empty),
            AssetClass::Future => self
                .futures
                .choose(rng)
                .copied()
                .map(Instrument::from)
                .ok_or_else(empty),
            AssetClass::Option => self
                .options
                .choose(rng)
                .copied()
                .map(Instrument::from)
                .ok_or_else(empty),
        }
    }
}
