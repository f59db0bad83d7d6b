// Live ticker refresh pipeline
pub mod fetcher;
pub mod pair_signals;
pub mod refresh_scheduler;
pub mod subscription_bus;

pub use fetcher::{MarketDataFetcher, PairFilter};
pub use pair_signals::{PairSignalEstimator, PairSignals, RandomSignalEstimator};
pub use refresh_scheduler::{
    PairSnapshot, RefreshOutcome, RefreshScheduler, SchedulerHandle, SchedulerSettings,
    SchedulerState,
};
pub use subscription_bus::{Subscription, SubscriptionBus, UpdateListener};
