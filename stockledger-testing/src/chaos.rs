//! Failure injection for ledger persistence.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use nutype::nutype;
use rand::{random, rngs::StdRng, Rng, SeedableRng};
use stockledger_types::{
    LedgerScope, Movement, MovementRepository, NewMovement, Operation, Store, StoreError,
};

/// Probability value for chaos engineering injection rates.
///
/// Probability represents a value in the range [0.0, 1.0] where 0.0 means
/// never inject failures and 1.0 means always inject failures.
///
/// # Examples
///
/// ```ignore
/// use stockledger_testing::chaos::Probability;
///
/// let never = Probability::try_new(0.0).unwrap();
/// let always = Probability::try_new(1.0).unwrap();
///
/// // Values outside [0.0, 1.0] are rejected
/// assert!(Probability::try_new(1.5).is_err());
/// ```
#[nutype(
    validate(greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Into)
)]
pub struct Probability(f32);

const INJECTED: &str = "injected chaos failure";

/// Which ledger operations a [`ChaosStore`] fails, and how often.
#[derive(Debug, Clone)]
pub struct ChaosConfig {
    deterministic_seed: Option<u64>,
    failure_probability: Probability,
    tail_failure_probability: Probability,
    fail_on_create: Option<NonZeroUsize>,
}

impl ChaosConfig {
    /// A configuration with a fixed RNG seed, so runs are reproducible.
    pub fn deterministic() -> Self {
        Self {
            deterministic_seed: Some(0),
            ..Self::default()
        }
    }

    /// Probability that a ledger write (`create` or `bulk_create`) fails.
    pub fn with_failure_probability(mut self, probability: f32) -> Self {
        self.failure_probability = Probability::try_new(probability.clamp(0.0, 1.0))
            .expect("clamped value is always valid");
        self
    }

    /// Probability that a ledger tail lookup fails.
    pub fn with_tail_failure_probability(mut self, probability: f32) -> Self {
        self.tail_failure_probability = Probability::try_new(probability.clamp(0.0, 1.0))
            .expect("clamped value is always valid");
        self
    }

    /// Fail exactly the `nth` call to `create`, counting from one.
    pub fn failing_nth_create(mut self, nth: NonZeroUsize) -> Self {
        self.fail_on_create = Some(nth);
        self
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            failure_probability: Probability::try_new(0.0).expect("0.0 is valid probability"),
            tail_failure_probability: Probability::try_new(0.0)
                .expect("0.0 is valid probability"),
            fail_on_create: None,
        }
    }
}

/// Extension trait for wrapping any store in a [`ChaosStore`].
pub trait ChaosStoreExt: Sized {
    /// Wrap `self` so ledger operations fail according to `config`.
    fn with_chaos(self, config: ChaosConfig) -> ChaosStore<Self>;
}

/// Store wrapper injecting failures into ledger persistence.
///
/// Warehouses, products and transactions pass straight through to the
/// wrapped store, so injected failures always happen inside a real
/// transaction that the caller must roll back.
pub struct ChaosStore<S> {
    store: Arc<S>,
    movements: ChaosMovements<S>,
}

impl<S> ChaosStore<S> {
    /// Wrap `store`, seeding the RNG from `config`.
    pub fn new(store: S, config: ChaosConfig) -> Self {
        let rng = match config.deterministic_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(random()),
        };
        let store = Arc::new(store);

        Self {
            movements: ChaosMovements {
                store: Arc::clone(&store),
                config,
                rng: Mutex::new(rng),
                creates: AtomicUsize::new(0),
            },
            store,
        }
    }

    /// The wrapped store, for setup and verification that must not fail.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Number of `create` calls observed so far.
    pub fn create_calls(&self) -> usize {
        self.movements.creates.load(Ordering::SeqCst)
    }
}

impl<S> Store for ChaosStore<S>
where
    S: Store,
{
    type Tx = S::Tx;
    type Warehouses = S::Warehouses;
    type Products = S::Products;
    type Movements = ChaosMovements<S>;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send {
        self.store.begin()
    }

    fn warehouses(&self) -> &Self::Warehouses {
        self.store.warehouses()
    }

    fn products(&self) -> &Self::Products {
        self.store.products()
    }

    fn movements(&self) -> &Self::Movements {
        &self.movements
    }
}

/// Ledger repository of a [`ChaosStore`].
pub struct ChaosMovements<S> {
    store: Arc<S>,
    config: ChaosConfig,
    rng: Mutex<StdRng>,
    creates: AtomicUsize,
}

impl<S> ChaosMovements<S> {
    fn should_inject(&self, probability: Probability) -> bool {
        let prob_f32: f32 = probability.into();

        if prob_f32 <= 0.0 {
            return false;
        }

        if prob_f32 >= 1.0 {
            return true;
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        rng.random_bool(f64::from(prob_f32))
    }

    fn is_targeted_create(&self) -> bool {
        let call = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        self.config
            .fail_on_create
            .is_some_and(|nth| nth.get() == call)
    }
}

impl<S> MovementRepository<S::Tx> for ChaosMovements<S>
where
    S: Store,
{
    fn create(
        &self,
        tx: &mut S::Tx,
        movement: NewMovement,
    ) -> impl Future<Output = Result<Movement, StoreError>> + Send {
        let targeted = self.is_targeted_create();
        let should_fail = targeted || self.should_inject(self.config.failure_probability);
        let movements = self.store.movements();

        async move {
            if should_fail {
                return Err(StoreError::StoreFailure {
                    operation: Operation::Insert,
                    detail: INJECTED.to_string(),
                });
            }

            movements.create(tx, movement).await
        }
    }

    fn find_last_movement(
        &self,
        tx: &mut S::Tx,
        scope: LedgerScope,
    ) -> impl Future<Output = Result<Movement, StoreError>> + Send {
        let should_fail = self.should_inject(self.config.tail_failure_probability);
        let movements = self.store.movements();

        async move {
            if should_fail {
                return Err(StoreError::StoreFailure {
                    operation: Operation::ReadTail,
                    detail: INJECTED.to_string(),
                });
            }

            movements.find_last_movement(tx, scope).await
        }
    }

    fn bulk_create(
        &self,
        tx: &mut S::Tx,
        movements: Vec<NewMovement>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let should_fail = self.should_inject(self.config.failure_probability);
        let repository = self.store.movements();

        async move {
            if should_fail {
                return Err(StoreError::StoreFailure {
                    operation: Operation::BulkInsert,
                    detail: INJECTED.to_string(),
                });
            }

            repository.bulk_create(tx, movements).await
        }
    }
}

impl<S> ChaosStoreExt for S
where
    S: Store,
{
    fn with_chaos(self, config: ChaosConfig) -> ChaosStore<Self> {
        ChaosStore::new(self, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_memory::InMemoryStore;

    #[test]
    fn deterministic_config_sets_seed() {
        let default_is_none = ChaosConfig::default().deterministic_seed.is_none();
        let deterministic_is_some = ChaosConfig::deterministic().deterministic_seed.is_some();

        assert!(default_is_none && deterministic_is_some);
    }

    #[test]
    fn out_of_range_probabilities_are_clamped() {
        let config = ChaosConfig::default()
            .with_failure_probability(3.0)
            .with_tail_failure_probability(-1.0);

        assert_eq!(f32::from(config.failure_probability), 1.0);
        assert_eq!(f32::from(config.tail_failure_probability), 0.0);
    }

    #[test]
    fn only_the_targeted_create_is_marked() {
        let chaos_store = ChaosStore::new(
            InMemoryStore::new(),
            ChaosConfig::deterministic().failing_nth_create(NonZeroUsize::MIN.saturating_add(1)),
        );

        let marks: Vec<bool> = (0..3)
            .map(|_| chaos_store.movements.is_targeted_create())
            .collect();

        assert_eq!(marks, vec![false, true, false]);
        assert_eq!(chaos_store.create_calls(), 3);
    }

    #[test]
    fn deterministic_half_probability_does_not_inject_immediately() {
        let chaos_store = ChaosStore::new(
            InMemoryStore::new(),
            ChaosConfig::deterministic().with_failure_probability(0.5),
        );

        assert!(!chaos_store
            .movements
            .should_inject(Probability::try_new(0.5).unwrap()));
    }
}
