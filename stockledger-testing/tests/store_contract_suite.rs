//! Store contract suite entry point for reusable backend verification.
//!
//! When new contract tests are added to the suite, all invocations of this macro
//! automatically include them.

use stockledger_testing::contract::store_contract_tests;

store_contract_tests! {
    suite = in_memory,
    make_store = stockledger_memory::InMemoryStore::new,
}
