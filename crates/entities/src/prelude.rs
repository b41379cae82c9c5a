pub use super::address_txs::Entity as AddressTxs;
pub use super::balance_txn::Entity as BalanceTxn;
pub use super::balances::Entity as Balances;
pub use super::block_status::Entity as BlockStatus;
pub use super::inscriptions::Entity as Inscriptions;
pub use super::inscriptions_stats::Entity as InscriptionsStats;
pub use super::txs::Entity as Txs;
pub use super::utxos::Entity as Utxos;
