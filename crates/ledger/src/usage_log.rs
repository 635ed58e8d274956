use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dentstock_core::{OperatoryId, ProcedureId, StockError, StockResult, SupplyId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageAction {
    Use,
}

/// One consumption record. Entries are never updated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub id: Uuid,
    /// 1-based position in the log.
    pub sequence: u64,
    pub user_id: UserId,
    pub operatory_id: OperatoryId,
    pub supply_id: SupplyId,
    pub quantity: u64,
    pub action: UsageAction,
    pub procedure_id: Option<ProcedureId>,
    /// `Supply.cost_per_unit` (cents) at the time of consumption.
    pub unit_cost_snapshot: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Entry as submitted by the engine; the log assigns id, sequence and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUsage {
    pub user_id: UserId,
    pub operatory_id: OperatoryId,
    pub supply_id: SupplyId,
    pub quantity: u64,
    pub procedure_id: Option<ProcedureId>,
    pub unit_cost_snapshot: Option<u64>,
}

/// Append-only audit trail of consumption.
pub trait UsageLog: Send + Sync {
    /// Append a batch as one unit: either every entry is stored or none is.
    fn append(&self, batch: Vec<NewUsage>) -> StockResult<Vec<UsageLogEntry>>;

    /// All entries in append order.
    fn entries(&self) -> StockResult<Vec<UsageLogEntry>>;

    fn entries_for_user(&self, user_id: UserId) -> StockResult<Vec<UsageLogEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }

    fn entries_for_operatory(&self, operatory_id: OperatoryId) -> StockResult<Vec<UsageLogEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.operatory_id == operatory_id)
            .collect())
    }
}

impl<L> UsageLog for Arc<L>
where
    L: UsageLog + ?Sized,
{
    fn append(&self, batch: Vec<NewUsage>) -> StockResult<Vec<UsageLogEntry>> {
        (**self).append(batch)
    }

    fn entries(&self) -> StockResult<Vec<UsageLogEntry>> {
        (**self).entries()
    }

    fn entries_for_user(&self, user_id: UserId) -> StockResult<Vec<UsageLogEntry>> {
        (**self).entries_for_user(user_id)
    }

    fn entries_for_operatory(&self, operatory_id: OperatoryId) -> StockResult<Vec<UsageLogEntry>> {
        (**self).entries_for_operatory(operatory_id)
    }
}

/// In-memory usage log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUsageLog {
    inner: RwLock<Vec<UsageLogEntry>>,
}

impl InMemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UsageLog for InMemoryUsageLog {
    fn append(&self, batch: Vec<NewUsage>) -> StockResult<Vec<UsageLogEntry>> {
        let mut log = self
            .inner
            .write()
            .map_err(|_| StockError::storage("usage log lock poisoned"))?;

        let now = Utc::now();
        let start = log.len() as u64;
        let appended: Vec<UsageLogEntry> = batch
            .into_iter()
            .enumerate()
            .map(|(i, new)| UsageLogEntry {
                id: Uuid::now_v7(),
                sequence: start + i as u64 + 1,
                user_id: new.user_id,
                operatory_id: new.operatory_id,
                supply_id: new.supply_id,
                quantity: new.quantity,
                action: UsageAction::Use,
                procedure_id: new.procedure_id,
                unit_cost_snapshot: new.unit_cost_snapshot,
                timestamp: now,
            })
            .collect();

        log.extend(appended.iter().cloned());
        Ok(appended)
    }

    fn entries(&self) -> StockResult<Vec<UsageLogEntry>> {
        let log = self
            .inner
            .read()
            .map_err(|_| StockError::storage("usage log lock poisoned"))?;
        Ok(log.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(user: UserId, op: OperatoryId, quantity: u64) -> NewUsage {
        NewUsage {
            user_id: user,
            operatory_id: op,
            supply_id: SupplyId::new(),
            quantity,
            procedure_id: None,
            unit_cost_snapshot: Some(125),
        }
    }

    #[test]
    fn append_assigns_increasing_sequence() {
        let log = InMemoryUsageLog::new();
        let user = UserId::new();
        let op = OperatoryId::new();

        let first = log.append(vec![usage(user, op, 1), usage(user, op, 2)]).unwrap();
        let second = log.append(vec![usage(user, op, 3)]).unwrap();

        assert_eq!(
            first.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(second[0].sequence, 3);
        assert_eq!(second[0].action, UsageAction::Use);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn filters_keep_append_order() {
        let log = InMemoryUsageLog::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let op_a = OperatoryId::new();
        let op_b = OperatoryId::new();

        log.append(vec![usage(alice, op_a, 1)]).unwrap();
        log.append(vec![usage(bob, op_a, 2)]).unwrap();
        log.append(vec![usage(alice, op_b, 3)]).unwrap();

        let by_alice: Vec<u64> = log
            .entries_for_user(alice)
            .unwrap()
            .iter()
            .map(|e| e.quantity)
            .collect();
        assert_eq!(by_alice, vec![1, 3]);

        let in_a: Vec<u64> = log
            .entries_for_operatory(op_a)
            .unwrap()
            .iter()
            .map(|e| e.quantity)
            .collect();
        assert_eq!(in_a, vec![1, 2]);
    }

    #[test]
    fn empty_batch_appends_nothing() {
        let log = InMemoryUsageLog::new();
        assert!(log.append(Vec::new()).unwrap().is_empty());
        assert!(log.is_empty());
    }
}
