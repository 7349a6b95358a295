//! Ledger reads and writes for investment updates.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ServiceError, StoreContext};
use crate::db::{InvestmentStore, UpdateStore};
use crate::domain::{
    CreateInvestmentUpdateCommand, FindInvestmentUpdateQuery, InvestmentId, InvestmentUpdate,
    UpdateId,
};
use crate::engine::{attach_costs, carry_forward, merge_window, running_costs};

#[derive(Debug, Clone)]
pub struct InvestmentUpdateService {
    investments: Arc<dyn InvestmentStore>,
    updates: Arc<dyn UpdateStore>,
}

impl InvestmentUpdateService {
    pub fn new(investments: Arc<dyn InvestmentStore>, updates: Arc<dyn UpdateStore>) -> Self {
        Self {
            investments,
            updates,
        }
    }

    /// Ledger query with carry-forward synthesis.
    ///
    /// Returns the updates of the queried investments dated on or after
    /// `date_from`, ascending by date. For every investment whose latest
    /// update before the window is not dated exactly `date_from`, a record
    /// carrying that update's cost and value is synthesized at `date_from`,
    /// so charts start with a data point for every investment. Costs are
    /// always computed over the full history.
    pub async fn find(
        &self,
        query: &FindInvestmentUpdateQuery,
    ) -> Result<Vec<InvestmentUpdate>, ServiceError> {
        if query.investment_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Floors are read before the history: updates are immutable, so every
        // floor that still exists is contained in the history read after it.
        let mut floors = Vec::new();
        if let Some(date_from) = query.date_from {
            for investment_id in &query.investment_ids {
                let floor = self
                    .updates
                    .find_last_update_at_or_before(*investment_id, date_from)
                    .await
                    .context(|| format!("floor lookup for investment {}", investment_id))?;
                floors.extend(floor);
            }
        }

        // Unbounded: updates before the window feed the costs inside it.
        let history = self
            .updates
            .find_updates(&query.investment_ids, None)
            .await
            .context(|| "failed to find investment updates".to_string())?;
        let costs = running_costs(&history);

        let window: Vec<InvestmentUpdate> = history
            .iter()
            .filter(|u| query.date_from.map_or(true, |from| u.date >= from))
            .filter_map(|u| costs.get(&u.id).map(|cost| u.with_cost(*cost)))
            .collect();

        let date_from = match query.date_from {
            Some(date_from) => date_from,
            None => return Ok(window),
        };

        let synthesized: Vec<InvestmentUpdate> = floors
            .iter()
            .filter_map(|floor| match costs.get(&floor.id) {
                Some(cost) => carry_forward(date_from, &floor.with_cost(*cost)),
                None => {
                    debug!(update_id = %floor.id, "Floor update deleted during query");
                    None
                }
            })
            .collect();

        debug!(
            investments = query.investment_ids.len(),
            window = window.len(),
            synthesized = synthesized.len(),
            "Ledger query"
        );

        Ok(merge_window(synthesized, window))
    }

    pub async fn find_by_id(&self, id: UpdateId) -> Result<InvestmentUpdate, ServiceError> {
        let record = self
            .updates
            .find_update_by_id(id)
            .await
            .context(|| format!("failed to find investment update {}", id))?
            .ok_or(ServiceError::UpdateNotFound(id))?;

        let history = self
            .updates
            .find_updates(&[record.investment_id], None)
            .await
            .context(|| format!("failed to find updates of investment {}", record.investment_id))?;
        let cost = running_costs(&history)
            .get(&id)
            .copied()
            .ok_or(ServiceError::UpdateNotFound(id))?;

        Ok(record.with_cost(cost))
    }

    /// All updates of an investment with costs attached, newest first.
    pub async fn find_by_investment_id(
        &self,
        investment_id: InvestmentId,
    ) -> Result<Vec<InvestmentUpdate>, ServiceError> {
        let history = self
            .updates
            .find_updates(&[investment_id], None)
            .await
            .context(|| format!("failed to find updates of investment {}", investment_id))?;

        let mut updates = attach_costs(&history);
        updates.reverse();
        Ok(updates)
    }

    /// Latest update per investment with costs attached.
    pub(crate) async fn find_last_updates(
        &self,
        investment_ids: &[InvestmentId],
    ) -> Result<HashMap<InvestmentId, InvestmentUpdate>, ServiceError> {
        let history = self
            .updates
            .find_updates(investment_ids, None)
            .await
            .context(|| "failed to find investment updates".to_string())?;

        // History is ascending by (date, seq); the last write per id wins.
        Ok(attach_costs(&history)
            .into_iter()
            .map(|u| (u.investment_id, u))
            .collect())
    }

    /// Append an update to an unlocked investment's ledger.
    pub async fn create(
        &self,
        command: &CreateInvestmentUpdateCommand,
    ) -> Result<InvestmentUpdate, ServiceError> {
        command.validate().map_err(ServiceError::InvalidCommand)?;
        self.require_writable(command.investment_id).await?;

        let record = self
            .updates
            .insert_update(command)
            .await
            .context(|| {
                format!(
                    "failed to create update for investment {}",
                    command.investment_id
                )
            })?;

        info!(
            investment_id = %record.investment_id,
            update_id = %record.id,
            date = %record.date,
            "Investment update created"
        );

        self.find_by_id(record.id).await
    }

    /// Append a batch of updates in one store transaction.
    ///
    /// Every command is validated and every target investment checked before
    /// anything is written; on error no update of the batch is stored.
    /// Returns the number of stored updates.
    pub async fn create_batch(
        &self,
        commands: &[CreateInvestmentUpdateCommand],
    ) -> Result<usize, ServiceError> {
        for command in commands {
            command.validate().map_err(ServiceError::InvalidCommand)?;
        }

        let mut checked: Vec<InvestmentId> = Vec::new();
        for command in commands {
            if !checked.contains(&command.investment_id) {
                self.require_writable(command.investment_id).await?;
                checked.push(command.investment_id);
            }
        }

        let records = self
            .updates
            .insert_updates(commands)
            .await
            .context(|| format!("failed to create {} investment updates", commands.len()))?;

        info!(
            investments = checked.len(),
            updates = records.len(),
            "Investment updates created"
        );
        Ok(records.len())
    }

    async fn require_writable(&self, investment_id: InvestmentId) -> Result<(), ServiceError> {
        let investment = self
            .investments
            .find_investment_by_id(investment_id)
            .await
            .context(|| format!("failed to find investment {}", investment_id))?
            .ok_or(ServiceError::InvestmentNotFound(investment_id))?;

        if investment.locked {
            return Err(ServiceError::InvestmentLocked(investment.id));
        }
        Ok(())
    }

    /// Delete a single update. Deleting an absent update is a no-op.
    pub async fn delete_by_id(&self, id: UpdateId) -> Result<(), ServiceError> {
        let deleted = self
            .updates
            .delete_update_by_id(id)
            .await
            .context(|| format!("failed to delete investment update {}", id))?;
        if deleted {
            info!(update_id = %id, "Investment update deleted");
        }
        Ok(())
    }

    /// Delete every update of an investment, returning how many were removed.
    pub async fn delete_by_investment_id(
        &self,
        investment_id: InvestmentId,
    ) -> Result<u64, ServiceError> {
        let deleted = self
            .updates
            .delete_updates_by_investment_id(investment_id)
            .await
            .context(|| format!("failed to delete updates of investment {}", investment_id))?;
        debug!(investment_id = %investment_id, deleted, "Investment updates deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, StoreError};
    use crate::domain::{InvestmentType, NewInvestment, UserId};
    use chrono::{NaiveDate, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service(store: &Arc<MemoryStore>) -> InvestmentUpdateService {
        InvestmentUpdateService::new(store.clone(), store.clone())
    }

    async fn investment(store: &MemoryStore, locked: bool) -> InvestmentId {
        store
            .insert_investment(&NewInvestment {
                id: InvestmentId::new_random(),
                investment_type: InvestmentType::Fund,
                name: "World".to_string(),
                user_id: UserId::new("u1"),
                locked,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
            .id
    }

    async fn add(
        service: &InvestmentUpdateService,
        investment_id: InvestmentId,
        date: NaiveDate,
        deposit: Option<i64>,
        withdrawal: Option<i64>,
        value: i64,
    ) -> InvestmentUpdate {
        service
            .create(&CreateInvestmentUpdateCommand::new(
                investment_id,
                date,
                deposit,
                withdrawal,
                value,
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_find_attaches_running_cost() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        add(&service, inv, date(2023, 1, 1), Some(100), None, 100).await;
        add(&service, inv, date(2023, 2, 1), None, Some(30), 75).await;
        add(&service, inv, date(2023, 3, 1), Some(50), None, 130).await;

        let found = service
            .find(&FindInvestmentUpdateQuery::new(vec![inv], None))
            .await
            .unwrap();
        let costs: Vec<i64> = found.iter().map(|u| u.cost).collect();
        assert_eq!(costs, vec![100, 70, 120]);
    }

    #[tokio::test]
    async fn test_mark_only_update_has_zero_cost() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        let update = add(&service, inv, date(2023, 1, 1), None, None, 500).await;
        assert_eq!(update.cost, 0);
    }

    #[tokio::test]
    async fn test_window_costs_use_full_history() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        add(&service, inv, date(2023, 1, 1), Some(1000), None, 1000).await;
        add(&service, inv, date(2023, 2, 1), Some(500), None, 1600).await;

        let found = service
            .find(&FindInvestmentUpdateQuery::new(
                vec![inv],
                Some(date(2023, 2, 1)),
            ))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cost, 1500);

        // A bounded store read loses the contributions before the window.
        let bounded = store.find_updates(&[inv], Some(date(2023, 2, 1))).await.unwrap();
        assert_eq!(attach_costs(&bounded)[0].cost, 500);
    }

    #[tokio::test]
    async fn test_carry_forward_synthesizes_window_start() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        let first = add(&service, inv, date(2023, 1, 1), Some(1000), None, 1000).await;
        add(&service, inv, date(2023, 3, 1), None, None, 1200).await;

        let found = service
            .find(&FindInvestmentUpdateQuery::new(
                vec![inv],
                Some(date(2023, 2, 1)),
            ))
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].date, date(2023, 2, 1));
        assert_eq!(found[0].id, first.id);
        assert_eq!(found[0].cost, 1000);
        assert_eq!(found[0].value, 1000);
        assert_eq!(found[0].deposit, None);
        assert_eq!(found[0].withdrawal, None);
        assert_eq!(found[1].date, date(2023, 3, 1));
        assert_eq!(found[1].value, 1200);
    }

    #[tokio::test]
    async fn test_floor_on_window_start_is_not_duplicated() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        add(&service, inv, date(2023, 2, 1), Some(10), None, 10).await;

        let found = service
            .find(&FindInvestmentUpdateQuery::new(
                vec![inv],
                Some(date(2023, 2, 1)),
            ))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].deposit, Some(10));
    }

    #[tokio::test]
    async fn test_no_history_before_window_synthesizes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let early = investment(&store, false).await;
        let late = investment(&store, false).await;

        add(&service, early, date(2023, 1, 1), Some(5), None, 5).await;
        add(&service, late, date(2023, 6, 1), Some(7), None, 7).await;

        let found = service
            .find(&FindInvestmentUpdateQuery::new(
                vec![early, late],
                Some(date(2023, 3, 1)),
            ))
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].investment_id, early);
        assert_eq!(found[0].date, date(2023, 3, 1));
        assert_eq!(found[1].investment_id, late);
        assert_eq!(found[1].date, date(2023, 6, 1));
    }

    #[tokio::test]
    async fn test_find_with_empty_set_returns_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;
        add(&service, inv, date(2023, 1, 1), Some(5), None, 5).await;

        let found = service
            .find(&FindInvestmentUpdateQuery::default())
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_propagates_store_errors() {
        let store = Arc::new(MemoryStore::new().with_failure("find_last_update_at_or_before"));
        let service = service(&store);
        let inv = investment(&store, false).await;

        let result = service
            .find(&FindInvestmentUpdateQuery::new(
                vec![inv],
                Some(date(2023, 1, 1)),
            ))
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Store {
                source: StoreError::Unavailable(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_create_rejected_for_locked_investment() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, true).await;

        let result = service
            .create(&CreateInvestmentUpdateCommand::new(
                inv,
                date(2023, 1, 1),
                Some(10),
                None,
                10,
            ))
            .await;
        assert!(matches!(result, Err(ServiceError::InvestmentLocked(id)) if id == inv));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_amounts() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        let result = service
            .create(&CreateInvestmentUpdateCommand::new(
                inv,
                date(2023, 1, 1),
                Some(0),
                None,
                10,
            ))
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidCommand(_))));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_create_for_missing_investment() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let missing = InvestmentId::new_random();

        let result = service
            .create(&CreateInvestmentUpdateCommand::new(
                missing,
                date(2023, 1, 1),
                None,
                None,
                10,
            ))
            .await;
        assert!(matches!(result, Err(ServiceError::InvestmentNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_duplicate_dates_coexist() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        add(&service, inv, date(2023, 1, 1), Some(100), None, 100).await;
        add(&service, inv, date(2023, 1, 1), Some(50), None, 150).await;

        let found = service.find_by_investment_id(inv).await.unwrap();
        assert_eq!(found.len(), 2);
        // Newest first: the second same-day update carries the larger cost.
        assert_eq!(found[0].cost, 150);
        assert_eq!(found[1].cost, 100);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;

        add(&service, inv, date(2023, 1, 1), Some(100), None, 100).await;
        let second = add(&service, inv, date(2023, 2, 1), Some(20), None, 130).await;

        let found = service.find_by_id(second.id).await.unwrap();
        assert_eq!(found.cost, 120);

        let missing = UpdateId::new_random();
        assert!(matches!(
            service.find_by_id(missing).await,
            Err(ServiceError::UpdateNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_delete_by_id_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;
        let update = add(&service, inv, date(2023, 1, 1), None, None, 1).await;

        service.delete_by_id(update.id).await.unwrap();
        service.delete_by_id(update.id).await.unwrap();
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_create_batch_checks_every_investment_first() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let open = investment(&store, false).await;
        let locked = investment(&store, true).await;

        let batch = [
            CreateInvestmentUpdateCommand::new(open, date(2023, 1, 1), Some(10), None, 10),
            CreateInvestmentUpdateCommand::new(locked, date(2023, 1, 1), Some(10), None, 10),
        ];
        let result = service.create_batch(&batch).await;
        assert!(matches!(result, Err(ServiceError::InvestmentLocked(id)) if id == locked));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_can_be_retried() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let inv = investment(&store, false).await;
        let batch = [
            CreateInvestmentUpdateCommand::new(inv, date(2023, 1, 1), Some(100), None, 100),
            CreateInvestmentUpdateCommand::new(inv, date(2023, 2, 1), Some(50), None, 160),
        ];

        store.fail("insert_updates");
        assert!(service.create_batch(&batch).await.is_err());
        assert_eq!(store.update_count(), 0);

        store.clear_failures();
        assert_eq!(service.create_batch(&batch).await.unwrap(), 2);

        let history = service.find_by_investment_id(inv).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].cost, 150);
    }
}
