//! Repair cached lecturer figures from their live allocations.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{DataMigration, MigrationReport};
use crate::domain::document::DocumentId;
use crate::domain::entities::{AdminAllocation, Lecturer, ModuleAllocation};
use crate::domain::entity::Entity;
use crate::domain::ports::{DocumentQuery, WriteBatch};
use crate::domain::store_access::{StoreAccess, decode, encode};
use crate::domain::workload::WorkloadAggregate;
use crate::domain::Error;

/// Recompute every lecturer through [`WorkloadAggregate::compute`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecalculateLecturerAggregates;

async fn hours_by_lecturer<A, F>(
    access: &StoreAccess,
    lecturer_of: F,
) -> Result<HashMap<DocumentId, f64>, Error>
where
    A: Entity,
    F: Fn(&A) -> (DocumentId, f64),
{
    let query = DocumentQuery::new(A::COLLECTION).active(Some(true));
    let mut totals = HashMap::new();
    for (_, allocation) in access.query_entities::<A>(&query).await? {
        let (lecturer_id, hours) = lecturer_of(&allocation.body);
        *totals.entry(lecturer_id).or_insert(0.0) += hours;
    }
    Ok(totals)
}

#[async_trait]
impl DataMigration for RecalculateLecturerAggregates {
    fn name(&self) -> &'static str {
        "recalculate-lecturer-aggregates"
    }

    fn description(&self) -> &'static str {
        "Rebuild lecturer allocated hours, capacity and availability from allocations"
    }

    async fn run(&self, access: &StoreAccess, report: &mut MigrationReport) -> Result<(), Error> {
        let teaching = hours_by_lecturer::<ModuleAllocation, _>(access, |allocation| {
            (allocation.lecturer_id, allocation.hours)
        })
        .await?;
        let admin = hours_by_lecturer::<AdminAllocation, _>(access, |allocation| {
            (allocation.lecturer_id, allocation.hours)
        })
        .await?;
        let now = access.now();

        for stored in access.query(&DocumentQuery::new(Lecturer::COLLECTION)).await? {
            report.scanned();
            let id = stored.meta.id;
            let mut lecturer = match decode::<Lecturer>(&stored) {
                Ok(lecturer) => lecturer,
                Err(err) => {
                    report.record_error(Some(id), err.message());
                    continue;
                }
            };
            let aggregate = WorkloadAggregate::compute(
                &lecturer.body.limits(),
                teaching.get(&id).copied().unwrap_or(0.0),
                admin.get(&id).copied().unwrap_or(0.0),
            );
            if lecturer.body.aggregate().matches(&aggregate) {
                continue;
            }
            lecturer.body.apply_aggregate(aggregate);
            lecturer.meta.updated_at = now;
            let next = match encode(lecturer.meta, &lecturer.body) {
                Ok(next) => next,
                Err(err) => {
                    report.record_error(Some(id), err.message());
                    continue;
                }
            };
            let mut batch = WriteBatch::new();
            batch.replace_if_unchanged(next.clone(), stored.meta.updated_at);
            report.apply(access, &next, batch).await;
        }
        Ok(())
    }
}
