//! Move legacy inline assessments into `module_assessments`.

use async_trait::async_trait;
use serde_json::Value;

use super::{DataMigration, MigrationReport};
use crate::domain::document::{DocumentMeta, StoredDocument};
use crate::domain::entities::{EmbeddedAssessment, ModuleAssessment, ModuleIteration};
use crate::domain::entity::Entity;
use crate::domain::ports::{DocumentQuery, WriteBatch};
use crate::domain::store_access::{StoreAccess, encode};
use crate::domain::Error;

/// Split each iteration's `assessments` array into standalone documents.
///
/// Entries that fail to decode or validate stay embedded so a later run can
/// retry them once fixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitEmbeddedAssessments;

fn convert(
    iteration: &StoredDocument,
    index: usize,
    raw: &Value,
) -> Result<ModuleAssessment, String> {
    let embedded: EmbeddedAssessment = serde_json::from_value(raw.clone())
        .map_err(|err| format!("assessment {index}: {err}"))?;
    let mut assessment = ModuleAssessment {
        module_iteration_id: iteration.meta.id,
        assessment_type_id: embedded.assessment_type_id,
        title: embedded.title,
        weighting: embedded.weighting,
    };
    assessment.normalise();
    assessment
        .validate()
        .map_err(|err| format!("assessment {index}: {err}"))?;
    Ok(assessment)
}

#[async_trait]
impl DataMigration for SplitEmbeddedAssessments {
    fn name(&self) -> &'static str {
        "split-embedded-assessments"
    }

    fn description(&self) -> &'static str {
        "Move assessments embedded in module iterations into module_assessments"
    }

    async fn run(&self, access: &StoreAccess, report: &mut MigrationReport) -> Result<(), Error> {
        let now = access.now();
        let query = DocumentQuery::new(ModuleIteration::COLLECTION);
        for iteration in access.query(&query).await? {
            report.scanned();
            let id = iteration.meta.id;
            let entries = match iteration.field("assessments") {
                Some(Value::Array(entries)) if !entries.is_empty() => entries.clone(),
                Some(Value::Array(_)) | None => continue,
                Some(_) => {
                    report.record_error(Some(id), "assessments is not an array");
                    continue;
                }
            };

            let mut batch = WriteBatch::new();
            let mut kept = Vec::new();
            for (index, raw) in entries.iter().enumerate() {
                match convert(&iteration, index, raw) {
                    Ok(assessment) => {
                        let meta = DocumentMeta::new(iteration.meta.organisation_id, now);
                        let created = encode(meta, &assessment)?;
                        let entry = report.audit(access, &created)?;
                        batch.insert(created);
                        batch.insert(entry);
                    }
                    Err(message) => {
                        report.record_error(Some(id), message);
                        kept.push(raw.clone());
                    }
                }
            }
            if kept.len() == entries.len() {
                continue;
            }

            let mut next = iteration.clone();
            next.meta.updated_at = now;
            if let Value::Object(body) = &mut next.body {
                if kept.is_empty() {
                    body.remove("assessments");
                } else {
                    body.insert("assessments".to_owned(), Value::Array(kept));
                }
            }
            batch.replace_if_unchanged(next.clone(), iteration.meta.updated_at);
            report.apply(access, &next, batch).await;
        }
        Ok(())
    }
}
