//! Team summaries, workload reports and rule evaluation.
//!
//! Reports snapshot lecturer figures at generation time. Every figure comes
//! from the lecturer's stored aggregate, which the allocation service keeps
//! in step with [`WorkloadAggregate::compute`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::document::{Document, DocumentId, DocumentMeta};
use super::entities::{
    AcademicYear, AuditAction, Lecturer, ReportRow, ReportStatus, ReportTotals, Team, TeamSummary,
    WorkloadCalculationRule, WorkloadReport,
};
use super::entity::Entity;
use super::format::{cn, format_percentage};
use super::ports::{DocumentQuery, WriteBatch};
use super::store_access::{StoreAccess, encode};
use super::Error;

/// Parameters for [`ReportingService::generate_workload_report`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReport {
    #[schema(value_type = String)]
    pub academic_year_id: DocumentId,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub team_id: Option<DocumentId>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Export encodings for a stored report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Html,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "html" => Ok(Self::Html),
            other => Err(Error::invalid_request(format!(
                "unsupported report format `{other}`; expected csv or html"
            ))),
        }
    }
}

/// A rendered report ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReport {
    pub content_type: &'static str,
    pub filename: String,
    pub body: String,
}

/// Hours produced by one calculation rule.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluation {
    #[schema(value_type = String)]
    pub rule_id: DocumentId,
    pub student_count: u32,
    pub hours: f64,
}

const CSV_HEADER: &str = "Lecturer,Contract,Teaching,Admin,Total,Capacity,Utilisation,Over allocated";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn render_csv(report: &WorkloadReport) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in &report.rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_field(&row.full_name),
            row.total_contract,
            row.teaching_hours,
            row.admin_hours,
            row.total_allocated,
            row.capacity,
            row.utilisation.as_deref().unwrap_or(""),
            if row.over_allocated { "yes" } else { "no" },
        ));
    }
    out
}

fn render_html(report: &WorkloadReport) -> String {
    let mut out = String::new();
    let table_class = cn(&[
        Some("workload-report"),
        (report.status == ReportStatus::Published).then_some("published"),
    ]);
    out.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.title)));
    out.push_str(&format!("<table class=\"{table_class}\">\n"));
    out.push_str(
        "<thead><tr><th>Lecturer</th><th>Contract</th><th>Teaching</th><th>Admin</th>\
         <th>Total</th><th>Capacity</th><th>Utilisation</th></tr></thead>\n<tbody>\n",
    );
    for row in &report.rows {
        let class = cn(&[
            Some("report-row"),
            row.over_allocated.then_some("over-allocated"),
            (row.capacity == 0.0).then_some("at-capacity"),
        ]);
        out.push_str(&format!(
            "<tr class=\"{class}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&row.full_name),
            row.total_contract,
            row.teaching_hours,
            row.admin_hours,
            row.total_allocated,
            row.capacity,
            row.utilisation.as_deref().unwrap_or("n/a"),
        ));
    }
    let totals = &report.totals;
    out.push_str(&format!(
        "</tbody>\n<tfoot><tr class=\"{}\"><td>{} lecturers</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td></td></tr></tfoot>\n</table>\n",
        cn(&[
            Some("report-totals"),
            (totals.over_allocated_count > 0).then_some("has-over-allocation"),
        ]),
        totals.lecturer_count,
        totals.total_contract,
        totals.teaching_hours,
        totals.admin_hours,
        totals.total_allocated,
        totals.capacity,
    ));
    out
}

fn report_row(lecturer: &Document<Lecturer>) -> ReportRow {
    let body = &lecturer.body;
    let limits = body.limits();
    let aggregate = body.aggregate();
    ReportRow {
        lecturer_id: lecturer.meta.id,
        full_name: body.full_name.clone(),
        total_contract: body.total_contract,
        teaching_hours: aggregate.allocated_teaching_hours,
        admin_hours: aggregate.allocated_admin_hours,
        total_allocated: aggregate.total_allocated,
        capacity: aggregate.capacity,
        utilisation: aggregate.utilisation(&limits).map(format_percentage),
        over_allocated: aggregate.is_over_allocated(),
    }
}

fn totals(rows: &[ReportRow]) -> ReportTotals {
    rows.iter().fold(ReportTotals::default(), |mut acc, row| {
        acc.lecturer_count += 1;
        acc.total_contract += row.total_contract;
        acc.teaching_hours += row.teaching_hours;
        acc.admin_hours += row.admin_hours;
        acc.total_allocated += row.total_allocated;
        acc.capacity += row.capacity;
        acc.over_allocated_count += u32::from(row.over_allocated);
        acc
    })
}

/// Reporting use-cases.
#[derive(Clone)]
pub struct ReportingService {
    access: StoreAccess,
}

impl ReportingService {
    /// Service over `access`.
    pub fn new(access: StoreAccess) -> Self {
        Self { access }
    }

    /// Active lecturers of one organisation, optionally narrowed to a team.
    ///
    /// An unset organisation leaves the query unscoped.
    async fn lecturers(
        &self,
        organisation_id: Option<DocumentId>,
        team_id: Option<DocumentId>,
    ) -> Result<Vec<Document<Lecturer>>, Error> {
        let mut query = DocumentQuery::new(Lecturer::COLLECTION)
            .in_organisation(organisation_id)
            .active(Some(true));
        if let Some(team_id) = team_id {
            query = query.filter("teamId", team_id.to_string());
        }
        let mut lecturers: Vec<_> = self
            .access
            .query_entities::<Lecturer>(&query)
            .await?
            .into_iter()
            .map(|(_, typed)| typed)
            .collect();
        lecturers.sort_by(|a, b| a.body.full_name.cmp(&b.body.full_name));
        Ok(lecturers)
    }

    /// Recompute and store the summary for one team and year.
    pub async fn refresh_team_summary(
        &self,
        team_id: DocumentId,
        academic_year_id: Option<DocumentId>,
        actor: &str,
    ) -> Result<Document<TeamSummary>, Error> {
        let (team, _) = self.access.load_entity::<Team>(team_id).await?;
        if let Some(year_id) = academic_year_id {
            self.access.load(AcademicYear::COLLECTION, year_id).await?;
        }
        let rows: Vec<ReportRow> = self
            .lecturers(team.meta.organisation_id, Some(team_id))
            .await?
            .iter()
            .map(report_row)
            .collect();
        let sums = totals(&rows);
        let now = self.access.now();
        let summary = TeamSummary {
            team_id,
            academic_year_id,
            lecturer_count: sums.lecturer_count,
            total_contract: sums.total_contract,
            total_allocated: sums.total_allocated,
            capacity: sums.capacity,
            over_allocated_count: sums.over_allocated_count,
            generated_at: now,
        };

        let year_value = academic_year_id.map(|id| serde_json::Value::String(id.to_string()));
        let existing = self
            .access
            .query(&DocumentQuery::new(TeamSummary::COLLECTION).filter("teamId", team_id.to_string()))
            .await?
            .into_iter()
            .find(|document| document.field("academicYearId") == year_value.as_ref());

        let mut batch = WriteBatch::new();
        let next = match existing {
            Some(current) => {
                let mut meta = current.meta.clone();
                meta.updated_at = now;
                let next = encode(meta, &summary)?;
                batch.replace_if_unchanged(next.clone(), current.meta.updated_at);
                next
            }
            None => {
                let next = encode(DocumentMeta::new(team.meta.organisation_id, now), &summary)?;
                batch.insert(next.clone());
                next
            }
        };
        batch.insert(self.access.audit(AuditAction::Generate, &next, actor, None)?);
        self.access.commit(batch).await?;
        info!(%team_id, lecturers = summary.lecturer_count, "team summary refreshed");
        Ok(Document {
            meta: next.meta,
            body: summary,
        })
    }

    /// Snapshot lecturer workloads into a new report.
    pub async fn generate_workload_report(
        &self,
        request: GenerateReport,
        actor: &str,
    ) -> Result<Document<WorkloadReport>, Error> {
        let (year_doc, year) = self
            .access
            .load_entity::<AcademicYear>(request.academic_year_id)
            .await?;
        let team = match request.team_id {
            Some(team_id) => Some(self.access.load_entity::<Team>(team_id).await?.1),
            None => None,
        };
        let rows: Vec<ReportRow> = self
            .lecturers(year_doc.meta.organisation_id, request.team_id)
            .await?
            .iter()
            .map(report_row)
            .collect();
        let title = request
            .title
            .map(|title| title.trim().to_owned())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| match &team {
                Some(team) => format!("{} workload {}", team.body.name, year.body.name),
                None => format!("Workload report {}", year.body.name),
            });
        let now = self.access.now();
        let report = WorkloadReport {
            academic_year_id: request.academic_year_id,
            team_id: request.team_id,
            title,
            status: ReportStatus::Generated,
            totals: totals(&rows),
            rows,
            generated_by: actor.to_owned(),
            generated_at: now,
            published_at: None,
        };
        let next = encode(DocumentMeta::new(year_doc.meta.organisation_id, now), &report)?;
        let mut batch = WriteBatch::new();
        batch.insert(next.clone());
        batch.insert(self.access.audit(
            AuditAction::Generate,
            &next,
            actor,
            Some(report.title.clone()),
        )?);
        self.access.commit(batch).await?;
        info!(id = %next.meta.id, rows = report.rows.len(), "workload report generated");
        Ok(Document {
            meta: next.meta,
            body: report,
        })
    }

    /// Move a generated report to `published`.
    pub async fn publish_report(
        &self,
        id: DocumentId,
        actor: &str,
    ) -> Result<Document<WorkloadReport>, Error> {
        let (stored, mut report) = self.access.load_entity::<WorkloadReport>(id).await?;
        if report.body.status == ReportStatus::Published {
            return Err(Error::conflict(format!("report {id} is already published")));
        }
        let now = self.access.now();
        report.body.status = ReportStatus::Published;
        report.body.published_at = Some(now);
        report.meta.updated_at = now;
        let next = encode(report.meta.clone(), &report.body)?;
        let mut batch = WriteBatch::new();
        batch.replace_if_unchanged(next.clone(), stored.meta.updated_at);
        batch.insert(self.access.audit(AuditAction::Publish, &next, actor, None)?);
        self.access.commit(batch).await?;
        info!(%id, "workload report published");
        Ok(report)
    }

    /// Render a stored report.
    pub async fn export_report(
        &self,
        id: DocumentId,
        format: ReportFormat,
    ) -> Result<ExportedReport, Error> {
        let (_, report) = self.access.load_entity::<WorkloadReport>(id).await?;
        Ok(match format {
            ReportFormat::Csv => ExportedReport {
                content_type: "text/csv; charset=utf-8",
                filename: format!("workload-report-{id}.csv"),
                body: render_csv(&report.body),
            },
            ReportFormat::Html => ExportedReport {
                content_type: "text/html; charset=utf-8",
                filename: format!("workload-report-{id}.html"),
                body: render_html(&report.body),
            },
        })
    }

    /// Apply a calculation rule to a student count.
    pub async fn evaluate_rule(
        &self,
        rule_id: DocumentId,
        student_count: u32,
    ) -> Result<RuleEvaluation, Error> {
        let (_, rule) = self
            .access
            .load_entity::<WorkloadCalculationRule>(rule_id)
            .await?;
        Ok(RuleEvaluation {
            rule_id,
            student_count,
            hours: rule.body.evaluate(student_count),
        })
    }
}

#[cfg(test)]
#[path = "reporting_service_tests.rs"]
mod tests;
