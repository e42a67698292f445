//! Document identity, metadata and collection naming.
//!
//! Every stored record is a [`StoredDocument`]: shared metadata plus a JSON
//! body belonging to one [`Collection`]. Typed views are produced by
//! decoding the body into an [`Entity`](super::entity::Entity).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::validation::ValidationError;

/// Opaque document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Named group of documents sharing one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Tenants.
    Organisations,
    /// Login identities.
    Users,
    /// `YYYY-YY` academic years.
    AcademicYears,
    /// Semesters or terms inside an academic year.
    SemesterPeriods,
    /// Lecturer teams.
    Teams,
    /// Lecturers and their cached workload figures.
    Lecturers,
    /// Taught modules.
    Modules,
    /// A module delivered in one academic year.
    ModuleIterations,
    /// Assessments attached to a module iteration.
    ModuleAssessments,
    /// Degree courses.
    Courses,
    /// Module membership of a course.
    CourseModules,
    /// Student intakes on a course.
    Cohorts,
    /// Categories of allocatable work.
    AllocationTypes,
    /// Categories of assessment.
    AssessmentTypes,
    /// Admin hours assigned to a lecturer.
    AdminAllocations,
    /// Teaching hours assigned to a lecturer.
    ModuleAllocations,
    /// Formulae for deriving allocation hours.
    WorkloadCalculationRules,
    /// Per-team aggregate snapshots.
    TeamSummaries,
    /// Generated workload reports.
    WorkloadReports,
    /// Append-only mutation history.
    AuditLogs,
    /// Data migration run records.
    MigrationRuns,
    /// Diagnostic test run records.
    TestRuns,
}

impl Collection {
    /// Every collection, in declaration order.
    pub const ALL: [Self; 22] = [
        Self::Organisations,
        Self::Users,
        Self::AcademicYears,
        Self::SemesterPeriods,
        Self::Teams,
        Self::Lecturers,
        Self::Modules,
        Self::ModuleIterations,
        Self::ModuleAssessments,
        Self::Courses,
        Self::CourseModules,
        Self::Cohorts,
        Self::AllocationTypes,
        Self::AssessmentTypes,
        Self::AdminAllocations,
        Self::ModuleAllocations,
        Self::WorkloadCalculationRules,
        Self::TeamSummaries,
        Self::WorkloadReports,
        Self::AuditLogs,
        Self::MigrationRuns,
        Self::TestRuns,
    ];

    /// Storage name, as persisted in the `collection` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organisations => "organisations",
            Self::Users => "users",
            Self::AcademicYears => "academic_years",
            Self::SemesterPeriods => "semester_periods",
            Self::Teams => "teams",
            Self::Lecturers => "lecturers",
            Self::Modules => "modules",
            Self::ModuleIterations => "module_iterations",
            Self::ModuleAssessments => "module_assessments",
            Self::Courses => "courses",
            Self::CourseModules => "course_modules",
            Self::Cohorts => "cohorts",
            Self::AllocationTypes => "allocation_types",
            Self::AssessmentTypes => "assessment_types",
            Self::AdminAllocations => "admin_allocations",
            Self::ModuleAllocations => "module_allocations",
            Self::WorkloadCalculationRules => "workload_calculation_rules",
            Self::TeamSummaries => "team_summaries",
            Self::WorkloadReports => "workload_reports",
            Self::AuditLogs => "audit_logs",
            Self::MigrationRuns => "migration_runs",
            Self::TestRuns => "test_runs",
        }
    }

    /// URL path segment under `/api/v1`.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Organisations => "/organisations",
            Self::Users => "/users",
            Self::AcademicYears => "/academic-years",
            Self::SemesterPeriods => "/semester-periods",
            Self::Teams => "/teams",
            Self::Lecturers => "/lecturers",
            Self::Modules => "/modules",
            Self::ModuleIterations => "/module-iterations",
            Self::ModuleAssessments => "/module-assessments",
            Self::Courses => "/courses",
            Self::CourseModules => "/course-modules",
            Self::Cohorts => "/cohorts",
            Self::AllocationTypes => "/allocation-types",
            Self::AssessmentTypes => "/assessment-types",
            Self::AdminAllocations => "/admin-allocations",
            Self::ModuleAllocations => "/module-allocations",
            Self::WorkloadCalculationRules => "/workload-calculation-rules",
            Self::TeamSummaries => "/team-summaries",
            Self::WorkloadReports => "/workload-reports",
            Self::AuditLogs => "/audit-logs",
            Self::MigrationRuns => "/migration-runs",
            Self::TestRuns => "/test-runs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a collection name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection `{0}`")]
pub struct UnknownCollection(pub String);

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| UnknownCollection(s.to_owned()))
    }
}

/// Metadata shared by every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    #[schema(value_type = String, format = Uuid)]
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub organisation_id: Option<DocumentId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DocumentMeta {
    /// Fresh metadata for a document created at `now`.
    ///
    /// Timestamps are truncated to microseconds so every store reports the
    /// same value it was given.
    #[must_use]
    pub fn new(organisation_id: Option<DocumentId>, now: DateTime<Utc>) -> Self {
        let now = stamp(now);
        Self {
            id: DocumentId::random(),
            organisation_id,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether the document has not been soft-deleted.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Normalise a timestamp to the precision the stores persist.
#[must_use]
pub fn stamp(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(6)
}

/// A document as held by a store: metadata plus an untyped body.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub collection: Collection,
    pub meta: DocumentMeta,
    pub body: Value,
}

impl StoredDocument {
    /// Build a stored document from a typed entity body.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPayload`] if the body does not
    /// serialise to a JSON object.
    pub fn encode<T: Serialize>(
        collection: Collection,
        meta: DocumentMeta,
        body: &T,
    ) -> Result<Self, ValidationError> {
        let body = serde_json::to_value(body).map_err(|err| ValidationError::InvalidPayload {
            message: err.to_string(),
        })?;
        if !body.is_object() {
            return Err(ValidationError::InvalidPayload {
                message: "document body must be a JSON object".to_owned(),
            });
        }
        Ok(Self {
            collection,
            meta,
            body,
        })
    }

    /// Decode the body into a typed entity.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPayload`] when the stored body does
    /// not match the entity schema.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        serde_json::from_value(self.body.clone()).map_err(|err| ValidationError::InvalidPayload {
            message: err.to_string(),
        })
    }

    /// Look up a top-level body field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Render the document as the flat JSON object returned to clients.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = match &self.body {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        if let Ok(Value::Object(meta)) = serde_json::to_value(&self.meta) {
            object.extend(meta);
        }
        Value::Object(object)
    }
}

/// Typed document: metadata flattened alongside the entity body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document<T> {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(flatten)]
    pub body: T,
}

impl<T: DeserializeOwned> TryFrom<&StoredDocument> for Document<T> {
    type Error = ValidationError;

    fn try_from(stored: &StoredDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            meta: stored.meta.clone(),
            body: stored.decode()?,
        })
    }
}
