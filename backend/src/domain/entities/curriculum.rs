//! Modules, courses and cohorts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{trim, trim_optional};
use crate::domain::document::{Collection, DocumentId};
use crate::domain::entity::{Entity, FilterField, Reference, UniqueKey};
use crate::domain::validation::{
    ValidationError, ensure_date_order, ensure_in_range, ensure_non_negative, ensure_not_blank,
};

/// Lowest and highest FHEQ levels accepted for modules and courses.
const MIN_LEVEL: u8 = 3;
const MAX_LEVEL: u8 = 8;

fn ensure_level(level: u8) -> Result<(), ValidationError> {
    ensure_in_range(
        "level",
        f64::from(level),
        f64::from(MIN_LEVEL),
        f64::from(MAX_LEVEL),
    )
}

/// A taught module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Module {
    pub code: String,
    pub title: String,
    pub credits: u32,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Entity for Module {
    const COLLECTION: Collection = Collection::Modules;
    const FILTERS: &'static [FilterField] =
        &[FilterField::text("code"), FilterField::integer("level")];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("code", &self.code)?;
        ensure_not_blank("title", &self.title)?;
        if self.credits == 0 {
            return Err(ValidationError::NotPositive { field: "credits" });
        }
        ensure_level(self.level)
    }

    fn normalise(&mut self) {
        trim(&mut self.code);
        trim(&mut self.title);
        trim_optional(&mut self.description);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::per_organisation("code", &self.code)]
    }
}

/// Legacy assessment entry embedded in a module iteration.
///
/// Older records stored assessments inline; the `split-embedded-assessments`
/// migration moves them into [`ModuleAssessment`] documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedAssessment {
    pub title: String,
    pub weighting: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_type_id: Option<DocumentId>,
}

/// One delivery of a module in an academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModuleIteration {
    pub module_id: DocumentId,
    pub academic_year_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester_period_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohort_id: Option<DocumentId>,
    #[serde(default)]
    pub teaching_hours: f64,
    #[serde(default)]
    pub marking_hours: f64,
    #[serde(default)]
    pub student_count: u32,
    /// Legacy inline assessments, kept raw so malformed entries survive
    /// until the split migration reports them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assessments: Vec<Value>,
}

impl Entity for ModuleIteration {
    const COLLECTION: Collection = Collection::ModuleIterations;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("moduleId"),
        FilterField::id("academicYearId"),
        FilterField::id("semesterPeriodId"),
        FilterField::id("cohortId"),
    ];
    const DERIVED_FIELDS: &'static [&'static str] = &["assessments"];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_non_negative("teachingHours", self.teaching_hours)?;
        ensure_non_negative("markingHours", self.marking_hours)
    }

    fn references(&self) -> Vec<Reference> {
        [
            Some(Reference::to("moduleId", Collection::Modules, self.module_id)),
            Some(Reference::to(
                "academicYearId",
                Collection::AcademicYears,
                self.academic_year_id,
            )),
            Reference::maybe(
                "semesterPeriodId",
                Collection::SemesterPeriods,
                self.semester_period_id,
            ),
            Reference::maybe("cohortId", Collection::Cohorts, self.cohort_id),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// An assessment attached to a module iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModuleAssessment {
    pub module_iteration_id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_type_id: Option<DocumentId>,
    pub title: String,
    pub weighting: f64,
}

impl Entity for ModuleAssessment {
    const COLLECTION: Collection = Collection::ModuleAssessments;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("moduleIterationId"),
        FilterField::id("assessmentTypeId"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("title", &self.title)?;
        ensure_in_range("weighting", self.weighting, 0.0, 100.0)
    }

    fn normalise(&mut self) {
        trim(&mut self.title);
    }

    fn references(&self) -> Vec<Reference> {
        [
            Some(Reference::to(
                "moduleIterationId",
                Collection::ModuleIterations,
                self.module_iteration_id,
            )),
            Reference::maybe(
                "assessmentTypeId",
                Collection::AssessmentTypes,
                self.assessment_type_id,
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// A degree course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Course {
    pub code: String,
    pub name: String,
    pub level: u8,
    pub duration_years: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<String>,
}

impl Entity for Course {
    const COLLECTION: Collection = Collection::Courses;
    const FILTERS: &'static [FilterField] =
        &[FilterField::text("code"), FilterField::integer("level")];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("code", &self.code)?;
        ensure_not_blank("name", &self.name)?;
        ensure_level(self.level)?;
        ensure_in_range("durationYears", f64::from(self.duration_years), 1.0, 7.0)
    }

    fn normalise(&mut self) {
        trim(&mut self.code);
        trim(&mut self.name);
        trim_optional(&mut self.faculty);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::per_organisation("code", &self.code)]
    }
}

/// Membership of a module in a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CourseModule {
    pub course_id: DocumentId,
    pub module_id: DocumentId,
    pub year_of_study: u8,
    #[serde(default)]
    pub is_core: bool,
}

impl Entity for CourseModule {
    const COLLECTION: Collection = Collection::CourseModules;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("courseId"),
        FilterField::id("moduleId"),
        FilterField::integer("yearOfStudy"),
        FilterField::flag("isCore"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_in_range("yearOfStudy", f64::from(self.year_of_study), 1.0, 7.0)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::within_parent(
            "moduleId",
            self.module_id.to_string().into(),
            "courseId",
            self.course_id,
        )]
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::to("courseId", Collection::Courses, self.course_id),
            Reference::to("moduleId", Collection::Modules, self.module_id),
        ]
    }
}

/// A student intake on a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Cohort {
    pub course_id: DocumentId,
    pub academic_year_id: DocumentId,
    pub name: String,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub student_count: u32,
}

impl Entity for Cohort {
    const COLLECTION: Collection = Collection::Cohorts;
    const FILTERS: &'static [FilterField] = &[
        FilterField::id("courseId"),
        FilterField::id("academicYearId"),
        FilterField::text("code"),
    ];

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("name", &self.name)?;
        ensure_not_blank("code", &self.code)?;
        ensure_date_order(("startDate", self.start_date), ("endDate", self.end_date))
    }

    fn normalise(&mut self) {
        trim(&mut self.name);
        trim(&mut self.code);
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::within_parent(
            "code",
            self.code.clone().into(),
            "courseId",
            self.course_id,
        )]
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::to("courseId", Collection::Courses, self.course_id),
            Reference::to(
                "academicYearId",
                Collection::AcademicYears,
                self.academic_year_id,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::prepare;
    use rstest::rstest;
    use serde_json::json;

    fn object(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[rstest]
    #[case(0, 6, "credits")]
    #[case(15, 2, "level")]
    #[case(15, 9, "level")]
    fn module_rules(#[case] credits: u32, #[case] level: u8, #[case] field: &str) {
        let result = prepare::<Module>(object(json!({
            "code": "CS101",
            "title": "Programming",
            "credits": credits,
            "level": level,
        })));
        let err = result.expect_err("rule violated");
        assert_eq!(err.field(), Some(field));
    }

    #[rstest]
    fn weighting_above_one_hundred_fails() {
        let result = prepare::<ModuleAssessment>(object(json!({
            "moduleIterationId": DocumentId::random(),
            "title": "Exam",
            "weighting": 120.0,
        })));
        assert!(matches!(
            result,
            Err(ValidationError::OutOfRange {
                field: "weighting",
                ..
            })
        ));
    }

    #[rstest]
    fn iteration_lists_optional_references_only_when_set() {
        let iteration: ModuleIteration = prepare(object(json!({
            "moduleId": DocumentId::random(),
            "academicYearId": DocumentId::random(),
        })))
        .expect("valid iteration");
        assert_eq!(iteration.references().len(), 2);
    }

    #[rstest]
    fn course_modules_are_unique_within_their_course() {
        let course = DocumentId::random();
        let module = DocumentId::random();
        let link = CourseModule {
            course_id: course,
            module_id: module,
            year_of_study: 1,
            is_core: true,
        };
        let keys = link.unique_keys();
        assert_eq!(
            keys.first().map(UniqueKey::filters),
            Some(vec![
                ("moduleId".to_owned(), json!(module.to_string())),
                ("courseId".to_owned(), json!(course.to_string())),
            ])
        );
    }
}
