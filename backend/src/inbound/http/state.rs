//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only talk to domain
//! services, so they run unchanged over the Diesel or in-memory store.

use std::sync::Arc;

use crate::domain::allocation_service::AllocationService;
use crate::domain::calendar_service::AcademicCalendarService;
use crate::domain::document_service::DocumentService;
use crate::domain::entity::Entity;
use crate::domain::migrations::DataMigrationService;
use crate::domain::ports::LoginService;
use crate::domain::reporting_service::ReportingService;
use crate::domain::store_access::StoreAccess;
use crate::domain::test_runs::TestRunService;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub access: StoreAccess,
    pub allocations: AllocationService,
    pub calendar: AcademicCalendarService,
    pub reporting: ReportingService,
    pub migrations: DataMigrationService,
    pub test_runs: TestRunService,
}

impl HttpState {
    /// Build every service over one store.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use workload_backend::domain::ports::FixtureLoginService;
    /// use workload_backend::domain::store_access::StoreAccess;
    /// use workload_backend::inbound::http::state::HttpState;
    /// use workload_backend::outbound::memory::MemoryDocumentStore;
    ///
    /// let access = StoreAccess::new(
    ///     Arc::new(MemoryDocumentStore::new()),
    ///     Arc::new(DefaultClock),
    /// );
    /// let state = HttpState::new(Arc::new(FixtureLoginService), access);
    /// assert_eq!(state.migrations.list().len(), 3);
    /// ```
    pub fn new(login: Arc<dyn LoginService>, access: StoreAccess) -> Self {
        Self {
            login,
            allocations: AllocationService::new(access.clone()),
            calendar: AcademicCalendarService::new(access.clone()),
            reporting: ReportingService::new(access.clone()),
            migrations: DataMigrationService::with_builtin(access.clone()),
            test_runs: TestRunService::new(access.clone()),
            access,
        }
    }

    /// Generic CRUD service for `T`.
    pub fn documents<T: Entity>(&self) -> DocumentService<T> {
        DocumentService::new(self.access.clone())
    }
}
