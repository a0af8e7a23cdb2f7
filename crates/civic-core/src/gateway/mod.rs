//! Single HTTP entry point in front of the civic modules.
//!
//! Resolves the caller's [`Session`] once per request and mounts the router
//! of every module the city has enabled. Disabled modules are simply absent,
//! so their paths fall through to 404.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{middleware, Router};
use tracing::debug;

pub mod rejection;
pub mod session;


pub use rejection::{ApiError, ApiJson, ApiQuery};
pub use session::{resolve_session, AccessError, Authenticator, Session};

use crate::city::CivicModule;
use crate::engagement::alerts::{alert_router, AlertDispatcher, AlertService, LogDispatcher};
use crate::engagement::budget::{budget_router, BudgetService};
use crate::engagement::citizens::{citizen_router, CitizenRegistry};
use crate::engagement::council::{council_router, CouncilService};
use crate::engagement::issues::{issue_router, IssueService};
use crate::engagement::voting::{voting_router, VotingService};
use crate::store::Database;

/// Shared handles to every module service over one database.
#[derive(Debug)]
pub struct CivicServices<D = LogDispatcher> {
    pub citizens: Arc<CitizenRegistry>,
    pub issues: Arc<IssueService>,
    pub voting: Arc<VotingService>,
    pub alerts: Arc<AlertService<D>>,
    pub budget: Arc<BudgetService>,
    pub council: Arc<CouncilService>,
}

impl<D> Clone for CivicServices<D> {
    fn clone(&self) -> Self {
        Self {
            citizens: Arc::clone(&self.citizens),
            issues: Arc::clone(&self.issues),
            voting: Arc::clone(&self.voting),
            alerts: Arc::clone(&self.alerts),
            budget: Arc::clone(&self.budget),
            council: Arc::clone(&self.council),
        }
    }
}

impl<D> CivicServices<D>
where
    D: AlertDispatcher + 'static,
{
    pub fn new(database: Database, dispatcher: D) -> Self {
        Self {
            citizens: Arc::new(CitizenRegistry::new(database.clone())),
            issues: Arc::new(IssueService::new(database.clone())),
            voting: Arc::new(VotingService::new(database.clone())),
            alerts: Arc::new(AlertService::new(database.clone(), dispatcher)),
            budget: Arc::new(BudgetService::new(database.clone())),
            council: Arc::new(CouncilService::new(database)),
        }
    }
}

/// Citizen routes plus one router per enabled module, behind session resolution.
pub fn gateway_router<D>(
    services: &CivicServices<D>,
    modules: &BTreeSet<CivicModule>,
    staff_token: Option<String>,
) -> Router
where
    D: AlertDispatcher + 'static,
{
    let mut router = citizen_router(Arc::clone(&services.citizens));

    for module in modules {
        let mounted = match module {
            CivicModule::Issues => issue_router(Arc::clone(&services.issues)),
            CivicModule::Voting => voting_router(Arc::clone(&services.voting)),
            CivicModule::Alerts => alert_router(Arc::clone(&services.alerts)),
            CivicModule::Budget => budget_router(Arc::clone(&services.budget)),
            CivicModule::Council => council_router(Arc::clone(&services.council)),
        };
        debug!(module = %module, "module mounted");
        router = router.merge(mounted);
    }

    let authenticator = Authenticator::new(services.citizens.as_ref().clone(), staff_token);
    router.layer(middleware::from_fn_with_state(authenticator, resolve_session))
}
