use chrono::Duration;
use model::{
    activity::{Activity, ActivityKind},
    company::Company,
    notification::{Notification, NotificationKind},
    settings::SystemSettings,
    user::{Role, User},
    WithId,
};
use serde::Serialize;
use utility::id::Id;

use crate::{
    database::{
        ActivityRepo, Database, DatabaseOperations, NotificationRepo, Repo, SettingsRepo,
    },
    RequestError, RequestResult,
};

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod company;
pub mod employees;
pub mod fleet;
pub mod loyalty;
pub mod notifications;
pub mod routes;
pub mod trips;

pub const ACCESS_DENIED: &str = "Accès refusé";
pub const NO_COMPANY: &str = "Aucune compagnie n'est associée à ce compte";
pub const COMPANY_NOT_APPROVED: &str = "Votre compagnie n'est pas encore approuvée";

/// Default lifetime of a login session.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    #[serde(flatten)]
    pub user: WithId<User>,
}

impl Actor {
    pub fn new(user: WithId<User>) -> Self {
        Self { user }
    }

    pub fn id(&self) -> Id<User> {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.content.role
    }

    pub fn company_id(&self) -> Option<Id<Company>> {
        self.user.content.company_id
    }

    pub fn is(&self, role: Role) -> bool {
        self.role() == role
    }

    /// Fails with 403 unless the actor has one of the given roles.
    pub fn require(&self, roles: &[Role]) -> RequestResult<()> {
        if roles.contains(&self.role()) {
            Ok(())
        } else {
            Err(RequestError::forbidden(ACCESS_DENIED))
        }
    }

    pub fn require_admin(&self) -> RequestResult<()> {
        self.require(&[Role::Admin])
    }
}

/// Roles allowed to change fleet, routes and trips.
pub const OPERATORS: &[Role] = &[Role::Patron, Role::Gestionnaire];
/// Every role working for a company.
pub const STAFF: &[Role] = &[Role::Patron, Role::Gestionnaire, Role::Caissier];

#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database + Send + Sync + Sized + 'static,
{
    pub database: D,
    session_ttl: Duration,
}

impl<D> Client<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self {
            database,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    pub fn with_session_ttl(self, session_ttl: Duration) -> Self {
        Self {
            session_ttl,
            ..self
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

/// Returns the company of a staff member, checking role and, if requested,
/// whether the company is approved.
pub(crate) async fn company_of<O>(
    ops: &mut O,
    actor: &Actor,
    roles: &[Role],
    approved: bool,
) -> RequestResult<WithId<Company>>
where
    O: DatabaseOperations,
{
    actor.require(roles)?;
    let company_id = actor
        .company_id()
        .ok_or_else(|| RequestError::forbidden(NO_COMPANY))?;
    let company = ops.get(&company_id).await?;
    if approved && !company.content.is_approved() {
        return Err(RequestError::forbidden(COMPANY_NOT_APPROVED));
    }
    Ok(company)
}

/// Stored settings, or the defaults when none were saved yet.
pub(crate) async fn settings<O>(ops: &mut O) -> RequestResult<SystemSettings>
where
    O: DatabaseOperations,
{
    Ok(ops.settings().await?.unwrap_or_default())
}

pub(crate) fn ensure_available(settings: &SystemSettings) -> RequestResult<()> {
    if settings.maintenance_mode {
        Err(RequestError::Unavailable)
    } else {
        Ok(())
    }
}

/// Creates a notification unless the recipient opted out of its kind.
pub(crate) async fn notify<O>(
    ops: &mut O,
    user_id: &Id<User>,
    kind: NotificationKind,
    title: &str,
    message: String,
) -> RequestResult<Option<WithId<Notification>>>
where
    O: DatabaseOperations,
{
    let preferences = ops.preferences(user_id).await?.unwrap_or_default();
    if !kind.allowed_by(&preferences) {
        log::debug!("notification {:?} for {} suppressed by preferences", kind, user_id);
        return Ok(None);
    }
    let notification = ops
        .insert(Notification::new(*user_id, kind, title, message))
        .await?;
    Ok(Some(notification))
}

pub(crate) async fn record<O>(
    ops: &mut O,
    company_id: Option<Id<Company>>,
    actor: Option<&Actor>,
    kind: ActivityKind,
    description: String,
) -> RequestResult<()>
where
    O: DatabaseOperations,
{
    ops.insert_activity(Activity::new(
        company_id,
        actor.map(Actor::id),
        kind,
        description,
    ))
    .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests.

    use chrono::{Duration, Utc};
    use model::{
        bus::{Bus, BusForm},
        company::{Company, CompanyForm, CompanyStatus},
        route::{Route, RouteForm},
        trip::{Trip, TripForm},
        user::{RegistrationForm, Role, User},
        WithId,
    };

    use super::{Actor, Client};
    use crate::{database::Repo, database::Database, memory::MemoryDatabase};

    pub const PASSWORD: &str = "motdepasse";

    pub fn client() -> Client<MemoryDatabase> {
        Client::new(MemoryDatabase::new())
    }

    pub fn company_form(name: &str) -> CompanyForm {
        CompanyForm {
            name: name.to_owned(),
            email: "contact@compagnie.sn".to_owned(),
            phone: "+221 33 800 00 00".to_owned(),
            address: "Avenue Blaise Diagne".to_owned(),
            city: "Dakar".to_owned(),
            description: None,
            license_number: None,
        }
    }

    pub fn registration(email: &str, role: Role) -> RegistrationForm {
        RegistrationForm {
            full_name: "Awa Diop".to_owned(),
            email: email.to_owned(),
            password: PASSWORD.to_owned(),
            phone: None,
            role,
            company: (role == Role::Patron).then(|| company_form("Sénégal Express")),
        }
    }

    pub async fn admin(client: &Client<MemoryDatabase>) -> Actor {
        let user = client
            .bootstrap_admin("admin@busline.sn", PASSWORD, "Administrateur")
            .await
            .unwrap()
            .unwrap();
        Actor::new(user)
    }

    pub async fn customer(client: &Client<MemoryDatabase>, email: &str) -> Actor {
        let info = client.register(registration(email, Role::Client)).await.unwrap();
        Actor::new(info.user)
    }

    /// A patron whose company is still pending.
    pub async fn pending_patron(client: &Client<MemoryDatabase>, email: &str) -> Actor {
        let info = client.register(registration(email, Role::Patron)).await.unwrap();
        Actor::new(info.user)
    }

    /// A patron of an approved company.
    pub async fn patron(client: &Client<MemoryDatabase>, email: &str) -> (Actor, WithId<Company>) {
        let patron = pending_patron(client, email).await;
        let mut auto = client.database.auto().await.unwrap();
        let company_id = patron.company_id().unwrap();
        let company: WithId<Company> = auto.get(&company_id).await.unwrap();
        let company = auto
            .update(company.map(|company| Company {
                status: CompanyStatus::Approved,
                ..company
            }))
            .await
            .unwrap();
        (patron, company)
    }

    pub async fn bus(client: &Client<MemoryDatabase>, patron: &Actor, capacity: i32) -> WithId<Bus> {
        client
            .create_bus(
                patron,
                BusForm {
                    plate_number: format!("DK-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
                    model: "Mercedes Tourismo".to_owned(),
                    capacity,
                    amenities: vec![],
                    status: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn route(client: &Client<MemoryDatabase>, patron: &Actor) -> WithId<Route> {
        client
            .create_route(
                patron,
                RouteForm {
                    departure_city: "Dakar".to_owned(),
                    arrival_city: "Saint-Louis".to_owned(),
                    distance_km: 264,
                    estimated_duration: Duration::hours(4),
                    base_price: 7500,
                    status: None,
                },
            )
            .await
            .unwrap()
    }

    /// A scheduled trip departing in two days with a bus of the given capacity.
    pub async fn trip(
        client: &Client<MemoryDatabase>,
        patron: &Actor,
        capacity: i32,
    ) -> WithId<Trip> {
        let bus = bus(client, patron, capacity).await;
        let route = route(client, patron).await;
        client
            .create_trip(
                patron,
                TripForm {
                    route_id: route.id,
                    bus_id: bus.id,
                    departure_time: Utc::now() + Duration::days(2),
                    arrival_time: None,
                    price: None,
                },
            )
            .await
            .unwrap()
            .trip
    }

    pub async fn user(client: &Client<MemoryDatabase>, actor: &Actor) -> WithId<User> {
        client.database.auto().await.unwrap().get(&actor.id()).await.unwrap()
    }
}
