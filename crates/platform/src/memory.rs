//! A database kept in process memory.
//!
//! Transactions work on a private copy of the whole state which replaces the
//! shared state on commit. Concurrent transactions are not isolated from each
//! other, the last commit wins. Good enough for tests and local development.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{
    activity::Activity,
    alert::SystemAlert,
    booking::{Booking, BookingStatus, BookingTotals},
    bus::Bus,
    company::{Company, CompanyStatus},
    loyalty::{LoyaltyReward, Redemption},
    notification::{Notification, NotificationPreferences},
    route::Route,
    settings::SystemSettings,
    subscription::SubscriptionPlan,
    trip::{Trip, TripStatus},
    user::{Role, Session, User},
    WithId,
};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::database::{
    ActivityRepo, AlertRepo, BookingRepo, BusRepo, CompanyRepo, Database,
    DatabaseAutocommit, DatabaseError, DatabaseTransaction, LoyaltyRepo,
    NotificationRepo, Repo, Result, RouteRepo, SessionRepo, SettingsRepo,
    SubscriptionRepo, TripRepo, UserRepo,
};

#[derive(Debug, Clone)]
struct Table<T>(IndexMap<Uuid, T>);

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<T> Table<T>
where
    T: HasId<IdType = Uuid> + Clone,
{
    fn get(&self, id: &Id<T>) -> Result<WithId<T>> {
        self.0
            .get(&id.raw())
            .map(|value| WithId::new(*id, value.clone()))
            .ok_or(DatabaseError::NotFound)
    }

    fn insert(&mut self, value: T) -> WithId<T> {
        let id = Id::<T>::generate();
        self.0.insert(id.raw(), value.clone());
        WithId::new(id, value)
    }

    fn update(&mut self, element: WithId<T>) -> Result<WithId<T>> {
        match self.0.get_mut(&element.id.raw()) {
            Some(value) => {
                *value = element.content.clone();
                Ok(element)
            }
            None => Err(DatabaseError::NotFound),
        }
    }

    fn filter<F>(&self, predicate: F) -> Vec<WithId<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.0
            .iter()
            .filter(|(_, value)| predicate(value))
            .map(|(id, value)| WithId::new(Id::new(*id), value.clone()))
            .collect()
    }

    fn find<F>(&self, predicate: F) -> Option<WithId<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.filter(predicate).into_iter().next()
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Table<User>,
    password_hashes: HashMap<Uuid, String>,
    sessions: HashMap<String, Session>,
    companies: Table<Company>,
    buses: Table<Bus>,
    routes: Table<Route>,
    trips: Table<Trip>,
    bookings: Table<Booking>,
    notifications: Table<Notification>,
    preferences: HashMap<Uuid, NotificationPreferences>,
    activities: Table<Activity>,
    alerts: Table<SystemAlert>,
    rewards: Table<LoyaltyReward>,
    loyalty_points: HashMap<Uuid, i64>,
    redemptions: Table<Redemption>,
    plans: Table<SubscriptionPlan>,
    settings: Option<SystemSettings>,
}

impl MemoryState {
    /// the unique constraints a relational database would enforce.
    fn check_user(&self, user: &WithId<User>) -> Result<()> {
        let taken = self
            .users
            .0
            .iter()
            .any(|(id, other)| id != &user.id.raw() && other.email == user.content.email);
        if taken {
            Err(DatabaseError::Conflict("users_email_key".to_owned()))
        } else {
            Ok(())
        }
    }

    fn check_bus(&self, bus: &WithId<Bus>) -> Result<()> {
        let taken = self.buses.0.iter().any(|(id, other)| {
            id != &bus.id.raw()
                && other.company_id == bus.content.company_id
                && other.plate_number == bus.content.plate_number
        });
        if taken {
            Err(DatabaseError::Conflict(
                "buses_company_id_plate_number_key".to_owned(),
            ))
        } else {
            Ok(())
        }
    }

    fn check_booking(&self, booking: &Booking) -> Result<()> {
        if self
            .bookings
            .0
            .values()
            .any(|other| other.reference == booking.reference)
        {
            Err(DatabaseError::Conflict("bookings_reference_key".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryOperations {
    shared: Arc<Mutex<MemoryState>>,
    /// private copy of the state while a transaction is running.
    staged: Option<MemoryState>,
}

impl MemoryOperations {
    fn with_state<R, F>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut MemoryState) -> Result<R>,
    {
        match &mut self.staged {
            Some(state) => f(state),
            None => {
                let mut state = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut *state)
            }
        }
    }
}

pub type MemoryAutocommit = MemoryOperations;
pub type MemoryTransaction = MemoryOperations;

impl DatabaseAutocommit for MemoryOperations {}

#[async_trait]
impl DatabaseTransaction for MemoryOperations {
    async fn commit(mut self) -> Result<()> {
        if let Some(staged) = self.staged.take() {
            *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = staged;
        }
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;
    type Autocommit = MemoryAutocommit;

    async fn transaction(&self) -> Result<Self::Transaction> {
        let staged = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(MemoryOperations {
            shared: self.state.clone(),
            staged: Some(staged),
        })
    }

    async fn auto(&self) -> Result<Self::Autocommit> {
        Ok(MemoryOperations {
            shared: self.state.clone(),
            staged: None,
        })
    }
}

/// Implements `Repo` for entities without unique constraints.
macro_rules! plain_repo {
    ($model:ty, $table:ident) => {
        #[async_trait]
        impl Repo<$model> for MemoryOperations {
            async fn get(&mut self, id: &Id<$model>) -> Result<WithId<$model>> {
                self.with_state(|state| state.$table.get(id))
            }

            async fn insert(&mut self, element: $model) -> Result<WithId<$model>> {
                self.with_state(|state| Ok(state.$table.insert(element)))
            }

            async fn update(&mut self, element: WithId<$model>) -> Result<WithId<$model>> {
                self.with_state(|state| state.$table.update(element))
            }
        }
    };
}

plain_repo!(Company, companies);
plain_repo!(Route, routes);
plain_repo!(Trip, trips);
plain_repo!(Notification, notifications);
plain_repo!(SystemAlert, alerts);
plain_repo!(LoyaltyReward, rewards);
plain_repo!(SubscriptionPlan, plans);

#[async_trait]
impl Repo<User> for MemoryOperations {
    async fn get(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        self.with_state(|state| state.users.get(id))
    }

    async fn insert(&mut self, element: User) -> Result<WithId<User>> {
        self.with_state(|state| {
            state.check_user(&WithId::new(Id::generate(), element.clone()))?;
            Ok(state.users.insert(element))
        })
    }

    async fn update(&mut self, element: WithId<User>) -> Result<WithId<User>> {
        self.with_state(|state| {
            state.check_user(&element)?;
            state.users.update(element)
        })
    }
}

#[async_trait]
impl Repo<Bus> for MemoryOperations {
    async fn get(&mut self, id: &Id<Bus>) -> Result<WithId<Bus>> {
        self.with_state(|state| state.buses.get(id))
    }

    async fn insert(&mut self, element: Bus) -> Result<WithId<Bus>> {
        self.with_state(|state| {
            state.check_bus(&WithId::new(Id::generate(), element.clone()))?;
            Ok(state.buses.insert(element))
        })
    }

    async fn update(&mut self, element: WithId<Bus>) -> Result<WithId<Bus>> {
        self.with_state(|state| {
            state.check_bus(&element)?;
            state.buses.update(element)
        })
    }
}

#[async_trait]
impl Repo<Booking> for MemoryOperations {
    async fn get(&mut self, id: &Id<Booking>) -> Result<WithId<Booking>> {
        self.with_state(|state| state.bookings.get(id))
    }

    async fn insert(&mut self, element: Booking) -> Result<WithId<Booking>> {
        self.with_state(|state| {
            state.check_booking(&element)?;
            Ok(state.bookings.insert(element))
        })
    }

    async fn update(&mut self, element: WithId<Booking>) -> Result<WithId<Booking>> {
        self.with_state(|state| state.bookings.update(element))
    }
}

#[async_trait]
impl UserRepo for MemoryOperations {
    async fn user_by_email(&mut self, email: &str) -> Result<Option<WithId<User>>> {
        self.with_state(|state| Ok(state.users.find(|user| user.email == email)))
    }

    async fn password_hash(&mut self, id: &Id<User>) -> Result<Option<String>> {
        self.with_state(|state| Ok(state.password_hashes.get(&id.raw()).cloned()))
    }

    async fn set_password_hash(&mut self, id: &Id<User>, hash: &str) -> Result<()> {
        self.with_state(|state| {
            state.users.get(id)?;
            state.password_hashes.insert(id.raw(), hash.to_owned());
            Ok(())
        })
    }

    async fn users_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<User>>> {
        self.with_state(|state| {
            Ok(state
                .users
                .filter(|user| user.company_id.as_ref() == Some(company)))
        })
    }

    async fn users(&mut self, role: Option<Role>) -> Result<Vec<WithId<User>>> {
        self.with_state(|state| {
            Ok(state
                .users
                .filter(|user| role.map(|role| user.role == role).unwrap_or(true)))
        })
    }
}

#[async_trait]
impl SessionRepo for MemoryOperations {
    async fn put_session(&mut self, session: Session) -> Result<Session> {
        self.with_state(|state| {
            state
                .sessions
                .insert(session.token.clone(), session.clone());
            Ok(session)
        })
    }

    async fn session(&mut self, token: &str) -> Result<Option<Session>> {
        self.with_state(|state| Ok(state.sessions.get(token).cloned()))
    }

    async fn delete_session(&mut self, token: &str) -> Result<()> {
        self.with_state(|state| {
            state.sessions.remove(token);
            Ok(())
        })
    }

    async fn delete_sessions_of(&mut self, user: &Id<User>, keep: Option<&str>) -> Result<u64> {
        self.with_state(|state| {
            let before = state.sessions.len();
            state.sessions.retain(|token, session| {
                session.user_id != *user || Some(token.as_str()) == keep
            });
            Ok((before - state.sessions.len()) as u64)
        })
    }
}

#[async_trait]
impl CompanyRepo for MemoryOperations {
    async fn company_by_owner(&mut self, owner: &Id<User>) -> Result<Option<WithId<Company>>> {
        self.with_state(|state| Ok(state.companies.find(|company| company.owner_id == *owner)))
    }

    async fn companies(&mut self, status: Option<CompanyStatus>) -> Result<Vec<WithId<Company>>> {
        self.with_state(|state| {
            Ok(state.companies.filter(|company| {
                status.map(|status| company.status == status).unwrap_or(true)
            }))
        })
    }
}

#[async_trait]
impl BusRepo for MemoryOperations {
    async fn buses_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<Bus>>> {
        self.with_state(|state| Ok(state.buses.filter(|bus| bus.company_id == *company)))
    }

    async fn bus_by_plate(
        &mut self,
        company: &Id<Company>,
        plate: &str,
    ) -> Result<Option<WithId<Bus>>> {
        self.with_state(|state| {
            Ok(state
                .buses
                .find(|bus| bus.company_id == *company && bus.plate_number == plate))
        })
    }
}

#[async_trait]
impl RouteRepo for MemoryOperations {
    async fn routes_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<Route>>> {
        self.with_state(|state| Ok(state.routes.filter(|route| route.company_id == *company)))
    }
}

fn by_departure(mut trips: Vec<WithId<Trip>>) -> Vec<WithId<Trip>> {
    trips.sort_by_key(|trip| trip.content.departure_time);
    trips
}

#[async_trait]
impl TripRepo for MemoryOperations {
    async fn trips_by_company(
        &mut self,
        company: &Id<Company>,
        status: Option<TripStatus>,
    ) -> Result<Vec<WithId<Trip>>> {
        self.with_state(|state| {
            Ok(by_departure(state.trips.filter(|trip| {
                trip.company_id == *company
                    && status.map(|status| trip.status == status).unwrap_or(true)
            })))
        })
    }

    async fn bookable_trips(&mut self, after: DateTime<Utc>) -> Result<Vec<WithId<Trip>>> {
        self.with_state(|state| {
            Ok(by_departure(state.trips.filter(|trip| {
                trip.status.is_bookable() && trip.departure_time > after
            })))
        })
    }

    async fn trip_for_update(&mut self, id: &Id<Trip>) -> Result<WithId<Trip>> {
        self.with_state(|state| state.trips.get(id))
    }
}

#[async_trait]
impl BookingRepo for MemoryOperations {
    async fn bookings_by_user(&mut self, user: &Id<User>) -> Result<Vec<WithId<Booking>>> {
        self.with_state(|state| {
            let mut bookings = state
                .bookings
                .filter(|booking| booking.user_id.as_ref() == Some(user));
            bookings.reverse();
            Ok(bookings)
        })
    }

    async fn bookings_by_trip(&mut self, trip: &Id<Trip>) -> Result<Vec<WithId<Booking>>> {
        self.with_state(|state| Ok(state.bookings.filter(|booking| booking.trip_id == *trip)))
    }

    async fn booked_seats(&mut self, trip: &Id<Trip>) -> Result<i64> {
        self.with_state(|state| {
            Ok(state
                .bookings
                .0
                .values()
                .filter(|booking| {
                    booking.trip_id == *trip && booking.status == BookingStatus::Confirmed
                })
                .map(|booking| booking.seats as i64)
                .sum())
        })
    }

    async fn booking_totals(&mut self, company: Option<&Id<Company>>) -> Result<BookingTotals> {
        self.with_state(|state| {
            let bookings = state.bookings.0.values().filter(|booking| match company {
                Some(company) => state
                    .trips
                    .0
                    .get(&booking.trip_id.raw())
                    .map(|trip| trip.company_id == *company)
                    .unwrap_or(false),
                None => true,
            });
            Ok(BookingTotals::of(bookings))
        })
    }
}

#[async_trait]
impl NotificationRepo for MemoryOperations {
    async fn notifications_by_user(
        &mut self,
        user: &Id<User>,
        unread_only: bool,
    ) -> Result<Vec<WithId<Notification>>> {
        self.with_state(|state| {
            let mut notifications = state.notifications.filter(|notification| {
                notification.user_id == *user && !(unread_only && notification.read)
            });
            notifications.reverse();
            Ok(notifications)
        })
    }

    async fn mark_all_read(&mut self, user: &Id<User>) -> Result<u64> {
        self.with_state(|state| {
            let mut marked = 0;
            for notification in state.notifications.0.values_mut() {
                if notification.user_id == *user && !notification.read {
                    notification.read = true;
                    marked += 1;
                }
            }
            Ok(marked)
        })
    }

    async fn preferences(&mut self, user: &Id<User>) -> Result<Option<NotificationPreferences>> {
        self.with_state(|state| Ok(state.preferences.get(&user.raw()).copied()))
    }

    async fn put_preferences(
        &mut self,
        user: &Id<User>,
        preferences: NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        self.with_state(|state| {
            state.preferences.insert(user.raw(), preferences);
            Ok(preferences)
        })
    }
}

#[async_trait]
impl ActivityRepo for MemoryOperations {
    async fn insert_activity(&mut self, activity: Activity) -> Result<WithId<Activity>> {
        self.with_state(|state| Ok(state.activities.insert(activity)))
    }

    async fn activities(
        &mut self,
        company: Option<&Id<Company>>,
        limit: i64,
    ) -> Result<Vec<WithId<Activity>>> {
        self.with_state(|state| {
            let mut activities = state.activities.filter(|activity| match company {
                Some(company) => activity.company_id.as_ref() == Some(company),
                None => true,
            });
            activities.reverse();
            activities.truncate(limit.max(0) as usize);
            Ok(activities)
        })
    }
}

#[async_trait]
impl AlertRepo for MemoryOperations {
    async fn alerts(&mut self, include_resolved: bool) -> Result<Vec<WithId<SystemAlert>>> {
        self.with_state(|state| {
            let mut alerts = state
                .alerts
                .filter(|alert| include_resolved || !alert.resolved);
            alerts.reverse();
            Ok(alerts)
        })
    }
}

#[async_trait]
impl LoyaltyRepo for MemoryOperations {
    async fn rewards(&mut self, active_only: bool) -> Result<Vec<WithId<LoyaltyReward>>> {
        self.with_state(|state| Ok(state.rewards.filter(|reward| !active_only || reward.active)))
    }

    async fn loyalty_points(&mut self, user: &Id<User>) -> Result<i64> {
        self.with_state(|state| Ok(state.loyalty_points.get(&user.raw()).copied().unwrap_or(0)))
    }

    async fn add_loyalty_points(&mut self, user: &Id<User>, delta: i64) -> Result<i64> {
        self.with_state(|state| {
            let points = state.loyalty_points.entry(user.raw()).or_insert(0);
            *points = (*points + delta).max(0);
            Ok(*points)
        })
    }

    async fn spend_loyalty_points(&mut self, user: &Id<User>, amount: i64) -> Result<Option<i64>> {
        self.with_state(|state| match state.loyalty_points.get_mut(&user.raw()) {
            Some(points) if *points >= amount => {
                *points -= amount;
                Ok(Some(*points))
            }
            _ => Ok(None),
        })
    }

    async fn insert_redemption(&mut self, redemption: Redemption) -> Result<WithId<Redemption>> {
        self.with_state(|state| Ok(state.redemptions.insert(redemption)))
    }

    async fn redemptions(&mut self, user: &Id<User>) -> Result<Vec<WithId<Redemption>>> {
        self.with_state(|state| {
            let mut redemptions = state
                .redemptions
                .filter(|redemption| redemption.user_id == *user);
            redemptions.reverse();
            Ok(redemptions)
        })
    }
}

#[async_trait]
impl SubscriptionRepo for MemoryOperations {
    async fn plans(&mut self, active_only: bool) -> Result<Vec<WithId<SubscriptionPlan>>> {
        self.with_state(|state| Ok(state.plans.filter(|plan| !active_only || plan.active)))
    }
}

#[async_trait]
impl SettingsRepo for MemoryOperations {
    async fn settings(&mut self) -> Result<Option<SystemSettings>> {
        self.with_state(|state| Ok(state.settings.clone()))
    }

    async fn put_settings(&mut self, settings: SystemSettings) -> Result<SystemSettings> {
        self.with_state(|state| {
            state.settings = Some(settings.clone());
            Ok(settings)
        })
    }
}
