use std::{error, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    activity::Activity,
    alert::SystemAlert,
    booking::{Booking, BookingTotals},
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
use thiserror::Error;
use utility::id::{HasId, Id};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("row not found")]
    NotFound,
    /// a unique constraint was violated, holds the constraint name.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync>),
}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait Repo<T>
where
    T: HasId<IdType = Uuid> + Send + Sync + 'static,
{
    async fn get(&mut self, id: &Id<T>) -> Result<WithId<T>>;

    /// inserts the element with a freshly generated id.
    async fn insert(&mut self, element: T) -> Result<WithId<T>>;

    async fn update(&mut self, element: WithId<T>) -> Result<WithId<T>>;
}

#[async_trait]
pub trait UserRepo: Repo<User> {
    /// looks up a user by its normalized email address.
    async fn user_by_email(&mut self, email: &str) -> Result<Option<WithId<User>>>;

    async fn password_hash(&mut self, id: &Id<User>) -> Result<Option<String>>;

    async fn set_password_hash(&mut self, id: &Id<User>, hash: &str) -> Result<()>;

    async fn users_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<User>>>;

    async fn users(&mut self, role: Option<Role>) -> Result<Vec<WithId<User>>>;
}

#[async_trait]
pub trait SessionRepo {
    async fn put_session(&mut self, session: Session) -> Result<Session>;

    async fn session(&mut self, token: &str) -> Result<Option<Session>>;

    async fn delete_session(&mut self, token: &str) -> Result<()>;

    /// drops all sessions of a user, except the one with token `keep`.
    async fn delete_sessions_of(&mut self, user: &Id<User>, keep: Option<&str>) -> Result<u64>;
}

#[async_trait]
pub trait CompanyRepo: Repo<Company> {
    async fn company_by_owner(&mut self, owner: &Id<User>) -> Result<Option<WithId<Company>>>;

    async fn companies(&mut self, status: Option<CompanyStatus>) -> Result<Vec<WithId<Company>>>;
}

#[async_trait]
pub trait BusRepo: Repo<Bus> {
    async fn buses_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<Bus>>>;

    /// `plate` has to be normalized already.
    async fn bus_by_plate(
        &mut self,
        company: &Id<Company>,
        plate: &str,
    ) -> Result<Option<WithId<Bus>>>;
}

#[async_trait]
pub trait RouteRepo: Repo<Route> {
    async fn routes_by_company(&mut self, company: &Id<Company>) -> Result<Vec<WithId<Route>>>;
}

#[async_trait]
pub trait TripRepo: Repo<Trip> {
    /// trips of a company ordered by departure time.
    async fn trips_by_company(
        &mut self,
        company: &Id<Company>,
        status: Option<TripStatus>,
    ) -> Result<Vec<WithId<Trip>>>;

    /// trips still open for booking which depart after `after`, ordered by departure.
    async fn bookable_trips(&mut self, after: DateTime<Utc>) -> Result<Vec<WithId<Trip>>>;

    /// like `get`, but locks the trip until the end of the transaction, so
    /// concurrent bookings of the same trip are serialized.
    async fn trip_for_update(&mut self, id: &Id<Trip>) -> Result<WithId<Trip>>;
}

#[async_trait]
pub trait BookingRepo: Repo<Booking> {
    /// bookings of a client, most recent first.
    async fn bookings_by_user(&mut self, user: &Id<User>) -> Result<Vec<WithId<Booking>>>;

    async fn bookings_by_trip(&mut self, trip: &Id<Trip>) -> Result<Vec<WithId<Booking>>>;

    /// seats held by confirmed bookings of a trip.
    async fn booked_seats(&mut self, trip: &Id<Trip>) -> Result<i64>;

    /// totals over paid bookings, of one company or the whole platform.
    async fn booking_totals(&mut self, company: Option<&Id<Company>>) -> Result<BookingTotals>;
}

#[async_trait]
pub trait NotificationRepo: Repo<Notification> {
    /// notifications of a user, most recent first.
    async fn notifications_by_user(
        &mut self,
        user: &Id<User>,
        unread_only: bool,
    ) -> Result<Vec<WithId<Notification>>>;

    /// returns the number of notifications marked.
    async fn mark_all_read(&mut self, user: &Id<User>) -> Result<u64>;

    async fn preferences(&mut self, user: &Id<User>) -> Result<Option<NotificationPreferences>>;

    async fn put_preferences(
        &mut self,
        user: &Id<User>,
        preferences: NotificationPreferences,
    ) -> Result<NotificationPreferences>;
}

#[async_trait]
pub trait ActivityRepo {
    async fn insert_activity(&mut self, activity: Activity) -> Result<WithId<Activity>>;

    /// most recent first, optionally restricted to one company.
    async fn activities(
        &mut self,
        company: Option<&Id<Company>>,
        limit: i64,
    ) -> Result<Vec<WithId<Activity>>>;
}

#[async_trait]
pub trait AlertRepo: Repo<SystemAlert> {
    /// most recent first.
    async fn alerts(&mut self, include_resolved: bool) -> Result<Vec<WithId<SystemAlert>>>;
}

#[async_trait]
pub trait LoyaltyRepo: Repo<LoyaltyReward> {
    async fn rewards(&mut self, active_only: bool) -> Result<Vec<WithId<LoyaltyReward>>>;

    async fn loyalty_points(&mut self, user: &Id<User>) -> Result<i64>;

    /// adds `delta` (which may be negative) to the balance, never going below zero.
    /// returns the new balance.
    async fn add_loyalty_points(&mut self, user: &Id<User>, delta: i64) -> Result<i64>;

    /// takes `amount` points off the balance only if it holds that many.
    /// returns the new balance, or `None` when the balance is too low.
    async fn spend_loyalty_points(&mut self, user: &Id<User>, amount: i64) -> Result<Option<i64>>;

    async fn insert_redemption(&mut self, redemption: Redemption) -> Result<WithId<Redemption>>;

    /// most recent first.
    async fn redemptions(&mut self, user: &Id<User>) -> Result<Vec<WithId<Redemption>>>;
}

#[async_trait]
pub trait SubscriptionRepo: Repo<SubscriptionPlan> {
    async fn plans(&mut self, active_only: bool) -> Result<Vec<WithId<SubscriptionPlan>>>;
}

#[async_trait]
pub trait SettingsRepo {
    async fn settings(&mut self) -> Result<Option<SystemSettings>>;

    async fn put_settings(&mut self, settings: SystemSettings) -> Result<SystemSettings>;
}

pub trait DatabaseOperations:
    UserRepo
    + SessionRepo
    + CompanyRepo
    + BusRepo
    + RouteRepo
    + TripRepo
    + BookingRepo
    + NotificationRepo
    + ActivityRepo
    + AlertRepo
    + LoyaltyRepo
    + SubscriptionRepo
    + SettingsRepo
    + Send
{
}

impl<T> DatabaseOperations for T where
    T: UserRepo
        + SessionRepo
        + CompanyRepo
        + BusRepo
        + RouteRepo
        + TripRepo
        + BookingRepo
        + NotificationRepo
        + ActivityRepo
        + AlertRepo
        + LoyaltyRepo
        + SubscriptionRepo
        + SettingsRepo
        + Send
{
}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

pub trait DatabaseAutocommit: DatabaseOperations {}

/// trait to implement a busline database.
/// multiple concurrent accesses should be possible by e.g. cloning the database object.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send;
    type Autocommit: DatabaseAutocommit + Send;

    async fn transaction(&self) -> Result<Self::Transaction>;

    async fn auto(&self) -> Result<Self::Autocommit>;
}
