use chrono::Utc;
use futures::try_join;
use indexmap::IndexMap;
use model::{
    activity::{Activity, ActivityKind},
    booking::BookingTotals,
    bus::BusStatus,
    company::{Company, CompanyForm, PlanChoiceForm},
    count_by,
    subscription::SubscriptionPlan,
    trip::{Trip, TripStatus},
    user::Role,
    Validate, WithId,
};
use serde::Serialize;

use super::{company_of, record, Actor, Client, STAFF};
use crate::{
    database::{
        ActivityRepo, BookingRepo, BusRepo, Database, DatabaseTransaction, Repo, RouteRepo,
        TripRepo,
    },
    not_found_to_none, RequestError, RequestResult,
};

pub const UPCOMING_TRIPS: usize = 5;
pub const RECENT_ACTIVITIES: i64 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDashboard {
    pub company: WithId<Company>,
    pub buses: usize,
    pub active_buses: usize,
    pub routes: usize,
    pub trips_by_status: IndexMap<TripStatus, usize>,
    pub upcoming_trips: Vec<WithId<Trip>>,
    pub bookings: BookingTotals,
    pub recent_activities: Vec<WithId<Activity>>,
}

impl<D> Client<D>
where
    D: Database,
{
    /// The company of the actor, whatever its review status.
    pub async fn own_company(&self, actor: &Actor) -> RequestResult<WithId<Company>> {
        company_of(&mut self.database.auto().await?, actor, STAFF, false).await
    }

    pub async fn update_company(
        &self,
        actor: &Actor,
        form: CompanyForm,
    ) -> RequestResult<WithId<Company>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, &[Role::Patron], false).await?;
        form.validate()?;
        let company = tx.update(company.map(|company| company.with_profile(form))).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::CompanyUpdated,
            "Profil de la compagnie mis à jour".to_owned(),
        )
        .await?;
        tx.commit().await?;
        Ok(company)
    }

    /// The chosen plan, if any.
    pub async fn company_subscription(
        &self,
        actor: &Actor,
    ) -> RequestResult<Option<WithId<SubscriptionPlan>>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, false).await?;
        match company.content.subscription_plan_id {
            Some(plan_id) => not_found_to_none(auto.get(&plan_id).await.map_err(RequestError::from)),
            None => Ok(None),
        }
    }

    pub async fn choose_plan(
        &self,
        actor: &Actor,
        form: PlanChoiceForm,
    ) -> RequestResult<WithId<Company>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, &[Role::Patron], false).await?;
        let plan: WithId<SubscriptionPlan> = not_found_to_none(
            tx.get(&form.plan_id).await.map_err(RequestError::from),
        )?
        .filter(|plan| plan.content.active)
        .ok_or_else(|| RequestError::invalid("planId", "Cette offre n'est pas disponible"))?;
        let company = tx
            .update(company.map(|company| Company {
                subscription_plan_id: Some(plan.id),
                ..company
            }))
            .await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::CompanyUpdated,
            format!("Abonnement {} choisi", plan.content.name),
        )
        .await?;
        tx.commit().await?;
        Ok(company)
    }

    pub async fn company_dashboard(&self, actor: &Actor) -> RequestResult<CompanyDashboard> {
        let company = self.own_company(actor).await?;
        let id = company.id;
        let (buses, routes, trips, bookings, recent_activities) = try_join!(
            async { self.database.auto().await?.buses_by_company(&id).await },
            async { self.database.auto().await?.routes_by_company(&id).await },
            async { self.database.auto().await?.trips_by_company(&id, None).await },
            async { self.database.auto().await?.booking_totals(Some(&id)).await },
            async {
                self.database
                    .auto()
                    .await?
                    .activities(Some(&id), RECENT_ACTIVITIES)
                    .await
            },
        )?;
        let now = Utc::now();
        let upcoming_trips = trips
            .iter()
            .filter(|trip| {
                trip.content.status == TripStatus::Scheduled && trip.content.departure_time > now
            })
            .take(UPCOMING_TRIPS)
            .cloned()
            .collect();
        Ok(CompanyDashboard {
            company,
            buses: buses.len(),
            active_buses: buses
                .iter()
                .filter(|bus| bus.content.status == BusStatus::Active)
                .count(),
            routes: routes.len(),
            trips_by_status: count_by(&TripStatus::ALL, &trips, |trip| trip.content.status),
            upcoming_trips,
            bookings,
            recent_activities,
        })
    }

    pub async fn company_activities(
        &self,
        actor: &Actor,
        limit: i64,
    ) -> RequestResult<Vec<WithId<Activity>>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, false).await?;
        Ok(auto.activities(Some(&company.id), limit).await?)
    }
}
