use chrono::{DateTime, Utc};
use itertools::Itertools;
use model::{
    activity::ActivityKind,
    booking::{Booking, BookingStatus},
    bus::{Bus, BusStatus},
    company::Company,
    loyalty::points_for,
    notification::NotificationKind,
    route::{Route, RouteStatus},
    trip::{Trip, TripForm, TripSearch, TripStatus, TripStatusForm},
    Validate, ValidationErrors, WithId,
};
use serde::Serialize;
use utility::id::Id;

use super::{
    admin::INVALID_TRANSITION, company_of, fleet::bus_of, notify, record, routes::route_of, Actor,
    Client, OPERATORS, STAFF,
};
use crate::{
    database::{
        BookingRepo, Database, DatabaseOperations, DatabaseTransaction, LoyaltyRepo, Repo,
        TripRepo,
    },
    not_found_to_none, RequestError, RequestResult,
};

pub const TRIP_LOCKED: &str = "Ce voyage ne peut plus être modifié";
pub const BUS_TOO_SMALL: &str = "Ce bus ne peut pas accueillir les places déjà réservées";
pub const ARRIVAL_OUT_OF_RANGE: &str = "L'heure d'arrivée ne peut pas être calculée";

/// A trip together with everything a passenger needs to know about it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    #[serde(flatten)]
    pub trip: WithId<Trip>,
    pub route: WithId<Route>,
    pub bus: WithId<Bus>,
    pub company_name: String,
    pub available_seats: i64,
}

pub(crate) async fn trip_details<O>(ops: &mut O, trip: WithId<Trip>) -> RequestResult<TripDetails>
where
    O: DatabaseOperations,
{
    let route: WithId<Route> = ops.get(&trip.content.route_id).await?;
    let bus: WithId<Bus> = ops.get(&trip.content.bus_id).await?;
    let company: WithId<Company> = ops.get(&trip.content.company_id).await?;
    let booked = ops.booked_seats(&trip.id).await?;
    Ok(TripDetails {
        available_seats: (bus.content.capacity as i64 - booked).max(0),
        trip,
        route,
        bus,
        company_name: company.content.name,
    })
}

/// Trips passengers may see and book: open for booking, departing in the
/// future and run by an approved company.
pub(crate) fn publicly_visible(trip: &Trip, company: &Company) -> bool {
    trip.status.is_bookable() && trip.departure_time > Utc::now() && company.is_approved()
}

fn owned_by(trip: WithId<Trip>, company: &Id<Company>) -> RequestResult<WithId<Trip>> {
    if trip.content.company_id != *company {
        return Err(RequestError::NotFound);
    }
    Ok(trip)
}

/// Checks the route, bus and times of a trip form against the company.
async fn trip_resources<O>(
    ops: &mut O,
    company: &Id<Company>,
    form: &TripForm,
) -> RequestResult<(WithId<Route>, WithId<Bus>)>
where
    O: DatabaseOperations,
{
    form.validate()?;
    let route = not_found_to_none(route_of(ops, company, &form.route_id).await)?;
    let bus = not_found_to_none(bus_of(ops, company, &form.bus_id).await)?;
    let mut errors = ValidationErrors::new();
    errors
        .check(
            route
                .as_ref()
                .is_some_and(|route| route.content.status == RouteStatus::Active),
            "routeId",
            "Cet itinéraire n'est pas disponible",
        )
        .check(
            bus.as_ref()
                .is_some_and(|bus| bus.content.status == BusStatus::Active),
            "busId",
            "Ce bus n'est pas disponible",
        )
        .check(
            form.departure_time > Utc::now(),
            "departureTime",
            "Le départ doit être dans le futur",
        );
    match (route, bus) {
        (Some(route), Some(bus)) if errors.is_empty() => Ok((route, bus)),
        _ => Err(errors.into()),
    }
}

fn schedule(
    form: &TripForm,
    route: &Route,
) -> RequestResult<(DateTime<Utc>, DateTime<Utc>, i64)> {
    let arrival = match form.arrival_time {
        Some(arrival) => arrival,
        None => form
            .departure_time
            .checked_add_signed(route.estimated_duration)
            .ok_or_else(|| RequestError::invalid("departureTime", ARRIVAL_OUT_OF_RANGE))?,
    };
    Ok((
        form.departure_time,
        arrival,
        form.price.unwrap_or(route.base_price),
    ))
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn trips(
        &self,
        actor: &Actor,
        status: Option<TripStatus>,
    ) -> RequestResult<Vec<WithId<Trip>>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, true).await?;
        Ok(auto.trips_by_company(&company.id, status).await?)
    }

    pub async fn trip(&self, actor: &Actor, id: &Id<Trip>) -> RequestResult<TripDetails> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, true).await?;
        let trip = owned_by(auto.get(id).await?, &company.id)?;
        trip_details(&mut auto, trip).await
    }

    pub async fn create_trip(&self, actor: &Actor, form: TripForm) -> RequestResult<TripDetails> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        let (route, bus) = trip_resources(&mut tx, &company.id, &form).await?;
        let (departure_time, arrival_time, price) = schedule(&form, &route.content)?;
        let trip = tx
            .insert(Trip {
                company_id: company.id,
                route_id: route.id,
                bus_id: bus.id,
                departure_time,
                arrival_time,
                price,
                status: TripStatus::Scheduled,
                created_at: Utc::now(),
            })
            .await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::TripCreated,
            format!(
                "Voyage {} du {} programmé",
                route.content.label(),
                departure_time.format("%d/%m/%Y %H:%M")
            ),
        )
        .await?;
        let details = trip_details(&mut tx, trip).await?;
        tx.commit().await?;
        log::info!("trip {} created by company {}", details.trip.id, company.id);
        Ok(details)
    }

    pub async fn update_trip(
        &self,
        actor: &Actor,
        id: &Id<Trip>,
        form: TripForm,
    ) -> RequestResult<TripDetails> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        let trip = owned_by(tx.trip_for_update(id).await?, &company.id)?;
        if !trip.content.status.is_bookable() {
            return Err(RequestError::conflict(TRIP_LOCKED));
        }
        let (route, bus) = trip_resources(&mut tx, &company.id, &form).await?;
        if (bus.content.capacity as i64) < tx.booked_seats(&trip.id).await? {
            return Err(RequestError::conflict(BUS_TOO_SMALL));
        }
        let (departure_time, arrival_time, price) = schedule(&form, &route.content)?;
        let trip = tx
            .update(trip.map(|trip| Trip {
                route_id: route.id,
                bus_id: bus.id,
                departure_time,
                arrival_time,
                price,
                ..trip
            }))
            .await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::TripUpdated,
            format!("Voyage {} modifié", route.content.label()),
        )
        .await?;
        let details = trip_details(&mut tx, trip).await?;
        tx.commit().await?;
        Ok(details)
    }

    /// Moves a trip along its lifecycle and applies the consequences to its
    /// bookings: cancellation cancels them and takes back loyalty points,
    /// arrival completes them.
    pub async fn update_trip_status(
        &self,
        actor: &Actor,
        id: &Id<Trip>,
        form: TripStatusForm,
    ) -> RequestResult<TripDetails> {
        let next = form.status;
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        let trip = owned_by(tx.trip_for_update(id).await?, &company.id)?;
        let previous = trip.content.status;
        if !previous.can_transition_to(next) {
            return Err(RequestError::conflict(INVALID_TRANSITION));
        }
        let trip = tx
            .update(trip.map(|trip| Trip {
                status: next,
                ..trip
            }))
            .await?;
        let route: WithId<Route> = tx.get(&trip.content.route_id).await?;

        let confirmed: Vec<WithId<Booking>> = tx
            .bookings_by_trip(&trip.id)
            .await?
            .into_iter()
            .filter(|booking| booking.content.status == BookingStatus::Confirmed)
            .collect();
        let settled = match next {
            TripStatus::Cancelled => Some(BookingStatus::Cancelled),
            TripStatus::Arrived => Some(BookingStatus::Completed),
            _ => None,
        };
        if let Some(status) = settled {
            for booking in &confirmed {
                if status == BookingStatus::Cancelled {
                    if let Some(user_id) = booking.content.user_id {
                        tx.add_loyalty_points(&user_id, -points_for(booking.content.total_price))
                            .await?;
                    }
                }
                tx.update(booking.clone().map(|booking| Booking { status, ..booking }))
                    .await?;
            }
        }

        let message = format!(
            "Votre voyage {} du {} est désormais {}.",
            route.content.label(),
            trip.content.departure_time.format("%d/%m/%Y %H:%M"),
            next.label()
        );
        let recipients: Vec<_> = confirmed
            .iter()
            .filter_map(|booking| booking.content.user_id)
            .unique()
            .collect();
        for user_id in recipients {
            notify(
                &mut tx,
                &user_id,
                NotificationKind::TripUpdate,
                "Mise à jour de votre voyage",
                message.clone(),
            )
            .await?;
        }
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::TripStatusChanged,
            format!(
                "Voyage {} : {} → {}",
                route.content.label(),
                previous.label(),
                next.label()
            ),
        )
        .await?;
        let details = trip_details(&mut tx, trip).await?;
        tx.commit().await?;
        log::info!(
            "trip {} moved from {:?} to {:?}, {} bookings affected",
            details.trip.id,
            previous,
            next,
            confirmed.len()
        );
        Ok(details)
    }

    pub async fn cancel_trip(&self, actor: &Actor, id: &Id<Trip>) -> RequestResult<TripDetails> {
        self.update_trip_status(
            actor,
            id,
            TripStatusForm {
                status: TripStatus::Cancelled,
            },
        )
        .await
    }

    /// Every booking of a trip, whatever its status.
    pub async fn trip_manifest(
        &self,
        actor: &Actor,
        id: &Id<Trip>,
    ) -> RequestResult<Vec<WithId<Booking>>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, true).await?;
        let trip = owned_by(auto.get(id).await?, &company.id)?;
        Ok(auto.bookings_by_trip(&trip.id).await?)
    }

    /// Public search over trips open for booking, ordered by departure.
    pub async fn search_trips(&self, search: &TripSearch) -> RequestResult<Vec<TripDetails>> {
        let mut auto = self.database.auto().await?;
        let mut results = Vec::new();
        for trip in auto.bookable_trips(Utc::now()).await? {
            let details = trip_details(&mut auto, trip).await?;
            if !search.matches(&details.trip.content, &details.route.content) {
                continue;
            }
            let company: WithId<Company> = auto.get(&details.trip.content.company_id).await?;
            if publicly_visible(&details.trip.content, &company.content) {
                results.push(details);
            }
        }
        Ok(results)
    }

    pub async fn public_trip(&self, id: &Id<Trip>) -> RequestResult<TripDetails> {
        let mut auto = self.database.auto().await?;
        let trip: WithId<Trip> = auto.get(id).await?;
        let company: WithId<Company> = auto.get(&trip.content.company_id).await?;
        if !publicly_visible(&trip.content, &company.content) {
            return Err(RequestError::NotFound);
        }
        trip_details(&mut auto, trip).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use model::{
        booking::BookingForm,
        bus::BusForm,
        notification::NotificationPreferences,
        route::MAX_PRICE,
        ExampleData,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::client::testing;

    fn form(route: &WithId<Route>, bus: &WithId<Bus>) -> TripForm {
        TripForm {
            route_id: route.id,
            bus_id: bus.id,
            departure_time: Utc::now() + Duration::days(1),
            arrival_time: None,
            price: None,
        }
    }

    fn booking(trip: &WithId<Trip>, seats: i32) -> BookingForm {
        BookingForm {
            trip_id: trip.id,
            seats,
            passenger_name: None,
            passenger_phone: None,
        }
    }

    fn status(status: TripStatus) -> TripStatusForm {
        TripStatusForm { status }
    }

    #[tokio::test]
    async fn arrival_and_price_default_to_the_route() {
        let client = testing::client();
        let (patron, company) = testing::patron(&client, "patron@example.sn").await;
        let bus = testing::bus(&client, &patron, 30).await;
        let route = testing::route(&client, &patron).await;
        let form = form(&route, &bus);
        let departure = form.departure_time;

        let details = client.create_trip(&patron, form).await.unwrap();
        assert_eq!(details.trip.content.arrival_time, departure + Duration::hours(4));
        assert_eq!(details.trip.content.price, 7500);
        assert_eq!(details.trip.content.status, TripStatus::Scheduled);
        assert_eq!(details.available_seats, 30);
        assert_eq!(details.company_name, company.content.name);
    }

    #[test]
    fn arrival_beyond_the_calendar_is_invalid() {
        let route = Route {
            estimated_duration: Duration::hours(100_000_000_000),
            ..Route::example_data()
        };
        let form = TripForm {
            route_id: Id::generate(),
            bus_id: Id::generate(),
            departure_time: Utc::now() + Duration::days(1),
            arrival_time: None,
            price: None,
        };
        assert!(matches!(
            schedule(&form, &route),
            Err(RequestError::Validation(errors)) if errors.message_for("departureTime") == Some(ARRIVAL_OUT_OF_RANGE)
        ));
    }

    #[tokio::test]
    async fn prices_beyond_the_limit_are_rejected() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let bus = testing::bus(&client, &patron, 30).await;
        let route = testing::route(&client, &patron).await;
        let result = client
            .create_trip(
                &patron,
                TripForm {
                    price: Some(MAX_PRICE + 1),
                    ..form(&route, &bus)
                },
            )
            .await;
        assert!(matches!(result, Err(RequestError::Validation(errors)) if errors.message_for("price").is_some()));
    }

    #[tokio::test]
    async fn departure_in_the_past_and_archived_bus_are_rejected() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let bus = testing::bus(&client, &patron, 30).await;
        let route = testing::route(&client, &patron).await;
        client.archive_bus(&patron, &bus.id).await.unwrap();

        let result = client
            .create_trip(
                &patron,
                TripForm {
                    departure_time: Utc::now() - Duration::hours(1),
                    ..form(&route, &bus)
                },
            )
            .await;
        match result {
            Err(RequestError::Validation(errors)) => {
                assert!(errors.message_for("departureTime").is_some());
                assert!(errors.message_for("busId").is_some());
                assert!(errors.message_for("routeId").is_none());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn resources_of_other_companies_are_invalid() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let (other, _) = testing::patron(&client, "two@example.sn").await;
        let bus = testing::bus(&client, &other, 30).await;
        let route = testing::route(&client, &patron).await;
        let result = client.create_trip(&patron, form(&route, &bus)).await;
        assert!(matches!(result, Err(RequestError::Validation(errors)) if errors.message_for("busId").is_some()));
    }

    #[tokio::test]
    async fn final_statuses_can_not_be_left() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;

        for next in [TripStatus::Boarding, TripStatus::Departed, TripStatus::Arrived] {
            client
                .update_trip_status(&patron, &trip.id, status(next))
                .await
                .unwrap();
        }
        for next in TripStatus::ALL {
            let result = client.update_trip_status(&patron, &trip.id, status(next)).await;
            assert!(
                matches!(&result, Err(RequestError::Conflict(message)) if message == INVALID_TRANSITION),
                "{:?} → {:?}",
                TripStatus::Arrived,
                next
            );
        }
    }

    #[tokio::test]
    async fn cancelling_a_trip_cancels_bookings_and_reverses_points() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;

        let booked = client.book(&customer, booking(&trip, 2)).await.unwrap();
        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 150);

        let details = client.cancel_trip(&patron, &trip.id).await.unwrap();
        assert_eq!(details.trip.content.status, TripStatus::Cancelled);
        assert_eq!(details.available_seats, 30);

        let booking = client.booking(&customer, &booked.id).await.unwrap();
        assert_eq!(booking.content.status, BookingStatus::Cancelled);
        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 0);

        let notifications = client.notifications(&customer, false).await.unwrap();
        assert_eq!(notifications[0].content.kind, NotificationKind::TripUpdate);
    }

    #[tokio::test]
    async fn arrival_completes_bookings() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        let booked = client.book(&customer, booking(&trip, 1)).await.unwrap();

        for next in [TripStatus::Departed, TripStatus::Arrived] {
            client
                .update_trip_status(&patron, &trip.id, status(next))
                .await
                .unwrap();
        }
        let booking = client.booking(&customer, &booked.id).await.unwrap();
        assert_eq!(booking.content.status, BookingStatus::Completed);
        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 75);
    }

    #[tokio::test]
    async fn trip_updates_follow_preferences() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        client
            .update_preferences(
                &customer,
                NotificationPreferences {
                    trip_updates: false,
                    ..NotificationPreferences::default()
                },
            )
            .await
            .unwrap();
        let trip = testing::trip(&client, &patron, 30).await;
        client.book(&customer, booking(&trip, 1)).await.unwrap();
        client
            .update_trip_status(&patron, &trip.id, status(TripStatus::Delayed))
            .await
            .unwrap();

        let kinds: Vec<_> = client
            .notifications(&customer, false)
            .await
            .unwrap()
            .into_iter()
            .map(|notification| notification.content.kind)
            .collect();
        assert_eq!(kinds, vec![NotificationKind::BookingConfirmed]);
    }

    #[tokio::test]
    async fn smaller_bus_must_hold_booked_seats() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        client.book(&customer, booking(&trip, 10)).await.unwrap();
        client.book(&customer, booking(&trip, 5)).await.unwrap();

        let minibus = client
            .create_bus(
                &patron,
                BusForm {
                    plate_number: "DK-0010-MB".to_owned(),
                    model: "Toyota Coaster".to_owned(),
                    capacity: 12,
                    amenities: vec![],
                    status: None,
                },
            )
            .await
            .unwrap();
        let mut form = TripForm {
            route_id: trip.content.route_id,
            bus_id: minibus.id,
            departure_time: trip.content.departure_time,
            arrival_time: None,
            price: None,
        };
        let result = client.update_trip(&patron, &trip.id, form.clone()).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == BUS_TOO_SMALL));

        form.bus_id = trip.content.bus_id;
        form.price = Some(9000);
        let details = client.update_trip(&patron, &trip.id, form).await.unwrap();
        assert_eq!(details.trip.content.price, 9000);
        assert_eq!(details.available_seats, 15);
    }

    #[tokio::test]
    async fn departed_trips_can_not_be_edited() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        client
            .update_trip_status(&patron, &trip.id, status(TripStatus::Departed))
            .await
            .unwrap();
        let result = client
            .update_trip(
                &patron,
                &trip.id,
                TripForm {
                    route_id: trip.content.route_id,
                    bus_id: trip.content.bus_id,
                    departure_time: trip.content.departure_time,
                    arrival_time: None,
                    price: None,
                },
            )
            .await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == TRIP_LOCKED));
    }

    #[tokio::test]
    async fn search_only_shows_bookable_trips_of_approved_companies() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, company) = testing::patron(&client, "patron@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        let cancelled = testing::trip(&client, &patron, 30).await;
        client.cancel_trip(&patron, &cancelled.id).await.unwrap();

        let search = TripSearch {
            departure_city: Some("dakar".to_owned()),
            ..TripSearch::default()
        };
        let found = client.search_trips(&search).await.unwrap();
        assert_eq!(
            found.iter().map(|details| details.trip.id).collect::<Vec<_>>(),
            vec![trip.id]
        );
        assert!(client.public_trip(&cancelled.id).await.is_err());

        let elsewhere = TripSearch {
            arrival_city: Some("Touba".to_owned()),
            ..TripSearch::default()
        };
        assert!(client.search_trips(&elsewhere).await.unwrap().is_empty());

        client
            .suspend_company(
                &admin,
                &company.id,
                model::company::SuspensionForm { reason: None },
            )
            .await
            .unwrap();
        assert!(client.search_trips(&search).await.unwrap().is_empty());
        assert!(matches!(
            client.public_trip(&trip.id).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn manifest_lists_bookings_for_staff_only() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let (other, _) = testing::patron(&client, "other@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        client.book(&customer, booking(&trip, 3)).await.unwrap();

        let manifest = client.trip_manifest(&patron, &trip.id).await.unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].content.seats, 3);
        assert!(matches!(
            client.trip_manifest(&other, &trip.id).await,
            Err(RequestError::NotFound)
        ));
        assert!(matches!(
            client.trip_manifest(&customer, &trip.id).await,
            Err(RequestError::Forbidden(_))
        ));
    }
}
