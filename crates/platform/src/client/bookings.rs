use chrono::{Duration, Utc};
use model::{
    activity::ActivityKind,
    booking::{Booking, BookingForm, BookingStatus, CounterSaleForm},
    bus::Bus,
    company::Company,
    loyalty::points_for,
    notification::NotificationKind,
    route::Route,
    settings::SystemSettings,
    trip::Trip,
    user::Role,
    Validate, WithId,
};
use utility::id::Id;

use super::{company_of, ensure_available, notify, record, settings, Actor, Client, STAFF};
use crate::{
    database::{BookingRepo, Database, DatabaseOperations, DatabaseTransaction, LoyaltyRepo, Repo, TripRepo},
    security, RequestError, RequestResult,
};

pub const NOT_ENOUGH_SEATS: &str = "Places insuffisantes";
pub const TRIP_NOT_BOOKABLE: &str = "Ce voyage n'est plus ouvert à la réservation";
pub const NOT_CANCELLABLE: &str = "Seules les réservations confirmées peuvent être annulées";
pub const DEADLINE_PASSED: &str = "Le délai d'annulation est dépassé";
pub const AMOUNT_TOO_LARGE: &str = "Le montant de la réservation est trop élevé";

const CLIENT: &[Role] = &[Role::Client];

fn check_seat_count(settings: &SystemSettings, seats: i32) -> RequestResult<()> {
    if seats > settings.max_seats_per_booking {
        return Err(RequestError::invalid(
            "seats",
            format!(
                "{} places au maximum par réservation",
                settings.max_seats_per_booking
            ),
        ));
    }
    Ok(())
}

fn total_price(trip: &Trip, seats: i32) -> RequestResult<i64> {
    trip.price
        .checked_mul(seats as i64)
        .ok_or_else(|| RequestError::invalid("seats", AMOUNT_TOO_LARGE))
}

/// Locks the trip and checks that `seats` more seats can be sold on it.
async fn reserve<O>(ops: &mut O, trip: &Id<Trip>, seats: i32) -> RequestResult<WithId<Trip>>
where
    O: DatabaseOperations,
{
    let trip = ops.trip_for_update(trip).await?;
    if !trip.content.status.is_bookable() || trip.content.departure_time <= Utc::now() {
        return Err(RequestError::conflict(TRIP_NOT_BOOKABLE));
    }
    let bus: WithId<Bus> = ops.get(&trip.content.bus_id).await?;
    let booked = ops.booked_seats(&trip.id).await?;
    if booked + seats as i64 > bus.content.capacity as i64 {
        log::debug!(
            "trip {}: {} seats requested, {} of {} booked",
            trip.id,
            seats,
            booked,
            bus.content.capacity
        );
        return Err(RequestError::conflict(NOT_ENOUGH_SEATS));
    }
    Ok(trip)
}

async fn route_label<O>(ops: &mut O, trip: &Trip) -> RequestResult<String>
where
    O: DatabaseOperations,
{
    let route: WithId<Route> = ops.get(&trip.route_id).await?;
    Ok(route.content.label())
}

impl<D> Client<D>
where
    D: Database,
{
    /// Online booking by a client. Earns loyalty points.
    pub async fn book(&self, actor: &Actor, form: BookingForm) -> RequestResult<WithId<Booking>> {
        actor.require(CLIENT)?;
        form.validate()?;
        let mut tx = self.database.transaction().await?;
        let settings = settings(&mut tx).await?;
        ensure_available(&settings)?;
        check_seat_count(&settings, form.seats)?;

        let company: WithId<Company> = {
            let trip: WithId<Trip> = tx.get(&form.trip_id).await?;
            tx.get(&trip.content.company_id).await?
        };
        if !company.content.is_approved() {
            return Err(RequestError::NotFound);
        }
        let trip = reserve(&mut tx, &form.trip_id, form.seats).await?;
        let total_price = total_price(&trip.content, form.seats)?;

        let user = &actor.user.content;
        let booking = tx
            .insert(Booking {
                reference: security::new_booking_reference(),
                trip_id: trip.id,
                user_id: Some(actor.id()),
                sold_by: None,
                passenger_name: form
                    .passenger_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(&user.full_name)
                    .to_owned(),
                passenger_phone: form.passenger_phone.or_else(|| user.phone.clone()),
                seats: form.seats,
                total_price,
                status: BookingStatus::Confirmed,
                created_at: Utc::now(),
            })
            .await?;
        let points = tx
            .add_loyalty_points(&actor.id(), points_for(booking.content.total_price))
            .await?;

        let label = route_label(&mut tx, &trip.content).await?;
        notify(
            &mut tx,
            &actor.id(),
            NotificationKind::BookingConfirmed,
            "Réservation confirmée",
            format!(
                "Votre réservation {} pour {} du {} est confirmée ({} place(s)).",
                booking.content.reference,
                label,
                trip.content.departure_time.format("%d/%m/%Y %H:%M"),
                booking.content.seats
            ),
        )
        .await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::BookingCreated,
            format!(
                "Réservation {} : {} place(s) sur {}",
                booking.content.reference, booking.content.seats, label
            ),
        )
        .await?;
        tx.commit().await?;
        log::info!(
            "booking {} on trip {}, user {} now has {} points",
            booking.content.reference,
            trip.id,
            actor.id(),
            points
        );
        Ok(booking)
    }

    /// Sale at the counter to a walk-in passenger. Earns no loyalty points.
    pub async fn counter_sale(
        &self,
        actor: &Actor,
        form: CounterSaleForm,
    ) -> RequestResult<WithId<Booking>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, STAFF, true).await?;
        form.validate()?;
        let settings = settings(&mut tx).await?;
        ensure_available(&settings)?;
        check_seat_count(&settings, form.seats)?;

        let trip: WithId<Trip> = tx.get(&form.trip_id).await?;
        if trip.content.company_id != company.id {
            return Err(RequestError::NotFound);
        }
        let trip = reserve(&mut tx, &trip.id, form.seats).await?;
        let total_price = total_price(&trip.content, form.seats)?;
        let booking = tx
            .insert(Booking {
                reference: security::new_booking_reference(),
                trip_id: trip.id,
                user_id: None,
                sold_by: Some(actor.id()),
                passenger_name: form.passenger_name.trim().to_owned(),
                passenger_phone: form.passenger_phone,
                seats: form.seats,
                total_price,
                status: BookingStatus::Confirmed,
                created_at: Utc::now(),
            })
            .await?;
        let label = route_label(&mut tx, &trip.content).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::CounterSale,
            format!(
                "Vente au guichet {} : {} place(s) sur {}",
                booking.content.reference, booking.content.seats, label
            ),
        )
        .await?;
        tx.commit().await?;
        Ok(booking)
    }

    /// Bookings of the client, most recent first.
    pub async fn bookings(&self, actor: &Actor) -> RequestResult<Vec<WithId<Booking>>> {
        actor.require(CLIENT)?;
        Ok(self
            .database
            .auto()
            .await?
            .bookings_by_user(&actor.id())
            .await?)
    }

    pub async fn booking(&self, actor: &Actor, id: &Id<Booking>) -> RequestResult<WithId<Booking>> {
        actor.require(CLIENT)?;
        let booking: WithId<Booking> = self.database.auto().await?.get(id).await?;
        if booking.content.user_id != Some(actor.id()) {
            return Err(RequestError::NotFound);
        }
        Ok(booking)
    }

    pub async fn cancel_booking(
        &self,
        actor: &Actor,
        id: &Id<Booking>,
    ) -> RequestResult<WithId<Booking>> {
        actor.require(CLIENT)?;
        let mut tx = self.database.transaction().await?;
        let trip_id = {
            let booking: WithId<Booking> = tx.get(id).await?;
            if booking.content.user_id != Some(actor.id()) {
                return Err(RequestError::NotFound);
            }
            booking.content.trip_id
        };
        // the trip lock orders this against other cancellations and trip
        // status changes, the booking is read again once it is held
        let trip = tx.trip_for_update(&trip_id).await?;
        let booking: WithId<Booking> = tx.get(id).await?;
        if booking.content.status != BookingStatus::Confirmed {
            return Err(RequestError::conflict(NOT_CANCELLABLE));
        }
        let settings = settings(&mut tx).await?;
        let deadline = trip.content.departure_time
            - Duration::hours(settings.cancellation_deadline_hours as i64);
        if Utc::now() > deadline {
            return Err(RequestError::conflict(DEADLINE_PASSED));
        }

        let booking = tx
            .update(booking.map(|booking| Booking {
                status: BookingStatus::Cancelled,
                ..booking
            }))
            .await?;
        tx.add_loyalty_points(&actor.id(), -points_for(booking.content.total_price))
            .await?;
        let label = route_label(&mut tx, &trip.content).await?;
        notify(
            &mut tx,
            &actor.id(),
            NotificationKind::BookingCancelled,
            "Réservation annulée",
            format!(
                "Votre réservation {} pour {} a été annulée.",
                booking.content.reference, label
            ),
        )
        .await?;
        record(
            &mut tx,
            Some(trip.content.company_id),
            Some(actor),
            ActivityKind::BookingCancelled,
            format!("Réservation {} annulée", booking.content.reference),
        )
        .await?;
        tx.commit().await?;
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use model::{
        booking::{REFERENCE_LENGTH, REFERENCE_PREFIX},
        company::SuspensionForm,
        user::EmployeeForm,
        ExampleData,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::client::testing;

    fn form(trip: &WithId<Trip>, seats: i32) -> BookingForm {
        BookingForm {
            trip_id: trip.id,
            seats,
            passenger_name: None,
            passenger_phone: None,
        }
    }

    #[tokio::test]
    async fn booking_credits_points_and_notifies() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;

        let booking = client.book(&customer, form(&trip, 2)).await.unwrap();
        assert_eq!(booking.content.total_price, 15000);
        assert_eq!(booking.content.passenger_name, "Awa Diop");
        assert_eq!(booking.content.status, BookingStatus::Confirmed);
        assert!(booking.content.reference.starts_with(REFERENCE_PREFIX));
        assert_eq!(
            booking.content.reference.len(),
            REFERENCE_PREFIX.len() + REFERENCE_LENGTH
        );

        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 150);
        let notifications = client.notifications(&customer, true).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].content.kind, NotificationKind::BookingConfirmed);
        assert_eq!(client.bookings(&customer).await.unwrap().len(), 1);
    }

    #[test]
    fn totals_that_do_not_fit_are_rejected() {
        assert_eq!(total_price(&Trip::example_data(), 2).ok(), Some(15000));
        let trip = Trip {
            price: i64::MAX / 2 + 1,
            ..Trip::example_data()
        };
        assert!(matches!(
            total_price(&trip, 2),
            Err(RequestError::Validation(errors)) if errors.message_for("seats") == Some(AMOUNT_TOO_LARGE)
        ));
    }

    #[tokio::test]
    async fn overbooking_is_refused_and_books_nothing() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 10).await;

        client.book(&customer, form(&trip, 8)).await.unwrap();
        let result = client.book(&customer, form(&trip, 3)).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == NOT_ENOUGH_SEATS));

        let manifest = client.trip_manifest(&patron, &trip.id).await.unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(client.trip(&patron, &trip.id).await.unwrap().available_seats, 2);
        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 600);
    }

    #[tokio::test]
    async fn seat_count_is_limited_by_settings() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        let result = client.book(&customer, form(&trip, 11)).await;
        assert!(matches!(result, Err(RequestError::Validation(errors)) if errors.message_for("seats").is_some()));
    }

    #[tokio::test]
    async fn only_clients_book() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        assert!(matches!(
            client.book(&patron, form(&trip, 1)).await,
            Err(RequestError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn maintenance_blocks_bookings() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        client
            .update_settings(
                &admin,
                SystemSettings {
                    maintenance_mode: true,
                    ..SystemSettings::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            client.book(&customer, form(&trip, 1)).await,
            Err(RequestError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn trips_of_suspended_companies_can_not_be_booked() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, company) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        client
            .suspend_company(&admin, &company.id, SuspensionForm { reason: None })
            .await
            .unwrap();
        assert!(matches!(
            client.book(&customer, form(&trip, 1)).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn cancellation_reverses_points() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let other = testing::customer(&client, "fatou@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        let booking = client.book(&customer, form(&trip, 2)).await.unwrap();

        assert!(matches!(
            client.cancel_booking(&other, &booking.id).await,
            Err(RequestError::NotFound)
        ));
        let cancelled = client.cancel_booking(&customer, &booking.id).await.unwrap();
        assert_eq!(cancelled.content.status, BookingStatus::Cancelled);
        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 0);
        assert_eq!(
            client.notifications(&customer, false).await.unwrap()[0].content.kind,
            NotificationKind::BookingCancelled
        );

        let again = client.cancel_booking(&customer, &booking.id).await;
        assert!(matches!(again, Err(RequestError::Conflict(message)) if message == NOT_CANCELLABLE));
    }

    #[tokio::test]
    async fn bookings_of_cancelled_trips_are_not_cancelled_again() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        client.book(&customer, form(&trip, 2)).await.unwrap();
        let booking = client.book(&customer, form(&trip, 3)).await.unwrap();
        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 375);

        client.cancel_trip(&patron, &trip.id).await.unwrap();
        assert_eq!(client.loyalty_account(&customer).await.unwrap().points, 0);
        let result = client.cancel_booking(&customer, &booking.id).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == NOT_CANCELLABLE));
        assert_eq!(
            client.booking(&customer, &booking.id).await.unwrap().content.status,
            BookingStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn cancellation_deadline() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        let booking = client.book(&customer, form(&trip, 1)).await.unwrap();
        client
            .update_settings(
                &admin,
                SystemSettings {
                    cancellation_deadline_hours: 72,
                    ..SystemSettings::default()
                },
            )
            .await
            .unwrap();
        let result = client.cancel_booking(&customer, &booking.id).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == DEADLINE_PASSED));
    }

    #[tokio::test]
    async fn counter_sale_by_cashier() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let (other, _) = testing::patron(&client, "other@example.sn").await;
        let cashier = client
            .create_employee(
                &patron,
                EmployeeForm {
                    full_name: "Moussa Fall".to_owned(),
                    email: "caisse@example.sn".to_owned(),
                    password: testing::PASSWORD.to_owned(),
                    phone: None,
                    role: Role::Caissier,
                },
            )
            .await
            .unwrap();
        let cashier = Actor::new(cashier);
        let trip = testing::trip(&client, &patron, 30).await;
        let sale = CounterSaleForm {
            trip_id: trip.id,
            seats: 3,
            passenger_name: "Ibrahima Sarr".to_owned(),
            passenger_phone: None,
        };

        let booking = client.counter_sale(&cashier, sale.clone()).await.unwrap();
        assert_eq!(booking.content.sold_by, Some(cashier.id()));
        assert_eq!(booking.content.user_id, None);
        assert_eq!(booking.content.total_price, 22500);
        assert_eq!(client.trip(&patron, &trip.id).await.unwrap().available_seats, 27);

        assert!(matches!(
            client.counter_sale(&other, sale).await,
            Err(RequestError::NotFound)
        ));
    }
}
