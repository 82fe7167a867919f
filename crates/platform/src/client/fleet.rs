use model::{
    activity::ActivityKind,
    bus::{normalize_plate, Bus, BusForm, BusStatus},
    company::Company,
    subscription::SubscriptionPlan,
    Validate, WithId,
};
use utility::id::Id;

use super::{company_of, record, trips::BUS_TOO_SMALL, Actor, Client, OPERATORS, STAFF};
use crate::{
    database::{
        BookingRepo, BusRepo, Database, DatabaseOperations, DatabaseTransaction, Repo, TripRepo,
    },
    not_found_to_none, RequestError, RequestResult,
};

pub const PLATE_TAKEN: &str = "Un bus avec cette immatriculation existe déjà";
pub const BUS_LIMIT_REACHED: &str = "Limite de bus atteinte pour votre abonnement";

/// The subscription plan of a company, if it has chosen one that still exists.
pub(crate) async fn plan_of<O>(
    ops: &mut O,
    company: &WithId<Company>,
) -> RequestResult<Option<WithId<SubscriptionPlan>>>
where
    O: DatabaseOperations,
{
    match company.content.subscription_plan_id {
        Some(plan_id) => not_found_to_none(ops.get(&plan_id).await.map_err(RequestError::from)),
        None => Ok(None),
    }
}

/// Fails when the company's plan has no room for one more bus in service.
async fn ensure_bus_allowed<O>(ops: &mut O, company: &WithId<Company>) -> RequestResult<()>
where
    O: DatabaseOperations,
{
    if let Some(plan) = plan_of(ops, company).await? {
        let in_service = ops
            .buses_by_company(&company.id)
            .await?
            .iter()
            .filter(|bus| bus.content.status != BusStatus::Inactive)
            .count();
        if !plan.content.allows_buses(in_service) {
            return Err(RequestError::forbidden(BUS_LIMIT_REACHED));
        }
    }
    Ok(())
}

/// Locks the bus's trips that have not left yet and checks that `capacity`
/// still holds the seats booked on each of them.
async fn ensure_capacity_holds_bookings<O>(
    ops: &mut O,
    bus: &WithId<Bus>,
    capacity: i32,
) -> RequestResult<()>
where
    O: DatabaseOperations,
{
    let trips = ops.trips_by_company(&bus.content.company_id, None).await?;
    for trip in trips
        .iter()
        .filter(|trip| trip.content.bus_id == bus.id && trip.content.status.is_upcoming())
    {
        ops.trip_for_update(&trip.id).await?;
        let booked = ops.booked_seats(&trip.id).await?;
        if booked > capacity as i64 {
            log::debug!(
                "bus {}: trip {} has {} seats booked, {} requested",
                bus.id,
                trip.id,
                booked,
                capacity
            );
            return Err(RequestError::conflict(BUS_TOO_SMALL));
        }
    }
    Ok(())
}

/// Buses of other companies are reported as missing.
pub(crate) async fn bus_of<O>(
    ops: &mut O,
    company: &Id<Company>,
    id: &Id<Bus>,
) -> RequestResult<WithId<Bus>>
where
    O: DatabaseOperations,
{
    let bus: WithId<Bus> = ops.get(id).await?;
    if bus.content.company_id != *company {
        return Err(RequestError::NotFound);
    }
    Ok(bus)
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn buses(&self, actor: &Actor) -> RequestResult<Vec<WithId<Bus>>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, true).await?;
        Ok(auto.buses_by_company(&company.id).await?)
    }

    pub async fn bus(&self, actor: &Actor, id: &Id<Bus>) -> RequestResult<WithId<Bus>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, true).await?;
        bus_of(&mut auto, &company.id, id).await
    }

    pub async fn create_bus(&self, actor: &Actor, form: BusForm) -> RequestResult<WithId<Bus>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        form.validate()?;
        let plate = normalize_plate(&form.plate_number);
        if tx.bus_by_plate(&company.id, &plate).await?.is_some() {
            return Err(RequestError::conflict(PLATE_TAKEN));
        }
        ensure_bus_allowed(&mut tx, &company).await?;
        let bus = tx.insert(Bus::from_form(company.id, form)).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::BusCreated,
            format!("Bus {} ajouté", bus.content.plate_number),
        )
        .await?;
        tx.commit().await?;
        Ok(bus)
    }

    pub async fn update_bus(
        &self,
        actor: &Actor,
        id: &Id<Bus>,
        form: BusForm,
    ) -> RequestResult<WithId<Bus>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        let bus = bus_of(&mut tx, &company.id, id).await?;
        form.validate()?;
        let plate = normalize_plate(&form.plate_number);
        if let Some(other) = tx.bus_by_plate(&company.id, &plate).await? {
            if other.id != bus.id {
                return Err(RequestError::conflict(PLATE_TAKEN));
            }
        }
        let back_in_service = bus.content.status == BusStatus::Inactive
            && form.status.is_some_and(|status| status != BusStatus::Inactive);
        if back_in_service {
            ensure_bus_allowed(&mut tx, &company).await?;
        }
        if form.capacity < bus.content.capacity {
            ensure_capacity_holds_bookings(&mut tx, &bus, form.capacity).await?;
        }
        let bus = tx.update(bus.map(|bus| bus.with_form(form))).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::BusUpdated,
            format!("Bus {} modifié", bus.content.plate_number),
        )
        .await?;
        tx.commit().await?;
        Ok(bus)
    }

    /// Buses are never deleted, they are taken out of service.
    pub async fn archive_bus(&self, actor: &Actor, id: &Id<Bus>) -> RequestResult<WithId<Bus>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        let bus = bus_of(&mut tx, &company.id, id).await?;
        let bus = tx
            .update(bus.map(|bus| Bus {
                status: BusStatus::Inactive,
                ..bus
            }))
            .await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::BusUpdated,
            format!("Bus {} retiré du service", bus.content.plate_number),
        )
        .await?;
        tx.commit().await?;
        Ok(bus)
    }
}

#[cfg(test)]
mod tests {
    use model::{booking::BookingForm, subscription::SubscriptionPlan, user::Role, ExampleData};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::client::testing;

    fn form(plate: &str) -> BusForm {
        BusForm {
            plate_number: plate.to_owned(),
            model: "Sprinter".to_owned(),
            capacity: 20,
            amenities: vec!["Wi-Fi".to_owned()],
            status: None,
        }
    }

    #[tokio::test]
    async fn plates_are_unique_per_company() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let (other, _) = testing::patron(&client, "two@example.sn").await;

        client.create_bus(&patron, form("DK 1234 AB")).await.unwrap();
        let result = client.create_bus(&patron, form("dk1234ab")).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == PLATE_TAKEN));
        assert!(client.create_bus(&other, form("DK1234AB")).await.is_ok());
    }

    #[tokio::test]
    async fn buses_of_other_companies_are_not_found() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let (other, _) = testing::patron(&client, "two@example.sn").await;
        let bus = client.create_bus(&patron, form("DK-0001")).await.unwrap();
        assert!(matches!(
            client.bus(&other, &bus.id).await,
            Err(RequestError::NotFound)
        ));
        assert!(matches!(
            client.archive_bus(&other, &bus.id).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn archive_keeps_the_bus() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let bus = client.create_bus(&patron, form("DK-0001")).await.unwrap();
        let archived = client.archive_bus(&patron, &bus.id).await.unwrap();
        assert_eq!(archived.content.status, BusStatus::Inactive);
        assert_eq!(client.buses(&patron).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cashiers_can_read_but_not_write() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let cashier = client
            .create_employee(
                &patron,
                model::user::EmployeeForm {
                    full_name: "Moussa Fall".to_owned(),
                    email: "moussa@example.sn".to_owned(),
                    password: testing::PASSWORD.to_owned(),
                    phone: None,
                    role: Role::Caissier,
                },
            )
            .await
            .unwrap();
        let cashier = Actor::new(cashier);
        assert!(client.buses(&cashier).await.is_ok());
        assert!(matches!(
            client.create_bus(&cashier, form("DK-0001")).await,
            Err(RequestError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn plan_limits_buses_in_service() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let plan = client
            .create_plan(
                &admin,
                SubscriptionPlan {
                    max_buses: Some(1),
                    ..SubscriptionPlan::example_data()
                },
            )
            .await
            .unwrap();
        client
            .choose_plan(&patron, model::company::PlanChoiceForm { plan_id: plan.id })
            .await
            .unwrap();

        let first = client.create_bus(&patron, form("DK-0001")).await.unwrap();
        let result = client.create_bus(&patron, form("DK-0002")).await;
        assert!(matches!(result, Err(RequestError::Forbidden(message)) if message == BUS_LIMIT_REACHED));

        client.archive_bus(&patron, &first.id).await.unwrap();
        assert!(client.create_bus(&patron, form("DK-0002")).await.is_ok());
    }

    #[tokio::test]
    async fn plan_limits_buses_back_in_service() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let plan = client
            .create_plan(
                &admin,
                SubscriptionPlan {
                    max_buses: Some(1),
                    ..SubscriptionPlan::example_data()
                },
            )
            .await
            .unwrap();
        client
            .choose_plan(&patron, model::company::PlanChoiceForm { plan_id: plan.id })
            .await
            .unwrap();

        let first = client.create_bus(&patron, form("DK-0001")).await.unwrap();
        client.archive_bus(&patron, &first.id).await.unwrap();
        let second = client.create_bus(&patron, form("DK-0002")).await.unwrap();

        let reactivate = BusForm {
            status: Some(BusStatus::Active),
            ..form("DK-0001")
        };
        let result = client.update_bus(&patron, &first.id, reactivate.clone()).await;
        assert!(matches!(result, Err(RequestError::Forbidden(message)) if message == BUS_LIMIT_REACHED));

        // archived buses can still be edited while they stay out of service
        let renamed = BusForm {
            model: "Sprinter 516".to_owned(),
            ..form("DK-0001")
        };
        let renamed = client.update_bus(&patron, &first.id, renamed).await.unwrap();
        assert_eq!(renamed.content.status, BusStatus::Inactive);

        client.archive_bus(&patron, &second.id).await.unwrap();
        let active = client.update_bus(&patron, &first.id, reactivate).await.unwrap();
        assert_eq!(active.content.status, BusStatus::Active);
    }

    #[tokio::test]
    async fn capacity_must_hold_seats_booked_on_upcoming_trips() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "one@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let trip = testing::trip(&client, &patron, 30).await;
        for _ in 0..2 {
            client
                .book(
                    &customer,
                    BookingForm {
                        trip_id: trip.id,
                        seats: 10,
                        passenger_name: None,
                        passenger_phone: None,
                    },
                )
                .await
                .unwrap();
        }
        let bus = client.bus(&patron, &trip.content.bus_id).await.unwrap();
        let resize = |capacity| BusForm {
            plate_number: bus.content.plate_number.clone(),
            model: bus.content.model.clone(),
            capacity,
            amenities: vec![],
            status: None,
        };

        let result = client.update_bus(&patron, &bus.id, resize(10)).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == BUS_TOO_SMALL));
        assert_eq!(client.trip(&patron, &trip.id).await.unwrap().available_seats, 10);

        let resized = client.update_bus(&patron, &bus.id, resize(20)).await.unwrap();
        assert_eq!(resized.content.capacity, 20);
        assert_eq!(client.trip(&patron, &trip.id).await.unwrap().available_seats, 0);
    }
}
