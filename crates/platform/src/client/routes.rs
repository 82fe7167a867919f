use model::{
    activity::ActivityKind,
    company::Company,
    route::{Route, RouteForm, RouteStatus},
    Validate, WithId,
};
use utility::id::Id;

use super::{company_of, record, Actor, Client, OPERATORS, STAFF};
use crate::{
    database::{Database, DatabaseOperations, DatabaseTransaction, Repo, RouteRepo},
    RequestError, RequestResult,
};

/// Routes of other companies are reported as missing.
pub(crate) async fn route_of<O>(
    ops: &mut O,
    company: &Id<Company>,
    id: &Id<Route>,
) -> RequestResult<WithId<Route>>
where
    O: DatabaseOperations,
{
    let route: WithId<Route> = ops.get(id).await?;
    if route.content.company_id != *company {
        return Err(RequestError::NotFound);
    }
    Ok(route)
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn routes(&self, actor: &Actor) -> RequestResult<Vec<WithId<Route>>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, true).await?;
        Ok(auto.routes_by_company(&company.id).await?)
    }

    pub async fn route(&self, actor: &Actor, id: &Id<Route>) -> RequestResult<WithId<Route>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, STAFF, true).await?;
        route_of(&mut auto, &company.id, id).await
    }

    pub async fn create_route(
        &self,
        actor: &Actor,
        form: RouteForm,
    ) -> RequestResult<WithId<Route>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        form.validate()?;
        let route = tx.insert(Route::from_form(company.id, form)).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::RouteCreated,
            format!("Itinéraire {} créé", route.content.label()),
        )
        .await?;
        tx.commit().await?;
        Ok(route)
    }

    pub async fn update_route(
        &self,
        actor: &Actor,
        id: &Id<Route>,
        form: RouteForm,
    ) -> RequestResult<WithId<Route>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        let route = route_of(&mut tx, &company.id, id).await?;
        form.validate()?;
        let route = tx.update(route.map(|route| route.with_form(form))).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::RouteUpdated,
            format!("Itinéraire {} modifié", route.content.label()),
        )
        .await?;
        tx.commit().await?;
        Ok(route)
    }

    pub async fn archive_route(&self, actor: &Actor, id: &Id<Route>) -> RequestResult<WithId<Route>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, OPERATORS, true).await?;
        let route = route_of(&mut tx, &company.id, id).await?;
        let route = tx
            .update(route.map(|route| Route {
                status: RouteStatus::Inactive,
                ..route
            }))
            .await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::RouteUpdated,
            format!("Itinéraire {} désactivé", route.content.label()),
        )
        .await?;
        tx.commit().await?;
        Ok(route)
    }
}
