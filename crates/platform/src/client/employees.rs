use model::{
    activity::ActivityKind,
    company::Company,
    user::{AccountStatus, EmployeeForm, EmployeeUpdateForm, Role, User},
    validation::normalize_email,
    Validate, WithId,
};
use utility::id::Id;

use super::{
    auth::{hash_password, EMAIL_TAKEN},
    company_of,
    fleet::plan_of,
    record, Actor, Client,
};
use crate::{
    database::{Database, DatabaseOperations, DatabaseTransaction, Repo, SessionRepo, UserRepo},
    RequestError, RequestResult,
};

pub const EMPLOYEE_LIMIT_REACHED: &str = "Limite d'employés atteinte pour votre abonnement";

const PATRON: &[Role] = &[Role::Patron];

/// Fails when the company's plan has no room for one more active employee.
async fn ensure_employee_allowed<O>(ops: &mut O, company: &WithId<Company>) -> RequestResult<()>
where
    O: DatabaseOperations,
{
    if let Some(plan) = plan_of(ops, company).await? {
        let active = ops
            .users_by_company(&company.id)
            .await?
            .iter()
            .filter(|user| user.content.role.is_employee_role() && user.content.is_active())
            .count();
        if !plan.content.allows_employees(active) {
            return Err(RequestError::forbidden(EMPLOYEE_LIMIT_REACHED));
        }
    }
    Ok(())
}

/// Employees of other companies and the patron are reported as missing.
async fn employee_of<O>(
    ops: &mut O,
    company: &Id<Company>,
    id: &Id<User>,
) -> RequestResult<WithId<User>>
where
    O: DatabaseOperations,
{
    let user: WithId<User> = ops.get(id).await?;
    if user.content.company_id != Some(*company) || !user.content.role.is_employee_role() {
        return Err(RequestError::NotFound);
    }
    Ok(user)
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn employees(&self, actor: &Actor) -> RequestResult<Vec<WithId<User>>> {
        let mut auto = self.database.auto().await?;
        let company = company_of(&mut auto, actor, PATRON, true).await?;
        Ok(auto
            .users_by_company(&company.id)
            .await?
            .into_iter()
            .filter(|user| user.content.role.is_employee_role())
            .collect())
    }

    pub async fn create_employee(
        &self,
        actor: &Actor,
        form: EmployeeForm,
    ) -> RequestResult<WithId<User>> {
        actor.require(PATRON)?;
        form.validate()?;
        let password_hash = hash_password(form.password.clone()).await?;

        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, PATRON, true).await?;
        let email = normalize_email(&form.email);
        if tx.user_by_email(&email).await?.is_some() {
            return Err(RequestError::conflict(EMAIL_TAKEN));
        }
        ensure_employee_allowed(&mut tx, &company).await?;
        let employee = tx
            .insert(User::new(
                &email,
                &form.full_name,
                form.phone.as_deref(),
                form.role,
                Some(company.id),
            ))
            .await?;
        tx.set_password_hash(&employee.id, &password_hash).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::EmployeeCreated,
            format!(
                "Employé {} ajouté ({:?})",
                employee.content.full_name, employee.content.role
            ),
        )
        .await?;
        tx.commit().await?;
        Ok(employee)
    }

    pub async fn update_employee(
        &self,
        actor: &Actor,
        id: &Id<User>,
        form: EmployeeUpdateForm,
    ) -> RequestResult<WithId<User>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, PATRON, true).await?;
        let employee = employee_of(&mut tx, &company.id, id).await?;
        form.validate()?;
        if !employee.content.is_active() && form.status == AccountStatus::Active {
            ensure_employee_allowed(&mut tx, &company).await?;
        }
        let employee = tx
            .update(employee.map(|user| User {
                full_name: form.full_name.trim().to_owned(),
                phone: form.phone.as_deref().map(|phone| phone.trim().to_owned()),
                role: form.role,
                status: form.status,
                ..user
            }))
            .await?;
        if !employee.content.is_active() {
            tx.delete_sessions_of(&employee.id, None).await?;
        }
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::EmployeeUpdated,
            format!("Employé {} modifié", employee.content.full_name),
        )
        .await?;
        tx.commit().await?;
        Ok(employee)
    }

    pub async fn deactivate_employee(
        &self,
        actor: &Actor,
        id: &Id<User>,
    ) -> RequestResult<WithId<User>> {
        let mut tx = self.database.transaction().await?;
        let company = company_of(&mut tx, actor, PATRON, true).await?;
        let employee = employee_of(&mut tx, &company.id, id).await?;
        let employee = tx
            .update(employee.map(|user| User {
                status: AccountStatus::Inactive,
                ..user
            }))
            .await?;
        let dropped = tx.delete_sessions_of(&employee.id, None).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::EmployeeUpdated,
            format!("Employé {} désactivé", employee.content.full_name),
        )
        .await?;
        tx.commit().await?;
        log::info!("employee {} deactivated, {} sessions dropped", employee.id, dropped);
        Ok(employee)
    }
}

#[cfg(test)]
mod tests {
    use model::{
        company::PlanChoiceForm,
        subscription::SubscriptionPlan,
        user::LoginForm,
        ExampleData,
    };

    use super::*;
    use crate::client::testing;

    fn form(email: &str, role: Role) -> EmployeeForm {
        EmployeeForm {
            full_name: "Moussa Fall".to_owned(),
            email: email.to_owned(),
            password: testing::PASSWORD.to_owned(),
            phone: Some("+221 77 000 00 00".to_owned()),
            role,
        }
    }

    #[tokio::test]
    async fn patron_manages_employees() {
        let client = testing::client();
        let (patron, company) = testing::patron(&client, "patron@example.sn").await;
        let manager = client
            .create_employee(&patron, form("gestion@example.sn", Role::Gestionnaire))
            .await
            .unwrap();
        assert_eq!(manager.content.company_id, Some(company.id));

        let employees = client.employees(&patron).await.unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].id, manager.id);

        let updated = client
            .update_employee(
                &patron,
                &manager.id,
                EmployeeUpdateForm {
                    full_name: "Moussa Fall".to_owned(),
                    phone: None,
                    role: Role::Caissier,
                    status: AccountStatus::Active,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.content.role, Role::Caissier);
        assert_eq!(updated.content.phone, None);
    }

    #[tokio::test]
    async fn only_the_patron_manages_employees() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let manager = client
            .create_employee(&patron, form("gestion@example.sn", Role::Gestionnaire))
            .await
            .unwrap();
        let manager = Actor::new(manager);
        assert!(matches!(
            client.create_employee(&manager, form("caisse@example.sn", Role::Caissier)).await,
            Err(RequestError::Forbidden(_))
        ));
        assert!(matches!(
            client.deactivate_employee(&manager, &patron.id()).await,
            Err(RequestError::Forbidden(_))
        ));
        assert!(matches!(
            client.deactivate_employee(&patron, &patron.id()).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn employee_emails_are_unique() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let result = client
            .create_employee(&patron, form("PATRON@example.sn", Role::Caissier))
            .await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn deactivation_ends_sessions() {
        let client = testing::client();
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let cashier = client
            .create_employee(&patron, form("caisse@example.sn", Role::Caissier))
            .await
            .unwrap();
        let (session, _) = client
            .login(LoginForm {
                email: "caisse@example.sn".to_owned(),
                password: testing::PASSWORD.to_owned(),
            })
            .await
            .unwrap();
        assert!(client.authenticate(&session.token).await.is_ok());

        let cashier = client.deactivate_employee(&patron, &cashier.id).await.unwrap();
        assert_eq!(cashier.content.status, AccountStatus::Inactive);
        assert!(matches!(
            client.authenticate(&session.token).await,
            Err(RequestError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn plan_limits_active_employees() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let plan = client
            .create_plan(
                &admin,
                SubscriptionPlan {
                    max_employees: Some(1),
                    ..SubscriptionPlan::example_data()
                },
            )
            .await
            .unwrap();
        client
            .choose_plan(&patron, PlanChoiceForm { plan_id: plan.id })
            .await
            .unwrap();

        let first = client
            .create_employee(&patron, form("un@example.sn", Role::Caissier))
            .await
            .unwrap();
        let result = client
            .create_employee(&patron, form("deux@example.sn", Role::Caissier))
            .await;
        assert!(matches!(result, Err(RequestError::Forbidden(message)) if message == EMPLOYEE_LIMIT_REACHED));

        client.deactivate_employee(&patron, &first.id).await.unwrap();
        let second = client
            .create_employee(&patron, form("deux@example.sn", Role::Caissier))
            .await
            .unwrap();

        let reactivate = EmployeeUpdateForm {
            full_name: "Moussa Fall".to_owned(),
            phone: None,
            role: Role::Caissier,
            status: AccountStatus::Active,
        };
        let result = client
            .update_employee(&patron, &first.id, reactivate.clone())
            .await;
        assert!(matches!(result, Err(RequestError::Forbidden(message)) if message == EMPLOYEE_LIMIT_REACHED));

        client.deactivate_employee(&patron, &second.id).await.unwrap();
        let first = client
            .update_employee(&patron, &first.id, reactivate)
            .await
            .unwrap();
        assert_eq!(first.content.status, AccountStatus::Active);
    }
}
